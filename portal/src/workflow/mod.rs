// Request workflow after submission: the administrator's dashboard, the
// owner's tracking view and the owner's history.
//
// Requests are nested records inside container documents
// (`requests/<container>/<request>`), so every view goes through
// `RequestRepository`.

pub mod admin;
pub mod history;
pub mod query;
pub mod repository;
pub mod tracking;

use thiserror::Error;

use crate::backend::BackendError;
use crate::models::request::RequestStatus;

/// Why a status change or edit was refused. Refusals never write.
#[derive(Debug, Error)]
pub enum StatusChangeError {
    #[error("You must be signed in.")]
    NotSignedIn,
    #[error("The requested record no longer exists.")]
    NotFound {
        container_id: String,
        request_id: String,
    },
    #[error("This document has already been declined and cannot be changed.")]
    AlreadyDeclined,
    #[error("Please provide a reason for declining.")]
    ReasonRequired,
    #[error("A request cannot move from {from} to {to}.")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },
    #[error("This request has already been followed up.")]
    AlreadyFollowedUp,
    #[error("'{0}' cannot be edited.")]
    ReadOnlyField(String),
    #[error("Only pending requests can be edited.")]
    NotEditable,
    #[error("Only claimed or acknowledged requests can be removed from history.")]
    NotTerminal,
    #[error("{0}")]
    Backend(#[from] BackendError),
}

impl StatusChangeError {
    pub(crate) fn not_found(container_id: &str, request_id: &str) -> Self {
        StatusChangeError::NotFound {
            container_id: container_id.to_string(),
            request_id: request_id.to_string(),
        }
    }
}
