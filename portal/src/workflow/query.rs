// Filtering and sorting of request rows for the list views.

use chrono::NaiveDate;
use std::cmp::Ordering;
use std::str::FromStr;

use crate::models::request::{DocumentType, RequestRow, RequestStatus, SubmittedRequest};

/// Empty fields match everything. `date` matches the UTC calendar day of
/// `requestDateTime`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub document_type: Option<DocumentType>,
    pub status: Option<RequestStatus>,
    pub date: Option<NaiveDate>,
}

impl RequestFilter {
    pub fn matches(&self, request: &SubmittedRequest) -> bool {
        self.document_type
            .map_or(true, |t| t == request.document_type)
            && self.status.map_or(true, |s| s == request.status)
            && self
                .date
                .map_or(true, |d| d == request.requested_at.date_naive())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    DocumentType,
    Copies,
    Status,
    RequestedAt,
}

impl FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "document-type" => Ok(SortKey::DocumentType),
            "number-of-copies" => Ok(SortKey::Copies),
            "status" => Ok(SortKey::Status),
            "requestDateTime" => Ok(SortKey::RequestedAt),
            other => Err(anyhow::anyhow!("Unknown sort key: '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

fn compare(key: SortKey, a: &SubmittedRequest, b: &SubmittedRequest) -> Ordering {
    match key {
        SortKey::DocumentType => a
            .document_type
            .as_str()
            .to_lowercase()
            .cmp(&b.document_type.as_str().to_lowercase()),
        SortKey::Copies => a.copies.cmp(&b.copies),
        SortKey::Status => a
            .status
            .as_str()
            .to_lowercase()
            .cmp(&b.status.as_str().to_lowercase()),
        SortKey::RequestedAt => a.requested_at.cmp(&b.requested_at),
    }
}

/// Filter, then stable-sort when a sort is given.
pub fn apply(
    rows: Vec<RequestRow>,
    filter: &RequestFilter,
    sort: Option<(SortKey, SortOrder)>,
) -> Vec<RequestRow> {
    let mut rows: Vec<RequestRow> = rows
        .into_iter()
        .filter(|row| filter.matches(&row.request))
        .collect();
    if let Some((key, order)) = sort {
        rows.sort_by(|a, b| {
            let ord = compare(key, &a.request, &b.request);
            match order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::repository::sample_request;
    use chrono::{TimeZone, Utc};

    fn row(
        id: &str,
        doc: DocumentType,
        status: RequestStatus,
        copies: u32,
        day: u32,
    ) -> RequestRow {
        let mut request = sample_request("u1", status);
        request.document_type = doc;
        request.copies = copies;
        request.requested_at = Utc.with_ymd_and_hms(2024, 3, day, 9, 30, 0).unwrap();
        RequestRow {
            container_id: id.to_string(),
            request_id: "r".to_string(),
            request,
        }
    }

    fn rows() -> Vec<RequestRow> {
        vec![
            row("a", DocumentType::Residency, RequestStatus::Pending, 2, 1),
            row("b", DocumentType::BusinessPermit, RequestStatus::Processing, 5, 2),
            row("c", DocumentType::Indigency, RequestStatus::Pending, 1, 2),
        ]
    }

    fn ids(rows: &[RequestRow]) -> Vec<&str> {
        rows.iter().map(|r| r.container_id.as_str()).collect()
    }

    #[test]
    fn empty_filter_keeps_everything() {
        assert_eq!(apply(rows(), &RequestFilter::default(), None).len(), 3);
    }

    #[test]
    fn filters_combine() {
        let filter = RequestFilter {
            status: Some(RequestStatus::Pending),
            date: NaiveDate::from_ymd_opt(2024, 3, 2),
            ..RequestFilter::default()
        };
        assert_eq!(ids(&apply(rows(), &filter, None)), vec!["c"]);

        let by_type = RequestFilter {
            document_type: Some(DocumentType::BusinessPermit),
            ..RequestFilter::default()
        };
        assert_eq!(ids(&apply(rows(), &by_type, None)), vec!["b"]);
    }

    #[test]
    fn sorts_by_key_and_order() {
        let f = RequestFilter::default();
        assert_eq!(
            ids(&apply(rows(), &f, Some((SortKey::DocumentType, SortOrder::Ascending)))),
            vec!["b", "c", "a"]
        );
        assert_eq!(
            ids(&apply(rows(), &f, Some((SortKey::Copies, SortOrder::Descending)))),
            vec!["b", "a", "c"]
        );
        assert_eq!(
            ids(&apply(rows(), &f, Some((SortKey::Status, SortOrder::Ascending)))),
            vec!["a", "c", "b"],
            "Stable for equal statuses"
        );
    }

    #[test]
    fn sort_key_parses_wire_names() {
        assert_eq!("number-of-copies".parse::<SortKey>().unwrap(), SortKey::Copies);
        assert!("colour".parse::<SortKey>().is_err());
        assert_eq!(SortOrder::Ascending.toggled(), SortOrder::Descending);
    }
}
