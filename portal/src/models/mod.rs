// Domain models shared by the wizard, the workflow views and the backend adapters.

pub mod record;
pub mod request;
