// Shared helpers: log formatting and masking, folder resolution, input validation.

pub mod logging;
pub mod path_resolver;
pub mod validation;
