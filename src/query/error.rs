use thiserror::Error;

/// A query parameter that could not be turned into a transform option.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Query parameter \"{field}\" is not valid. Reason: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}
