use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchdayError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: &'static str, id: u32 },
    #[error("{operation} failed: {message}")]
    Integrity { operation: &'static str, message: String },
    #[error("Permission denied: Cannot {action} {resource}")]
    Permission { action: String, resource: String },
    #[error("{0}")]
    Allocation(String),
}

pub type Result<T, E = MatchdayError> = std::result::Result<T, E>;

impl MatchdayError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str, id: u32) -> Self {
        Self::NotFound { resource, id }
    }

    pub fn integrity(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Integrity {
            operation,
            message: message.into(),
        }
    }
}
