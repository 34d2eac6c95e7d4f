// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid retry policy: {0}")]
    InvalidRetryPolicy(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
