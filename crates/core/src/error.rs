// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// True for errors caused by caller input rather than engine faults
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            AppError::Domain(crate::domain::DomainError::InvalidClass(_))
        )
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
