//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use dispatch_core::error::AppError;
use jsonrpsee::types::ErrorObjectOwned;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const INTERNAL_ERROR: i32 = 5000;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    if err.is_invalid_input() {
        return ErrorObjectOwned::owned(code::VALIDATION_ERROR, err.to_string(), None::<()>);
    }
    match err {
        AppError::Domain(e) => {
            ErrorObjectOwned::owned(code::INTERNAL_ERROR, e.to_string(), None::<()>)
        }
        AppError::Config(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::domain::DomainError;

    #[test]
    fn test_invalid_class_is_validation_error() {
        let err = to_rpc_error(AppError::Domain(DomainError::InvalidClass("GOLD".into())));
        assert_eq!(err.code(), code::VALIDATION_ERROR);
        assert!(err.message().contains("GOLD"));
    }

    #[test]
    fn test_invariant_violation_is_internal_error() {
        let err = to_rpc_error(AppError::Domain(DomainError::InvariantViolation(
            "bot 1 double booked".into(),
        )));
        assert_eq!(err.code(), code::INTERNAL_ERROR);
    }
}
