//! Result type aliases

use crate::error::{SearchError, ValidationErrors};

/// Standard Result type for search and storage operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Result of a validation pass
pub type ValidationResult = Result<(), ValidationErrors>;

/// Turn a possibly-empty error collection into a validation result
pub fn validation_result(errors: ValidationErrors) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_result() {
        assert!(validation_result(ValidationErrors::new()).is_ok());

        let mut errors = ValidationErrors::new();
        errors.add("age_loe", "must not be negative");
        let err = validation_result(errors).unwrap_err();
        assert!(err.has_error("age_loe"));
    }
}
