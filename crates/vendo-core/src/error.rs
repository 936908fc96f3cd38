//! # Error Types
//!
//! Domain-specific error types for vendo-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  vendo-core errors (this file)                                         │
//! │  ├── CoreError        - Location codec and cart domain errors          │
//! │  └── ValidationError  - Keypad / catalog input validation failures     │
//! │                                                                         │
//! │  vendo-hal errors (separate crate)                                     │
//! │  └── HalError         - Relay line faults, shutdown violations         │
//! │                                                                         │
//! │  vendo-engine errors (separate crate)                                  │
//! │  └── EngineError      - Payment, catalog I/O, coordinator state        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → display message     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (item code, index, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
///
/// A malformed location or out-of-range index indicates corrupt catalog data.
/// The dispense layer reports these per item; one bad bin record must never
/// halt dispensing of the valid ones.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A bin location string does not name a valid matrix cell.
    ///
    /// ## When This Occurs
    /// - Catalog record carries "A9", "Z1", "11", "" or similar
    /// - An admin typo survived into the persisted catalog
    #[error("invalid bin location {value:?}: {reason}")]
    InvalidLocation { value: String, reason: String },

    /// A linear matrix index is outside the addressable range.
    #[error("matrix index {index} out of range (0..{max})")]
    IndexOutOfRange { index: usize, max: usize },

    /// Cart has reached its maximum item count.
    #[error("cart cannot hold more than {max} items")]
    CartFull { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when keypad input or a catalog record doesn't meet
/// requirements. Used for early validation before any money moves.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g., non-digit characters in a keypad code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    NotPositive { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidLocation {
            value: "Z9".to_string(),
            reason: "row letter must be A-H".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid bin location \"Z9\": row letter must be A-H"
        );

        let err = CoreError::IndexOutOfRange { index: 40, max: 32 };
        assert_eq!(err.to_string(), "matrix index 40 out of range (0..32)");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "item code".to_string(),
        };
        assert_eq!(err.to_string(), "item code is required");

        let err = ValidationError::NotPositive {
            field: "price".to_string(),
        };
        assert_eq!(err.to_string(), "price must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "item code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
