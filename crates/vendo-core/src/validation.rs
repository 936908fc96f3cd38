//! # Validation Module
//!
//! Input validation utilities for the kiosk.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Keypad surface                                               │
//! │  ├── Only digit keys exist, immediate feedback                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Item code shape, catalog record sanity, password rules            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: TransactionCoordinator                                       │
//! │  ├── Cart non-empty, every code still resolves, before any charge      │
//! │                                                                         │
//! │  Defense in depth: nothing is charged for a record that fails here     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use vendo_core::validation::{validate_item_code, validate_selection};
//! use vendo_core::Money;
//!
//! validate_item_code("11").unwrap();
//! validate_selection("Water", Money::from_cents(10000)).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Item codes come from a numeric keypad; anything longer than this is a
/// stuck key or a parsing bug upstream.
const MAX_CODE_LEN: usize = 8;

/// Admin password length bounds (matches the change-password surface).
const MIN_PASSWORD_LEN: usize = 4;
const MAX_PASSWORD_LEN: usize = 16;

// =============================================================================
// Keypad Input
// =============================================================================

/// Validates a keypad item code.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 8 characters
/// - Must contain only digits (the keypad has no other keys)
///
/// ## Example
/// ```rust
/// use vendo_core::validation::validate_item_code;
///
/// assert!(validate_item_code("11").is_ok());
/// assert!(validate_item_code("").is_err());
/// assert!(validate_item_code("1A").is_err());
/// ```
pub fn validate_item_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "item code".to_string(),
        });
    }

    if code.len() > MAX_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "item code".to_string(),
            max: MAX_CODE_LEN,
        });
    }

    if !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "item code".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Catalog Record Sanity
// =============================================================================

/// Validates that a looked-up catalog record is sellable.
///
/// ## Rules
/// - Name must not be empty (a nameless record is catalog corruption)
/// - Price must be strictly positive (zero-priced records are placeholders
///   an admin has not finished editing; they must not reach the cart)
pub fn validate_selection(name: &str, price: Money) -> ValidationResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "item name".to_string(),
        });
    }

    if !price.is_positive() {
        return Err(ValidationError::NotPositive {
            field: "price".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Admin Password
// =============================================================================

/// Validates an admin password candidate.
///
/// ## Rules
/// - Must not be empty
/// - Must be between 4 and 16 characters
pub fn validate_admin_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    if password.len() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }

    if password.len() > MAX_PASSWORD_LEN {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: MAX_PASSWORD_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_item_codes() {
        assert!(validate_item_code("11").is_ok());
        assert!(validate_item_code("0").is_ok());
        assert!(validate_item_code("  42  ").is_ok()); // trimmed
    }

    #[test]
    fn test_invalid_item_codes() {
        assert!(validate_item_code("").is_err());
        assert!(validate_item_code("   ").is_err());
        assert!(validate_item_code("1A").is_err());
        assert!(validate_item_code("123456789").is_err());
    }

    #[test]
    fn test_selection_rules() {
        assert!(validate_selection("Water", Money::from_cents(10000)).is_ok());
        assert!(validate_selection("", Money::from_cents(10000)).is_err());
        assert!(validate_selection("Water", Money::zero()).is_err());
        assert!(validate_selection("Water", Money::from_cents(-5)).is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_admin_password("1234").is_ok());
        assert!(validate_admin_password("").is_err());
        assert!(validate_admin_password("123").is_err());
        assert!(validate_admin_password(&"x".repeat(17)).is_err());
    }
}
