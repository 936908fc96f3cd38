//! # Engine Error Types
//!
//! ## Propagation Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Who Sees Which Error                              │
//! │                                                                         │
//! │  Per-item during dispensing          → status stream, NEVER fatal      │
//! │  (unknown code, missing location,                                       │
//! │   single line fault)                                                    │
//! │                                                                         │
//! │  Before charging                      → EmptyCart / InvalidItems       │
//! │  (nothing was charged)                                                  │
//! │                                                                         │
//! │  Payment declined                     → PaymentFailed (retryable)      │
//! │                                                                         │
//! │  Matrix teardown fault, crashed       → fatal: coordinator returns     │
//! │  payment/dispense worker              to Idle with a surfaced error    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use vendo_core::CoreError;
use vendo_hal::HalError;

use crate::coordinator::KioskState;

/// Engine-level errors surfaced to the interactive layer.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Submit called with nothing in the cart. No charge was attempted.
    #[error("cart is empty")]
    EmptyCart,

    /// Cart items whose codes no longer resolve in the live catalog
    /// (an admin edited or deleted them mid-session). Nothing was charged.
    #[error("items no longer available: {}", codes.join(", "))]
    InvalidItems { codes: Vec<String> },

    /// A selection was refused: unknown code or an unsellable record.
    #[error("item {code} not available")]
    ItemNotAvailable { code: String },

    /// An operation arrived while a transaction is already in flight.
    #[error("kiosk busy ({state})")]
    Busy { state: KioskState },

    /// The card reader declined the charge. Recoverable by retry.
    #[error("payment failed: {message}")]
    PaymentFailed {
        message: String,
        error_code: Option<String>,
    },

    /// The payment worker panicked or was torn down mid-charge.
    #[error("payment worker failed: {0}")]
    PaymentWorker(String),

    /// The dispense worker panicked or was torn down mid-batch.
    #[error("dispense worker failed: {0}")]
    DispenseWorker(String),

    /// Hardware fault escalated as fatal (matrix teardown).
    #[error(transparent)]
    Hal(#[from] HalError),

    /// Domain error from vendo-core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Catalog file could not be read or written.
    #[error("catalog I/O error: {0}")]
    CatalogIo(#[from] std::io::Error),

    /// Catalog file is not valid JSON / not the expected shape.
    #[error("catalog format error: {0}")]
    CatalogFormat(String),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

/// Convenience type alias for Results with EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_items_message() {
        let err = EngineError::InvalidItems {
            codes: vec!["11".to_string(), "99".to_string()],
        };
        assert_eq!(err.to_string(), "items no longer available: 11, 99");
    }

    #[test]
    fn test_busy_message() {
        let err = EngineError::Busy {
            state: KioskState::Dispensing,
        };
        assert_eq!(err.to_string(), "kiosk busy (dispensing)");
    }

    #[test]
    fn test_hal_error_converts() {
        let err: EngineError = HalError::ShutDown.into();
        assert_eq!(err.to_string(), "relay matrix is shut down");
    }
}
