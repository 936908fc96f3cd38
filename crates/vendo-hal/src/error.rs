//! # HAL Error Types
//!
//! ## Design Principles
//! 1. Line faults carry the line and a reason - the sequencer reports them
//!    per item, never as batch-fatal
//! 2. Addressing errors reuse the core codec's `IndexOutOfRange`
//! 3. A matrix that has been shut down refuses further activations

use thiserror::Error;

use vendo_core::CoreError;

use crate::driver::Line;

/// Hardware abstraction layer errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HalError {
    /// The underlying driver failed to switch a line.
    ///
    /// ## When This Occurs
    /// - GPIO write fails on the deployed backend
    /// - An injected fault in the simulated backend (tests)
    #[error("relay line fault on {line}: {reason}")]
    LineFault { line: Line, reason: String },

    /// The driver failed as a whole, outside any single line switch
    /// (typically while releasing the hardware).
    #[error("hardware driver fault: {reason}")]
    DriverFault { reason: String },

    /// Activation requested after the matrix released its hardware.
    #[error("relay matrix is shut down")]
    ShutDown,

    /// Addressing error from the location codec (row/col/index bounds).
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Convenience type alias for Results with HalError.
pub type HalResult<T> = Result<T, HalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_fault_message() {
        let err = HalError::LineFault {
            line: Line::Row(2),
            reason: "injected fault".to_string(),
        };
        assert_eq!(err.to_string(), "relay line fault on row 2: injected fault");
    }

    #[test]
    fn test_core_error_passthrough() {
        let err: HalError = CoreError::IndexOutOfRange { index: 40, max: 32 }.into();
        assert_eq!(err.to_string(), "matrix index 40 out of range (0..32)");
    }
}
