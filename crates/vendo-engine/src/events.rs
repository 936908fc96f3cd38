//! # Dispense Status Events
//!
//! Typed status events for one dispense batch, plus the display seam.
//!
//! ## Why Typed Events Over a Callback?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The obvious shape is a status callback invoked synchronously from     │
//! │  the dispense worker. That makes ordering and thread-safety accidents  │
//! │  of whoever wired the callback.                                        │
//! │                                                                         │
//! │  Instead the sequencer SENDS typed events over an unbounded mpsc       │
//! │  channel:                                                               │
//! │    • ordering is the channel's FIFO contract, not luck                 │
//! │    • a slow display can never stall a relay pulse                      │
//! │    • tests assert on variants, not on formatted strings                │
//! │                                                                         │
//! │  The human-readable string the kiosk screen shows is just the event's  │
//! │  Display impl.                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use vendo_core::LocationCode;

// =============================================================================
// DispenseEvent
// =============================================================================

/// One entry in the ordered status stream of a dispense batch.
///
/// Per-item outcomes are never fatal to the batch; the stream always ends
/// with exactly one `BatchComplete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispenseEvent {
    /// A relay pair is about to be energized.
    Activating { row: u8, col: u8 },

    /// The item's bin fired successfully.
    Dispensed {
        name: String,
        location: LocationCode,
    },

    /// The item code no longer resolves in the catalog.
    ItemNotFound { code: String },

    /// The catalog record has no usable location.
    NoLocationInfo { code: String },

    /// Activation failed for this item; the batch continues.
    HardwareError { name: String, reason: String },

    /// Terminal event: the batch is finished and the matrix released.
    BatchComplete { dispensed: usize, failed: usize },
}

impl DispenseEvent {
    /// True for the terminal event of a batch.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DispenseEvent::BatchComplete { .. })
    }
}

/// The strings the kiosk screen shows, one per event.
impl fmt::Display for DispenseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispenseEvent::Activating { row, col } => {
                write!(f, "Releasing bin: row {row}, col {col}...")
            }
            DispenseEvent::Dispensed { name, location } => {
                write!(f, "Dispensed {name} from {location}")
            }
            DispenseEvent::ItemNotFound { code } => {
                write!(f, "Error: item code {code} not found")
            }
            DispenseEvent::NoLocationInfo { code } => {
                write!(f, "Item {code} has no location information")
            }
            DispenseEvent::HardwareError { name, reason } => {
                write!(f, "Error dispensing {name}: {reason}")
            }
            DispenseEvent::BatchComplete { dispensed, failed } => {
                write!(
                    f,
                    "Dispensing complete: {dispensed} dispensed, {failed} failed"
                )
            }
        }
    }
}

// =============================================================================
// Display Seam
// =============================================================================

/// The status display collaborator.
///
/// Fire-and-forget: implementations must return promptly and never block
/// the caller (the coordinator forwards events from a worker through here).
pub trait StatusDisplay: Send + Sync {
    /// Shows one ordered, human-readable status line.
    fn notify(&self, message: &str);
}

/// No-op display for tests.
pub struct NoOpDisplay;

impl StatusDisplay for NoOpDisplay {
    fn notify(&self, _message: &str) {}
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_strings() {
        let loc: LocationCode = "A1".parse().unwrap();
        assert_eq!(
            DispenseEvent::Dispensed {
                name: "Water".to_string(),
                location: loc,
            }
            .to_string(),
            "Dispensed Water from A1"
        );
        assert_eq!(
            DispenseEvent::ItemNotFound {
                code: "99".to_string()
            }
            .to_string(),
            "Error: item code 99 not found"
        );
        assert_eq!(
            DispenseEvent::BatchComplete {
                dispensed: 2,
                failed: 1
            }
            .to_string(),
            "Dispensing complete: 2 dispensed, 1 failed"
        );
    }

    #[test]
    fn test_terminal_detection() {
        assert!(DispenseEvent::BatchComplete {
            dispensed: 0,
            failed: 0
        }
        .is_terminal());
        assert!(!DispenseEvent::ItemNotFound {
            code: "11".to_string()
        }
        .is_terminal());
    }

    #[test]
    fn test_event_serde_shape() {
        let ev = DispenseEvent::Activating { row: 2, col: 1 };
        let json = serde_json::to_string(&ev).unwrap();
        assert_eq!(json, r#"{"kind":"activating","row":2,"col":1}"#);
    }
}
