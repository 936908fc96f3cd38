//! # Payment Gateway
//!
//! The card reader seam and its mock implementation.
//!
//! ## The Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     PaymentGateway.charge(total)                        │
//! │                                                                         │
//! │  • BLOCKING, with no guaranteed latency bound (real readers take       │
//! │    hundreds of ms to seconds)                                           │
//! │  • untrusted: can decline or fail nondeterministically                  │
//! │  • exactly one result per attempt, consumed immediately                 │
//! │                                                                         │
//! │  Because it blocks, the coordinator ONLY ever calls it through         │
//! │  tokio::task::spawn_blocking - never on the interactive thread.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::thread;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use vendo_core::Money;

// =============================================================================
// PaymentResult
// =============================================================================

/// The outcome of one charge attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    /// Whether the charge went through.
    pub success: bool,

    /// The amount that was (or would have been) charged.
    pub amount: Money,

    /// Human-readable status line for the kiosk screen.
    pub message: String,

    /// Reader transaction id, present on success.
    pub transaction_id: Option<String>,

    /// Reader error code, present on failure.
    pub error_code: Option<String>,
}

impl PaymentResult {
    /// Builds an approved result.
    pub fn approved(amount: Money, transaction_id: impl Into<String>) -> Self {
        PaymentResult {
            success: true,
            amount,
            message: "Payment successful".to_string(),
            transaction_id: Some(transaction_id.into()),
            error_code: None,
        }
    }

    /// Builds a declined result.
    pub fn declined(amount: Money, message: impl Into<String>, error_code: impl Into<String>) -> Self {
        PaymentResult {
            success: false,
            amount,
            message: message.into(),
            transaction_id: None,
            error_code: Some(error_code.into()),
        }
    }
}

// =============================================================================
// PaymentGateway Seam
// =============================================================================

/// Blocking charge call against the card reader.
///
/// `Send + Sync` so the coordinator can hand a clone of the `Arc` to a
/// blocking worker.
pub trait PaymentGateway: Send + Sync {
    /// Charges `amount`; blocks until the reader answers.
    fn charge(&self, amount: Money) -> PaymentResult;
}

// =============================================================================
// Mock Card Reader
// =============================================================================

/// Simulated card reader.
///
/// Mimics a real reader's behavior: a fixed processing delay and a
/// configurable approval probability. Deterministic constructors exist for
/// tests that need a known outcome.
#[derive(Debug, Clone)]
pub struct MockCardReader {
    delay: Duration,
    approval_rate_pct: u8,
}

impl MockCardReader {
    /// Reader with the standard ~2s processing delay.
    ///
    /// `approval_rate_pct` is clamped to 100.
    pub fn new(approval_rate_pct: u8) -> Self {
        MockCardReader {
            delay: Duration::from_secs(2),
            approval_rate_pct: approval_rate_pct.min(100),
        }
    }

    /// Overrides the processing delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Reader that instantly approves everything (tests).
    pub fn approve_all() -> Self {
        MockCardReader {
            delay: Duration::ZERO,
            approval_rate_pct: 100,
        }
    }

    /// Reader that instantly declines everything (tests).
    pub fn decline_all() -> Self {
        MockCardReader {
            delay: Duration::ZERO,
            approval_rate_pct: 0,
        }
    }
}

impl PaymentGateway for MockCardReader {
    fn charge(&self, amount: Money) -> PaymentResult {
        // Real readers block; so does the mock
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        let mut rng = rand::thread_rng();
        let approved = rng.gen_range(0..100u8) < self.approval_rate_pct;
        debug!(amount = %amount, approved, "mock card reader answered");

        if approved {
            let txn = format!("TXN{:05}", rng.gen_range(10000..=99999u32));
            PaymentResult::approved(amount, txn)
        } else {
            PaymentResult::declined(
                amount,
                "Payment failed: insufficient funds",
                "INSUFFICIENT_FUNDS",
            )
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
