//! # Transaction Coordinator
//!
//! The state machine that serializes a kiosk session: selection, payment,
//! dispensing, one transaction at a time.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   confirm_selection / cancel                 submit()                   │
//! │          ┌────┐                                                         │
//! │          ▼    │        ┌────────────┐      ┌──────────┐                 │
//! │        ┌──────┴──┐     │ Validating │      │ Charging │                 │
//! │        │  Idle   ├────►│ cart+codes ├─────►│ blocking ├──┐              │
//! │        └─────────┘     └─────┬──────┘      └────┬─────┘  │ approved     │
//! │             ▲                │ EmptyCart /      │        ▼              │
//! │             │                │ InvalidItems     │   ┌────────────┐      │
//! │             │                ▼                  │   │ Dispensing │      │
//! │             │◄───────────────┘    declined /    │   │ relay batch│      │
//! │             │◄──────────────────────────────────┘   └────┬───────┘      │
//! │             │◄───────────────────────────────────────────┘              │
//! │             │        BatchComplete / fatal teardown                     │
//! │                                                                         │
//! │  Any submit/confirm/cancel while not Idle ⇒ Busy. NOTHING is charged   │
//! │  before validation passes, and the cart is cleared only once the        │
//! │  customer has been charged.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One coordinator per kiosk; callers share it behind an `Arc`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

use vendo_core::{validate_item_code, Cart, CartItem, CartTotals};

use crate::catalog::ItemLookup;
use crate::error::{EngineError, EngineResult};
use crate::events::StatusDisplay;
use crate::payment::PaymentGateway;
use crate::sequencer::{DispenseRun, DispenseSummary, Dispenser};

/// Default inactivity window before an abandoned cart is cleared.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// States / Policy / Receipt
// =============================================================================

/// Coordinator phase. Only `Idle` accepts new interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KioskState {
    Idle,
    Validating,
    Charging,
    Dispensing,
}

impl std::fmt::Display for KioskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            KioskState::Idle => "idle",
            KioskState::Validating => "validating",
            KioskState::Charging => "charging",
            KioskState::Dispensing => "dispensing",
        };
        f.write_str(s)
    }
}

/// What happens to the cart when the card reader declines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPolicy {
    /// Keep the cart so the customer can retry with another card.
    #[default]
    PreserveCart,
    /// Drop the cart; the customer starts over.
    ClearCart,
}

/// Outcome of a completed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// Kiosk-side identifier, distinct from the gateway's transaction id.
    pub receipt_id: uuid::Uuid,
    /// Gateway transaction id, when the gateway issued one.
    pub transaction_id: Option<String>,
    pub amount: vendo_core::Money,
    pub summary: DispenseSummary,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

// =============================================================================
// TransactionCoordinator
// =============================================================================

/// Serializes kiosk sessions over the shared catalog, gateway, and matrix.
pub struct TransactionCoordinator {
    state: Mutex<KioskState>,
    cart: Mutex<Cart>,
    last_interaction: Mutex<Instant>,
    lookup: Arc<dyn ItemLookup>,
    gateway: Arc<dyn PaymentGateway>,
    dispenser: Arc<dyn Dispenser>,
    display: Arc<dyn StatusDisplay>,
    policy: PaymentPolicy,
    idle_timeout: Duration,
}

/// Builder for [`TransactionCoordinator`].
pub struct CoordinatorBuilder {
    lookup: Arc<dyn ItemLookup>,
    gateway: Arc<dyn PaymentGateway>,
    dispenser: Arc<dyn Dispenser>,
    display: Arc<dyn StatusDisplay>,
    policy: PaymentPolicy,
    idle_timeout: Duration,
}

impl CoordinatorBuilder {
    pub fn new(
        lookup: Arc<dyn ItemLookup>,
        gateway: Arc<dyn PaymentGateway>,
        dispenser: Arc<dyn Dispenser>,
    ) -> Self {
        CoordinatorBuilder {
            lookup,
            gateway,
            dispenser,
            display: Arc::new(crate::events::NoOpDisplay),
            policy: PaymentPolicy::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn display(mut self, display: Arc<dyn StatusDisplay>) -> Self {
        self.display = display;
        self
    }

    pub fn payment_policy(mut self, policy: PaymentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn build(self) -> Arc<TransactionCoordinator> {
        Arc::new(TransactionCoordinator {
            state: Mutex::new(KioskState::Idle),
            cart: Mutex::new(Cart::new()),
            last_interaction: Mutex::new(Instant::now()),
            lookup: self.lookup,
            gateway: self.gateway,
            dispenser: self.dispenser,
            display: self.display,
            policy: self.policy,
            idle_timeout: self.idle_timeout,
        })
    }
}

impl TransactionCoordinator {
    pub fn builder(
        lookup: Arc<dyn ItemLookup>,
        gateway: Arc<dyn PaymentGateway>,
        dispenser: Arc<dyn Dispenser>,
    ) -> CoordinatorBuilder {
        CoordinatorBuilder::new(lookup, gateway, dispenser)
    }

    /// Current phase, for UIs that grey out their trigger surfaces.
    pub fn state(&self) -> KioskState {
        *self.state.lock().expect("coordinator state mutex poisoned")
    }

    /// Refreshes the inactivity clock. Every interactive entry point calls
    /// this; UIs may also call it directly on raw input events.
    pub fn touch(&self) {
        *self
            .last_interaction
            .lock()
            .expect("coordinator clock mutex poisoned") = Instant::now();
    }

    /// Snapshot of the cart's count and total for the UI header.
    pub fn cart_totals(&self) -> CartTotals {
        CartTotals::from(&*self.cart.lock().expect("coordinator cart mutex poisoned"))
    }

    /// Validates a keypad code, resolves it in the catalog, and appends it
    /// to the cart. Each confirmation is one bin activation later; repeats
    /// of the same code stay separate entries.
    pub fn confirm_selection(&self, code: &str) -> EngineResult<CartTotals> {
        self.touch();
        self.require_idle()?;

        let code = code.trim();
        validate_item_code(code).map_err(vendo_core::CoreError::from)?;

        let Some(record) = self.lookup.lookup(code) else {
            return Err(EngineError::ItemNotAvailable {
                code: code.to_string(),
            });
        };

        let mut cart = self.cart.lock().expect("coordinator cart mutex poisoned");
        cart.add_item(CartItem {
            code: code.to_string(),
            name: record.name,
            unit_price: record.price,
            location: record
                .location
                .as_deref()
                .and_then(|l| l.trim().parse().ok()),
        })?;

        info!(code, count = cart.item_count(), "selection confirmed");
        Ok(CartTotals::from(&*cart))
    }

    /// Clears the cart. Only before payment; a charged cart is the
    /// dispenser's to finish.
    pub fn cancel(&self) -> EngineResult<()> {
        self.touch();
        self.require_idle()?;

        let mut cart = self.cart.lock().expect("coordinator cart mutex poisoned");
        if !cart.is_empty() {
            info!(count = cart.item_count(), "session cancelled, cart cleared");
            cart.clear();
        }
        Ok(())
    }

    /// Runs the full transaction: validate, charge, dispense.
    ///
    /// Returns to `Idle` on every exit path. The cart is cleared exactly
    /// when the customer has been charged - even a fatal teardown after an
    /// approved charge clears it, because a retry would charge and dispense
    /// the same items twice.
    pub async fn submit(&self) -> EngineResult<TransactionReceipt> {
        self.touch();
        self.enter(KioskState::Validating)?;

        let result = self.run_transaction().await;
        self.set_state(KioskState::Idle);
        self.touch();
        result
    }

    async fn run_transaction(&self) -> EngineResult<TransactionReceipt> {
        // ---- Validating ----
        let cart_snapshot = {
            let cart = self.cart.lock().expect("coordinator cart mutex poisoned");
            if cart.is_empty() {
                return Err(EngineError::EmptyCart);
            }
            cart.clone()
        };

        // An admin may have edited the catalog since the items were added
        let stale: Vec<String> = cart_snapshot
            .items()
            .iter()
            .filter(|item| self.lookup.lookup(&item.code).is_none())
            .map(|item| item.code.clone())
            .collect();
        if !stale.is_empty() {
            warn!(codes = ?stale, "cart items vanished from catalog, nothing charged");
            return Err(EngineError::InvalidItems { codes: stale });
        }

        // ---- Charging ----
        let total = cart_snapshot.total();
        self.set_state(KioskState::Charging);
        info!(%total, items = cart_snapshot.item_count(), "charging card");

        let gateway = self.gateway.clone();
        let outcome = tokio::task::spawn_blocking(move || gateway.charge(total))
            .await
            .map_err(|e| {
                error!(error = %e, "payment worker crashed");
                EngineError::PaymentWorker(e.to_string())
            })?;

        if !outcome.success {
            warn!(message = %outcome.message, code = ?outcome.error_code, "payment declined");
            self.display.notify(&outcome.message);
            if self.policy == PaymentPolicy::ClearCart {
                self.cart
                    .lock()
                    .expect("coordinator cart mutex poisoned")
                    .clear();
            }
            return Err(EngineError::PaymentFailed {
                message: outcome.message,
                error_code: outcome.error_code,
            });
        }

        info!(txn = ?outcome.transaction_id, %total, "payment approved");
        self.display.notify(&outcome.message);

        // ---- Dispensing ----
        self.set_state(KioskState::Dispensing);
        let batch = self.run_batch(cart_snapshot).await;

        // Charged: the cart is spent however the batch ended. A retry after
        // a teardown fault would charge and dispense the same items twice.
        self.cart
            .lock()
            .expect("coordinator cart mutex poisoned")
            .clear();
        let summary = batch?;

        Ok(TransactionReceipt {
            receipt_id: uuid::Uuid::new_v4(),
            transaction_id: outcome.transaction_id,
            amount: total,
            summary,
            completed_at: chrono::Utc::now(),
        })
    }

    /// Drives one dispense batch, forwarding every event to the display in
    /// arrival order.
    async fn run_batch(&self, cart: Cart) -> EngineResult<DispenseSummary> {
        let DispenseRun { mut events, done } = self.dispenser.begin(cart)?;

        while let Some(event) = events.recv().await {
            self.display.notify(&event.to_string());
        }

        done.await.map_err(|e| {
            error!(error = %e, "dispense worker crashed");
            EngineError::DispenseWorker(e.to_string())
        })?
    }

    // ---- state plumbing ----

    fn require_idle(&self) -> EngineResult<()> {
        let state = *self.state.lock().expect("coordinator state mutex poisoned");
        if state != KioskState::Idle {
            return Err(EngineError::Busy { state });
        }
        Ok(())
    }

    /// Atomically leaves `Idle` for `next`; `Busy` if a transaction is
    /// already in flight.
    fn enter(&self, next: KioskState) -> EngineResult<()> {
        let mut state = self.state.lock().expect("coordinator state mutex poisoned");
        if *state != KioskState::Idle {
            return Err(EngineError::Busy { state: *state });
        }
        *state = next;
        Ok(())
    }

    fn set_state(&self, next: KioskState) {
        *self.state.lock().expect("coordinator state mutex poisoned") = next;
    }

    fn idle_for(&self) -> Duration {
        self.last_interaction
            .lock()
            .expect("coordinator clock mutex poisoned")
            .elapsed()
    }
}

// =============================================================================
// Idle Watchdog
// =============================================================================

/// Background task clearing carts abandoned at the machine.
///
/// Fires only when the coordinator is `Idle` with a non-empty cart and the
/// inactivity window has fully elapsed; it never touches an in-flight
/// charge or dispense.
pub fn spawn_idle_watchdog(coordinator: Arc<TransactionCoordinator>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let poll = coordinator.idle_timeout / 4;
        loop {
            tokio::time::sleep(poll).await;

            if coordinator.state() != KioskState::Idle {
                continue;
            }
            if coordinator.idle_for() < coordinator.idle_timeout {
                continue;
            }

            let mut cart = coordinator
                .cart
                .lock()
                .expect("coordinator cart mutex poisoned");
            if cart.is_empty() {
                continue;
            }

            info!(count = cart.item_count(), "idle timeout, clearing abandoned cart");
            cart.clear();
            drop(cart);

            coordinator.display.notify("Session timed out");
            coordinator.touch();
        }
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
