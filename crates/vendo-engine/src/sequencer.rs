//! # Dispense Sequencer
//!
//! Walks one cart in order, fires the relay matrix per item, and emits the
//! ordered status stream.
//!
//! ## Batch Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      One Dispense Batch                                 │
//! │                                                                         │
//! │  for item in cart (insertion order):                                    │
//! │    lookup(code)        ── unknown ──────► ItemNotFound, continue        │
//! │    record.location     ── absent ───────► NoLocationInfo, continue      │
//! │    parse + encode      ── malformed ────► HardwareError, continue       │
//! │    activate_by_index   ── line fault ───► HardwareError, continue       │
//! │                        ── ok ───────────► Dispensed                     │
//! │    settle delay between items (physical debounce, not UI pacing)        │
//! │                                                                         │
//! │  matrix.shutdown()     ── fault ────────► FATAL, batch returns Err      │
//! │  BatchComplete                                                          │
//! │                                                                         │
//! │  PER-ITEM FAILURES NEVER ABORT THE BATCH: a customer who paid for      │
//! │  three items gets the two servable ones, not none of them.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A sequencer run is finite and not restartable: it consumes the sequencer
//! (and the matrix inside it). A new cart needs a new sequencer.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use vendo_core::{Cart, LocationCode};
use vendo_hal::{HalResult, LineDriver, RelayMatrix, DEFAULT_PULSE};

use crate::catalog::ItemLookup;
use crate::error::EngineResult;
use crate::events::DispenseEvent;

/// Default pause between items, letting the matrix settle.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(500);

// =============================================================================
// Summary / Run Handle
// =============================================================================

/// Per-batch tallies, returned once the batch ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispenseSummary {
    /// Items whose bins fired.
    pub dispensed: usize,
    /// Items skipped or faulted (reported individually on the stream).
    pub failed: usize,
}

/// A running dispense batch: the ordered event stream plus the join handle
/// that yields the summary (or the one fatal teardown error).
pub struct DispenseRun {
    pub events: UnboundedReceiver<DispenseEvent>,
    pub done: JoinHandle<EngineResult<DispenseSummary>>,
}

/// Seam the coordinator dispenses through, so tests can count invocations
/// without touching a matrix.
pub trait Dispenser: Send + Sync {
    /// Starts a batch for `cart`.
    fn begin(&self, cart: Cart) -> EngineResult<DispenseRun>;
}

// =============================================================================
// DispenseSequencer
// =============================================================================

/// Sequences one cart through the relay matrix.
pub struct DispenseSequencer<D: LineDriver + 'static> {
    matrix: RelayMatrix<D>,
    lookup: Arc<dyn ItemLookup>,
    pulse: Duration,
    settle: Duration,
    progress: bool,
}

impl<D: LineDriver + 'static> DispenseSequencer<D> {
    /// Creates a sequencer with default timing.
    pub fn new(matrix: RelayMatrix<D>, lookup: Arc<dyn ItemLookup>) -> Self {
        DispenseSequencer {
            matrix,
            lookup,
            pulse: DEFAULT_PULSE,
            settle: DEFAULT_SETTLE,
            progress: false,
        }
    }

    /// Overrides pulse and settle durations.
    pub fn with_timing(mut self, pulse: Duration, settle: Duration) -> Self {
        self.pulse = pulse;
        self.settle = settle;
        self
    }

    /// Enables `Activating` progress events before each relay pulse.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Spawns the batch onto a worker and hands back the run handles.
    ///
    /// Consumes the sequencer: a batch cannot be restarted.
    pub fn spawn(self, cart: Cart) -> DispenseRun {
        let (tx, rx) = mpsc::unbounded_channel();
        let done = tokio::spawn(self.run(cart, tx));
        DispenseRun { events: rx, done }
    }

    async fn run(
        mut self,
        cart: Cart,
        tx: UnboundedSender<DispenseEvent>,
    ) -> EngineResult<DispenseSummary> {
        let mut dispensed = 0usize;
        let mut failed = 0usize;

        info!(items = cart.item_count(), "dispense batch started");

        for (position, item) in cart.items().iter().enumerate() {
            if position > 0 {
                // Physical debounce: the matrix must fully settle between pulses
                tokio::time::sleep(self.settle).await;
            }

            let Some(record) = self.lookup.lookup(&item.code) else {
                warn!(code = %item.code, "item code not in catalog");
                emit(&tx, DispenseEvent::ItemNotFound {
                    code: item.code.clone(),
                });
                failed += 1;
                continue;
            };

            let Some(raw_location) = record
                .location
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
            else {
                warn!(code = %item.code, "item has no location information");
                emit(&tx, DispenseEvent::NoLocationInfo {
                    code: item.code.clone(),
                });
                failed += 1;
                continue;
            };

            // Malformation is caught here, at encode time, item by item
            let location: LocationCode = match raw_location.parse() {
                Ok(loc) => loc,
                Err(e) => {
                    warn!(code = %item.code, location = raw_location, error = %e, "unservable location");
                    emit(&tx, DispenseEvent::HardwareError {
                        name: record.name.clone(),
                        reason: e.to_string(),
                    });
                    failed += 1;
                    continue;
                }
            };

            if self.progress {
                emit(&tx, DispenseEvent::Activating {
                    row: location.row(),
                    col: location.col(),
                });
            }

            match self.matrix.activate_by_index(location.index(), self.pulse).await {
                Ok(()) => {
                    info!(code = %item.code, name = %record.name, %location, "item dispensed");
                    emit(&tx, DispenseEvent::Dispensed {
                        name: record.name.clone(),
                        location,
                    });
                    dispensed += 1;
                }
                Err(e) => {
                    // One failing bin must not block the rest of the order
                    warn!(code = %item.code, error = %e, "activation failed, continuing batch");
                    emit(&tx, DispenseEvent::HardwareError {
                        name: record.name.clone(),
                        reason: e.to_string(),
                    });
                    failed += 1;
                }
            }
        }

        // The one fatal path: lines that cannot be released are a hazard
        if let Err(e) = self.matrix.shutdown() {
            error!(error = %e, "relay matrix teardown failed");
            return Err(e.into());
        }

        emit(&tx, DispenseEvent::BatchComplete { dispensed, failed });
        info!(dispensed, failed, "dispense batch complete");

        Ok(DispenseSummary { dispensed, failed })
    }
}

/// Sends an event, ignoring a dropped receiver - a vanished display must
/// not stop the relays.
fn emit(tx: &UnboundedSender<DispenseEvent>, event: DispenseEvent) {
    let _ = tx.send(event);
}

// =============================================================================
// RelayDispenser
// =============================================================================

/// Factory for the driver behind each batch's fresh matrix.
pub type DriverFactory = Box<dyn Fn() -> HalResult<Box<dyn LineDriver>> + Send + Sync>;

/// The production [`Dispenser`]: builds a fresh matrix per batch over a
/// driver from the factory, mirroring the hardware lifecycle (lines claimed
/// for the batch, released by the batch's own shutdown).
pub struct RelayDispenser {
    factory: DriverFactory,
    lookup: Arc<dyn ItemLookup>,
    pulse: Duration,
    settle: Duration,
    progress: bool,
}

impl RelayDispenser {
    pub fn new(factory: DriverFactory, lookup: Arc<dyn ItemLookup>) -> Self {
        RelayDispenser {
            factory,
            lookup,
            pulse: DEFAULT_PULSE,
            settle: DEFAULT_SETTLE,
            progress: false,
        }
    }

    /// Overrides pulse and settle durations.
    pub fn with_timing(mut self, pulse: Duration, settle: Duration) -> Self {
        self.pulse = pulse;
        self.settle = settle;
        self
    }

    /// Enables `Activating` progress events.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }
}

impl Dispenser for RelayDispenser {
    fn begin(&self, cart: Cart) -> EngineResult<DispenseRun> {
        let driver = (self.factory)()?;
        let matrix = RelayMatrix::new(driver)?;
        let sequencer = DispenseSequencer::new(matrix, self.lookup.clone())
            .with_timing(self.pulse, self.settle)
            .with_progress(self.progress);
        Ok(sequencer.spawn(cart))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use vendo_core::{CartItem, Money};
    use vendo_hal::{Line, SimulatedLineDriver, SimulatedLineHandle};

    use crate::catalog::ItemRecord;
    use crate::error::EngineError;

    const FAST: Duration = Duration::from_millis(1);

    /// Map-backed lookup stub.
    struct MapLookup(HashMap<String, ItemRecord>);

    impl MapLookup {
        fn standard() -> Arc<Self> {
            let mut items = HashMap::new();
            items.insert("11".into(), record("Water", 10000, Some("A1")));
            items.insert("12".into(), record("Chips", 15000, None));
            items.insert("13".into(), record("Soda", 18000, Some("B1")));
            items.insert("66".into(), record("Mangled", 5000, Some("Z9")));
            Arc::new(MapLookup(items))
        }
    }

    impl ItemLookup for MapLookup {
        fn lookup(&self, code: &str) -> Option<ItemRecord> {
            self.0.get(code).cloned()
        }
    }

    fn record(name: &str, price: i64, location: Option<&str>) -> ItemRecord {
        ItemRecord {
            name: name.to_string(),
            price: Money::from_cents(price),
            location: location.map(String::from),
        }
    }

    fn cart_of(codes: &[&str]) -> Cart {
        let mut cart = Cart::new();
        for code in codes {
            cart.add_item(CartItem {
                code: code.to_string(),
                name: format!("Item {code}"),
                unit_price: Money::from_cents(100),
                location: None,
            })
            .unwrap();
        }
        cart
    }

    fn sequencer(
        lookup: Arc<dyn ItemLookup>,
    ) -> (DispenseSequencer<SimulatedLineDriver>, SimulatedLineHandle) {
        let driver = SimulatedLineDriver::new();
        let handle = driver.handle();
        let matrix = RelayMatrix::new(driver).unwrap();
        (
            DispenseSequencer::new(matrix, lookup).with_timing(FAST, FAST),
            handle,
        )
    }

    async fn collect(run: DispenseRun) -> (Vec<DispenseEvent>, EngineResult<DispenseSummary>) {
        let DispenseRun { mut events, done } = run;
        let mut collected = Vec::new();
        while let Some(ev) = events.recv().await {
            collected.push(ev);
        }
        let outcome = done.await.expect("dispense task must not panic");
        (collected, outcome)
    }

    #[tokio::test]
    async fn test_missing_location_mid_cart_keeps_order() {
        let (seq, _handle) = sequencer(MapLookup::standard());
        let (events, outcome) = collect(seq.spawn(cart_of(&["11", "12", "13"]))).await;

        // Exactly the per-item outcomes in cart order, then the terminal event
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], DispenseEvent::Dispensed { name, .. } if name == "Water"));
        assert!(matches!(&events[1], DispenseEvent::NoLocationInfo { code } if code == "12"));
        assert!(matches!(&events[2], DispenseEvent::Dispensed { name, .. } if name == "Soda"));
        assert_eq!(
            events[3],
            DispenseEvent::BatchComplete {
                dispensed: 2,
                failed: 1
            }
        );

        let summary = outcome.unwrap();
        assert_eq!(summary.dispensed, 2);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_unknown_code_is_reported_not_fatal() {
        let (seq, _handle) = sequencer(MapLookup::standard());
        let (events, outcome) = collect(seq.spawn(cart_of(&["99", "11"]))).await;

        assert!(matches!(&events[0], DispenseEvent::ItemNotFound { code } if code == "99"));
        assert!(matches!(&events[1], DispenseEvent::Dispensed { .. }));
        assert_eq!(outcome.unwrap().dispensed, 1);
    }

    #[tokio::test]
    async fn test_malformed_location_is_reported_at_encode_time() {
        let (seq, _handle) = sequencer(MapLookup::standard());
        let (events, outcome) = collect(seq.spawn(cart_of(&["66", "11"]))).await;

        assert!(matches!(
            &events[0],
            DispenseEvent::HardwareError { name, reason }
                if name == "Mangled" && reason.contains("Z9")
        ));
        assert!(matches!(&events[1], DispenseEvent::Dispensed { .. }));
        assert_eq!(outcome.unwrap().dispensed, 1);
    }

    #[tokio::test]
    async fn test_line_fault_does_not_block_rest_of_order() {
        let (seq, handle) = sequencer(MapLookup::standard());
        // "11" lives at A1 = row 0; fault that row
        handle.inject_fault(Line::Row(0));

        let (events, outcome) = collect(seq.spawn(cart_of(&["11", "13"]))).await;

        assert!(matches!(&events[0], DispenseEvent::HardwareError { name, .. } if name == "Water"));
        assert!(matches!(&events[1], DispenseEvent::Dispensed { name, .. } if name == "Soda"));
        assert_eq!(
            events[2],
            DispenseEvent::BatchComplete {
                dispensed: 1,
                failed: 1
            }
        );
        assert!(outcome.is_ok());
        assert!(handle.is_all_low());
    }

    #[tokio::test]
    async fn test_matrix_released_exactly_once_after_batch() {
        let (seq, handle) = sequencer(MapLookup::standard());
        let (_events, outcome) = collect(seq.spawn(cart_of(&["11"]))).await;

        assert!(outcome.is_ok());
        assert!(handle.is_released());
        assert!(handle.is_all_low());
    }

    #[tokio::test]
    async fn test_teardown_fault_is_fatal_and_suppresses_batch_complete() {
        let (seq, handle) = sequencer(MapLookup::standard());
        handle.inject_release_fault();

        let (events, outcome) = collect(seq.spawn(cart_of(&["11"]))).await;

        // The item still dispensed, but the stream never completed
        assert!(matches!(&events[0], DispenseEvent::Dispensed { .. }));
        assert!(!events.iter().any(DispenseEvent::is_terminal));
        assert!(matches!(outcome, Err(EngineError::Hal(_))));
    }

    #[tokio::test]
    async fn test_progress_events_when_enabled() {
        let (seq, _handle) = sequencer(MapLookup::standard());
        let (events, _) = collect(seq.with_progress(true).spawn(cart_of(&["13"]))).await;

        // B1 = row 1, col 0
        assert_eq!(events[0], DispenseEvent::Activating { row: 1, col: 0 });
        assert!(matches!(&events[1], DispenseEvent::Dispensed { .. }));
    }

    #[tokio::test]
    async fn test_relay_dispenser_builds_fresh_matrix_per_batch() {
        let handles: Arc<std::sync::Mutex<Vec<SimulatedLineHandle>>> = Arc::default();
        let handles_in_factory = handles.clone();
        let factory: DriverFactory = Box::new(move || {
            let driver = SimulatedLineDriver::new();
            handles_in_factory.lock().unwrap().push(driver.handle());
            let boxed: Box<dyn LineDriver> = Box::new(driver);
            Ok(boxed)
        });

        let dispenser =
            RelayDispenser::new(factory, MapLookup::standard()).with_timing(FAST, FAST);

        for _ in 0..2 {
            let (_events, outcome) = collect(dispenser.begin(cart_of(&["11"])).unwrap()).await;
            assert!(outcome.is_ok());
        }

        let handles = handles.lock().unwrap();
        assert_eq!(handles.len(), 2, "one fresh driver per batch");
        assert!(handles.iter().all(SimulatedLineHandle::is_released));
    }
}
