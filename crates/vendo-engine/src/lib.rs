//! # vendo-engine: Transaction Orchestration for the Vendo Kiosk
//!
//! Everything between the interactive surface and the relay lines: the item
//! catalog, the payment gateway seam, the dispense sequencer, and the
//! transaction coordinator that ties them together off the UI thread.
//!
//! ## Transaction Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        One Kiosk Transaction                            │
//! │                                                                         │
//! │  keypad ──► confirm_selection(code) ──► Cart (ordered, running total)  │
//! │                                                                         │
//! │  pay ──► TransactionCoordinator.submit()                               │
//! │            │  Idle → Validating   cart non-empty? codes still valid?   │
//! │            │  Validating → Charging                                     │
//! │            │      spawn_blocking ──► PaymentGateway.charge(total)      │
//! │            │  Charging → Dispensing (on success)                        │
//! │            │      DispenseSequencer ──► RelayMatrix per item            │
//! │            │          events ──► mpsc ──► StatusDisplay (in order)     │
//! │            │  Dispensing → Idle   cart cleared, receipt returned        │
//! │            ▼                                                            │
//! │          errors at any stage → Idle with a readable message             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`catalog`] - JSON-backed item catalog and the `ItemLookup` seam
//! - [`payment`] - `PaymentGateway` trait and the mock card reader
//! - [`events`] - typed dispense status events and the display seam
//! - [`sequencer`] - per-item dispense loop over the relay matrix
//! - [`coordinator`] - the kiosk state machine
//! - [`config`] - layered kiosk configuration
//! - [`error`] - engine error types

pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod payment;
pub mod sequencer;

pub use catalog::{CatalogStore, ItemLookup, ItemRecord};
pub use config::{ConfigError, KioskConfig};
pub use coordinator::{
    spawn_idle_watchdog, CoordinatorBuilder, KioskState, PaymentPolicy, TransactionCoordinator,
    TransactionReceipt,
};
pub use error::{EngineError, EngineResult};
pub use events::{DispenseEvent, NoOpDisplay, StatusDisplay};
pub use payment::{MockCardReader, PaymentGateway, PaymentResult};
pub use sequencer::{
    DispenseRun, DispenseSequencer, DispenseSummary, Dispenser, DriverFactory, RelayDispenser,
};
