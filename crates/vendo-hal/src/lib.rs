//! # vendo-hal: Relay Matrix Hardware Abstraction
//!
//! Low-level driver layer for the 8×4 bin matrix.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Relay Matrix Layer                              │
//! │                                                                         │
//! │  vendo-engine (DispenseSequencer)                                      │
//! │       │ activate_by_index(9, pulse)                                    │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │ RelayMatrix                                                     │   │
//! │  │  Idle ──► Energized(row, col) ──► Idle                          │   │
//! │  │  • all lines low before energizing a new pair                   │   │
//! │  │  • hold bounded by MAX_PULSE (watchdog by construction)         │   │
//! │  │  • drop guard forces lines low on fault AND on cancellation     │   │
//! │  └────────────────────────────┬────────────────────────────────────┘   │
//! │                               │ set_line(Line::Row(2), true)            │
//! │                               ▼                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │ LineDriver (trait)                                              │   │
//! │  │  SimulatedLineDriver  │  real GPIO backend (same trait)         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The matrix owns its driver; no other component may address the lines.
//! One matrix instance serves exactly one dispense batch - [`RelayMatrix::shutdown`]
//! releases the hardware at the end of the batch.

pub mod driver;
pub mod error;
pub mod matrix;

pub use driver::{Line, LineDriver, SimulatedLineDriver, SimulatedLineHandle};
pub use error::{HalError, HalResult};
pub use matrix::{RelayMatrix, DEFAULT_PULSE, MAX_PULSE};
