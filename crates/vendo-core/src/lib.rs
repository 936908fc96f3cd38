//! # vendo-core: Pure Business Logic for the Vendo Kiosk
//!
//! This crate is the **heart** of the kiosk controller. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vendo Kiosk Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Touchscreen / Keypad Surface                 │   │
//! │  │    enter code ──► confirm item ──► pay ──► watch status        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                vendo-engine (orchestration)                     │   │
//! │  │    TransactionCoordinator, DispenseSequencer, PaymentGateway   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ vendo-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ location  │  │   money   │  │   cart    │  │ validation│  │   │
//! │  │   │ Location  │  │   Money   │  │   Cart    │  │   rules   │  │   │
//! │  │   │ Code codec│  │  (cents)  │  │ CartItem  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO HARDWARE • NO TIMERS • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    vendo-hal (Hardware Layer)                   │   │
//! │  │              LineDriver trait, RelayMatrix sequencing           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`location`] - Bin location codec (row letter + column digit ↔ matrix index)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - Ordered cart with derived running total
//! - [`error`] - Domain error types
//! - [`validation`] - Keypad input and catalog record validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Hardware, file system, and timer access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in the smallest currency unit (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use vendo_core::location::LocationCode;
//! use vendo_core::money::Money;
//!
//! // "C2" sits on row C (index 2), column 2 (index 1)
//! let loc: LocationCode = "C2".parse().unwrap();
//! assert_eq!(loc.index(), 2 * 4 + 1);
//!
//! // Prices are integer cents; never floats
//! let price = Money::from_cents(10000); // $100.00
//! assert_eq!(format!("{price}"), "$100.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod location;
pub mod money;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use vendo_core::Money` instead of
// `use vendo_core::money::Money`

pub use cart::{Cart, CartItem, CartTotals};
pub use error::{CoreError, CoreResult, ValidationError};
pub use location::LocationCode;
pub use money::Money;
pub use validation::{validate_admin_password, validate_item_code, validate_selection};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Number of relay matrix rows (bin rows `A` through `H`).
pub const MATRIX_ROWS: u8 = 8;

/// Number of relay matrix columns (bin columns `1` through `4`).
pub const MATRIX_COLS: u8 = 4;

/// Total number of addressable bins (8 rows × 4 columns).
pub const BIN_COUNT: u8 = MATRIX_ROWS * MATRIX_COLS;

/// Maximum items allowed in a single cart.
///
/// ## Business Reason
/// One full matrix worth of items is the most a single order can physically
/// dispense; anything beyond that is a runaway cart.
pub const MAX_CART_ITEMS: usize = BIN_COUNT as usize;
