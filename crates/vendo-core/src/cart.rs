//! # Cart
//!
//! The ordered cart for a single kiosk session.
//!
//! ## Cart Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cart Lifecycle                                   │
//! │                                                                         │
//! │  Keypad confirm ──► add_item()  ──► items.push(...)  (insertion order) │
//! │  Cancel / timeout ─► clear()     ──► items.clear()                      │
//! │  Dispense done ───► clear()     ──► items.clear()                      │
//! │                                                                         │
//! │  INSERTION ORDER IS DISPENSE ORDER. The sequencer walks the items      │
//! │  front to back, so the first item confirmed is the first bin fired.    │
//! │                                                                         │
//! │  Unlike a supermarket cart there is NO quantity merging: confirming    │
//! │  the same code twice appends two entries, because each entry is one    │
//! │  physical relay activation.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::location::LocationCode;
use crate::money::Money;
use crate::MAX_CART_ITEMS;

// =============================================================================
// CartItem
// =============================================================================

/// One purchased unit, frozen at confirmation time.
///
/// ## Design Notes
/// - `code`: the keypad item code, used to re-resolve the item at submit
///   time (the catalog may have been edited mid-session)
/// - `name` / `unit_price` / `location`: snapshot of the catalog record at
///   the moment the user confirmed, so the display stays consistent even if
///   an admin edits the record afterwards
/// - `location` is optional: a record without location data still sells,
///   the sequencer just reports it as unservable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Keypad item code (e.g. "11").
    pub code: String,

    /// Item name at time of adding (frozen).
    pub name: String,

    /// Price in smallest currency unit at time of adding (frozen).
    pub unit_price: Money,

    /// Bin location at time of adding, if the record had one.
    pub location: Option<LocationCode>,
}

// =============================================================================
// Cart
// =============================================================================

/// The ordered cart.
///
/// ## Invariants
/// - `total()` always equals the sum of `unit_price` over current items
///   (it is derived, never stored, so it cannot drift)
/// - Never negative: unit prices are validated positive before insertion
/// - At most [`MAX_CART_ITEMS`] entries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    /// Items in insertion (= dispense) order.
    items: Vec<CartItem>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart { items: Vec::new() }
    }

    /// Appends an item to the cart.
    ///
    /// ## Behavior
    /// Always appends - no quantity merging (see module docs). Fails with
    /// `CartFull` once the cart holds a full matrix worth of items.
    pub fn add_item(&mut self, item: CartItem) -> CoreResult<()> {
        if self.items.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartFull {
                max: MAX_CART_ITEMS,
            });
        }
        self.items.push(item);
        Ok(())
    }

    /// Clears all items from the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Items in dispense order.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Number of items in the cart.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// The running total: sum of unit prices over current items.
    pub fn total(&self) -> Money {
        self.items.iter().map(|i| i.unit_price).sum()
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// CartTotals
// =============================================================================

/// Cart summary for the display surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub item_count: usize,
    pub total: Money,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            item_count: cart.item_count(),
            total: cart.total(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
