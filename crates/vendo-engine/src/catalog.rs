//! # Item Catalog
//!
//! JSON-backed item catalog and the lookup seam the dispense path uses.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  vending_items.json (flat map, one reserved key)                        │
//! │                                                                         │
//! │  {                                                                      │
//! │      "11": { "name": "Water", "price": 10000, "location": "A1" },       │
//! │      "12": { "name": "Chips", "price": 15000, "location": "A3" },       │
//! │      "13": { "name": "Soda",  "price": 18000, "location": "B1" },       │
//! │      "admin_password": "1234"                                           │
//! │  }                                                                      │
//! │                                                                         │
//! │  Locations are stored as RAW STRINGS, not parsed at load time: a       │
//! │  record with a mangled location must still load, sell, and then be     │
//! │  reported per item at encode time. One bad bin never takes down the    │
//! │  catalog.                                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! The store sits behind a `RwLock`: the interactive surface and the
//! dispense worker read concurrently during a batch; admin edits take the
//! write lock and then trigger an explicit [`CatalogStore::save`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{info, warn};

use vendo_core::validation::{validate_admin_password, validate_selection};
use vendo_core::Money;

use crate::error::{EngineError, EngineResult};

/// Reserved top-level key holding the admin password.
const ADMIN_PASSWORD_KEY: &str = "admin_password";

/// Password seeded into a brand-new catalog file.
const DEFAULT_ADMIN_PASSWORD: &str = "1234";

// =============================================================================
// ItemRecord
// =============================================================================

/// One sellable item as persisted in the catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Display name shown on the kiosk screen.
    pub name: String,

    /// Price in the smallest currency unit.
    pub price: Money,

    /// Bin location as the raw persisted string (e.g. "A1").
    ///
    /// Deliberately NOT a `LocationCode`: malformed locations are a
    /// per-item dispense-time error, not a load-time one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

// =============================================================================
// ItemLookup Seam
// =============================================================================

/// Read access to the live catalog.
///
/// `Send + Sync` because the dispense worker re-resolves every item code
/// while the interactive surface keeps reading for display.
pub trait ItemLookup: Send + Sync {
    /// Resolves an item code to its current record, if any.
    fn lookup(&self, code: &str) -> Option<ItemRecord>;
}

// =============================================================================
// CatalogStore
// =============================================================================

/// Catalog state guarded by the store's lock.
#[derive(Debug)]
struct CatalogInner {
    items: BTreeMap<String, ItemRecord>,
    admin_password: String,
}

/// JSON-file-backed catalog store.
///
/// Load once at startup (seeding defaults when the file is missing), then
/// serve lookups from memory; every admin edit is followed by an explicit
/// `save` trigger.
#[derive(Debug)]
pub struct CatalogStore {
    path: PathBuf,
    inner: RwLock<CatalogInner>,
}

impl CatalogStore {
    /// Opens the catalog at `path`, creating and seeding it when missing.
    pub fn open(path: impl Into<PathBuf>) -> EngineResult<Self> {
        let path = path.into();

        let store = if path.exists() {
            let inner = Self::load_file(&path)?;
            info!(path = %path.display(), items = inner.items.len(), "catalog loaded");
            CatalogStore {
                path,
                inner: RwLock::new(inner),
            }
        } else {
            info!(path = %path.display(), "catalog missing, seeding defaults");
            let store = CatalogStore {
                path,
                inner: RwLock::new(Self::seeded_defaults()),
            };
            store.save()?;
            store
        };

        Ok(store)
    }

    /// Parses the catalog file, tolerating malformed individual records.
    fn load_file(path: &Path) -> EngineResult<CatalogInner> {
        let raw = fs::read_to_string(path)?;
        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| EngineError::CatalogFormat(e.to_string()))?;

        let map = value
            .as_object()
            .ok_or_else(|| EngineError::CatalogFormat("top level must be an object".into()))?;

        let mut items = BTreeMap::new();
        let mut admin_password = DEFAULT_ADMIN_PASSWORD.to_string();

        for (key, entry) in map {
            if key == ADMIN_PASSWORD_KEY {
                match entry.as_str() {
                    Some(pw) => admin_password = pw.to_string(),
                    None => warn!("admin_password entry is not a string, keeping default"),
                }
                continue;
            }

            // One broken record is an admin typo, not a dead kiosk
            match serde_json::from_value::<ItemRecord>(entry.clone()) {
                Ok(record) => {
                    items.insert(key.clone(), record);
                }
                Err(e) => {
                    warn!(code = %key, error = %e, "skipping malformed catalog record");
                }
            }
        }

        Ok(CatalogInner {
            items,
            admin_password,
        })
    }

    /// The default catalog a fresh machine ships with.
    fn seeded_defaults() -> CatalogInner {
        let mut items = BTreeMap::new();
        items.insert(
            "11".to_string(),
            ItemRecord {
                name: "Water".to_string(),
                price: Money::from_cents(10000),
                location: Some("A1".to_string()),
            },
        );
        items.insert(
            "12".to_string(),
            ItemRecord {
                name: "Chips".to_string(),
                price: Money::from_cents(15000),
                location: Some("A3".to_string()),
            },
        );
        items.insert(
            "13".to_string(),
            ItemRecord {
                name: "Soda".to_string(),
                price: Money::from_cents(18000),
                location: Some("B1".to_string()),
            },
        );
        CatalogInner {
            items,
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }

    /// Persists the current catalog to disk (the save trigger after edits).
    pub fn save(&self) -> EngineResult<()> {
        let inner = self.inner.read().expect("catalog lock poisoned");

        let mut map = serde_json::Map::new();
        for (code, record) in &inner.items {
            map.insert(
                code.clone(),
                serde_json::to_value(record)
                    .map_err(|e| EngineError::CatalogFormat(e.to_string()))?,
            );
        }
        map.insert(
            ADMIN_PASSWORD_KEY.to_string(),
            serde_json::Value::String(inner.admin_password.clone()),
        );

        let body = serde_json::to_string_pretty(&serde_json::Value::Object(map))
            .map_err(|e| EngineError::CatalogFormat(e.to_string()))?;
        fs::write(&self.path, body)?;
        Ok(())
    }

    /// Snapshot of all items, sorted by code.
    pub fn items(&self) -> Vec<(String, ItemRecord)> {
        let inner = self.inner.read().expect("catalog lock poisoned");
        inner
            .items
            .iter()
            .map(|(code, record)| (code.clone(), record.clone()))
            .collect()
    }

    /// Inserts or replaces an item record (admin edit; call `save` after).
    ///
    /// Rejects unsellable records up front - a nameless or zero-priced
    /// record never reaches the file.
    pub fn upsert_item(&self, code: &str, record: ItemRecord) -> EngineResult<()> {
        validate_selection(&record.name, record.price).map_err(vendo_core::CoreError::from)?;
        let mut inner = self.inner.write().expect("catalog lock poisoned");
        inner.items.insert(code.to_string(), record);
        Ok(())
    }

    /// Removes an item record; returns whether it existed.
    pub fn remove_item(&self, code: &str) -> bool {
        let mut inner = self.inner.write().expect("catalog lock poisoned");
        inner.items.remove(code).is_some()
    }

    /// Checks a password attempt against the stored admin password.
    pub fn verify_admin_password(&self, attempt: &str) -> bool {
        let inner = self.inner.read().expect("catalog lock poisoned");
        inner.admin_password == attempt
    }

    /// Replaces the admin password (call `save` after).
    pub fn set_admin_password(&self, password: &str) -> EngineResult<()> {
        validate_admin_password(password).map_err(vendo_core::CoreError::from)?;
        let mut inner = self.inner.write().expect("catalog lock poisoned");
        inner.admin_password = password.to_string();
        Ok(())
    }
}

impl ItemLookup for CatalogStore {
    fn lookup(&self, code: &str) -> Option<ItemRecord> {
        let inner = self.inner.read().expect("catalog lock poisoned");
        inner.items.get(code).cloned()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_catalog_path(dir: &TempDir) -> PathBuf {
        dir.path().join("vending_items.json")
    }

    #[test]
    fn test_open_missing_file_seeds_defaults() {
        let dir = TempDir::new().unwrap();
        let path = temp_catalog_path(&dir);

        let store = CatalogStore::open(&path).unwrap();
        assert!(path.exists(), "seeding should write the file");

        let water = store.lookup("11").unwrap();
        assert_eq!(water.name, "Water");
        assert_eq!(water.price.cents(), 10000);
        assert_eq!(water.location.as_deref(), Some("A1"));

        assert!(store.verify_admin_password("1234"));
        assert!(!store.verify_admin_password("0000"));
    }

    #[test]
    fn test_roundtrip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = temp_catalog_path(&dir);

        let store = CatalogStore::open(&path).unwrap();
        store
            .upsert_item(
                "21",
                ItemRecord {
                    name: "Juice".to_string(),
                    price: Money::from_cents(22000),
                    location: Some("C2".to_string()),
                },
            )
            .unwrap();
        store.set_admin_password("9876").unwrap();
        store.save().unwrap();

        let reopened = CatalogStore::open(&path).unwrap();
        let juice = reopened.lookup("21").unwrap();
        assert_eq!(juice.price.cents(), 22000);
        assert!(reopened.verify_admin_password("9876"));
        assert_eq!(reopened.items().len(), 4);
    }

    #[test]
    fn test_malformed_record_is_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let path = temp_catalog_path(&dir);
        fs::write(
            &path,
            r#"{
                "11": { "name": "Water", "price": 10000, "location": "A1" },
                "12": { "name": "Broken", "price": "not a number" },
                "admin_password": "1234"
            }"#,
        )
        .unwrap();

        let store = CatalogStore::open(&path).unwrap();
        assert!(store.lookup("11").is_some());
        assert!(store.lookup("12").is_none());
    }

    #[test]
    fn test_record_without_location_loads() {
        let dir = TempDir::new().unwrap();
        let path = temp_catalog_path(&dir);
        fs::write(
            &path,
            r#"{ "14": { "name": "Gum", "price": 500 }, "admin_password": "1234" }"#,
        )
        .unwrap();

        let store = CatalogStore::open(&path).unwrap();
        let gum = store.lookup("14").unwrap();
        assert_eq!(gum.location, None);
    }

    #[test]
    fn test_upsert_rejects_unsellable_records() {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::open(temp_catalog_path(&dir)).unwrap();

        let nameless = ItemRecord {
            name: "".to_string(),
            price: Money::from_cents(100),
            location: None,
        };
        assert!(store.upsert_item("30", nameless).is_err());

        let free = ItemRecord {
            name: "Freebie".to_string(),
            price: Money::zero(),
            location: None,
        };
        assert!(store.upsert_item("31", free).is_err());
    }

    #[test]
    fn test_remove_item() {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::open(temp_catalog_path(&dir)).unwrap();

        assert!(store.remove_item("11"));
        assert!(!store.remove_item("11"));
        assert!(store.lookup("11").is_none());
    }

    #[test]
    fn test_password_rules_enforced() {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::open(temp_catalog_path(&dir)).unwrap();

        assert!(store.set_admin_password("12").is_err());
        assert!(store.set_admin_password("4321").is_ok());
        assert!(store.verify_admin_password("4321"));
    }

    #[test]
    fn test_garbage_file_is_a_format_error() {
        let dir = TempDir::new().unwrap();
        let path = temp_catalog_path(&dir);
        fs::write(&path, "not json at all").unwrap();

        let err = CatalogStore::open(&path).unwrap_err();
        assert!(matches!(err, EngineError::CatalogFormat(_)));
    }
}
