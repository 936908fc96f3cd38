//! # Kiosk Configuration
//!
//! Layered settings for a kiosk deployment.
//!
//! ## Load Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   built-in defaults  ──►  JSON config file  ──►  VENDO_* environment   │
//! │   (always complete)       (partial, optional)    (per-field override)   │
//! │                                                                         │
//! │   Later layers win. A missing file is fine; a malformed file or an     │
//! │   unparseable override is a ConfigError, never a panic.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::coordinator::PaymentPolicy;

/// Environment variable prefix for overrides.
const ENV_PREFIX: &str = "VENDO_";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file exists but could not be read.
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for this shape.
    #[error("malformed config file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A setting (file or environment) holds an unusable value.
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

// =============================================================================
// KioskConfig
// =============================================================================

/// All tunables for one kiosk. Every field has a working default, so the
/// binary runs with no config file at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KioskConfig {
    /// Relay pulse width in milliseconds.
    pub pulse_ms: u64,
    /// Settle delay between items in milliseconds.
    pub settle_ms: u64,
    /// Inactivity window before an abandoned cart is cleared, in seconds.
    pub idle_timeout_secs: u64,
    /// Cart handling when a charge is declined.
    pub payment_policy: PaymentPolicy,
    /// Mock card reader approval probability, 0..=100.
    pub approval_rate_pct: u8,
    /// Item catalog file, created with seed items when absent.
    pub catalog_path: PathBuf,
}

impl Default for KioskConfig {
    fn default() -> Self {
        KioskConfig {
            pulse_ms: 500,
            settle_ms: 500,
            idle_timeout_secs: 30,
            payment_policy: PaymentPolicy::PreserveCart,
            approval_rate_pct: 50,
            catalog_path: PathBuf::from("vending_items.json"),
        }
    }
}

impl KioskConfig {
    /// Loads defaults, then the JSON file at `path` if one is given and
    /// exists, then `VENDO_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if p.exists() => Self::from_file(p)?,
            Some(p) => {
                debug!(path = %p.display(), "config file absent, using defaults");
                KioskConfig::default()
            }
            None => KioskConfig::default(),
        };
        config.apply_env_overrides(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a complete-or-partial config file. Absent fields keep their
    /// defaults; unknown fields are rejected so typos surface at startup.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `VENDO_*` overrides from an environment snapshot.
    ///
    /// Takes the variables as an iterator so tests can inject them without
    /// mutating process state.
    pub fn apply_env_overrides(
        &mut self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), ConfigError> {
        for (key, value) in vars {
            let Some(field) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match field {
                "PULSE_MS" => self.pulse_ms = parse_number(&key, &value)?,
                "SETTLE_MS" => self.settle_ms = parse_number(&key, &value)?,
                "IDLE_TIMEOUT_SECS" => self.idle_timeout_secs = parse_number(&key, &value)?,
                "APPROVAL_RATE_PCT" => self.approval_rate_pct = parse_number(&key, &value)?,
                "CATALOG_PATH" => self.catalog_path = PathBuf::from(&value),
                "PAYMENT_POLICY" => {
                    self.payment_policy = match value.as_str() {
                        "preserve_cart" => PaymentPolicy::PreserveCart,
                        "clear_cart" => PaymentPolicy::ClearCart,
                        _ => {
                            return Err(ConfigError::InvalidValue {
                                key,
                                value,
                                reason: "expected preserve_cart or clear_cart".to_string(),
                            })
                        }
                    }
                }
                // Unknown VENDO_ vars are ignored; RUST_LOG-style neighbors
                // must not break startup
                _ => {}
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.pulse_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pulse_ms".to_string(),
                value: "0".to_string(),
                reason: "pulse must be at least 1 ms".to_string(),
            });
        }
        if self.idle_timeout_secs == 0 {
            // The watchdog polls at a fraction of this window; zero would
            // spin it on zero-length sleeps
            return Err(ConfigError::InvalidValue {
                key: "idle_timeout_secs".to_string(),
                value: "0".to_string(),
                reason: "idle timeout must be at least 1 second".to_string(),
            });
        }
        if self.approval_rate_pct > 100 {
            return Err(ConfigError::InvalidValue {
                key: "approval_rate_pct".to_string(),
                value: self.approval_rate_pct.to_string(),
                reason: "must be 0..=100".to_string(),
            });
        }
        Ok(())
    }

    pub fn pulse(&self) -> Duration {
        Duration::from_millis(self.pulse_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: "expected an unsigned number".to_string(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = KioskConfig::default();
        assert_eq!(config.pulse(), Duration::from_millis(500));
        assert_eq!(config.settle(), Duration::from_millis(500));
        assert_eq!(config.idle_timeout(), Duration::from_secs(30));
        assert_eq!(config.payment_policy, PaymentPolicy::PreserveCart);
        assert_eq!(config.approval_rate_pct, 50);
    }

    #[test]
    fn test_partial_file_keeps_defaults_for_the_rest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"pulse_ms": 250, "payment_policy": "clear_cart"}}"#).unwrap();

        let config = KioskConfig::from_file(file.path()).unwrap();
        assert_eq!(config.pulse_ms, 250);
        assert_eq!(config.payment_policy, PaymentPolicy::ClearCart);
        assert_eq!(config.settle_ms, 500);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"pluse_ms": 250}}"#).unwrap();

        assert!(matches!(
            KioskConfig::from_file(file.path()),
            Err(ConfigError::Malformed { .. })
        ));
    }

    #[test]
    fn test_env_overrides_win() {
        let mut config = KioskConfig::default();
        config
            .apply_env_overrides([
                ("VENDO_SETTLE_MS".to_string(), "100".to_string()),
                ("VENDO_PAYMENT_POLICY".to_string(), "clear_cart".to_string()),
                ("VENDO_CATALOG_PATH".to_string(), "/tmp/items.json".to_string()),
                ("HOME".to_string(), "/root".to_string()),
            ])
            .unwrap();

        assert_eq!(config.settle_ms, 100);
        assert_eq!(config.payment_policy, PaymentPolicy::ClearCart);
        assert_eq!(config.catalog_path, PathBuf::from("/tmp/items.json"));
    }

    #[test]
    fn test_bad_env_value_is_an_error() {
        let mut config = KioskConfig::default();
        let err = config
            .apply_env_overrides([("VENDO_PULSE_MS".to_string(), "fast".to_string())])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "VENDO_PULSE_MS"));

        let err = config
            .apply_env_overrides([("VENDO_PAYMENT_POLICY".to_string(), "maybe".to_string())])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_pulse_and_bad_rate() {
        let config = KioskConfig {
            pulse_ms: 0,
            ..KioskConfig::default()
        };
        assert!(config.validate().is_err());

        let config = KioskConfig {
            approval_rate_pct: 101,
            ..KioskConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_idle_timeout() {
        // A zero window would have the watchdog spinning on zero sleeps
        let config = KioskConfig {
            idle_timeout_secs: 0,
            ..KioskConfig::default()
        };
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::InvalidValue { ref key, .. } if key == "idle_timeout_secs"
        ));
    }
}
