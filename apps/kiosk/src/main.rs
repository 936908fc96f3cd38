//! # Vendo Kiosk Controller
//!
//! Wires the catalog, card reader, relay dispenser, and coordinator together
//! and runs one scripted session.
//!
//! ## Wiring
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Kiosk Binary                                    │
//! │                                                                         │
//! │  CLI codes ──► TransactionCoordinator ──► MockCardReader               │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                 RelayDispenser ──► RelayMatrix ──► SimulatedLineDriver │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                 DispenseEvent stream ──► stdout                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `vendo-kiosk [CODE]...` (defaults to `11 13`). Configuration comes
//! from the JSON file named by `VENDO_CONFIG` plus `VENDO_*` overrides.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use vendo_engine::{
    spawn_idle_watchdog, CatalogStore, DriverFactory, KioskConfig, MockCardReader, RelayDispenser,
    StatusDisplay, TransactionCoordinator,
};
use vendo_hal::{LineDriver, SimulatedLineDriver};

/// Prints status lines straight to the customer-facing console.
struct ConsoleDisplay;

impl StatusDisplay for ConsoleDisplay {
    fn notify(&self, message: &str) {
        println!("{message}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing (RUST_LOG overrides the default level)
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string())),
        )
        .with_target(true)
        .init();

    info!("Starting Vendo kiosk controller...");

    // Load configuration
    let config_path = std::env::var_os("VENDO_CONFIG").map(PathBuf::from);
    let config = KioskConfig::load(config_path.as_deref())?;
    info!(
        pulse_ms = config.pulse_ms,
        settle_ms = config.settle_ms,
        approval_rate_pct = config.approval_rate_pct,
        catalog = %config.catalog_path.display(),
        "Configuration loaded"
    );

    // Open the catalog, seeding defaults on first run
    let catalog = Arc::new(CatalogStore::open(&config.catalog_path)?);
    info!(items = catalog.items().len(), "Catalog ready");

    // Relay dispenser over simulated lines; swap the factory for a GPIO
    // driver on real hardware
    let factory: DriverFactory = Box::new(|| {
        let driver: Box<dyn LineDriver> = Box::new(SimulatedLineDriver::new());
        Ok(driver)
    });
    let dispenser = Arc::new(
        RelayDispenser::new(factory, catalog.clone())
            .with_timing(config.pulse(), config.settle())
            .with_progress(true),
    );

    // Build the coordinator and start the inactivity watchdog
    let gateway = Arc::new(MockCardReader::new(config.approval_rate_pct));
    let coordinator = TransactionCoordinator::builder(catalog, gateway, dispenser)
        .display(Arc::new(ConsoleDisplay))
        .payment_policy(config.payment_policy)
        .idle_timeout(config.idle_timeout())
        .build();
    let watchdog = spawn_idle_watchdog(coordinator.clone());

    // Scripted session from CLI item codes
    let codes: Vec<String> = std::env::args().skip(1).collect();
    let codes = if codes.is_empty() {
        vec!["11".to_string(), "13".to_string()]
    } else {
        codes
    };

    for code in &codes {
        match coordinator.confirm_selection(code) {
            Ok(totals) => {
                println!(
                    "Added item {code} ({} items, total {})",
                    totals.item_count, totals.total
                );
            }
            Err(e) => {
                eprintln!("Cannot add item {code}: {e}");
            }
        }
    }

    let outcome = coordinator.submit().await;
    watchdog.abort();

    match outcome {
        Ok(receipt) => {
            info!(
                receipt_id = %receipt.receipt_id,
                txn = ?receipt.transaction_id,
                "Transaction complete"
            );
            println!(
                "Receipt {}: charged {}, {} dispensed, {} failed",
                receipt.receipt_id, receipt.amount, receipt.summary.dispensed,
                receipt.summary.failed
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("Transaction failed: {e}");
            std::process::exit(1);
        }
    }
}
