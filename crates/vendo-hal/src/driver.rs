//! # Line Driver
//!
//! The narrow hardware seam beneath the relay matrix.
//!
//! ## Why a Trait?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Driver Backends                                   │
//! │                                                                         │
//! │  RelayMatrix ──► LineDriver ──┬──► SimulatedLineDriver                 │
//! │  (same logic,    (set_line,   │    in-memory transition log,           │
//! │   either way)     release)    │    fault injection for tests           │
//! │                               │                                         │
//! │                               └──► GPIO backend (deployment)           │
//! │                                    rows: BCM 17,27,22,23,24,25,8,7     │
//! │                                    cols: BCM 5,6,13,19                 │
//! │                                                                         │
//! │  The matrix sequencing logic is identical against both backends;       │
//! │  only the line driver is swapped.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Driver calls are synchronous and fast (a GPIO register write); anything
//! slow or fallible beyond a single line switch belongs above this seam.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use vendo_core::{MATRIX_COLS, MATRIX_ROWS};

use crate::error::{HalError, HalResult};

// =============================================================================
// Line
// =============================================================================

/// One physical actuation line of the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Line {
    /// Row line, zero-based (`A` = 0 … `H` = 7).
    Row(u8),
    /// Column line, zero-based (`1` = 0 … `4` = 3).
    Col(u8),
}

impl Line {
    /// Iterates every line of the matrix (8 rows then 4 columns).
    pub fn all() -> impl Iterator<Item = Line> {
        (0..MATRIX_ROWS)
            .map(Line::Row)
            .chain((0..MATRIX_COLS).map(Line::Col))
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Row(r) => write!(f, "row {r}"),
            Line::Col(c) => write!(f, "col {c}"),
        }
    }
}

// =============================================================================
// LineDriver Trait
// =============================================================================

/// Synchronous access to the relay actuation lines.
///
/// Implementations must be cheap per call; the matrix calls `set_line` up to
/// a dozen times around every pulse. `release` frees whatever the backend
/// holds (GPIO claims, file handles) and is called exactly once, by
/// [`RelayMatrix::shutdown`](crate::matrix::RelayMatrix::shutdown).
pub trait LineDriver: Send {
    /// Switches one line high or low.
    fn set_line(&mut self, line: Line, high: bool) -> HalResult<()>;

    /// Releases the underlying hardware resources.
    ///
    /// After release, further `set_line` calls are driver errors.
    fn release(&mut self) -> HalResult<()>;
}

// Boxed drivers behave like the driver they wrap, so the engine can pick a
// backend at runtime without making every consumer generic.
impl LineDriver for Box<dyn LineDriver> {
    fn set_line(&mut self, line: Line, high: bool) -> HalResult<()> {
        (**self).set_line(line, high)
    }

    fn release(&mut self) -> HalResult<()> {
        (**self).release()
    }
}

/// Forces every line of the matrix low.
///
/// Attempts ALL lines even when one faults - a fault on row 3 must not leave
/// row 5 energized. The first fault encountered is returned after the sweep.
pub fn force_all_low<D: LineDriver + ?Sized>(driver: &mut D) -> HalResult<()> {
    let mut first_fault = None;
    for line in Line::all() {
        if let Err(e) = driver.set_line(line, false) {
            first_fault.get_or_insert(e);
        }
    }
    match first_fault {
        None => Ok(()),
        Some(e) => Err(e),
    }
}

// =============================================================================
// Simulated Backend
// =============================================================================

/// Internal state shared between a simulated driver and its handles.
#[derive(Debug, Default)]
struct SimState {
    /// Every `set_line` call, in order.
    transitions: Vec<(Line, bool)>,
    /// Lines currently high.
    energized: HashSet<Line>,
    /// Lines that fault when driven high.
    faulty: HashSet<Line>,
    /// When set, `release` fails (exercises the batch-fatal teardown path).
    fail_release: bool,
    /// Set once `release` has run.
    released: bool,
}

/// In-memory line driver for tests and the demo session.
///
/// Records every transition so tests can assert the exact actuation order,
/// and can inject per-line faults to exercise the guaranteed-release paths.
#[derive(Debug)]
pub struct SimulatedLineDriver {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedLineDriver {
    /// Creates a fresh simulated driver with all lines low.
    pub fn new() -> Self {
        SimulatedLineDriver {
            state: Arc::new(Mutex::new(SimState::default())),
        }
    }

    /// Returns an observation handle that outlives the driver.
    ///
    /// The matrix consumes the driver, so tests grab a handle first and
    /// inspect the line log after the batch finishes.
    pub fn handle(&self) -> SimulatedLineHandle {
        SimulatedLineHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for SimulatedLineDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDriver for SimulatedLineDriver {
    fn set_line(&mut self, line: Line, high: bool) -> HalResult<()> {
        let mut state = self.state.lock().expect("sim driver mutex poisoned");

        if state.released {
            return Err(HalError::LineFault {
                line,
                reason: "driver already released".to_string(),
            });
        }

        if high && state.faulty.contains(&line) {
            return Err(HalError::LineFault {
                line,
                reason: "injected fault".to_string(),
            });
        }

        state.transitions.push((line, high));
        if high {
            state.energized.insert(line);
        } else {
            state.energized.remove(&line);
        }
        Ok(())
    }

    fn release(&mut self) -> HalResult<()> {
        let mut state = self.state.lock().expect("sim driver mutex poisoned");
        if state.fail_release {
            return Err(HalError::DriverFault {
                reason: "injected release fault".to_string(),
            });
        }
        state.released = true;
        Ok(())
    }
}

/// Observation and fault-injection handle for [`SimulatedLineDriver`].
#[derive(Debug, Clone)]
pub struct SimulatedLineHandle {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedLineHandle {
    /// Every `set_line` call recorded so far, in order.
    pub fn transitions(&self) -> Vec<(Line, bool)> {
        self.state
            .lock()
            .expect("sim driver mutex poisoned")
            .transitions
            .clone()
    }

    /// Only the rising edges, in order - the sequence of energized lines.
    pub fn risen_lines(&self) -> Vec<Line> {
        self.transitions()
            .into_iter()
            .filter_map(|(line, high)| high.then_some(line))
            .collect()
    }

    /// Lines currently high.
    pub fn energized(&self) -> Vec<Line> {
        let state = self.state.lock().expect("sim driver mutex poisoned");
        state.energized.iter().copied().collect()
    }

    /// True when every line is low.
    pub fn is_all_low(&self) -> bool {
        self.state
            .lock()
            .expect("sim driver mutex poisoned")
            .energized
            .is_empty()
    }

    /// True once the driver has been released.
    pub fn is_released(&self) -> bool {
        self.state
            .lock()
            .expect("sim driver mutex poisoned")
            .released
    }

    /// Makes a line fault whenever it is driven high.
    pub fn inject_fault(&self, line: Line) {
        self.state
            .lock()
            .expect("sim driver mutex poisoned")
            .faulty
            .insert(line);
    }

    /// Makes `release` fail - the one fault that is fatal to a batch.
    pub fn inject_release_fault(&self) {
        self.state
            .lock()
            .expect("sim driver mutex poisoned")
            .fail_release = true;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_lines_iterates_full_matrix() {
        let lines: Vec<_> = Line::all().collect();
        assert_eq!(lines.len(), 12); // 8 rows + 4 cols
        assert_eq!(lines[0], Line::Row(0));
        assert_eq!(lines[8], Line::Col(0));
    }

    #[test]
    fn test_sim_driver_records_transitions() {
        let mut driver = SimulatedLineDriver::new();
        let handle = driver.handle();

        driver.set_line(Line::Row(2), true).unwrap();
        driver.set_line(Line::Col(1), true).unwrap();
        driver.set_line(Line::Row(2), false).unwrap();

        assert_eq!(
            handle.transitions(),
            vec![
                (Line::Row(2), true),
                (Line::Col(1), true),
                (Line::Row(2), false),
            ]
        );
        assert_eq!(handle.energized(), vec![Line::Col(1)]);
    }

    #[test]
    fn test_injected_fault_only_trips_on_rising_edge() {
        let mut driver = SimulatedLineDriver::new();
        let handle = driver.handle();
        handle.inject_fault(Line::Row(3));

        // Driving low always works - the release sweep must never fault out
        driver.set_line(Line::Row(3), false).unwrap();
        assert!(driver.set_line(Line::Row(3), true).is_err());
    }

    #[test]
    fn test_force_all_low_clears_energized_lines() {
        let mut driver = SimulatedLineDriver::new();
        let handle = driver.handle();
        driver.set_line(Line::Row(1), true).unwrap();
        driver.set_line(Line::Col(2), true).unwrap();

        force_all_low(&mut driver).unwrap();
        assert!(handle.is_all_low());
    }

    #[test]
    fn test_released_driver_rejects_writes() {
        let mut driver = SimulatedLineDriver::new();
        driver.release().unwrap();
        assert!(driver.set_line(Line::Row(0), true).is_err());
    }
}
