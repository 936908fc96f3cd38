//! # Relay Matrix
//!
//! Safe sequencing over the 8×4 relay matrix.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      RelayMatrix States                                 │
//! │                                                                         │
//! │            activate_cell(row, col, pulse)                               │
//! │   ┌──────┐ ────────────────────────────► ┌────────────────────┐        │
//! │   │ Idle │                               │ Energized(row,col) │        │
//! │   │(all  │ ◄──────────────────────────── │ one row line high, │        │
//! │   │ low) │   pulse elapsed / fault /     │ one col line high  │        │
//! │   └──┬───┘   task cancelled              └────────────────────┘        │
//! │      │                                                                  │
//! │      │ shutdown()                                                       │
//! │      ▼                                                                  │
//! │   ┌──────────┐                                                          │
//! │   │ ShutDown │  all low, driver released, further activations refused  │
//! │   └──────────┘                                                          │
//! │                                                                         │
//! │  SAFETY: the Energized state exits through a drop guard, so the lines  │
//! │  go low on EVERY path out of the hold - normal expiry, a line fault    │
//! │  mid-energize, or the dispense task being cancelled.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Pulse Bounding
//! The hold duration is clamped to [`MAX_PULSE`]. There is no code path that
//! holds a relay indefinitely: a caller passing `Duration::MAX` still gets a
//! 5 second pulse, and a caller passing zero gets the minimum tick. This is
//! the watchdog invariant - a hardware fault cannot leave a bin energized
//! forever.

use std::time::Duration;

use tracing::{debug, info, warn};

use vendo_core::LocationCode;

use crate::driver::{force_all_low, Line, LineDriver};
use crate::error::{HalError, HalResult};

/// Default relay hold time.
pub const DEFAULT_PULSE: Duration = Duration::from_millis(500);

/// Hard upper bound on any relay hold.
pub const MAX_PULSE: Duration = Duration::from_secs(5);

/// Shortest representable hold; zero would be a no-op pulse.
const MIN_PULSE: Duration = Duration::from_millis(1);

// =============================================================================
// Lines Guard
// =============================================================================

/// Scope guard over the energized lines.
///
/// Dropping the guard forces every line low, ignoring faults - on the
/// unwind/cancellation path there is nobody left to report them to, and a
/// best-effort sweep is strictly safer than none. The normal path calls
/// [`LinesGuard::release`], which surfaces faults.
struct LinesGuard<'a, D: LineDriver> {
    driver: &'a mut D,
    armed: bool,
}

impl<'a, D: LineDriver> LinesGuard<'a, D> {
    fn new(driver: &'a mut D) -> Self {
        LinesGuard {
            driver,
            armed: true,
        }
    }

    /// Raises a line; on fault the guard stays armed, so the drop sweep
    /// still returns the matrix to all-off.
    fn raise(&mut self, line: Line) -> HalResult<()> {
        self.driver.set_line(line, true)
    }

    /// Normal exit: sweep all lines low and surface any fault.
    fn release(mut self) -> HalResult<()> {
        self.armed = false;
        force_all_low(self.driver)
    }
}

impl<D: LineDriver> Drop for LinesGuard<'_, D> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = force_all_low(self.driver) {
                warn!(error = %e, "line fault during forced release");
            }
        }
    }
}

// =============================================================================
// Relay Matrix
// =============================================================================

/// Exclusive owner of the matrix actuation lines.
///
/// One instance serves exactly one dispense batch: construct it with a fresh
/// driver, fire the batch, then [`shutdown`](RelayMatrix::shutdown) releases
/// the hardware. Dropping an un-shut-down matrix releases it too (relays are
/// never left owned by a dead task).
#[derive(Debug)]
pub struct RelayMatrix<D: LineDriver> {
    driver: D,
    shut_down: bool,
}

impl<D: LineDriver> RelayMatrix<D> {
    /// Creates a matrix over a driver, forcing a known all-off state.
    pub fn new(mut driver: D) -> HalResult<Self> {
        force_all_low(&mut driver)?;
        Ok(RelayMatrix {
            driver,
            shut_down: false,
        })
    }

    /// Activates the cell at `(row, col)` for `pulse`, then de-energizes.
    ///
    /// ## Sequence
    /// 1. All lines forced low (known state)
    /// 2. Row line then column line raised
    /// 3. Hold for the clamped pulse
    /// 4. All lines forced low - guaranteed on every exit path
    ///
    /// Fails with `IndexOutOfRange` for row ∉ [0,8) or col ∉ [0,4), and
    /// with `ShutDown` after the matrix released its hardware.
    pub async fn activate_cell(&mut self, row: u8, col: u8, pulse: Duration) -> HalResult<()> {
        if self.shut_down {
            return Err(HalError::ShutDown);
        }

        // Bounds check through the codec - the same rules the catalog uses
        let cell = LocationCode::new(row, col)?;
        let pulse = clamp_pulse(pulse);

        force_all_low(&mut self.driver)?;

        let mut guard = LinesGuard::new(&mut self.driver);
        guard.raise(Line::Row(row))?;
        guard.raise(Line::Col(col))?;

        debug!(%cell, row, col, pulse_ms = pulse.as_millis() as u64, "relay pair energized");

        // Cancellation point: dropping this future drops the guard, which
        // sweeps the lines low before the task unwinds.
        tokio::time::sleep(pulse).await;

        guard.release()?;
        debug!(%cell, "relay pair released");
        Ok(())
    }

    /// Activates a cell by its linear index in `[0, 32)`.
    ///
    /// Convenience wrapper over [`activate_cell`](RelayMatrix::activate_cell)
    /// using the location codec's linear addressing.
    pub async fn activate_by_index(&mut self, index: usize, pulse: Duration) -> HalResult<()> {
        let cell = LocationCode::from_index(index)?;
        self.activate_cell(cell.row(), cell.col(), pulse).await
    }

    /// Shuts the matrix down: all lines low, driver released.
    ///
    /// Idempotent - the second and later calls are no-ops. A fault here is
    /// the one batch-fatal hardware error: lines that cannot be released are
    /// a physical hazard, not a skippable item.
    pub fn shutdown(&mut self) -> HalResult<()> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;

        let swept = force_all_low(&mut self.driver);
        let released = self.driver.release();
        info!("relay matrix shut down");

        swept.and(released)
    }
}

impl<D: LineDriver> Drop for RelayMatrix<D> {
    fn drop(&mut self) {
        if !self.shut_down {
            if let Err(e) = self.shutdown() {
                warn!(error = %e, "relay matrix shutdown failed during drop");
            }
        }
    }
}

/// Clamps a requested hold into `[MIN_PULSE, MAX_PULSE]`.
fn clamp_pulse(pulse: Duration) -> Duration {
    if pulse > MAX_PULSE {
        warn!(
            requested_ms = pulse.as_millis() as u64,
            max_ms = MAX_PULSE.as_millis() as u64,
            "pulse clamped to maximum"
        );
        MAX_PULSE
    } else if pulse < MIN_PULSE {
        MIN_PULSE
    } else {
        pulse
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{SimulatedLineDriver, SimulatedLineHandle};

    const TEST_PULSE: Duration = Duration::from_millis(5);

    fn matrix() -> (RelayMatrix<SimulatedLineDriver>, SimulatedLineHandle) {
        let driver = SimulatedLineDriver::new();
        let handle = driver.handle();
        (RelayMatrix::new(driver).unwrap(), handle)
    }

    #[tokio::test]
    async fn test_activate_cell_leaves_all_lines_low() {
        let (mut matrix, handle) = matrix();

        matrix.activate_cell(2, 1, TEST_PULSE).await.unwrap();
        assert!(handle.is_all_low());

        // The addressed pair was the one energized
        assert_eq!(handle.risen_lines(), vec![Line::Row(2), Line::Col(1)]);
    }

    #[tokio::test]
    async fn test_back_to_back_activations_stay_clean() {
        let (mut matrix, handle) = matrix();

        for index in [0usize, 4, 9, 31] {
            matrix.activate_by_index(index, TEST_PULSE).await.unwrap();
            assert!(handle.is_all_low(), "lines left high after index {index}");
        }
    }

    #[tokio::test]
    async fn test_activate_rejects_out_of_range() {
        let (mut matrix, _) = matrix();

        assert!(matrix.activate_cell(8, 0, TEST_PULSE).await.is_err());
        assert!(matrix.activate_cell(0, 4, TEST_PULSE).await.is_err());
        assert!(matrix.activate_by_index(32, TEST_PULSE).await.is_err());
    }

    #[tokio::test]
    async fn test_line_fault_still_releases() {
        let (mut matrix, handle) = matrix();
        handle.inject_fault(Line::Col(1));

        // Raising col 1 faults after row 2 is already high; the guard must
        // sweep row 2 back low on the error path.
        let err = matrix.activate_cell(2, 1, TEST_PULSE).await.unwrap_err();
        assert!(matches!(err, HalError::LineFault { .. }));
        assert!(handle.is_all_low());
    }

    #[tokio::test]
    async fn test_cancellation_releases_lines() {
        let (mut matrix, handle) = matrix();

        {
            let activation = matrix.activate_cell(2, 1, Duration::from_secs(1));
            tokio::pin!(activation);
            // Poll the future far enough to energize the pair, then drop it
            let poll = futures_poll_once(&mut activation).await;
            assert!(poll.is_none(), "activation should still be holding");
            assert_eq!(handle.energized().len(), 2);
        }

        // Dropped mid-hold: the drop guard swept the lines low
        assert!(handle.is_all_low());
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent_and_blocks_activation() {
        let (mut matrix, handle) = matrix();

        matrix.shutdown().unwrap();
        matrix.shutdown().unwrap();
        assert!(handle.is_released());

        let err = matrix.activate_cell(0, 0, TEST_PULSE).await.unwrap_err();
        assert!(matches!(err, HalError::ShutDown));
    }

    #[tokio::test]
    async fn test_drop_releases_hardware() {
        let driver = SimulatedLineDriver::new();
        let handle = driver.handle();
        {
            let _matrix = RelayMatrix::new(driver).unwrap();
        }
        assert!(handle.is_released());
    }

    #[test]
    fn test_pulse_clamping() {
        assert_eq!(clamp_pulse(Duration::from_secs(60)), MAX_PULSE);
        assert_eq!(clamp_pulse(Duration::ZERO), MIN_PULSE);
        assert_eq!(clamp_pulse(DEFAULT_PULSE), DEFAULT_PULSE);
    }

    /// Polls a future exactly once; returns its output when ready.
    async fn futures_poll_once<F: std::future::Future + Unpin>(fut: &mut F) -> Option<F::Output> {
        use std::task::Poll;
        std::future::poll_fn(|cx| match std::pin::Pin::new(&mut *fut).poll(cx) {
            Poll::Ready(out) => Poll::Ready(Some(out)),
            Poll::Pending => Poll::Ready(None),
        })
        .await
    }
}
