//! Display refresh tick.
//!
//! Capture cycles are scheduled on the next tick instead of after a fixed
//! delay. With a zero interval the tick degenerates to a cooperative
//! `yield_now`.

use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior, interval};

/// Default refresh period (60 Hz).
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_micros(16_667);

/// Source of refresh ticks for one session.
#[derive(Debug)]
pub enum FrameClock {
    /// Ticks aligned to a fixed refresh period.
    Interval(Interval),
    /// Yields to the scheduler once per tick.
    Yield,
}

impl FrameClock {
    /// Creates a clock for `period`; zero selects [`FrameClock::Yield`].
    ///
    /// Must be called inside a tokio runtime when `period` is nonzero.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        if period.is_zero() {
            return Self::Yield;
        }

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self::Interval(ticker)
    }

    /// Waits for the next tick.
    pub async fn tick(&mut self) {
        match self {
            Self::Interval(ticker) => {
                ticker.tick().await;
            }
            Self::Yield => tokio::task::yield_now().await,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
