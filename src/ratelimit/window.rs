//! Fixed counting windows aligned to epoch boundaries.

/// A fixed window of `period` seconds containing some instant.
///
/// Windows are derived from the clock, never stored: every process sharing
/// a store computes the same window for the same instant and period, so all
/// of their increments land on the same counter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedWindow {
    start: u64,
    period: u64,
}

impl FixedWindow {
    /// The window containing `now` (epoch seconds) for the given period.
    ///
    /// `period_secs` must be positive; policies validate this at
    /// construction.
    pub fn containing(now: u64, period_secs: u64) -> Self {
        debug_assert!(period_secs > 0, "window period must be positive");
        let start = (now / period_secs) * period_secs;
        Self {
            start,
            period: period_secs,
        }
    }

    /// Epoch second at which this window began.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Epoch second at which this window ends and the next begins.
    pub fn reset(&self) -> u64 {
        self.start + self.period
    }

    /// Seconds until the window resets, measured from `now`.
    pub fn seconds_until_reset(&self, now: u64) -> u64 {
        self.reset().saturating_sub(now)
    }

    /// The store key binding a scope to this window.
    pub fn counter_key(&self, scope_key: &str) -> String {
        format!("{}:{}", scope_key, self.start)
    }
}
