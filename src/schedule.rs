/// Interval of the two sector store between two comparisons of the live settings with the
/// persisted ones.
pub const SECTOR_WRITE_INTERVAL_MS: u64 = 5_000;

/// Interval of the linear store, see [`crate::linear::LinearStore`].
pub const LINEAR_WRITE_INTERVAL_MS: u64 = 10_000;

/// Result of a scheduler tick.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tick<W> {
    /// The deadline has not been reached yet, nothing was compared.
    NotDue,
    /// The settings match the last persisted record, flash was not touched.
    Unchanged,
    /// A new record was programmed.
    Written(W),
}

/// Fixed-rate deadline. Writes are driven by this timer and never by individual mutations of
/// the settings, so toggling a value back and forth between two ticks costs nothing.
pub(crate) struct Schedule {
    interval_ms: u64,
    deadline_ms: u64,
}

impl Schedule {
    pub(crate) const fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            deadline_ms: u64::MAX,
        }
    }

    pub(crate) fn set_interval(&mut self, interval_ms: u64) {
        self.interval_ms = interval_ms;
    }

    pub(crate) fn arm(&mut self, now_ms: u64) {
        self.deadline_ms = now_ms.saturating_add(self.interval_ms);
    }

    /// Returns true and re-arms once the deadline has passed.
    pub(crate) fn poll(&mut self, now_ms: u64) -> bool {
        if now_ms < self.deadline_ms {
            return false;
        }
        self.arm(now_ms);
        true
    }
}
