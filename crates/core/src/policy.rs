//! Order cutoff policy.
//!
//! Lunch orders must be in before a fixed wall-clock time in the kitchen's
//! time zone. The rule lives here rather than in the store gateway so the
//! caller decides when it applies and tests can pass any instant.

use chrono::{DateTime, NaiveTime, Timelike, Utc};

use crate::types::BusinessZone;

/// Orders are accepted strictly before `cutoff`, local to `zone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutoffPolicy {
    zone: BusinessZone,
    cutoff: NaiveTime,
}

impl CutoffPolicy {
    /// Default cutoff hour.
    pub const DEFAULT_CUTOFF_HOUR: u32 = 10;

    /// Create a policy with an explicit cutoff time.
    #[must_use]
    pub const fn new(zone: BusinessZone, cutoff: NaiveTime) -> Self {
        Self { zone, cutoff }
    }

    /// The business zone the cutoff is measured in.
    #[must_use]
    pub const fn zone(&self) -> BusinessZone {
        self.zone
    }

    /// The cutoff wall-clock time.
    #[must_use]
    pub const fn cutoff(&self) -> NaiveTime {
        self.cutoff
    }

    /// Whether an order placed at `now` is still in time.
    #[must_use]
    pub fn allows(&self, now: DateTime<Utc>) -> bool {
        self.zone.local(now).time() < self.cutoff
    }

    /// Cutoff formatted for messages, e.g. `10:00`.
    #[must_use]
    pub fn cutoff_label(&self) -> String {
        format!("{:02}:{:02}", self.cutoff.hour(), self.cutoff.minute())
    }
}

impl Default for CutoffPolicy {
    fn default() -> Self {
        Self::new(
            BusinessZone::default(),
            NaiveTime::from_hms_opt(Self::DEFAULT_CUTOFF_HOUR, 0, 0).unwrap_or(NaiveTime::MIN),
        )
    }
}
