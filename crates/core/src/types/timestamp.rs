//! Business-local timestamps.
//!
//! Orders carry their creation time as a formatted local string rather than
//! a Unix timestamp. The business runs in a single fixed time zone, so the
//! zone is a plain UTC offset rather than a tz database entry.

use core::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Pattern used for [`OrderTimestamp`]: `dd/MM/yyyy HH:mm:ss`, 24-hour clock.
pub const ORDER_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// The fixed time zone the kitchen operates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessZone(FixedOffset);

impl BusinessZone {
    /// New Zealand standard time, UTC+12.
    #[must_use]
    pub fn nzst() -> Self {
        Self::from_offset_minutes(12 * 60).unwrap_or_else(Self::utc)
    }

    /// UTC.
    #[must_use]
    pub fn utc() -> Self {
        Self(Utc.fix())
    }

    /// Build a zone from an offset east of UTC, in minutes.
    ///
    /// Returns `None` if the offset is outside ±24 hours.
    #[must_use]
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Self)
    }

    /// The underlying offset.
    #[must_use]
    pub const fn offset(&self) -> FixedOffset {
        self.0
    }

    /// Convert an instant into business-local wall-clock time.
    #[must_use]
    pub fn local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.0)
    }

    /// Stamp an instant as an order creation time.
    #[must_use]
    pub fn order_timestamp(&self, instant: DateTime<Utc>) -> OrderTimestamp {
        OrderTimestamp(
            self.local(instant)
                .format(ORDER_TIMESTAMP_FORMAT)
                .to_string(),
        )
    }
}

impl Default for BusinessZone {
    fn default() -> Self {
        Self::nzst()
    }
}

/// Creation time of an order, formatted in the business zone.
///
/// The string is what gets stored. Because the pattern is day-first it does
/// not sort chronologically as text, so ordering goes through [`Self::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct OrderTimestamp(String);

impl OrderTimestamp {
    /// Wrap a stored timestamp string without validating it.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The stored text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse back into a local date-time. `None` for malformed or legacy values.
    #[must_use]
    pub fn parse(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.0, ORDER_TIMESTAMP_FORMAT).ok()
    }
}

impl fmt::Display for OrderTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
