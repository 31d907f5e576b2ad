//! Wall-clock timestamps for the last-write-wins selection path.

use chrono::TimeZone;

use crate::causal::VersionedValue;

/// An UTC timestamp recording when a value was written.
///
/// Only used by the last-write-wins convenience path, which orders values by
/// wall-clock time instead of causal history. Depends on the system time
/// reported by the operating system; meaningful comparison across nodes
/// requires reasonably synchronized clocks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct Timestamp(chrono::DateTime<chrono::Utc>);

impl Timestamp {
    /// Returns an UTC timestamp corresponding to the current date and time.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Constructs a timestamp from the number of non-leap milliseconds since
    /// the Unix epoch. Returns `None` if the value is out of range.
    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        chrono::Utc.timestamp_millis_opt(millis).single().map(Self)
    }
}

/// A [`VersionedValue`] together with the wall-clock time it was written at.
///
/// This is the parallel representation consumed by last-write-wins selection:
/// the timestamp decides, the version vector is ignored.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimestampedValue {
    timestamp: Timestamp,
    value: VersionedValue,
}

impl TimestampedValue {
    /// Constructs a new pair from the given timestamp and value.
    pub fn new(timestamp: Timestamp, value: VersionedValue) -> Self {
        Self { timestamp, value }
    }

    /// Returns the recorded write time.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Returns a reference to the wrapped value.
    pub fn value(&self) -> &VersionedValue {
        &self.value
    }

    /// Returns the wrapped value, taking ownership.
    pub fn into_value(self) -> VersionedValue {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::Timestamp;

    #[test]
    fn timestamps_order_by_wall_clock() {
        let earlier = Timestamp::from_unix_millis(10).unwrap();
        let later = Timestamp::from_unix_millis(30).unwrap();

        assert!(earlier < later);
        assert!(earlier < Timestamp::now());
    }
}
