// libs/scheduling-cell/src/interval.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Half-open `[start, end)` interval over UTC instants.
///
/// Callers are responsible for rejecting zero-length or inverted intervals
/// (`start >= end`) before constructing one; the methods here assume valid
/// input and perform no checks of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Two half-open intervals overlap iff max(starts) < min(ends).
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start.max(other.start) < self.end.min(other.end)
    }

    /// Whether `other` lies fully inside this interval.
    pub fn contains(&self, other: &TimeInterval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}
