//! Time-of-day windows for alert admission.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// A wall-clock interval during which an alert may be surfaced.
///
/// Both bounds are exclusive: a time equal to `start` or `end` is outside
/// the window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    /// Create a window from hour/minute pairs.
    ///
    /// Returns `None` when either bound is not a valid time of day.
    pub fn from_hm(start: (u32, u32), end: (u32, u32)) -> Option<Self> {
        Some(Self {
            start: NaiveTime::from_hms_opt(start.0, start.1, 0)?,
            end: NaiveTime::from_hms_opt(end.0, end.1, 0)?,
        })
    }

    /// Strict containment check.
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start < time && time < self.end
    }

    /// Whether `start` lies before `end`.
    pub fn is_well_formed(&self) -> bool {
        self.start < self.end
    }

    /// Whether two windows share any instant.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// True if `time` falls strictly inside any of `windows`.
pub fn within_any(windows: &[TimeWindow], time: NaiveTime) -> bool {
    windows.iter().any(|w| w.contains(time))
}
