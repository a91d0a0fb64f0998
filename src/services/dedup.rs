//! Delivery deduplication.
//!
//! Remembers which alert subjects were already delivered so that an alert
//! that stays in the portal table for a while is only sent once. The set
//! lives for the lifetime of the process; nothing is persisted, so a
//! restart permits subjects delivered before it to be sent again.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;

use crate::models::DedupConfig;
use crate::utils::clock::Clock;

struct DedupState {
    /// Day the current set was started on
    day: NaiveDate,
    seen: HashSet<String>,
}

/// Process-lifetime set of delivered alert subjects.
///
/// All operations take the internal lock, so one instance can be shared
/// between concurrent scans. [`DeliveryDeduplicator::check_and_mark`] is the
/// only gate scans should use: it tests and records membership under a
/// single lock acquisition.
pub struct DeliveryDeduplicator {
    state: Mutex<DedupState>,
    clock: Arc<dyn Clock>,
    reset_daily: bool,
}

impl DeliveryDeduplicator {
    /// Create an empty deduplicator.
    ///
    /// With `reset_daily`, the set is cleared whenever the clock reports a
    /// different date than the one the set was started on.
    pub fn new(clock: Arc<dyn Clock>, reset_daily: bool) -> Self {
        let day = clock.today();
        Self {
            state: Mutex::new(DedupState {
                day,
                seen: HashSet::new(),
            }),
            clock,
            reset_daily,
        }
    }

    pub fn from_config(config: &DedupConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, config.reset_daily)
    }

    /// Whether `subject` was already delivered.
    pub fn seen(&self, subject: &str) -> bool {
        self.lock().seen.contains(subject)
    }

    /// Record `subject` as delivered. Returns `false` if it already was.
    pub fn mark(&self, subject: &str) -> bool {
        self.lock().seen.insert(subject.to_string())
    }

    /// Atomically check and record `subject`.
    ///
    /// Returns `true` exactly once per subject (per day when daily reset is
    /// enabled); every later call returns `false`.
    pub fn check_and_mark(&self, subject: &str) -> bool {
        let mut state = self.lock();
        if state.seen.contains(subject) {
            return false;
        }
        state.seen.insert(subject.to_string())
    }

    /// Forget everything and start a new day at the clock's current date.
    pub fn reset_for_new_day(&self) {
        let today = self.clock.today();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.day = today;
        state.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().seen.is_empty()
    }

    /// Lock the state, rolling over to a fresh set first if the day changed.
    fn lock(&self) -> MutexGuard<'_, DedupState> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if self.reset_daily {
            let today = self.clock.today();
            if state.day != today {
                log::info!(
                    "Day changed ({} -> {}), forgetting {} delivered subject(s)",
                    state.day,
                    today,
                    state.seen.len()
                );
                state.day = today;
                state.seen.clear();
            }
        }
        state
    }
}
