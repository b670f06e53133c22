//! Clock abstraction for timestamps and cache expiry.
//!
//! Everything that reads "now" takes a `Clock` so tests can drive time by
//! hand instead of sleeping.

use crate::entity::Timestamp;
use chrono::{TimeZone, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Hand-driven clock for deterministic tests.
///
/// Clones share the same instant, so a test can keep one handle and advance
/// the clock seen by a store it has handed another handle to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// 2024-01-01 00:00:00 UTC
    pub fn at_epoch_2024() -> Self {
        Self::new(Utc.timestamp_opt(1_704_067_200, 0).single().unwrap_or_else(Utc::now))
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let delta =
            chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::days(36_500));
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now = now.checked_add_signed(delta).unwrap_or(*now);
    }

    pub fn set(&self, to: Timestamp) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
