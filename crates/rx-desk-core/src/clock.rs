//! Time source for derived fields and relative filters.

use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};

/// Source of "today" and the current timestamp.
pub trait Clock: Send + Sync {
    /// Current local calendar date.
    fn today(&self) -> NaiveDate;

    /// Current Unix timestamp in milliseconds.
    fn timestamp_millis(&self) -> i64;
}

pub type SharedClock = Arc<dyn Clock>;

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn timestamp_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock pinned to a fixed instant (for tests and replays).
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    today: NaiveDate,
    millis: i64,
}

impl FixedClock {
    /// Pin the clock to midnight UTC of the given date.
    pub fn on(today: NaiveDate) -> Self {
        let millis = today
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis())
            .unwrap_or_default();
        Self { today, millis }
    }

    /// Override the timestamp while keeping the date.
    pub fn with_millis(mut self, millis: i64) -> Self {
        self.millis = millis;
        self
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.today
    }

    fn timestamp_millis(&self) -> i64 {
        self.millis
    }
}

/// Shared wall clock.
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}
