use std::fmt::Debug;

use chrono::NaiveDate;

/// Source of "today" for the date-window filters.
pub trait Clock: Debug + Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the machine running the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Always returns the same day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
