//! Session configuration.

use std::time::Duration;

use chrono::{Local, NaiveDate};

use crate::cache::DEFAULT_CACHE_TTL;

/// Booking session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long fetched availability stays fresh.
    pub cache_ttl: Duration,

    /// Earliest selectable date. Defaults to today.
    pub min_date: Option<NaiveDate>,

    /// Overrides the local date, for reproducible calendars.
    pub today: Option<NaiveDate>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            min_date: None,
            today: None,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the availability cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Builder: set the earliest selectable date.
    pub fn with_min_date(mut self, date: NaiveDate) -> Self {
        self.min_date = Some(date);
        self
    }

    /// Builder: pin "today".
    pub fn with_today(mut self, date: NaiveDate) -> Self {
        self.today = Some(date);
        self
    }

    /// The configured or local current date.
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// The earliest selectable date, never before today.
    pub fn min_date(&self) -> NaiveDate {
        let today = self.today();
        self.min_date.map_or(today, |date| date.max(today))
    }
}
