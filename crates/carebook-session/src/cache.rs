//! Availability cache with TTL and stale-response protection.
//!
//! Dates are cached per (calendar, type, month) and times per
//! (calendar, date, type). Each scope tracks its own in-flight keys, loading
//! flag and last error, so a failed times fetch never hides the dates
//! already on screen.
//!
//! Fetches are split into `begin_*` and `complete_*`. `begin_*` hands out a
//! [`FetchTicket`] only when a network call is actually needed; the caller
//! performs the call and passes the ticket back with the result. A ticket
//! from before the last [`AvailabilityCache::reset`], or for a key that is
//! no longer being loaded, is discarded.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::time::{Duration, Instant};

use carebook_api::{ApiError, ApiResult};
use carebook_core::{TimeSlot, YearMonth};
use chrono::NaiveDate;
use tracing::{debug, warn};

/// Default time-to-live for cached availability.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Cache key for a month of available dates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatesKey {
    pub calendar_id: String,
    pub appointment_type_id: String,
    pub month: YearMonth,
}

impl DatesKey {
    pub fn new(
        calendar_id: impl Into<String>,
        appointment_type_id: impl Into<String>,
        month: YearMonth,
    ) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            appointment_type_id: appointment_type_id.into(),
            month,
        }
    }
}

impl fmt::Display for DatesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.calendar_id, self.appointment_type_id, self.month
        )
    }
}

/// Cache key for the slots of one day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimesKey {
    pub calendar_id: String,
    pub date: NaiveDate,
    pub appointment_type_id: String,
}

impl TimesKey {
    pub fn new(
        calendar_id: impl Into<String>,
        date: NaiveDate,
        appointment_type_id: impl Into<String>,
    ) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            date,
            appointment_type_id: appointment_type_id.into(),
        }
    }
}

impl fmt::Display for TimesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.calendar_id, self.date, self.appointment_type_id
        )
    }
}

/// Permission to perform one fetch and store its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket<K> {
    key: K,
    generation: u64,
}

impl<K> FetchTicket<K> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What happened to a completed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The result was stored.
    Stored,
    /// The failure was recorded; cached data is untouched.
    Failed,
    /// The response no longer matches current state and was dropped.
    Stale,
}

/// A cached value with its expiry.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Entries, loading flag and error for one kind of fetch.
#[derive(Debug)]
struct Scope<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    in_flight: HashSet<K>,
    error: Option<ApiError>,
}

impl<K, V> Default for Scope<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            in_flight: HashSet::new(),
            error: None,
        }
    }
}

impl<K, V> Scope<K, V>
where
    K: Clone + Eq + Hash + fmt::Display,
{
    fn begin(&mut self, key: K, generation: u64) -> Option<FetchTicket<K>> {
        if self.in_flight.contains(&key) {
            debug!(key = %key, "Fetch already in flight");
            return None;
        }
        if self.entries.get(&key).is_some_and(|entry| !entry.is_expired()) {
            debug!(key = %key, "Cache hit");
            return None;
        }

        self.in_flight.insert(key.clone());
        self.error = None;
        debug!(key = %key, generation, "Starting fetch");
        Some(FetchTicket { key, generation })
    }

    fn complete(
        &mut self,
        ticket: FetchTicket<K>,
        generation: u64,
        ttl: Duration,
        result: ApiResult<V>,
    ) -> Applied {
        if ticket.generation != generation || !self.in_flight.contains(&ticket.key) {
            warn!(
                key = %ticket.key,
                ticket_generation = ticket.generation,
                generation,
                "Discarding stale response"
            );
            return Applied::Stale;
        }

        self.in_flight.remove(&ticket.key);
        match result {
            Ok(value) => {
                debug!(key = %ticket.key, "Stored fetch result");
                self.entries.insert(ticket.key, CacheEntry::new(value, ttl));
                Applied::Stored
            }
            Err(error) => {
                warn!(key = %ticket.key, error = %error, "Fetch failed");
                self.error = Some(error);
                Applied::Failed
            }
        }
    }

    fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|entry| &entry.value)
    }
}

/// Server availability for the current provider and appointment type.
#[derive(Debug)]
pub struct AvailabilityCache {
    ttl: Duration,
    generation: u64,
    dates: Scope<DatesKey, BTreeSet<NaiveDate>>,
    times: Scope<TimesKey, Vec<TimeSlot>>,
}

impl Default for AvailabilityCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl AvailabilityCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            generation: 0,
            dates: Scope::default(),
            times: Scope::default(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Bumped by every [`AvailabilityCache::reset`].
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Starts loading a month of dates, unless it is cached or in flight.
    pub fn begin_dates(&mut self, key: DatesKey) -> Option<FetchTicket<DatesKey>> {
        self.dates.begin(key, self.generation)
    }

    /// Stores the dates fetched for `ticket`, merged by month.
    pub fn complete_dates(
        &mut self,
        ticket: FetchTicket<DatesKey>,
        result: ApiResult<Vec<NaiveDate>>,
    ) -> Applied {
        let month = ticket.key.month;
        let result = result.map(|dates| {
            let in_month: BTreeSet<NaiveDate> =
                dates.iter().copied().filter(|d| month.contains(*d)).collect();
            if in_month.len() != dates.len() {
                debug!(month = %month, dropped = dates.len() - in_month.len(), "Ignoring dates outside requested month");
            }
            in_month
        });
        self.dates
            .complete(ticket, self.generation, self.ttl, result)
    }

    /// Starts loading the slots of a day, unless cached or in flight.
    pub fn begin_times(&mut self, key: TimesKey) -> Option<FetchTicket<TimesKey>> {
        self.times.begin(key, self.generation)
    }

    /// Stores the slots fetched for `ticket`.
    pub fn complete_times(
        &mut self,
        ticket: FetchTicket<TimesKey>,
        result: ApiResult<Vec<TimeSlot>>,
    ) -> Applied {
        self.times.complete(ticket, self.generation, self.ttl, result)
    }

    /// Cached dates for a month. `None` means not loaded yet, which is not
    /// the same as an empty month.
    pub fn dates(&self, key: &DatesKey) -> Option<&BTreeSet<NaiveDate>> {
        self.dates.get(key)
    }

    /// Cached slots for a day. `Some(&[])` means the day has no free slots.
    pub fn times(&self, key: &TimesKey) -> Option<&[TimeSlot]> {
        self.times.get(key).map(Vec::as_slice)
    }

    pub fn is_loading_dates(&self) -> bool {
        !self.dates.in_flight.is_empty()
    }

    pub fn is_loading_times(&self) -> bool {
        !self.times.in_flight.is_empty()
    }

    /// Whether this particular month is being fetched.
    pub fn is_loading_month(&self, key: &DatesKey) -> bool {
        self.dates.in_flight.contains(key)
    }

    pub fn dates_error(&self) -> Option<&ApiError> {
        self.dates.error.as_ref()
    }

    pub fn times_error(&self) -> Option<&ApiError> {
        self.times.error.as_ref()
    }

    /// Drops one day's slots so the next request re-fetches them.
    pub fn invalidate_times(&mut self, key: &TimesKey) {
        if self.times.entries.remove(key).is_some() {
            debug!(key = %key, "Invalidated cached times");
        }
    }

    /// Forgets everything and invalidates outstanding tickets.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.dates = Scope::default();
        self.times = Scope::default();
        debug!(generation = self.generation, "Reset availability cache");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn march() -> YearMonth {
        YearMonth::new(2024, 3).unwrap()
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn dates_key() -> DatesKey {
        DatesKey::new("cal_1", "5", march())
    }

    mod dates {
        use super::*;

        #[test]
        fn begin_is_idempotent_while_in_flight() {
            let mut cache = AvailabilityCache::default();
            assert!(cache.begin_dates(dates_key()).is_some());
            assert!(cache.is_loading_dates());
            assert!(cache.begin_dates(dates_key()).is_none());
        }

        #[test]
        fn stores_and_serves_from_cache() {
            let mut cache = AvailabilityCache::default();
            let ticket = cache.begin_dates(dates_key()).unwrap();
            let applied = cache.complete_dates(ticket, Ok(vec![date(3, 15), date(3, 10)]));

            assert_eq!(applied, Applied::Stored);
            assert!(!cache.is_loading_dates());
            let dates: Vec<_> = cache.dates(&dates_key()).unwrap().iter().copied().collect();
            assert_eq!(dates, vec![date(3, 10), date(3, 15)]);
            assert!(cache.begin_dates(dates_key()).is_none());
        }

        #[test]
        fn empty_month_is_distinct_from_unloaded() {
            let mut cache = AvailabilityCache::default();
            assert!(cache.dates(&dates_key()).is_none());

            let ticket = cache.begin_dates(dates_key()).unwrap();
            cache.complete_dates(ticket, Ok(vec![]));
            assert_eq!(cache.dates(&dates_key()).map(BTreeSet::len), Some(0));
        }

        #[test]
        fn months_are_merged_independently() {
            let mut cache = AvailabilityCache::default();
            let ticket = cache.begin_dates(dates_key()).unwrap();
            cache.complete_dates(ticket, Ok(vec![date(3, 10)]));

            let april = DatesKey::new("cal_1", "5", march().next());
            let ticket = cache.begin_dates(april.clone()).unwrap();
            cache.complete_dates(ticket, Ok(vec![date(4, 2)]));

            assert!(cache.dates(&dates_key()).unwrap().contains(&date(3, 10)));
            assert!(cache.dates(&april).unwrap().contains(&date(4, 2)));
        }

        #[test]
        fn drops_dates_outside_the_month() {
            let mut cache = AvailabilityCache::default();
            let ticket = cache.begin_dates(dates_key()).unwrap();
            cache.complete_dates(ticket, Ok(vec![date(3, 10), date(4, 1)]));
            assert_eq!(cache.dates(&dates_key()).unwrap().len(), 1);
        }

        #[test]
        fn failure_keeps_other_months() {
            let mut cache = AvailabilityCache::default();
            let ticket = cache.begin_dates(dates_key()).unwrap();
            cache.complete_dates(ticket, Ok(vec![date(3, 10)]));

            let april = DatesKey::new("cal_1", "5", march().next());
            let ticket = cache.begin_dates(april.clone()).unwrap();
            let applied = cache.complete_dates(ticket, Err(ApiError::network("offline")));

            assert_eq!(applied, Applied::Failed);
            assert!(cache.dates_error().is_some());
            assert!(cache.dates(&april).is_none());
            assert!(cache.dates(&dates_key()).is_some());

            // Retry clears the error.
            assert!(cache.begin_dates(april).is_some());
            assert!(cache.dates_error().is_none());
        }

        #[test]
        fn expired_entries_are_refetched() {
            let mut cache = AvailabilityCache::new(Duration::ZERO);
            let ticket = cache.begin_dates(dates_key()).unwrap();
            cache.complete_dates(ticket, Ok(vec![date(3, 10)]));

            // Still readable while the refresh runs.
            assert!(cache.begin_dates(dates_key()).is_some());
            assert!(cache.dates(&dates_key()).is_some());
        }
    }

    mod stale {
        use super::*;

        #[test]
        fn response_from_before_reset_is_discarded() {
            let mut cache = AvailabilityCache::default();
            let old = cache.begin_dates(dates_key()).unwrap();
            cache.reset();

            let other = DatesKey::new("cal_2", "6", march());
            let current = cache.begin_dates(other.clone()).unwrap();

            assert_eq!(cache.complete_dates(old, Ok(vec![date(3, 1)])), Applied::Stale);
            assert!(cache.dates(&dates_key()).is_none());
            assert!(cache.is_loading_dates());

            assert_eq!(cache.complete_dates(current, Ok(vec![date(3, 2)])), Applied::Stored);
            assert!(cache.dates(&other).unwrap().contains(&date(3, 2)));
        }

        #[test]
        fn same_key_after_reset_is_still_stale() {
            let mut cache = AvailabilityCache::default();
            let old = cache.begin_dates(dates_key()).unwrap();
            cache.reset();
            let _current = cache.begin_dates(dates_key()).unwrap();

            assert_eq!(cache.complete_dates(old, Ok(vec![date(3, 1)])), Applied::Stale);
            assert!(cache.dates(&dates_key()).is_none());
        }

        #[test]
        fn months_in_flight_together_are_both_kept() {
            let mut cache = AvailabilityCache::default();
            let march_ticket = cache.begin_dates(dates_key()).unwrap();
            let april = DatesKey::new("cal_1", "5", march().next());
            let april_ticket = cache.begin_dates(april.clone()).unwrap();
            assert!(cache.is_loading_month(&dates_key()));

            assert_eq!(cache.complete_dates(april_ticket, Ok(vec![date(4, 2)])), Applied::Stored);
            assert_eq!(cache.complete_dates(march_ticket, Ok(vec![date(3, 9)])), Applied::Stored);
            assert!(!cache.is_loading_dates());
            assert!(cache.dates(&april).is_some());
        }

        #[test]
        fn times_from_before_reset_are_discarded() {
            let mut cache = AvailabilityCache::default();
            let key = TimesKey::new("cal_1", date(3, 10), "5");
            let old = cache.begin_times(key.clone()).unwrap();
            cache.reset();
            let current = cache.begin_times(key.clone()).unwrap();

            let applied = cache.complete_times(old, Ok(vec![TimeSlot::new("09:00")]));
            assert_eq!(applied, Applied::Stale);
            assert!(cache.times(&key).is_none());
            assert!(cache.is_loading_times());

            assert_eq!(cache.complete_times(current, Ok(vec![])), Applied::Stored);
            assert_eq!(cache.times(&key), Some(&[][..]));
        }

        #[test]
        fn completed_ticket_cannot_be_replayed() {
            let mut cache = AvailabilityCache::new(Duration::ZERO);
            let ticket = cache.begin_dates(dates_key()).unwrap();
            let replay = ticket.clone();
            cache.complete_dates(ticket, Ok(vec![date(3, 9)]));

            assert_eq!(cache.complete_dates(replay, Ok(vec![])), Applied::Stale);
            assert_eq!(cache.dates(&dates_key()).unwrap().len(), 1);
        }
    }

    mod times {
        use super::*;

        fn times_key() -> TimesKey {
            TimesKey::new("cal_1", date(3, 10), "5")
        }

        #[test]
        fn independent_flags() {
            let mut cache = AvailabilityCache::default();
            let _dates = cache.begin_dates(dates_key()).unwrap();
            let ticket = cache.begin_times(times_key()).unwrap();

            cache.complete_times(ticket, Err(ApiError::server("boom")));
            assert!(cache.times_error().is_some());
            assert!(cache.dates_error().is_none());
            assert!(cache.is_loading_dates());
            assert!(!cache.is_loading_times());
        }

        #[test]
        fn invalidate_forces_refetch() {
            let mut cache = AvailabilityCache::default();
            let ticket = cache.begin_times(times_key()).unwrap();
            cache.complete_times(ticket, Ok(vec![TimeSlot::new("09:00")]));
            assert!(cache.begin_times(times_key()).is_none());

            cache.invalidate_times(&times_key());
            assert!(cache.times(&times_key()).is_none());
            assert!(cache.begin_times(times_key()).is_some());
        }

        #[test]
        fn reset_clears_everything() {
            let mut cache = AvailabilityCache::default();
            let ticket = cache.begin_times(times_key()).unwrap();
            cache.complete_times(ticket, Ok(vec![]));
            let generation = cache.generation();

            cache.reset();
            assert_eq!(cache.generation(), generation + 1);
            assert!(cache.times(&times_key()).is_none());
            assert!(!cache.is_loading_times());
        }
    }
}
