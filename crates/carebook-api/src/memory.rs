//! In-memory implementation of [`SchedulingApi`].
//!
//! Serves fixtures from memory and records what it was asked. Failures can
//! be queued per operation and responses can be held back until released,
//! which is how the session tests reproduce out-of-order responses.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use carebook_core::{
    Appointment, BookingRequest, CurrentUser, DoctorPage, DoctorQuery, Provider, RescheduleRequest,
    TimeSlot, YearMonth,
};
use chrono::NaiveDate;
use tokio::sync::watch;
use tracing::debug;

use crate::api::{BoxFuture, SchedulingApi};
use crate::error::{ApiError, ApiResult};

/// The operations of [`SchedulingApi`], for counters and injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListDoctors,
    AvailableDates,
    AvailableTimes,
    CreateAppointment,
    RescheduleAppointment,
    CurrentUser,
}

type DatesKey = (String, String, YearMonth);
type TimesKey = (String, NaiveDate, String);

#[derive(Debug, Default)]
struct MemoryState {
    doctors: Vec<Provider>,
    page_size: Option<usize>,
    dates: HashMap<DatesKey, Vec<NaiveDate>>,
    times: HashMap<TimesKey, Vec<TimeSlot>>,
    user: Option<CurrentUser>,
    failures: HashMap<Operation, VecDeque<ApiError>>,
    calls: HashMap<Operation, usize>,
    date_requests: Vec<DatesKey>,
    bookings: Vec<BookingRequest>,
    reschedules: Vec<RescheduleRequest>,
}

/// A [`SchedulingApi`] backed by fixtures.
#[derive(Debug, Default)]
pub struct MemoryApi {
    state: Mutex<MemoryState>,
    gates: Mutex<HashMap<Operation, watch::Sender<bool>>>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a provider to the directory.
    pub fn with_doctor(self, provider: Provider) -> Self {
        self.lock().doctors.push(provider);
        self
    }

    /// Builder: paginate the directory `size` providers at a time.
    pub fn with_page_size(self, size: usize) -> Self {
        self.lock().page_size = Some(size.max(1));
        self
    }

    /// Builder: available dates for a calendar, type and month.
    pub fn with_dates(
        self,
        calendar_id: &str,
        appointment_type_id: &str,
        month: YearMonth,
        dates: Vec<NaiveDate>,
    ) -> Self {
        self.set_dates(calendar_id, appointment_type_id, month, dates);
        self
    }

    /// Builder: available slots for a calendar, date and type.
    pub fn with_times(
        self,
        calendar_id: &str,
        date: NaiveDate,
        appointment_type_id: &str,
        slots: Vec<TimeSlot>,
    ) -> Self {
        self.lock().times.insert(
            (calendar_id.to_string(), date, appointment_type_id.to_string()),
            slots,
        );
        self
    }

    /// Builder: the signed-in user.
    pub fn with_user(self, user: CurrentUser) -> Self {
        self.lock().user = Some(user);
        self
    }

    /// Replaces the dates served for a key.
    pub fn set_dates(
        &self,
        calendar_id: &str,
        appointment_type_id: &str,
        month: YearMonth,
        dates: Vec<NaiveDate>,
    ) {
        self.lock().dates.insert(
            (calendar_id.to_string(), appointment_type_id.to_string(), month),
            dates,
        );
    }

    /// Makes the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: Operation, error: ApiError) {
        self.lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Holds every call of `operation` until [`MemoryApi::release`].
    pub fn hold(&self, operation: Operation) {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        match gates.get(&operation) {
            Some(gate) => {
                gate.send_replace(false);
            }
            None => {
                let (gate, _) = watch::channel(false);
                gates.insert(operation, gate);
            }
        }
    }

    /// Lets held calls of `operation` complete.
    pub fn release(&self, operation: Operation) {
        let gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(gate) = gates.get(&operation) {
            gate.send_replace(true);
        }
    }

    /// Number of calls made to `operation`, held ones included.
    pub fn calls(&self, operation: Operation) -> usize {
        self.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Every `available_dates` request, in call order.
    pub fn date_requests(&self) -> Vec<(String, String, YearMonth)> {
        self.lock().date_requests.clone()
    }

    /// Booking requests received, in call order.
    pub fn bookings(&self) -> Vec<BookingRequest> {
        self.lock().bookings.clone()
    }

    /// Reschedule requests received, in call order.
    pub fn reschedules(&self) -> Vec<RescheduleRequest> {
        self.lock().reschedules.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts the call and pops an injected failure, if any.
    fn enter(&self, operation: Operation) -> ApiResult<()> {
        let mut state = self.lock();
        *state.calls.entry(operation).or_insert(0) += 1;
        match state.failures.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn wait_for_gate(&self, operation: Operation) {
        let receiver = {
            let gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
            gates.get(&operation).map(watch::Sender::subscribe)
        };
        if let Some(mut receiver) = receiver {
            debug!(operation = ?operation, "Waiting for release");
            // The sender lives as long as `self`, so this only errors on drop.
            let _ = receiver.wait_for(|open| *open).await;
        }
    }
}

impl SchedulingApi for MemoryApi {
    fn name(&self) -> &str {
        "memory"
    }

    fn list_doctors(&self, query: DoctorQuery) -> BoxFuture<'_, ApiResult<DoctorPage>> {
        Box::pin(async move {
            self.enter(Operation::ListDoctors)?;
            self.wait_for_gate(Operation::ListDoctors).await;

            let state = self.lock();
            let needle = query.search.as_deref().map(str::to_lowercase);
            let matching: Vec<&Provider> = state
                .doctors
                .iter()
                .filter(|d| match &needle {
                    Some(needle) => d.name.to_lowercase().contains(needle.as_str()),
                    None => true,
                })
                .filter(|d| match &query.location {
                    Some(location) => d.address.as_deref() == Some(location.as_str()),
                    None => true,
                })
                .collect();

            let offset = match query.page_token.as_deref() {
                Some(token) => token
                    .parse::<usize>()
                    .map_err(|_| ApiError::bad_request(format!("invalid page token '{}'", token)))?,
                None => 0,
            };
            let size = state.page_size.unwrap_or(matching.len().max(1));
            let end = (offset + size).min(matching.len());
            let doctors: Vec<Provider> = matching
                .get(offset..end)
                .unwrap_or_default()
                .iter()
                .map(|d| (*d).clone())
                .collect();
            let has_more = end < matching.len();

            Ok(DoctorPage {
                doctors,
                has_more,
                next_page_token: has_more.then(|| end.to_string()),
            })
        })
    }

    fn available_dates<'a>(
        &'a self,
        calendar_id: &'a str,
        appointment_type_id: &'a str,
        month: YearMonth,
    ) -> BoxFuture<'a, ApiResult<Vec<NaiveDate>>> {
        Box::pin(async move {
            let key = (calendar_id.to_string(), appointment_type_id.to_string(), month);
            self.lock().date_requests.push(key.clone());
            self.enter(Operation::AvailableDates)?;
            self.wait_for_gate(Operation::AvailableDates).await;

            // Read after the gate so a held call sees fixtures set meanwhile.
            Ok(self.lock().dates.get(&key).cloned().unwrap_or_default())
        })
    }

    fn available_times<'a>(
        &'a self,
        calendar_id: &'a str,
        date: NaiveDate,
        appointment_type_id: &'a str,
    ) -> BoxFuture<'a, ApiResult<Vec<TimeSlot>>> {
        Box::pin(async move {
            self.enter(Operation::AvailableTimes)?;
            self.wait_for_gate(Operation::AvailableTimes).await;

            let key = (calendar_id.to_string(), date, appointment_type_id.to_string());
            Ok(self.lock().times.get(&key).cloned().unwrap_or_default())
        })
    }

    fn create_appointment(&self, request: BookingRequest) -> BoxFuture<'_, ApiResult<Appointment>> {
        Box::pin(async move {
            self.enter(Operation::CreateAppointment)?;
            self.wait_for_gate(Operation::CreateAppointment).await;

            let mut state = self.lock();
            state.bookings.push(request.clone());
            Ok(Appointment {
                id: format!("appt-{}", state.bookings.len()),
                provider_id: None,
                appointment_type_id: request.appointment_type_id,
                datetime: request.datetime,
                status: Some("booked".to_string()),
                notes: request.notes,
            })
        })
    }

    fn reschedule_appointment(
        &self,
        request: RescheduleRequest,
    ) -> BoxFuture<'_, ApiResult<Appointment>> {
        Box::pin(async move {
            self.enter(Operation::RescheduleAppointment)?;
            self.wait_for_gate(Operation::RescheduleAppointment).await;

            self.lock().reschedules.push(request.clone());
            Ok(Appointment {
                id: request.appointment_id,
                provider_id: None,
                appointment_type_id: request.appointment_type_id,
                datetime: request.appointment_date,
                status: Some("rescheduled".to_string()),
                notes: request.notes,
            })
        })
    }

    fn current_user(&self) -> BoxFuture<'_, ApiResult<CurrentUser>> {
        Box::pin(async move {
            self.enter(Operation::CurrentUser)?;
            self.wait_for_gate(Operation::CurrentUser).await;

            self.lock()
                .user
                .clone()
                .ok_or_else(|| ApiError::unauthorized("no signed-in user"))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::error::ApiErrorCode;

    fn march() -> YearMonth {
        YearMonth::new(2024, 3).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[tokio::test]
    async fn paginates_directory() {
        let api = MemoryApi::new()
            .with_doctor(Provider::new("1", "Dr. Adams"))
            .with_doctor(Provider::new("2", "Dr. Baker"))
            .with_doctor(Provider::new("3", "Dr. Clark"))
            .with_page_size(2);

        let first = api.list_doctors(DoctorQuery::new()).await.unwrap();
        assert_eq!(first.doctors.len(), 2);
        assert!(first.has_more);

        let token = first.next_page_token.unwrap();
        let second = api
            .list_doctors(DoctorQuery::new().with_page_token(token))
            .await
            .unwrap();
        assert_eq!(second.doctors[0].id, "3");
        assert!(!second.has_more);
        assert_eq!(api.calls(Operation::ListDoctors), 2);
    }

    #[tokio::test]
    async fn search_filters_by_name() {
        let api = MemoryApi::new()
            .with_doctor(Provider::new("1", "Dr. Adams"))
            .with_doctor(Provider::new("2", "Dr. Baker"));

        let page = api
            .list_doctors(DoctorQuery::new().with_search("bak"))
            .await
            .unwrap();
        assert_eq!(page.doctors.len(), 1);
        assert_eq!(page.doctors[0].id, "2");
    }

    #[tokio::test]
    async fn serves_fixtures_and_empty_defaults() {
        let api = MemoryApi::new().with_dates("cal_1", "5", march(), vec![date(10), date(15)]);

        let dates = api.available_dates("cal_1", "5", march()).await.unwrap();
        assert_eq!(dates, vec![date(10), date(15)]);

        let none = api.available_dates("cal_1", "6", march()).await.unwrap();
        assert!(none.is_empty());
        assert_eq!(api.date_requests().len(), 2);
    }

    #[tokio::test]
    async fn injected_failure_is_consumed_once() {
        let api = MemoryApi::new();
        api.fail_next(Operation::AvailableTimes, ApiError::server("boom"));

        let err = api.available_times("cal_1", date(10), "5").await.unwrap_err();
        assert_eq!(err.code(), ApiErrorCode::ServerError);
        assert!(api.available_times("cal_1", date(10), "5").await.is_ok());
        assert_eq!(api.calls(Operation::AvailableTimes), 2);
    }

    #[tokio::test]
    async fn held_calls_wait_for_release() {
        let api = Arc::new(MemoryApi::new().with_user(CurrentUser::new("a@b.c", "A B")));
        api.hold(Operation::CurrentUser);

        let task = {
            let api = Arc::clone(&api);
            tokio::spawn(async move { api.current_user().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!task.is_finished());

        api.release(Operation::CurrentUser);
        let user = task.await.unwrap().unwrap();
        assert_eq!(user.email(), Some("a@b.c"));
    }

    #[tokio::test]
    async fn records_bookings() {
        let api = MemoryApi::new();
        let request = BookingRequest {
            calendar_id: "cal_1".into(),
            appointment_type_id: Some("5".into()),
            datetime: "2024-03-10T09:30:00".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: None,
            notes: None,
            timezone: None,
        };

        let appointment = api.create_appointment(request.clone()).await.unwrap();
        assert_eq!(appointment.id, "appt-1");
        assert_eq!(api.bookings(), vec![request]);
    }

    #[tokio::test]
    async fn missing_user_is_unauthorized() {
        let err = MemoryApi::new().current_user().await.unwrap_err();
        assert_eq!(err.code(), ApiErrorCode::Unauthorized);
    }
}
