//! The booking state machine.
//!
//! [`BookingFlow`] owns the selection, the provider list, the calendar and
//! the availability cache. It never performs I/O: operations that need the
//! network return [`Effect`]s, and the caller feeds results back through
//! [`BookingFlow::dates_loaded`], [`BookingFlow::times_loaded`] and
//! [`BookingFlow::submission_finished`]. Those check that the result still
//! matches the current selection before applying it.

use std::collections::BTreeSet;

use carebook_api::{ApiError, ApiErrorCode, ApiResult};
use carebook_core::{
    Appointment, CurrentUser, DoctorPage, MonthGrid, MonthView, Provider, TimeSlot, YearMonth,
};
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::cache::{Applied, AvailabilityCache, DatesKey, FetchTicket, TimesKey};
use crate::commit::{self, BookingMode, CommitRequest};
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::selection::{Phase, Selection};

/// A submission the caller must send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitTicket {
    id: u64,
    request: CommitRequest,
}

impl SubmitTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn request(&self) -> &CommitRequest {
        &self.request
    }
}

/// Work requested by the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchDates(FetchTicket<DatesKey>),
    FetchTimes(FetchTicket<TimesKey>),
    Submit(SubmitTicket),
}

#[derive(Debug, Default)]
struct Submission {
    in_flight: Option<u64>,
    next_id: u64,
    error: Option<ApiError>,
    appointment: Option<Appointment>,
}

/// Selection, availability and submission state for one booking screen.
#[derive(Debug)]
pub struct BookingFlow {
    mode: BookingMode,
    user: CurrentUser,
    selection: Selection,
    providers: Vec<Provider>,
    next_page_token: Option<String>,
    has_more_providers: bool,
    calendar: MonthView,
    cache: AvailabilityCache,
    last_fetched_month: Option<YearMonth>,
    seed_pending: bool,
    submission: Submission,
}

impl BookingFlow {
    /// Starts a new booking with an empty selection.
    pub fn book(user: CurrentUser, config: &SessionConfig) -> Self {
        Self::new(BookingMode::Book, user, config)
    }

    /// Starts a reschedule of `target`.
    ///
    /// The provider and type are matched once providers load, and the
    /// calendar opens on the month of the current appointment.
    pub fn reschedule(
        target: carebook_core::RescheduleTarget,
        user: CurrentUser,
        config: &SessionConfig,
    ) -> Self {
        Self::new(BookingMode::Reschedule(target), user, config)
    }

    pub fn new(mode: BookingMode, user: CurrentUser, config: &SessionConfig) -> Self {
        let mut calendar = MonthView::new(config.today()).with_min_date(config.min_date());
        let mut selection = Selection::new();
        let seed_pending = if let BookingMode::Reschedule(target) = &mode {
            if let Some(date) = target.date {
                calendar = calendar.showing(YearMonth::of(date));
            }
            if let Some(notes) = &target.notes {
                selection.set_notes(notes.clone());
            }
            true
        } else {
            false
        };

        Self {
            mode,
            user,
            selection,
            providers: Vec::new(),
            next_page_token: None,
            has_more_providers: false,
            calendar,
            cache: AvailabilityCache::new(config.cache_ttl),
            last_fetched_month: None,
            seed_pending,
            submission: Submission::default(),
        }
    }

    pub fn mode(&self) -> &BookingMode {
        &self.mode
    }

    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn phase(&self) -> Phase {
        self.selection.phase()
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn has_more_providers(&self) -> bool {
        self.has_more_providers
    }

    pub fn next_page_token(&self) -> Option<&str> {
        self.next_page_token.as_deref()
    }

    pub fn calendar(&self) -> &MonthView {
        &self.calendar
    }

    pub fn displayed_month(&self) -> YearMonth {
        self.calendar.displayed_month()
    }

    pub fn cache(&self) -> &AvailabilityCache {
        &self.cache
    }

    pub fn is_submitting(&self) -> bool {
        self.submission.in_flight.is_some()
    }

    /// The last submission failure, kept until the next submit.
    pub fn submission_error(&self) -> Option<&ApiError> {
        self.submission.error.as_ref()
    }

    /// The booked or rescheduled appointment, once the server confirmed it.
    pub fn appointment(&self) -> Option<&Appointment> {
        self.submission.appointment.as_ref()
    }

    /// Key of the displayed month for the current provider and type.
    pub fn dates_key(&self) -> Option<DatesKey> {
        self.dates_key_for(self.calendar.displayed_month())
    }

    fn dates_key_for(&self, month: YearMonth) -> Option<DatesKey> {
        let calendar_id = self.selection.provider()?.calendar_id.as_ref()?;
        let appointment_type = self.selection.appointment_type()?;
        Some(DatesKey::new(
            calendar_id.clone(),
            appointment_type.id.clone(),
            month,
        ))
    }

    /// Key of the selected day.
    pub fn times_key(&self) -> Option<TimesKey> {
        let calendar_id = self.selection.provider()?.calendar_id.as_ref()?;
        let appointment_type = self.selection.appointment_type()?;
        let date = self.selection.date()?;
        Some(TimesKey::new(
            calendar_id.clone(),
            date,
            appointment_type.id.clone(),
        ))
    }

    /// Dates available in the displayed month, `None` while not loaded.
    pub fn available_dates(&self) -> Option<&BTreeSet<NaiveDate>> {
        self.cache.dates(&self.dates_key()?)
    }

    /// Slots of the selected day, `None` while not loaded.
    pub fn available_times(&self) -> Option<&[TimeSlot]> {
        self.cache.times(&self.times_key()?)
    }

    /// The displayed month as a grid.
    pub fn month_grid(&self) -> MonthGrid {
        let empty = BTreeSet::new();
        let available = self.available_dates().unwrap_or(&empty);
        self.calendar.grid(available, self.selection.date())
    }

    fn ensure_idle(&self) -> SessionResult<()> {
        if self.is_submitting() {
            return Err(SessionError::Busy);
        }
        Ok(())
    }

    /// Records a page of providers.
    ///
    /// With `append` the page extends the list (load more); otherwise it
    /// replaces it. In reschedule mode this is where the provider and type
    /// are matched and auto-selected.
    pub fn providers_loaded(&mut self, page: DoctorPage, append: bool) -> SessionResult<Vec<Effect>> {
        self.ensure_idle()?;
        debug!(count = page.doctors.len(), append, has_more = page.has_more, "Providers loaded");
        if append {
            self.providers.extend(page.doctors);
        } else {
            self.providers = page.doctors;
        }
        self.has_more_providers = page.has_more;
        self.next_page_token = page.next_page_token;

        if self.seed_pending {
            return self.seed_from_target();
        }
        Ok(Vec::new())
    }

    fn seed_from_target(&mut self) -> SessionResult<Vec<Effect>> {
        let Some(target) = self.mode.reschedule_target().cloned() else {
            return Ok(Vec::new());
        };

        let Some(provider) = self.providers.iter().find(|p| p.id == target.provider_id).cloned()
        else {
            if self.has_more_providers {
                debug!(provider = %target.provider_id, "Reschedule provider not loaded yet");
                return Ok(Vec::new());
            }
            self.seed_pending = false;
            warn!(provider = %target.provider_id, "Reschedule provider not found");
            return Err(SessionError::unknown_provider(target.provider_id));
        };

        self.seed_pending = false;
        let Some(appointment_type) = provider.appointment_type(&target.appointment_type_id).cloned()
        else {
            self.select_provider_unchecked(provider);
            warn!(appointment_type = %target.appointment_type_id, "Reschedule appointment type not found");
            return Err(SessionError::unknown_appointment_type(target.appointment_type_id));
        };

        info!(
            appointment = %target.appointment_id,
            provider = %provider.id,
            appointment_type = %appointment_type.id,
            "Seeded reschedule selection"
        );
        self.select_provider_unchecked(provider);
        Ok(self.select_type_unchecked(appointment_type).into_iter().collect())
    }

    /// Chooses a provider by id. Clears type, date and time.
    pub fn select_provider(&mut self, provider_id: &str) -> SessionResult<Vec<Effect>> {
        self.ensure_idle()?;
        if self.selection.provider().is_some_and(|p| p.id == provider_id) {
            return Ok(Vec::new());
        }
        let provider = self
            .providers
            .iter()
            .find(|p| p.id == provider_id)
            .cloned()
            .ok_or_else(|| SessionError::unknown_provider(provider_id))?;

        self.seed_pending = false;
        self.select_provider_unchecked(provider);
        Ok(Vec::new())
    }

    fn select_provider_unchecked(&mut self, provider: Provider) {
        debug!(provider = %provider.id, "Provider selected");
        if provider.calendar_id.is_none() {
            warn!(provider = %provider.id, "Provider has no calendar, availability cannot be loaded");
        }
        self.selection.set_provider(provider);
        self.cache.reset();
        self.last_fetched_month = None;
    }

    /// Chooses an appointment type of the selected provider. Clears date
    /// and time, and loads the displayed month.
    pub fn select_type(&mut self, appointment_type_id: &str) -> SessionResult<Vec<Effect>> {
        self.ensure_idle()?;
        let provider = self
            .selection
            .provider()
            .ok_or(SessionError::out_of_order("choosing a type", "a provider"))?;
        if self
            .selection
            .appointment_type()
            .is_some_and(|t| t.id == appointment_type_id)
        {
            return Ok(Vec::new());
        }
        let appointment_type = provider
            .appointment_type(appointment_type_id)
            .cloned()
            .ok_or_else(|| SessionError::unknown_appointment_type(appointment_type_id))?;

        Ok(self.select_type_unchecked(appointment_type).into_iter().collect())
    }

    fn select_type_unchecked(
        &mut self,
        appointment_type: carebook_core::AppointmentType,
    ) -> Option<Effect> {
        debug!(appointment_type = %appointment_type.id, "Appointment type selected");
        self.selection.set_appointment_type(appointment_type);
        self.cache.reset();
        self.last_fetched_month = None;
        self.request_dates()
    }

    fn request_dates(&mut self) -> Option<Effect> {
        let key = self.dates_key()?;
        self.last_fetched_month = Some(key.month);
        self.cache.begin_dates(key).map(Effect::FetchDates)
    }

    fn request_times(&mut self) -> Option<Effect> {
        let key = self.times_key()?;
        self.cache.begin_times(key).map(Effect::FetchTimes)
    }

    /// Chooses a date in the displayed month. Clears the time and loads the
    /// day's slots.
    pub fn select_date(&mut self, date: NaiveDate) -> SessionResult<Vec<Effect>> {
        self.ensure_idle()?;
        if self.selection.provider().is_none() {
            return Err(SessionError::out_of_order("choosing a date", "a provider"));
        }
        if self.selection.appointment_type().is_none() {
            return Err(SessionError::out_of_order("choosing a date", "an appointment type"));
        }

        let empty = BTreeSet::new();
        let available = self.available_dates().unwrap_or(&empty);
        let key = self.calendar.select(date, available)?;

        if self.selection.date() != Some(date) {
            debug!(date = %key, "Date selected");
            self.selection.set_date(date);
        }
        Ok(self.request_times().into_iter().collect())
    }

    /// Chooses a slot of the selected day by its label or raw value.
    pub fn select_time(&mut self, time: &str) -> SessionResult<()> {
        self.ensure_idle()?;
        if self.selection.provider().is_none() || self.selection.appointment_type().is_none() {
            return Err(SessionError::out_of_order("choosing a time", "an appointment type"));
        }
        if self.selection.date().is_none() {
            return Err(SessionError::out_of_order("choosing a time", "a date"));
        }

        let wanted = time.trim();
        let slot = self
            .available_times()
            .and_then(|slots| {
                slots.iter().find(|slot| {
                    slot.label() == wanted
                        || slot.raw_time.as_deref() == Some(wanted)
                        || slot.iso_time.as_deref() == Some(wanted)
                })
            })
            .cloned()
            .ok_or_else(|| SessionError::unknown_slot(wanted))?;

        debug!(time = %slot.label(), "Time selected");
        self.selection.set_slot(slot);
        Ok(())
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) -> SessionResult<()> {
        self.ensure_idle()?;
        self.selection.set_notes(notes);
        Ok(())
    }

    pub fn set_phone(&mut self, phone: impl Into<String>) -> SessionResult<()> {
        self.ensure_idle()?;
        self.selection.set_phone(phone);
        Ok(())
    }

    /// Shows the next month, loading it if it was not the last one fetched.
    pub fn next_month(&mut self) -> SessionResult<Vec<Effect>> {
        self.ensure_idle()?;
        let month = self.calendar.go_to_next_month();
        Ok(self.month_changed(month).into_iter().collect())
    }

    /// Shows the previous month. Does nothing at the current month.
    pub fn previous_month(&mut self) -> SessionResult<Vec<Effect>> {
        self.ensure_idle()?;
        let Some(month) = self.calendar.go_to_previous_month() else {
            debug!("Already at the current month");
            return Ok(Vec::new());
        };
        Ok(self.month_changed(month).into_iter().collect())
    }

    fn month_changed(&mut self, month: YearMonth) -> Option<Effect> {
        debug!(month = %month, "Month changed");
        if self.last_fetched_month == Some(month) {
            return None;
        }
        self.request_dates()
    }

    /// Retries the displayed month after a failed fetch.
    pub fn retry_dates(&mut self) -> SessionResult<Vec<Effect>> {
        self.ensure_idle()?;
        Ok(self.request_dates().into_iter().collect())
    }

    /// Retries the selected day after a failed fetch.
    pub fn retry_times(&mut self) -> SessionResult<Vec<Effect>> {
        self.ensure_idle()?;
        Ok(self.request_times().into_iter().collect())
    }

    /// Applies a dates response.
    pub fn dates_loaded(
        &mut self,
        ticket: FetchTicket<DatesKey>,
        result: ApiResult<Vec<NaiveDate>>,
    ) -> Applied {
        self.cache.complete_dates(ticket, result)
    }

    /// Applies a times response.
    pub fn times_loaded(
        &mut self,
        ticket: FetchTicket<TimesKey>,
        result: ApiResult<Vec<TimeSlot>>,
    ) -> Applied {
        self.cache.complete_times(ticket, result)
    }

    /// Validates the selection and hands out the request to send.
    ///
    /// Validation failures never produce an effect.
    pub fn submit(&mut self) -> SessionResult<Effect> {
        self.ensure_idle()?;
        let request = commit::prepare(&self.mode, &self.selection, &self.user)?;

        self.submission.next_id += 1;
        let id = self.submission.next_id;
        self.submission.in_flight = Some(id);
        self.submission.error = None;
        debug!(submission = id, datetime = request.datetime(), "Submitting");
        Ok(Effect::Submit(SubmitTicket { id, request }))
    }

    /// Applies the server's answer to a submission.
    ///
    /// On failure the selection is kept as it was so the patient can pick
    /// another time. A conflict also drops the day's cached slots.
    pub fn submission_finished(&mut self, id: u64, result: ApiResult<Appointment>) -> Applied {
        if self.submission.in_flight != Some(id) {
            warn!(submission = id, "Discarding stale submission response");
            return Applied::Stale;
        }
        self.submission.in_flight = None;

        match result {
            Ok(appointment) => {
                info!(
                    appointment = %appointment.id,
                    datetime = %appointment.datetime,
                    reschedule = self.mode.is_reschedule(),
                    "Appointment confirmed"
                );
                self.submission.appointment = Some(appointment);
                Applied::Stored
            }
            Err(error) => {
                warn!(error = %error, "Submission failed");
                if error.code() == ApiErrorCode::Conflict
                    && let Some(key) = self.times_key()
                {
                    self.cache.invalidate_times(&key);
                }
                self.submission.error = Some(error);
                Applied::Failed
            }
        }
    }
}
