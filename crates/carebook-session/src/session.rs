//! Async driver for a [`BookingFlow`].
//!
//! [`BookingSession`] runs the flow's effects on tokio tasks against a
//! [`SchedulingApi`] and applies their results as they come back. Results
//! are posted to the session over an mpsc channel and applied by
//! [`BookingSession::pump`] or [`BookingSession::settle`]; the flow decides
//! whether each one still matches the current selection.
//!
//! Closing (or dropping) the session aborts outstanding tasks and closes
//! the channel, so nothing that arrives later can touch its state.

use std::sync::Arc;

use carebook_api::{ApiError, ApiResult, SchedulingApi};
use carebook_core::{Appointment, CurrentUser, DoctorQuery, RescheduleTarget, TimeSlot};
use chrono::NaiveDate;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{Applied, DatesKey, FetchTicket, TimesKey};
use crate::commit::{BookingMode, CommitRequest};
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::flow::{BookingFlow, Effect};

/// Capacity of the result channel.
const EVENT_CHANNEL_SIZE: usize = 32;

/// A completed network call, on its way back to the session.
#[derive(Debug)]
enum Event {
    Dates {
        ticket: FetchTicket<DatesKey>,
        result: ApiResult<Vec<NaiveDate>>,
    },
    Times {
        ticket: FetchTicket<TimesKey>,
        result: ApiResult<Vec<TimeSlot>>,
    },
    Submitted {
        id: u64,
        result: ApiResult<Appointment>,
    },
}

/// One booking or reschedule screen, from provider list to confirmation.
pub struct BookingSession {
    api: Arc<dyn SchedulingApi>,
    flow: BookingFlow,
    query: DoctorQuery,
    event_tx: mpsc::Sender<Event>,
    event_rx: mpsc::Receiver<Event>,
    tasks: Vec<JoinHandle<()>>,
    pending: usize,
    closed: bool,
}

impl BookingSession {
    pub fn new(api: Arc<dyn SchedulingApi>, flow: BookingFlow) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        debug!(api = api.name(), reschedule = flow.mode().is_reschedule(), "Opening booking session");
        Self {
            api,
            flow,
            query: DoctorQuery::default(),
            event_tx,
            event_rx,
            tasks: Vec::new(),
            pending: 0,
            closed: false,
        }
    }

    /// Opens a session for a new booking.
    pub fn book(api: Arc<dyn SchedulingApi>, user: CurrentUser, config: &SessionConfig) -> Self {
        Self::new(api, BookingFlow::book(user, config))
    }

    /// Opens a session that reschedules `target`.
    pub fn reschedule(
        api: Arc<dyn SchedulingApi>,
        target: RescheduleTarget,
        user: CurrentUser,
        config: &SessionConfig,
    ) -> Self {
        Self::new(api, BookingFlow::reschedule(target, user, config))
    }

    pub fn flow(&self) -> &BookingFlow {
        &self.flow
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of network calls whose results have not been applied yet.
    pub fn pending(&self) -> usize {
        self.pending
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    /// Loads the first page of providers matching `query`.
    pub async fn load_providers(&mut self, query: DoctorQuery) -> SessionResult<()> {
        self.ensure_open()?;
        self.pump();
        let page = self
            .api
            .list_doctors(DoctorQuery {
                page_token: None,
                ..query.clone()
            })
            .await?;
        self.query = query;
        let effects = self.flow.providers_loaded(page, false)?;
        self.execute(effects);
        Ok(())
    }

    /// Appends the next page of providers. Returns `false` when there was
    /// nothing more to load.
    pub async fn load_more_providers(&mut self) -> SessionResult<bool> {
        self.ensure_open()?;
        self.pump();
        if !self.flow.has_more_providers() {
            return Ok(false);
        }
        let query = DoctorQuery {
            page_token: self.flow.next_page_token().map(str::to_string),
            ..self.query.clone()
        };
        let page = self.api.list_doctors(query).await?;
        let effects = self.flow.providers_loaded(page, true)?;
        self.execute(effects);
        Ok(true)
    }

    /// Applies `step` to the flow and starts whatever it asks for.
    fn step<F>(&mut self, step: F) -> SessionResult<()>
    where
        F: FnOnce(&mut BookingFlow) -> SessionResult<Vec<Effect>>,
    {
        self.ensure_open()?;
        self.pump();
        let effects = step(&mut self.flow)?;
        self.execute(effects);
        Ok(())
    }

    pub fn choose_provider(&mut self, provider_id: &str) -> SessionResult<()> {
        self.step(|flow| flow.select_provider(provider_id))
    }

    pub fn choose_type(&mut self, appointment_type_id: &str) -> SessionResult<()> {
        self.step(|flow| flow.select_type(appointment_type_id))
    }

    pub fn choose_date(&mut self, date: NaiveDate) -> SessionResult<()> {
        self.step(|flow| flow.select_date(date))
    }

    pub fn choose_time(&mut self, time: &str) -> SessionResult<()> {
        self.step(|flow| flow.select_time(time).map(|()| Vec::new()))
    }

    pub fn set_notes(&mut self, notes: &str) -> SessionResult<()> {
        self.step(|flow| flow.set_notes(notes).map(|()| Vec::new()))
    }

    pub fn set_phone(&mut self, phone: &str) -> SessionResult<()> {
        self.step(|flow| flow.set_phone(phone).map(|()| Vec::new()))
    }

    pub fn show_next_month(&mut self) -> SessionResult<()> {
        self.step(BookingFlow::next_month)
    }

    pub fn show_previous_month(&mut self) -> SessionResult<()> {
        self.step(BookingFlow::previous_month)
    }

    pub fn retry_dates(&mut self) -> SessionResult<()> {
        self.step(BookingFlow::retry_dates)
    }

    pub fn retry_times(&mut self) -> SessionResult<()> {
        self.step(BookingFlow::retry_times)
    }

    /// Validates and sends the booking, then waits for the server.
    ///
    /// Validation failures return before anything is sent. On a server
    /// failure the selection is left as it was.
    pub async fn submit(&mut self) -> SessionResult<Appointment> {
        self.ensure_open()?;
        self.pump();
        let effect = self.flow.submit()?;
        self.execute(vec![effect]);

        while self.flow.is_submitting() {
            self.next_event().await?;
        }

        if let Some(error) = self.flow.submission_error() {
            return Err(error.clone().into());
        }
        self.flow
            .appointment()
            .cloned()
            .ok_or_else(|| ApiError::internal("submission finished without a result").into())
    }

    /// Applies results that have already arrived, without waiting.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.event_rx.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Waits until every outstanding call has been applied.
    pub async fn settle(&mut self) -> SessionResult<()> {
        self.ensure_open()?;
        while self.pending > 0 {
            self.next_event().await?;
        }
        Ok(())
    }

    async fn next_event(&mut self) -> SessionResult<Applied> {
        let event = self.event_rx.recv().await.ok_or(SessionError::Closed)?;
        self.pending = self.pending.saturating_sub(1);
        Ok(self.apply(event))
    }

    fn apply(&mut self, event: Event) -> Applied {
        match event {
            Event::Dates { ticket, result } => self.flow.dates_loaded(ticket, result),
            Event::Times { ticket, result } => self.flow.times_loaded(ticket, result),
            Event::Submitted { id, result } => self.flow.submission_finished(id, result),
        }
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            let api = Arc::clone(&self.api);
            let tx = self.event_tx.clone();
            let handle = match effect {
                Effect::FetchDates(ticket) => tokio::spawn(async move {
                    let key = ticket.key();
                    let result = api
                        .available_dates(&key.calendar_id, &key.appointment_type_id, key.month)
                        .await;
                    deliver(&tx, Event::Dates { ticket, result }).await;
                }),
                Effect::FetchTimes(ticket) => tokio::spawn(async move {
                    let key = ticket.key();
                    let result = api
                        .available_times(&key.calendar_id, key.date, &key.appointment_type_id)
                        .await;
                    deliver(&tx, Event::Times { ticket, result }).await;
                }),
                Effect::Submit(ticket) => {
                    let id = ticket.id();
                    let request = ticket.request().clone();
                    tokio::spawn(async move {
                        let result = match request {
                            CommitRequest::Book(request) => api.create_appointment(request).await,
                            CommitRequest::Reschedule(request) => {
                                api.reschedule_appointment(request).await
                            }
                        };
                        deliver(&tx, Event::Submitted { id, result }).await;
                    })
                }
            };
            self.tasks.retain(|task| !task.is_finished());
            self.tasks.push(handle);
            self.pending += 1;
        }
    }

    /// Ends the session. Outstanding calls are abandoned and any response
    /// that still arrives is ignored.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let abandoned = self.tasks.len();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.event_rx.close();
        while self.event_rx.try_recv().is_ok() {}
        self.pending = 0;
        info!(abandoned, mode = mode_name(self.flow.mode()), "Booking session closed");
    }
}

impl Drop for BookingSession {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn deliver(tx: &mpsc::Sender<Event>, event: Event) {
    if tx.send(event).await.is_err() {
        debug!("Session closed, dropping late response");
    }
}

fn mode_name(mode: &BookingMode) -> &'static str {
    if mode.is_reschedule() { "reschedule" } else { "book" }
}
