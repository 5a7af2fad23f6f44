//! HTTP implementation of [`SchedulingApi`].
//!
//! Talks JSON to the scheduling backend with a bearer token. Response bodies
//! are decoded through the [`crate::wire`] shapes so every accepted variant
//! is normalized here, once.

use carebook_core::{
    Appointment, BookingRequest, CurrentUser, DoctorPage, DoctorQuery, RescheduleRequest,
    TimeSlot, YearMonth, time::date_key,
};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::api::{BoxFuture, SchedulingApi};
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiErrorCode, ApiResult};
use crate::wire::{WireAppointmentEnvelope, WireDates, WireDoctorPage, WireTimes, WireUser};

/// Scheduling API client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSchedulingApi {
    http_client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpSchedulingApi {
    /// Creates a client from a validated configuration.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let base_url = config.validate()?;
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ApiError::configuration(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            http_client,
            base_url,
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::internal(format!("invalid endpoint '{}': {}", path, e)))
    }

    fn calendar_endpoint(&self, calendar_id: &str, leaf: &str) -> ApiResult<Url> {
        self.endpoint(&format!(
            "calendars/{}/{}",
            urlencoding::encode(calendar_id),
            leaf
        ))
    }

    /// Sends a request and decodes a JSON body of type `T`.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> ApiResult<T> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!("{}: request timeout", what)
            } else if e.is_connect() {
                format!("{}: connection failed: {}", what, e)
            } else {
                format!("{}: request failed: {}", what, e)
            };
            ApiError::network(message).with_source(e)
        })?;

        let status = response.status();
        if let Some(code) = ApiErrorCode::from_status(status.as_u16()) {
            let body = response.text().await.unwrap_or_default();
            let detail = error_detail(&body).unwrap_or_else(|| status.to_string());
            warn!(status = status.as_u16(), code = %code, request = what, "Scheduling API error");
            return Err(ApiError::new(code, format!("{}: {}", what, detail)));
        }

        let body = response.text().await.map_err(|e| {
            ApiError::network(format!("{}: failed to read response: {}", what, e)).with_source(e)
        })?;

        serde_json::from_str(&body).map_err(|e| {
            ApiError::invalid_response(format!("{}: failed to parse response: {}", what, e))
                .with_source(e)
        })
    }
}

/// Pulls a human-readable message out of an error body, if it has one.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error", "detail"]
        .iter()
        .find_map(|field| value.get(*field)?.as_str())
        .map(str::to_string)
}

impl SchedulingApi for HttpSchedulingApi {
    fn name(&self) -> &str {
        "http"
    }

    fn list_doctors(&self, query: DoctorQuery) -> BoxFuture<'_, ApiResult<DoctorPage>> {
        Box::pin(async move {
            let mut params: Vec<(&str, String)> = Vec::new();
            if let Some(search) = query.search.filter(|s| !s.trim().is_empty()) {
                params.push(("search", search));
            }
            if let Some(location) = query.location.filter(|s| !s.trim().is_empty()) {
                params.push(("location", location));
            }
            if let Some(token) = query.page_token {
                params.push(("page_token", token));
            }

            let url = self.endpoint("doctors")?;
            let page: WireDoctorPage = self
                .send(self.http_client.get(url).query(&params), "list doctors")
                .await?;
            let page = page.into_model();
            debug!(count = page.doctors.len(), has_more = page.has_more, "Fetched doctors");
            Ok(page)
        })
    }

    fn available_dates<'a>(
        &'a self,
        calendar_id: &'a str,
        appointment_type_id: &'a str,
        month: YearMonth,
    ) -> BoxFuture<'a, ApiResult<Vec<NaiveDate>>> {
        Box::pin(async move {
            let url = self.calendar_endpoint(calendar_id, "available-dates")?;
            let request = self.http_client.get(url).query(&[
                ("month", month.to_string()),
                ("appointment_type_id", appointment_type_id.to_string()),
            ]);
            let dates: WireDates = self.send(request, "available dates").await?;
            let dates = dates.into_dates();
            debug!(calendar = calendar_id, month = %month, count = dates.len(), "Fetched available dates");
            Ok(dates)
        })
    }

    fn available_times<'a>(
        &'a self,
        calendar_id: &'a str,
        date: NaiveDate,
        appointment_type_id: &'a str,
    ) -> BoxFuture<'a, ApiResult<Vec<TimeSlot>>> {
        Box::pin(async move {
            let url = self.calendar_endpoint(calendar_id, "available-times")?;
            let request = self.http_client.get(url).query(&[
                ("date", date_key(date)),
                ("appointment_type_id", appointment_type_id.to_string()),
            ]);
            let times: WireTimes = self.send(request, "available times").await?;
            let slots = times.into_slots();
            debug!(calendar = calendar_id, date = %date, count = slots.len(), "Fetched available times");
            Ok(slots)
        })
    }

    fn create_appointment(&self, request: BookingRequest) -> BoxFuture<'_, ApiResult<Appointment>> {
        Box::pin(async move {
            let url = self.endpoint("appointments")?;
            let appointment: WireAppointmentEnvelope = self
                .send(self.http_client.post(url).json(&request), "create appointment")
                .await?;
            Ok(appointment.into_model())
        })
    }

    fn reschedule_appointment(
        &self,
        request: RescheduleRequest,
    ) -> BoxFuture<'_, ApiResult<Appointment>> {
        Box::pin(async move {
            let url = self.endpoint(&format!(
                "appointments/{}/reschedule",
                urlencoding::encode(&request.appointment_id)
            ))?;
            let appointment: WireAppointmentEnvelope = self
                .send(self.http_client.patch(url).json(&request), "reschedule appointment")
                .await?;
            Ok(appointment.into_model())
        })
    }

    fn current_user(&self) -> BoxFuture<'_, ApiResult<CurrentUser>> {
        Box::pin(async move {
            let url = self.endpoint("me")?;
            let user: WireUser = self.send(self.http_client.get(url), "current user").await?;
            Ok(user.into_model())
        })
    }
}
