//! Appointment scheduling domain types.
//!
//! These are the canonical shapes used throughout carebook. Wire payloads
//! from the scheduling API are converted into these types at the API
//! boundary, so nothing downstream branches on payload shape.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How an appointment is conducted.
///
/// The category decides which extra fields a booking needs: `Phone`
/// appointments require a callback number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentCategory {
    InPerson,
    Virtual,
    Phone,
}

impl AppointmentCategory {
    /// Returns the wire name (`in-person`, `virtual`, `phone`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InPerson => "in-person",
            Self::Virtual => "virtual",
            Self::Phone => "phone",
        }
    }

    /// Returns `true` if bookings of this category need a phone number.
    pub fn requires_phone(&self) -> bool {
        matches!(self, Self::Phone)
    }

    /// Parses a category name leniently (case, `_`/space separators).
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "in-person" | "inperson" | "office" => Some(Self::InPerson),
            "virtual" | "video" | "telehealth" => Some(Self::Virtual),
            "phone" | "telephone" => Some(Self::Phone),
            _ => None,
        }
    }
}

impl fmt::Display for AppointmentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bookable service offered by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentType {
    pub id: String,
    pub name: String,
    pub category: AppointmentCategory,
    pub duration_minutes: u32,
    pub price: Option<f64>,
}

impl AppointmentType {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: AppointmentCategory,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            duration_minutes: 30,
            price: None,
        }
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = minutes;
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }
}

/// A bookable professional with a calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub name: String,
    /// Calendar identifier; availability cannot be queried without it.
    pub calendar_id: Option<String>,
    /// IANA timezone of the provider's calendar.
    pub timezone: Option<String>,
    pub appointment_types: Vec<AppointmentType>,
    pub address: Option<String>,
}

impl Provider {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            calendar_id: None,
            timezone: None,
            appointment_types: Vec::new(),
            address: None,
        }
    }

    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = Some(calendar_id.into());
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_appointment_type(mut self, appointment_type: AppointmentType) -> Self {
        self.appointment_types.push(appointment_type);
        self
    }

    /// Looks up one of this provider's appointment types by id.
    pub fn appointment_type(&self, id: &str) -> Option<&AppointmentType> {
        self.appointment_types.iter().find(|t| t.id == id)
    }
}

/// A discrete bookable time on a given date, as reported by the server.
///
/// Upstream sources disagree on shape: some send a canonical ISO instant,
/// some a raw `HH:MM`, some only a display label. See
/// [`crate::normalize::slot_datetime`] for how these are reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Display label (e.g. `2:30 PM` or `14:30`).
    #[serde(default)]
    pub time: String,
    /// Canonical ISO datetime, used verbatim when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso_time: Option<String>,
    /// Raw textual time as sent by the upstream calendar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_time: Option<String>,
}

impl TimeSlot {
    pub fn new(time: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            iso_time: None,
            raw_time: None,
        }
    }

    pub fn with_iso_time(mut self, iso: impl Into<String>) -> Self {
        self.iso_time = Some(iso.into());
        self
    }

    pub fn with_raw_time(mut self, raw: impl Into<String>) -> Self {
        self.raw_time = Some(raw.into());
        self
    }

    /// Label to show the user, falling back to the raw values.
    pub fn label(&self) -> &str {
        if !self.time.is_empty() {
            &self.time
        } else if let Some(raw) = self.raw_time.as_deref() {
            raw
        } else {
            self.iso_time.as_deref().unwrap_or_default()
        }
    }
}

/// An appointment as returned by the server after booking or rescheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_type_id: Option<String>,
    /// ISO datetime of the appointment.
    pub datetime: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Request body for booking a new appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub calendar_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_type_id: Option<String>,
    /// ISO datetime of the chosen slot.
    pub datetime: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Present only for phone appointments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Copied from the provider when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// Request body for moving an existing appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescheduleRequest {
    /// Not serialized: the id travels in the request path.
    #[serde(skip)]
    pub appointment_id: String,
    /// ISO datetime of the new slot.
    pub appointment_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_type_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// The signed-in patient, as far as booking is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CurrentUser {
    pub email: Option<String>,
    pub full_name: Option<String>,
}

impl CurrentUser {
    pub fn new(email: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            full_name: Some(full_name.into()),
        }
    }

    /// First whitespace-separated token of the full name.
    pub fn first_name(&self) -> Option<&str> {
        self.full_name
            .as_deref()
            .and_then(|name| name.split_whitespace().next())
    }

    /// Everything after the first token, joined by single spaces.
    ///
    /// Returns `None` for single-word names: the server requires both parts.
    pub fn last_name(&self) -> Option<String> {
        let name = self.full_name.as_deref()?;
        let rest: Vec<&str> = name.split_whitespace().skip(1).collect();
        if rest.is_empty() {
            None
        } else {
            Some(rest.join(" "))
        }
    }

    /// Email, if present and not blank.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

/// Filters for the provider directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoctorQuery {
    pub search: Option<String>,
    pub location: Option<String>,
    pub page_token: Option<String>,
}

impl DoctorQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_page_token(mut self, token: impl Into<String>) -> Self {
        self.page_token = Some(token.into());
        self
    }
}

/// One page of the provider directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoctorPage {
    pub doctors: Vec<Provider>,
    pub has_more: bool,
    /// Token to request the following page, when the server issues one.
    pub next_page_token: Option<String>,
}

/// Parameters of the reschedule entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RescheduleTarget {
    pub appointment_id: String,
    pub provider_id: String,
    pub appointment_type_id: String,
    /// Current date of the appointment; the calendar opens on its month.
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl RescheduleTarget {
    pub fn new(
        appointment_id: impl Into<String>,
        provider_id: impl Into<String>,
        appointment_type_id: impl Into<String>,
    ) -> Self {
        Self {
            appointment_id: appointment_id.into(),
            provider_id: provider_id.into(),
            appointment_type_id: appointment_type_id.into(),
            date: None,
            notes: None,
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
