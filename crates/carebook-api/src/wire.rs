//! Wire payloads from the scheduling API.
//!
//! The backend has grown several response shapes over time: ids arrive as
//! strings or numbers, field names in snake_case or camelCase, date lists
//! as bare strings or `{date}` objects, optionally wrapped in an envelope.
//! These types accept all of them and convert into the canonical
//! [`carebook_core`] model; nothing past this module sees the variation.

use carebook_core::normalize::normalize_dates;
use carebook_core::{
    Appointment, AppointmentCategory, AppointmentType, CurrentUser, DateLike, DoctorPage, Provider,
    TimeSlot,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// An identifier sent as either a string or a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Text(String),
    Number(i64),
}

impl WireId {
    pub fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

/// A price sent as a number or a decimal string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WirePrice {
    Number(f64),
    Text(String),
}

impl WirePrice {
    fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().trim_start_matches('$').parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireAppointmentType {
    pub id: WireId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "type")]
    pub category: Option<String>,
    #[serde(default, alias = "duration_minutes", alias = "durationMinutes")]
    pub duration: Option<u32>,
    #[serde(default)]
    pub price: Option<WirePrice>,
}

impl WireAppointmentType {
    pub fn into_model(self) -> AppointmentType {
        let id = self.id.into_string();
        let category = match self.category.as_deref().map(AppointmentCategory::parse) {
            Some(Some(category)) => category,
            other => {
                if let Some(None) = other {
                    warn!(appointment_type = %id, raw = ?self.category, "Unknown appointment category, assuming in-person");
                }
                AppointmentCategory::InPerson
            }
        };

        let mut appointment_type =
            AppointmentType::new(id.clone(), self.name.unwrap_or(id), category);
        if let Some(minutes) = self.duration {
            appointment_type = appointment_type.with_duration(minutes);
        }
        if let Some(price) = self.price.as_ref().and_then(WirePrice::to_f64) {
            appointment_type = appointment_type.with_price(price);
        }
        appointment_type
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireDoctor {
    pub id: WireId,
    #[serde(default, alias = "full_name", alias = "fullName")]
    pub name: Option<String>,
    #[serde(default, alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(default, alias = "lastName")]
    pub last_name: Option<String>,
    #[serde(
        default,
        alias = "acuity_calendar_id",
        alias = "acuityCalendarId",
        alias = "calendarId"
    )]
    pub calendar_id: Option<WireId>,
    #[serde(default, alias = "time_zone", alias = "timeZone")]
    pub timezone: Option<String>,
    #[serde(default, alias = "appointmentTypes")]
    pub appointment_types: Vec<WireAppointmentType>,
    #[serde(default)]
    pub address: Option<String>,
}

impl WireDoctor {
    pub fn into_model(self) -> Provider {
        let id = self.id.into_string();
        let name = match (self.name, self.first_name, self.last_name) {
            (Some(name), _, _) => name,
            (None, Some(first), Some(last)) => format!("{} {}", first, last),
            (None, Some(first), None) => first,
            (None, None, Some(last)) => last,
            (None, None, None) => id.clone(),
        };

        let mut provider = Provider::new(id, name);
        provider.calendar_id = self
            .calendar_id
            .map(WireId::into_string)
            .filter(|c| !c.trim().is_empty());
        provider.timezone = self.timezone.filter(|tz| !tz.trim().is_empty());
        provider.address = self.address;
        provider.appointment_types = self
            .appointment_types
            .into_iter()
            .map(WireAppointmentType::into_model)
            .collect();
        provider
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireDoctorPage {
    #[serde(default, alias = "data", alias = "providers")]
    pub doctors: Vec<WireDoctor>,
    #[serde(default, alias = "hasMore")]
    pub has_more: bool,
    #[serde(default, alias = "nextPageToken")]
    pub next_page_token: Option<String>,
}

impl WireDoctorPage {
    pub fn into_model(self) -> DoctorPage {
        DoctorPage {
            doctors: self.doctors.into_iter().map(WireDoctor::into_model).collect(),
            has_more: self.has_more || self.next_page_token.is_some(),
            next_page_token: self.next_page_token,
        }
    }
}

/// Available dates, bare or wrapped.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireDates {
    Bare(Vec<Value>),
    Wrapped {
        #[serde(alias = "available_dates", alias = "availableDates")]
        dates: Vec<Value>,
    },
}

impl WireDates {
    /// Canonical dates, sorted, with unparseable entries dropped.
    pub fn into_dates(self) -> Vec<NaiveDate> {
        let values = match self {
            Self::Bare(values) | Self::Wrapped { dates: values } => values,
        };
        normalize_dates(values.into_iter().map(date_like))
    }
}

fn date_like(value: Value) -> DateLike {
    match value {
        Value::String(text) => DateLike::Text(text),
        Value::Object(mut map) => DateLike::Object {
            date: match map.remove("date") {
                Some(Value::String(date)) => Some(date),
                _ => None,
            },
        },
        other => DateLike::Text(other.to_string()),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireTimeSlot {
    #[serde(default, alias = "label", alias = "display_time")]
    pub time: Option<String>,
    #[serde(default, alias = "isoTime", alias = "datetime")]
    pub iso_time: Option<String>,
    #[serde(default, alias = "rawTime")]
    pub raw_time: Option<String>,
}

/// One slot entry: either an object or a bare time string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireTimeEntry {
    Text(String),
    Slot(WireTimeSlot),
}

impl WireTimeEntry {
    pub fn into_model(self) -> TimeSlot {
        match self {
            Self::Text(text) => TimeSlot::new(text.clone()).with_raw_time(text),
            Self::Slot(slot) => TimeSlot {
                time: slot.time.unwrap_or_default(),
                iso_time: slot.iso_time,
                raw_time: slot.raw_time,
            },
        }
    }
}

/// Available times, bare or wrapped.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireTimes {
    Bare(Vec<WireTimeEntry>),
    Wrapped {
        #[serde(alias = "slots", alias = "available_times", alias = "availableTimes")]
        times: Vec<WireTimeEntry>,
    },
}

impl WireTimes {
    pub fn into_slots(self) -> Vec<TimeSlot> {
        let entries = match self {
            Self::Bare(entries) | Self::Wrapped { times: entries } => entries,
        };
        entries.into_iter().map(WireTimeEntry::into_model).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireAppointment {
    pub id: WireId,
    #[serde(default, alias = "doctor_id", alias = "doctorId", alias = "providerId")]
    pub provider_id: Option<WireId>,
    #[serde(default, alias = "appointmentTypeId")]
    pub appointment_type_id: Option<WireId>,
    #[serde(alias = "appointment_date", alias = "appointmentDate", alias = "date")]
    pub datetime: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl WireAppointment {
    pub fn into_model(self) -> Appointment {
        Appointment {
            id: self.id.into_string(),
            provider_id: self.provider_id.map(WireId::into_string),
            appointment_type_id: self.appointment_type_id.map(WireId::into_string),
            datetime: self.datetime,
            status: self.status,
            notes: self.notes,
        }
    }
}

/// A booking response, bare or wrapped in `{"appointment": ...}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireAppointmentEnvelope {
    Wrapped { appointment: WireAppointment },
    Bare(WireAppointment),
}

impl WireAppointmentEnvelope {
    pub fn into_model(self) -> Appointment {
        match self {
            Self::Wrapped { appointment } | Self::Bare(appointment) => appointment.into_model(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireUser {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "fullName", alias = "name")]
    pub full_name: Option<String>,
}

impl WireUser {
    pub fn into_model(self) -> CurrentUser {
        CurrentUser {
            email: self.email,
            full_name: self.full_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    mod dates {
        use super::*;

        #[test]
        fn string_array() {
            let wire: WireDates = serde_json::from_value(json!(["2024-03-15", "2024-03-10"])).unwrap();
            assert_eq!(wire.into_dates(), vec![date(2024, 3, 10), date(2024, 3, 15)]);
        }

        #[test]
        fn object_array() {
            let wire: WireDates = serde_json::from_value(json!([
                {"date": "2024-03-10"},
                {"date": "2024-03-15T00:00:00-0800"},
                {"day": "2024-03-20"}
            ]))
            .unwrap();
            assert_eq!(wire.into_dates(), vec![date(2024, 3, 10), date(2024, 3, 15)]);
        }

        #[test]
        fn wrapped_and_mixed() {
            let wire: WireDates = serde_json::from_value(json!({
                "available_dates": ["2024-03-10", {"date": "2024-03-11"}, 42, null]
            }))
            .unwrap();
            assert_eq!(wire.into_dates(), vec![date(2024, 3, 10), date(2024, 3, 11)]);
        }
    }

    mod times {
        use super::*;

        #[test]
        fn objects_with_camel_case() {
            let wire: WireTimes = serde_json::from_value(json!([
                {"time": "2:30 PM", "isoTime": "2024-03-05T14:30:00-05:00"},
                {"time": "3:00 PM", "rawTime": "15:00"}
            ]))
            .unwrap();
            let slots = wire.into_slots();
            assert_eq!(slots.len(), 2);
            assert_eq!(slots[0].iso_time.as_deref(), Some("2024-03-05T14:30:00-05:00"));
            assert_eq!(slots[1].raw_time.as_deref(), Some("15:00"));
        }

        #[test]
        fn bare_strings() {
            let wire: WireTimes = serde_json::from_value(json!({"slots": ["09:00", "09:30"]})).unwrap();
            let slots = wire.into_slots();
            assert_eq!(slots[0], TimeSlot::new("09:00").with_raw_time("09:00"));
            assert_eq!(slots[1].label(), "09:30");
        }
    }

    mod doctors {
        use super::*;

        #[test]
        fn numeric_ids_and_aliases() {
            let wire: WireDoctorPage = serde_json::from_value(json!({
                "data": [{
                    "id": 7,
                    "first_name": "Meredith",
                    "last_name": "Grey",
                    "acuityCalendarId": 1001,
                    "timeZone": "America/New_York",
                    "appointmentTypes": [
                        {"id": 3, "name": "Checkup", "category": "in-person", "duration": 30, "price": "120.00"},
                        {"id": "5", "name": "Call", "type": "PHONE", "durationMinutes": 15}
                    ]
                }],
                "hasMore": true
            }))
            .unwrap();

            let page = wire.into_model();
            assert!(page.has_more);
            let doctor = &page.doctors[0];
            assert_eq!(doctor.id, "7");
            assert_eq!(doctor.name, "Meredith Grey");
            assert_eq!(doctor.calendar_id.as_deref(), Some("1001"));
            assert_eq!(doctor.timezone.as_deref(), Some("America/New_York"));
            assert_eq!(doctor.appointment_types[0].price, Some(120.0));
            assert_eq!(doctor.appointment_types[1].category, AppointmentCategory::Phone);
            assert_eq!(doctor.appointment_types[1].duration_minutes, 15);
        }

        #[test]
        fn unknown_category_defaults_to_in_person() {
            let wire: WireAppointmentType =
                serde_json::from_value(json!({"id": "1", "category": "hologram"})).unwrap();
            let model = wire.into_model();
            assert_eq!(model.category, AppointmentCategory::InPerson);
            assert_eq!(model.name, "1");
        }

        #[test]
        fn blank_calendar_id_is_absent() {
            let wire: WireDoctor =
                serde_json::from_value(json!({"id": "1", "name": "Dr. X", "calendar_id": " "})).unwrap();
            assert!(wire.into_model().calendar_id.is_none());
        }

        #[test]
        fn next_page_token_implies_more() {
            let wire: WireDoctorPage =
                serde_json::from_value(json!({"doctors": [], "nextPageToken": "p2"})).unwrap();
            let page = wire.into_model();
            assert!(page.has_more);
            assert_eq!(page.next_page_token.as_deref(), Some("p2"));
        }
    }

    #[test]
    fn appointment_aliases() {
        let wire: WireAppointment = serde_json::from_value(json!({
            "id": 99,
            "doctor_id": 7,
            "appointment_date": "2024-04-02T10:00:00",
            "status": "scheduled"
        }))
        .unwrap();
        let appointment = wire.into_model();
        assert_eq!(appointment.id, "99");
        assert_eq!(appointment.provider_id.as_deref(), Some("7"));
        assert_eq!(appointment.datetime, "2024-04-02T10:00:00");
    }

    #[test]
    fn wrapped_appointment() {
        let wire: WireAppointmentEnvelope = serde_json::from_value(json!({
            "appointment": {"id": "a1", "datetime": "2024-03-10T09:30:00"}
        }))
        .unwrap();
        assert_eq!(wire.into_model().id, "a1");
    }

    #[test]
    fn user_aliases() {
        let wire: WireUser =
            serde_json::from_value(json!({"email": "ada@example.com", "fullName": "Ada Lovelace"})).unwrap();
        let user = wire.into_model();
        assert_eq!(user.last_name(), Some("Lovelace".to_string()));
    }

    mod snapshots {
        use super::*;

        #[test]
        fn camel_case_doctor() {
            let wire: WireDoctor = serde_json::from_value(json!({
                "id": 12,
                "firstName": "Meredith",
                "lastName": "Grey",
                "acuityCalendarId": 4411,
                "timeZone": "America/Los_Angeles",
                "appointmentTypes": [
                    {"id": 3, "name": "Video visit", "type": "video", "durationMinutes": 20, "price": "$75.00"}
                ]
            }))
            .unwrap();

            insta::assert_json_snapshot!(wire.into_model(), @r#"
{
  "id": "12",
  "name": "Meredith Grey",
  "calendar_id": "4411",
  "timezone": "America/Los_Angeles",
  "appointment_types": [
    {
      "id": "3",
      "name": "Video visit",
      "category": "virtual",
      "duration_minutes": 20,
      "price": 75.0
    }
  ],
  "address": null
}
"#);
        }
    }
}
