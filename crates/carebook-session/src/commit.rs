//! Turning a completed selection into a booking or reschedule request.

use carebook_core::{
    BookingRequest, CurrentUser, RescheduleRequest, RescheduleTarget, slot_datetime,
};
use tracing::debug;

use crate::error::ValidationError;
use crate::selection::Selection;

/// Whether the session books a new appointment or moves an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingMode {
    Book,
    Reschedule(RescheduleTarget),
}

impl BookingMode {
    pub fn is_reschedule(&self) -> bool {
        matches!(self, Self::Reschedule(_))
    }

    pub fn reschedule_target(&self) -> Option<&RescheduleTarget> {
        match self {
            Self::Book => None,
            Self::Reschedule(target) => Some(target),
        }
    }
}

/// The request to send, one per mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitRequest {
    Book(BookingRequest),
    Reschedule(RescheduleRequest),
}

impl CommitRequest {
    /// ISO datetime of the slot being committed.
    pub fn datetime(&self) -> &str {
        match self {
            Self::Book(request) => &request.datetime,
            Self::Reschedule(request) => &request.appointment_date,
        }
    }
}

/// Validates `selection` and builds the request for `mode`.
///
/// Checks run in a fixed order and the first failure is returned: provider,
/// appointment type, date, time, phone (phone appointments only), email,
/// last name. New bookings also need a provider calendar.
pub fn prepare(
    mode: &BookingMode,
    selection: &Selection,
    user: &CurrentUser,
) -> Result<CommitRequest, ValidationError> {
    let provider = selection.provider().ok_or(ValidationError::ProviderRequired)?;
    let appointment_type = selection
        .appointment_type()
        .ok_or(ValidationError::AppointmentTypeRequired)?;
    let date = selection.date().ok_or(ValidationError::DateRequired)?;
    let slot = selection.slot().ok_or(ValidationError::TimeRequired)?;

    let is_phone = appointment_type.category.requires_phone();
    let phone = selection.phone().trim();
    if is_phone && phone.is_empty() {
        return Err(ValidationError::PhoneRequired);
    }

    let email = user.email().ok_or(ValidationError::EmailMissing)?;
    let last_name = user.last_name().ok_or(ValidationError::LastNameMissing)?;

    let resolved = slot_datetime(slot, date);
    let approximate = resolved.is_fallback();
    let datetime = resolved.iso;
    let notes = non_blank(selection.notes());

    let request = match mode {
        BookingMode::Reschedule(target) => CommitRequest::Reschedule(RescheduleRequest {
            appointment_id: target.appointment_id.clone(),
            appointment_date: datetime,
            appointment_type_id: Some(appointment_type.id.clone()),
            notes,
        }),
        BookingMode::Book => {
            let calendar_id = provider
                .calendar_id
                .clone()
                .ok_or(ValidationError::CalendarMissing)?;
            CommitRequest::Book(BookingRequest {
                calendar_id,
                appointment_type_id: Some(appointment_type.id.clone()),
                datetime,
                first_name: user.first_name().unwrap_or_default().to_string(),
                last_name,
                email: email.to_string(),
                phone: is_phone.then(|| phone.to_string()),
                notes,
                timezone: provider.timezone.clone(),
            })
        }
    };

    debug!(
        provider = %provider.id,
        appointment_type = %appointment_type.id,
        datetime = request.datetime(),
        approximate,
        reschedule = mode.is_reschedule(),
        "Prepared commit request"
    );
    Ok(request)
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use carebook_core::{AppointmentCategory, AppointmentType, Provider, TimeSlot};
    use chrono::NaiveDate;

    fn user() -> CurrentUser {
        CurrentUser::new("ada@example.com", "Ada Lovelace")
    }

    fn provider() -> Provider {
        Provider::new("7", "Dr. Grey")
            .with_calendar_id("cal_1")
            .with_timezone("America/New_York")
            .with_appointment_type(AppointmentType::new("3", "Checkup", AppointmentCategory::InPerson))
            .with_appointment_type(AppointmentType::new("5", "Call", AppointmentCategory::Phone))
    }

    fn complete(type_id: &str) -> Selection {
        let provider = provider();
        let appointment_type = provider.appointment_type(type_id).cloned().unwrap();
        let mut selection = Selection::new();
        selection.set_provider(provider);
        selection.set_appointment_type(appointment_type);
        selection.set_date(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        selection.set_slot(TimeSlot::new("9:30 AM").with_raw_time("09:30"));
        selection
    }

    mod validation {
        use super::*;

        #[test]
        fn empty_selection_reports_provider_first() {
            let err = prepare(&BookingMode::Book, &Selection::new(), &CurrentUser::default())
                .unwrap_err();
            assert_eq!(err, ValidationError::ProviderRequired);
        }

        #[test]
        fn order_of_checks() {
            let mut selection = Selection::new();
            selection.set_provider(provider());
            assert_eq!(
                prepare(&BookingMode::Book, &selection, &user()).unwrap_err(),
                ValidationError::AppointmentTypeRequired
            );

            let mut selection = complete("3");
            selection.set_date(NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
            assert_eq!(
                prepare(&BookingMode::Book, &selection, &user()).unwrap_err(),
                ValidationError::TimeRequired
            );
        }

        #[test]
        fn phone_category_needs_phone() {
            let mut selection = complete("5");
            selection.set_phone("   ");
            assert_eq!(
                prepare(&BookingMode::Book, &selection, &user()).unwrap_err(),
                ValidationError::PhoneRequired
            );
        }

        #[test]
        fn phone_checked_before_user() {
            let selection = complete("5");
            assert_eq!(
                prepare(&BookingMode::Book, &selection, &CurrentUser::default()).unwrap_err(),
                ValidationError::PhoneRequired
            );
        }

        #[test]
        fn user_email_then_last_name() {
            let selection = complete("3");
            let no_email = CurrentUser {
                email: None,
                full_name: Some("Ada Lovelace".into()),
            };
            assert_eq!(
                prepare(&BookingMode::Book, &selection, &no_email).unwrap_err(),
                ValidationError::EmailMissing
            );

            let single_name = CurrentUser::new("cher@example.com", "Cher");
            assert_eq!(
                prepare(&BookingMode::Book, &selection, &single_name).unwrap_err(),
                ValidationError::LastNameMissing
            );
        }

        #[test]
        fn booking_needs_a_calendar() {
            let mut selection = complete("3");
            let mut provider = provider();
            provider.calendar_id = None;
            let appointment_type = provider.appointment_type("3").cloned().unwrap();
            selection.set_provider(provider);
            selection.set_appointment_type(appointment_type);
            selection.set_date(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
            selection.set_slot(TimeSlot::new("09:30"));

            assert_eq!(
                prepare(&BookingMode::Book, &selection, &user()).unwrap_err(),
                ValidationError::CalendarMissing
            );
        }
    }

    mod payload {
        use super::*;

        #[test]
        fn phone_booking_payload() {
            let mut selection = complete("5");
            selection.set_phone(" 555-0100 ");
            selection.set_notes("  Follow-up on labs ");

            let CommitRequest::Book(request) =
                prepare(&BookingMode::Book, &selection, &user()).unwrap()
            else {
                panic!("expected a booking");
            };

            insta::assert_json_snapshot!(request, @r#"
{
  "calendar_id": "cal_1",
  "appointment_type_id": "5",
  "datetime": "2024-03-10T09:30:00",
  "first_name": "Ada",
  "last_name": "Lovelace",
  "email": "ada@example.com",
  "phone": "555-0100",
  "notes": "Follow-up on labs",
  "timezone": "America/New_York"
}
"#);
        }

        #[test]
        fn in_person_booking_omits_phone_and_blank_notes() {
            let mut selection = complete("3");
            selection.set_phone("555-0100");
            selection.set_notes("   ");

            let CommitRequest::Book(request) =
                prepare(&BookingMode::Book, &selection, &user()).unwrap()
            else {
                panic!("expected a booking");
            };
            assert_eq!(request.phone, None);
            assert_eq!(request.notes, None);
        }

        #[test]
        fn reschedule_payload() {
            let target = RescheduleTarget::new("99", "7", "3")
                .with_date(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
            let mut selection = complete("3");
            selection.set_notes("bring x-rays");

            let request = prepare(&BookingMode::Reschedule(target), &selection, &user()).unwrap();
            assert_eq!(
                request,
                CommitRequest::Reschedule(RescheduleRequest {
                    appointment_id: "99".into(),
                    appointment_date: "2024-03-10T09:30:00".into(),
                    appointment_type_id: Some("3".into()),
                    notes: Some("bring x-rays".into()),
                })
            );
        }

        #[test]
        fn label_only_slot_books_midday() {
            let mut selection = complete("3");
            selection.set_slot(TimeSlot::new("Tue 9:30"));

            let request = prepare(&BookingMode::Book, &selection, &user()).unwrap();
            assert_eq!(request.datetime(), "2024-03-10T12:00:00");
        }

        #[test]
        fn canonical_iso_time_wins() {
            let mut selection = complete("3");
            selection.set_slot(TimeSlot::new("9:30 AM").with_iso_time("2024-03-10T09:30:00-05:00"));

            let request = prepare(&BookingMode::Book, &selection, &user()).unwrap();
            assert_eq!(request.datetime(), "2024-03-10T09:30:00-05:00");
        }
    }
}
