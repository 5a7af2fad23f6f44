//! Booking and rescheduling.
//!
//! Both commands walk the same steps a patient would: provider, type, date,
//! time, then submit. Validation happens in the session before anything is
//! sent, so a missing phone number never reaches the server.

use std::sync::Arc;

use carebook_api::SchedulingApi;
use carebook_core::{Appointment, CurrentUser, DoctorQuery, RescheduleTarget};
use carebook_session::{BookingSession, SessionConfig};
use chrono::NaiveDate;
use tracing::info;

use crate::cli::{ProviderArgs, SlotArgs};
use crate::error::{ClientError, ClientResult};

/// Picks the slot, applies the extra fields and submits.
async fn commit(
    session: &mut BookingSession,
    slot: &SlotArgs,
    phone: Option<&str>,
) -> ClientResult<Appointment> {
    super::open_day(session, slot.date).await?;
    session.choose_time(&slot.time)?;
    if let Some(ref notes) = slot.notes {
        session.set_notes(notes)?;
    }
    if let Some(phone) = phone {
        session.set_phone(phone)?;
    }

    let result = session.submit().await;
    session.close();
    Ok(result?)
}

/// Books a new appointment.
pub async fn book(
    api: Arc<dyn SchedulingApi>,
    user: CurrentUser,
    target: &ProviderArgs,
    slot: &SlotArgs,
    phone: Option<&str>,
    config: &SessionConfig,
) -> ClientResult<Appointment> {
    let mut session = BookingSession::book(api, user, config);
    super::select_target(&mut session, target).await?;
    let appointment = commit(&mut session, slot, phone).await?;
    info!(id = %appointment.id, datetime = %appointment.datetime, "Appointment booked");
    Ok(appointment)
}

/// Moves `appointment_id` to a new slot.
///
/// The provider and type are preselected from the arguments, loading more
/// provider pages until the provider shows up.
pub async fn reschedule(
    api: Arc<dyn SchedulingApi>,
    user: CurrentUser,
    appointment_id: &str,
    target: &ProviderArgs,
    current_date: Option<NaiveDate>,
    slot: &SlotArgs,
    config: &SessionConfig,
) -> ClientResult<Appointment> {
    let mut reschedule =
        RescheduleTarget::new(appointment_id, &target.doctor, &target.appointment_type);
    if let Some(date) = current_date {
        reschedule = reschedule.with_date(date);
    }

    let mut session = BookingSession::reschedule(api, reschedule, user, config);
    session.load_providers(DoctorQuery::new()).await?;
    while session.flow().selection().appointment_type().is_none() {
        if !session.load_more_providers().await? {
            return Err(ClientError::NotFound(format!("provider '{}'", target.doctor)));
        }
    }

    let appointment = commit(&mut session, slot, None).await?;
    info!(id = %appointment.id, datetime = %appointment.datetime, "Appointment rescheduled");
    Ok(appointment)
}

fn describe(verb: &str, appointment: &Appointment) -> String {
    let mut line = format!("{} appointment {} for {}", verb, appointment.id, appointment.datetime);
    if let Some(ref status) = appointment.status {
        line.push_str(&format!(" ({})", status));
    }
    line
}

/// `carebook book`
pub async fn run_book(
    api: Arc<dyn SchedulingApi>,
    user: CurrentUser,
    target: &ProviderArgs,
    slot: &SlotArgs,
    phone: Option<&str>,
    config: &SessionConfig,
    json: bool,
) -> ClientResult<()> {
    let appointment = book(api, user, target, slot, phone, config).await?;
    if json {
        return super::print_json(&appointment);
    }
    println!("{}", describe("Booked", &appointment));
    Ok(())
}

/// `carebook reschedule`
#[allow(clippy::too_many_arguments)]
pub async fn run_reschedule(
    api: Arc<dyn SchedulingApi>,
    user: CurrentUser,
    appointment_id: &str,
    target: &ProviderArgs,
    current_date: Option<NaiveDate>,
    slot: &SlotArgs,
    config: &SessionConfig,
    json: bool,
) -> ClientResult<()> {
    let appointment =
        reschedule(api, user, appointment_id, target, current_date, slot, config).await?;
    if json {
        return super::print_json(&appointment);
    }
    println!("{}", describe("Rescheduled", &appointment));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use carebook_api::{ApiError, ApiErrorCode, MemoryApi, Operation};
    use carebook_core::{AppointmentCategory, AppointmentType, Provider, TimeSlot, YearMonth};
    use carebook_session::{SessionError, ValidationError};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn user() -> CurrentUser {
        CurrentUser::new("ada@example.com", "Ada Lovelace")
    }

    fn config() -> SessionConfig {
        SessionConfig::new().with_today(date(3, 5))
    }

    fn api() -> Arc<MemoryApi> {
        Arc::new(
            MemoryApi::new()
                .with_doctor(Provider::new("1", "Dr. Bailey").with_calendar_id("cal_0"))
                .with_doctor(
                    Provider::new("7", "Dr. Grey")
                        .with_calendar_id("cal_1")
                        .with_timezone("America/New_York")
                        .with_appointment_type(AppointmentType::new(
                            "3",
                            "Checkup",
                            AppointmentCategory::InPerson,
                        ))
                        .with_appointment_type(AppointmentType::new(
                            "5",
                            "Call",
                            AppointmentCategory::Phone,
                        )),
                )
                .with_page_size(1)
                .with_user(user())
                .with_dates("cal_1", "3", YearMonth::new(2024, 3).unwrap(), vec![date(3, 10)])
                .with_dates("cal_1", "5", YearMonth::new(2024, 3).unwrap(), vec![date(3, 10)])
                .with_dates("cal_1", "3", YearMonth::new(2024, 4).unwrap(), vec![date(4, 2)])
                .with_times(
                    "cal_1",
                    date(3, 10),
                    "3",
                    vec![TimeSlot::new("9:30 AM").with_raw_time("09:30")],
                )
                .with_times(
                    "cal_1",
                    date(3, 10),
                    "5",
                    vec![TimeSlot::new("2:30 PM").with_raw_time("14:30")],
                )
                .with_times(
                    "cal_1",
                    date(4, 2),
                    "3",
                    vec![TimeSlot::new("10:00 AM").with_iso_time("2024-04-02T10:00:00-04:00")],
                ),
        )
    }

    fn target(type_id: &str) -> ProviderArgs {
        ProviderArgs {
            doctor: "7".to_string(),
            appointment_type: type_id.to_string(),
        }
    }

    fn slot(date: NaiveDate, time: &str) -> SlotArgs {
        SlotArgs {
            date,
            time: time.to_string(),
            notes: None,
        }
    }

    mod booking {
        use super::*;

        #[tokio::test]
        async fn books_on_a_later_page() {
            let api = api();
            let mut slot = slot(date(3, 10), "9:30 AM");
            slot.notes = Some("  knee pain ".to_string());

            let appointment = book(api.clone(), user(), &target("3"), &slot, None, &config())
                .await
                .unwrap();
            assert_eq!(appointment.datetime, "2024-03-10T09:30:00");
            assert_eq!(
                describe("Booked", &appointment),
                "Booked appointment appt-1 for 2024-03-10T09:30:00 (booked)"
            );

            let bookings = api.bookings();
            assert_eq!(bookings.len(), 1);
            assert_eq!(bookings[0].first_name, "Ada");
            assert_eq!(bookings[0].last_name, "Lovelace");
            assert_eq!(bookings[0].notes.as_deref(), Some("knee pain"));
            assert_eq!(api.calls(Operation::ListDoctors), 2);
        }

        #[tokio::test]
        async fn phone_type_needs_a_number() {
            let api = api();
            let err = book(
                api.clone(),
                user(),
                &target("5"),
                &slot(date(3, 10), "2:30 PM"),
                None,
                &config(),
            )
            .await
            .unwrap_err();

            assert!(matches!(
                err,
                ClientError::Session(SessionError::Validation(ValidationError::PhoneRequired))
            ));
            assert_eq!(api.calls(Operation::CreateAppointment), 0);
        }

        #[tokio::test]
        async fn phone_is_sent_for_phone_type() {
            let api = api();
            book(
                api.clone(),
                user(),
                &target("5"),
                &slot(date(3, 10), "14:30"),
                Some("555-0100"),
                &config(),
            )
            .await
            .unwrap();
            assert_eq!(api.bookings()[0].phone.as_deref(), Some("555-0100"));
        }

        #[tokio::test]
        async fn unknown_time_is_rejected() {
            let err = book(
                api(),
                user(),
                &target("3"),
                &slot(date(3, 10), "11:00 AM"),
                None,
                &config(),
            )
            .await
            .unwrap_err();
            assert!(err.to_string().contains("11:00 AM"));
        }

        #[tokio::test]
        async fn conflict_is_reported() {
            let api = api();
            api.fail_next(Operation::CreateAppointment, ApiError::conflict("taken"));
            let err = book(
                api,
                user(),
                &target("3"),
                &slot(date(3, 10), "9:30 AM"),
                None,
                &config(),
            )
            .await
            .unwrap_err();
            match err {
                ClientError::Session(SessionError::Api(e)) => {
                    assert_eq!(e.code(), ApiErrorCode::Conflict)
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }
    }

    mod rescheduling {
        use super::*;

        #[tokio::test]
        async fn moves_to_new_slot() {
            let api = api();
            let appointment = reschedule(
                api.clone(),
                user(),
                "99",
                &target("3"),
                Some(date(4, 1)),
                &slot(date(4, 2), "10:00 AM"),
                &config(),
            )
            .await
            .unwrap();

            assert_eq!(appointment.id, "99");
            let requests = api.reschedules();
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].appointment_id, "99");
            assert_eq!(requests[0].appointment_date, "2024-04-02T10:00:00-04:00");
            assert!(api.bookings().is_empty());
        }

        #[tokio::test]
        async fn can_move_to_an_earlier_month() {
            let api = api();
            reschedule(
                api.clone(),
                user(),
                "99",
                &target("3"),
                Some(date(4, 1)),
                &slot(date(3, 10), "9:30 AM"),
                &config(),
            )
            .await
            .unwrap();
            assert_eq!(api.reschedules()[0].appointment_date, "2024-03-10T09:30:00");
        }

        #[tokio::test]
        async fn unknown_provider_fails() {
            let target = ProviderArgs {
                doctor: "404".to_string(),
                appointment_type: "3".to_string(),
            };
            let err = reschedule(
                api(),
                user(),
                "99",
                &target,
                None,
                &slot(date(3, 10), "9:30 AM"),
                &config(),
            )
            .await
            .unwrap_err();
            assert!(matches!(
                err,
                ClientError::Session(SessionError::UnknownProvider { .. })
            ));
        }
    }
}
