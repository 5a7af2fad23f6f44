//! Subcommand implementations.
//!
//! Every command that talks to the scheduling API drives a
//! [`BookingSession`], the same state machine a booking screen would use,
//! so the CLI gets its validation and cache behavior for free.

pub mod book;
pub mod calendar;
pub mod config;
pub mod doctors;
pub mod times;

use std::sync::Arc;

use carebook_api::{HttpSchedulingApi, SchedulingApi};
use carebook_core::{DoctorQuery, YearMonth};
use carebook_session::BookingSession;
use chrono::NaiveDate;
use tracing::debug;

use crate::cli::ProviderArgs;
use crate::config::{ClientConfig, Overrides};
use crate::error::{ClientError, ClientResult};

/// Builds the HTTP client from the configuration.
pub fn connect(config: &ClientConfig, overrides: &Overrides) -> ClientResult<Arc<dyn SchedulingApi>> {
    let api_config = config.to_api_config(overrides).map_err(ClientError::Config)?;
    let api = HttpSchedulingApi::new(&api_config)?;
    Ok(Arc::new(api))
}

/// Loads providers page by page until `provider_id` is among them.
pub(crate) async fn find_provider(
    session: &mut BookingSession,
    provider_id: &str,
) -> ClientResult<()> {
    session.load_providers(DoctorQuery::new()).await?;
    while !session.flow().providers().iter().any(|p| p.id == provider_id) {
        if !session.load_more_providers().await? {
            return Err(ClientError::NotFound(format!("provider '{}'", provider_id)));
        }
    }
    Ok(())
}

/// Selects the provider and appointment type named on the command line.
pub(crate) async fn select_target(
    session: &mut BookingSession,
    target: &ProviderArgs,
) -> ClientResult<()> {
    find_provider(session, &target.doctor).await?;
    session.choose_provider(&target.doctor)?;
    session.choose_type(&target.appointment_type)?;
    Ok(())
}

/// Pages the calendar to `month` and waits for its availability.
///
/// The calendar cannot show months before the current one; asking for one
/// stops on the current month.
pub(crate) async fn show_month(session: &mut BookingSession, month: YearMonth) -> ClientResult<()> {
    while session.flow().displayed_month() < month {
        session.show_next_month()?;
    }
    while session.flow().displayed_month() > month && session.flow().calendar().can_go_previous() {
        session.show_previous_month()?;
    }
    session.settle().await?;
    debug!(month = %session.flow().displayed_month(), "Calendar ready");

    if let Some(error) = session.flow().cache().dates_error() {
        return Err(error.clone().into());
    }
    Ok(())
}

/// Picks `date` and waits for its slots.
pub(crate) async fn open_day(session: &mut BookingSession, date: NaiveDate) -> ClientResult<()> {
    show_month(session, YearMonth::of(date)).await?;
    session.choose_date(date)?;
    session.settle().await?;

    if let Some(error) = session.flow().cache().times_error() {
        return Err(error.clone().into());
    }
    Ok(())
}

/// Prints `value` as pretty JSON.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> ClientResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ClientError::Config(format!("failed to serialize output: {}", e)))?;
    println!("{}", json);
    Ok(())
}
