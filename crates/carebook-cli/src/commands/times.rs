//! Free slots on one day.

use std::sync::Arc;

use carebook_api::SchedulingApi;
use carebook_core::{CurrentUser, TimeSlot};
use carebook_session::{BookingSession, SessionConfig};
use chrono::NaiveDate;

use crate::cli::ProviderArgs;
use crate::error::ClientResult;

/// Loads the slots offered on `date`.
pub async fn slots(
    api: Arc<dyn SchedulingApi>,
    user: CurrentUser,
    target: &ProviderArgs,
    date: NaiveDate,
    config: &SessionConfig,
) -> ClientResult<Vec<TimeSlot>> {
    let mut session = BookingSession::book(api, user, config);
    super::select_target(&mut session, target).await?;
    super::open_day(&mut session, date).await?;

    let slots = session.flow().available_times().unwrap_or_default().to_vec();
    session.close();
    Ok(slots)
}

/// `carebook times`
pub async fn run(
    api: Arc<dyn SchedulingApi>,
    user: CurrentUser,
    target: &ProviderArgs,
    date: NaiveDate,
    config: &SessionConfig,
    json: bool,
) -> ClientResult<()> {
    let slots = slots(api, user, target, date, config).await?;
    if json {
        return super::print_json(&slots);
    }

    if slots.is_empty() {
        println!("No times left on {}.", date);
    }
    for slot in &slots {
        println!("{}", slot.label());
    }
    Ok(())
}
