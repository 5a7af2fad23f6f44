//! Month availability view.

use std::sync::Arc;

use carebook_api::SchedulingApi;
use carebook_core::time::date_key;
use carebook_core::{CurrentUser, MonthGrid, YearMonth};
use carebook_session::{BookingSession, SessionConfig};
use serde_json::json;

use crate::cli::ProviderArgs;
use crate::error::ClientResult;

/// Loads the availability grid for `month` (the current month when `None`).
pub async fn month_grid(
    api: Arc<dyn SchedulingApi>,
    user: CurrentUser,
    target: &ProviderArgs,
    month: Option<YearMonth>,
    config: &SessionConfig,
) -> ClientResult<MonthGrid> {
    let mut session = BookingSession::book(api, user, config);
    super::select_target(&mut session, target).await?;

    let month = month.unwrap_or_else(|| session.flow().displayed_month());
    super::show_month(&mut session, month).await?;

    let grid = session.flow().month_grid();
    session.close();
    Ok(grid)
}

/// `carebook calendar`
pub async fn run(
    api: Arc<dyn SchedulingApi>,
    user: CurrentUser,
    target: &ProviderArgs,
    month: Option<YearMonth>,
    config: &SessionConfig,
    json: bool,
) -> ClientResult<()> {
    let grid = month_grid(api, user, target, month, config).await?;

    if json {
        let available: Vec<String> = grid
            .cells
            .iter()
            .flatten()
            .filter(|cell| cell.selectable)
            .map(|cell| date_key(cell.date))
            .collect();
        return super::print_json(&json!({
            "month": grid.month,
            "available": available,
        }));
    }

    println!("{}", grid.render_text());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use carebook_api::{MemoryApi, Operation};
    use carebook_core::{AppointmentCategory, AppointmentType, Provider};
    use chrono::NaiveDate;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn month(m: u32) -> YearMonth {
        YearMonth::new(2024, m).unwrap()
    }

    fn api() -> Arc<MemoryApi> {
        Arc::new(
            MemoryApi::new()
                .with_doctor(
                    Provider::new("7", "Dr. Grey")
                        .with_calendar_id("cal_1")
                        .with_appointment_type(AppointmentType::new(
                            "3",
                            "Checkup",
                            AppointmentCategory::InPerson,
                        )),
                )
                .with_dates("cal_1", "3", month(3), vec![date(3, 10), date(3, 15)])
                .with_dates("cal_1", "3", month(4), vec![date(4, 2), date(4, 3)]),
        )
    }

    fn target() -> ProviderArgs {
        ProviderArgs {
            doctor: "7".to_string(),
            appointment_type: "3".to_string(),
        }
    }

    fn user() -> CurrentUser {
        CurrentUser::new("ada@example.com", "Ada Lovelace")
    }

    fn config() -> SessionConfig {
        SessionConfig::new().with_today(date(3, 5))
    }

    #[tokio::test]
    async fn current_month_by_default() {
        let grid = month_grid(api(), user(), &target(), None, &config()).await.unwrap();
        insta::assert_snapshot!(grid.render_text(), @r"
March 2024
   Su   Mo   Tu   We   Th   Fr   Sa
                             1    2
    3    4  (5)    6    7    8    9
  *10   11   12   13   14  *15   16
   17   18   19   20   21   22   23
   24   25   26   27   28   29   30
   31
");
    }

    #[tokio::test]
    async fn walks_forward_to_requested_month() {
        let api = api();
        let grid = month_grid(api.clone(), user(), &target(), Some(month(4)), &config())
            .await
            .unwrap();
        insta::assert_snapshot!(grid.render_text(), @r"
April 2024
   Su   Mo   Tu   We   Th   Fr   Sa
         1   *2   *3    4    5    6
    7    8    9   10   11   12   13
   14   15   16   17   18   19   20
   21   22   23   24   25   26   27
   28   29   30
");
        assert_eq!(api.calls(Operation::AvailableDates), 2);
    }

    #[tokio::test]
    async fn past_month_stays_on_current() {
        let grid = month_grid(api(), user(), &target(), Some(month(1)), &config())
            .await
            .unwrap();
        assert_eq!(grid.month, month(3));
        assert!(!grid.can_go_previous);
    }

    #[tokio::test]
    async fn unknown_provider_is_not_found() {
        let target = ProviderArgs {
            doctor: "404".to_string(),
            appointment_type: "3".to_string(),
        };
        let err = month_grid(api(), user(), &target, None, &config())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("provider '404'"));
    }

    #[tokio::test]
    async fn fetch_failure_surfaces() {
        let api = api();
        api.fail_next(
            Operation::AvailableDates,
            carebook_api::ApiError::server("boom"),
        );
        let err = month_grid(api, user(), &target(), None, &config())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::ClientError::Api(_)));
    }
}
