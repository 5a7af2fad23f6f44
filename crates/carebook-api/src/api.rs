//! SchedulingApi trait definition.
//!
//! [`SchedulingApi`] is the contract between the booking flow and whatever
//! serves availability and appointments. It is object-safe so a session can
//! hold an `Arc<dyn SchedulingApi>` and tests can substitute
//! [`crate::MemoryApi`].

use std::future::Future;
use std::pin::Pin;

use carebook_core::{
    Appointment, BookingRequest, CurrentUser, DoctorPage, DoctorQuery, RescheduleRequest,
    TimeSlot, YearMonth,
};
use chrono::NaiveDate;

use crate::error::ApiResult;

/// A boxed future for async trait methods.
///
/// Boxing keeps the trait object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Remote operations the booking flow depends on.
///
/// Implementations must be `Send + Sync`: calls run on spawned tasks.
pub trait SchedulingApi: Send + Sync {
    /// Returns a short name for logs (e.g. "http", "memory").
    fn name(&self) -> &str;

    /// Lists providers, one page at a time.
    fn list_doctors(&self, query: DoctorQuery) -> BoxFuture<'_, ApiResult<DoctorPage>>;

    /// Dates with at least one free slot for the type in `month`.
    ///
    /// Entries the server sends in an unrecognized shape are dropped.
    fn available_dates<'a>(
        &'a self,
        calendar_id: &'a str,
        appointment_type_id: &'a str,
        month: YearMonth,
    ) -> BoxFuture<'a, ApiResult<Vec<NaiveDate>>>;

    /// Free slots on `date`, in server order.
    fn available_times<'a>(
        &'a self,
        calendar_id: &'a str,
        date: NaiveDate,
        appointment_type_id: &'a str,
    ) -> BoxFuture<'a, ApiResult<Vec<TimeSlot>>>;

    /// Books a new appointment.
    fn create_appointment(&self, request: BookingRequest) -> BoxFuture<'_, ApiResult<Appointment>>;

    /// Moves an existing appointment to a new slot.
    fn reschedule_appointment(
        &self,
        request: RescheduleRequest,
    ) -> BoxFuture<'_, ApiResult<Appointment>>;

    /// The signed-in patient.
    fn current_user(&self) -> BoxFuture<'_, ApiResult<CurrentUser>>;
}
