//! Core types: appointment model, date/slot normalization, calendar widget

pub mod calendar;
pub mod model;
pub mod normalize;
pub mod time;
pub mod tracing;

pub use calendar::{CalendarError, CellStyle, DayCell, MonthGrid, MonthView};
pub use model::{
    Appointment, AppointmentCategory, AppointmentType, BookingRequest, CurrentUser, DoctorPage,
    DoctorQuery, Provider, RescheduleRequest, RescheduleTarget, TimeSlot,
};
pub use normalize::{DateLike, SlotDateTime, SlotSource, date_key, normalize_date, slot_datetime};
pub use time::{ParseYearMonthError, YearMonth};
pub use tracing::{LogConfig, LogFormat, TracingError, init_tracing};
