//! Session error types.

use carebook_api::ApiError;
use carebook_core::CalendarError;
use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Why a selection cannot be submitted yet.
///
/// Checked in declaration order; the first failing check is reported. The
/// messages are shown to the patient as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please choose a provider.")]
    ProviderRequired,

    #[error("Please choose an appointment type.")]
    AppointmentTypeRequired,

    #[error("Please choose a date.")]
    DateRequired,

    #[error("Please choose a time.")]
    TimeRequired,

    #[error("A phone number is required for phone appointments.")]
    PhoneRequired,

    #[error("Your account has no email address. Please update your profile.")]
    EmailMissing,

    #[error("Your profile needs a last name before you can book.")]
    LastNameMissing,

    #[error("This provider is not accepting online bookings.")]
    CalendarMissing,
}

/// Errors returned by the booking flow and session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The selection is incomplete or inconsistent; nothing was sent.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The scheduling API failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// A submission is in flight; edits and resubmits are refused.
    #[error("A booking is already being submitted")]
    Busy,

    /// The session was closed.
    #[error("Session is closed")]
    Closed,

    #[error("Unknown provider: {id}")]
    UnknownProvider { id: String },

    #[error("Unknown appointment type: {id}")]
    UnknownAppointmentType { id: String },

    #[error("Date not available: {0}")]
    DateUnavailable(#[from] CalendarError),

    #[error("No such time on the selected date: {time}")]
    UnknownSlot { time: String },

    /// A step was attempted before the steps it depends on.
    #[error("{step} requires {missing} to be chosen first")]
    OutOfOrder {
        step: &'static str,
        missing: &'static str,
    },
}

impl SessionError {
    /// Creates an unknown provider error.
    pub fn unknown_provider(id: impl Into<String>) -> Self {
        Self::UnknownProvider { id: id.into() }
    }

    /// Creates an unknown appointment type error.
    pub fn unknown_appointment_type(id: impl Into<String>) -> Self {
        Self::UnknownAppointmentType { id: id.into() }
    }

    /// Creates an unknown slot error.
    pub fn unknown_slot(time: impl Into<String>) -> Self {
        Self::UnknownSlot { time: time.into() }
    }

    /// Creates an out-of-order error.
    pub fn out_of_order(step: &'static str, missing: &'static str) -> Self {
        Self::OutOfOrder { step, missing }
    }

    /// Text suitable for showing to a patient.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}
