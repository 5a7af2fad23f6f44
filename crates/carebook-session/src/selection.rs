//! The patient's in-progress choice.
//!
//! Setters enforce the cascade: choosing a provider clears the type, date
//! and time; choosing a type clears the date and time; choosing a date
//! clears the time. Nothing ever clears upward.

use carebook_core::{AppointmentType, Provider, TimeSlot};
use chrono::NaiveDate;

/// Where the patient is in the booking steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    ChoosingProvider,
    ChoosingType,
    ChoosingDate,
    ChoosingTime,
    ReadyToSubmit,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChoosingProvider => "choosing-provider",
            Self::ChoosingType => "choosing-type",
            Self::ChoosingDate => "choosing-date",
            Self::ChoosingTime => "choosing-time",
            Self::ReadyToSubmit => "ready-to-submit",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    provider: Option<Provider>,
    appointment_type: Option<AppointmentType>,
    date: Option<NaiveDate>,
    slot: Option<TimeSlot>,
    notes: String,
    phone: String,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(&self) -> Option<&Provider> {
        self.provider.as_ref()
    }

    pub fn appointment_type(&self) -> Option<&AppointmentType> {
        self.appointment_type.as_ref()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn slot(&self) -> Option<&TimeSlot> {
        self.slot.as_ref()
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// Sets the provider and clears everything below it.
    pub fn set_provider(&mut self, provider: Provider) {
        self.provider = Some(provider);
        self.appointment_type = None;
        self.date = None;
        self.slot = None;
    }

    /// Sets the appointment type and clears the date and time.
    pub fn set_appointment_type(&mut self, appointment_type: AppointmentType) {
        self.appointment_type = Some(appointment_type);
        self.date = None;
        self.slot = None;
    }

    /// Sets the date and clears the time.
    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = Some(date);
        self.slot = None;
    }

    pub fn set_slot(&mut self, slot: TimeSlot) {
        self.slot = Some(slot);
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    pub fn set_phone(&mut self, phone: impl Into<String>) {
        self.phone = phone.into();
    }

    /// The first step that still needs a choice.
    pub fn phase(&self) -> Phase {
        match (
            &self.provider,
            &self.appointment_type,
            &self.date,
            &self.slot,
        ) {
            (None, ..) => Phase::ChoosingProvider,
            (Some(_), None, ..) => Phase::ChoosingType,
            (Some(_), Some(_), None, _) => Phase::ChoosingDate,
            (Some(_), Some(_), Some(_), None) => Phase::ChoosingTime,
            (Some(_), Some(_), Some(_), Some(_)) => Phase::ReadyToSubmit,
        }
    }
}
