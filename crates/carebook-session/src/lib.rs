//! Booking session: availability cache, selection flow, committer.
//!
//! This crate holds the stateful part of carebook:
//! - Availability caching with TTL and stale-response protection
//! - The selection state machine with its cascade rules
//! - Validation and payload building for bookings and reschedules
//! - An async driver that runs network calls on tokio tasks
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use carebook_api::{MemoryApi, SchedulingApi};
//! use carebook_core::{CurrentUser, DoctorQuery};
//! use carebook_session::{BookingSession, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api: Arc<dyn SchedulingApi> = Arc::new(MemoryApi::new());
//!     let user = CurrentUser::new("ada@example.com", "Ada Lovelace");
//!     let mut session = BookingSession::book(api, user, &SessionConfig::default());
//!
//!     session.load_providers(DoctorQuery::new()).await?;
//!     session.choose_provider("7")?;
//!     session.choose_type("3")?;
//!     session.settle().await?;
//!     Ok(())
//! }
//! ```

mod cache;
mod commit;
mod config;
mod error;
mod flow;
mod selection;
mod session;

pub use cache::{
    Applied, AvailabilityCache, DEFAULT_CACHE_TTL, DatesKey, FetchTicket, TimesKey,
};
pub use commit::{BookingMode, CommitRequest, prepare};
pub use config::SessionConfig;
pub use error::{SessionError, SessionResult, ValidationError};
pub use flow::{BookingFlow, Effect, SubmitTicket};
pub use selection::{Phase, Selection};
pub use session::BookingSession;
