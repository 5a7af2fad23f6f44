//! SchedulingApi trait and implementations.
//!
//! This crate is the boundary between the booking flow and the scheduling
//! backend:
//!
//! - [`SchedulingApi`] - The contract the booking session depends on
//! - [`HttpSchedulingApi`] - JSON over HTTP with a bearer token
//! - [`MemoryApi`] - Fixture-backed implementation for tests and demos
//! - [`ApiError`] - Classified errors for remote operations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐
//! │ Scheduling API  │    │    Fixtures     │
//! └────────┬────────┘    └────────┬────────┘
//!          │ wire payloads        │
//!          ▼                      ▼
//! ┌─────────────────┐    ┌─────────────────┐
//! │HttpSchedulingApi│    │    MemoryApi    │
//! └────────┬────────┘    └────────┬────────┘
//!          │    SchedulingApi     │
//!          └──────────┬───────────┘
//!                     ▼
//!           canonical carebook-core model
//! ```
//!
//! # Example
//!
//! ```ignore
//! use carebook_api::{ApiConfig, HttpSchedulingApi, SchedulingApi};
//!
//! let api = HttpSchedulingApi::new(&ApiConfig::new("https://api.example.com/v1"))?;
//! let dates = api.available_dates("cal_1", "5", "2024-03".parse()?).await?;
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod wire;

pub use api::{BoxFuture, SchedulingApi};
pub use config::{ApiConfig, DEFAULT_TIMEOUT};
pub use error::{ApiError, ApiErrorCode, ApiResult};
pub use http::HttpSchedulingApi;
pub use memory::{MemoryApi, Operation};
