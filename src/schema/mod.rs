//! Log record wire schema
//!
//! This module defines the JSON shape served by the journal API (`/logs`) and
//! the adapter that turns those records into immutable [`crate::types::LogEntry`]
//! values. All tolerance for malformed optional fields lives here, so the
//! metric components only ever see clean data.

mod adapter;
mod log_record;

pub use adapter::*;
pub use log_record::*;
