//! # Telemetry Module
//!
//! Periodic telemetry feed from the reporting service.
//!
//! This module handles:
//! - Decoding `{"readings": [...]}` batches (temperature + GPS position)
//! - Fetching one batch per poll cycle
//! - Running the poll timer as a cancelable task
//! - Feeding completed polls into the state store, newest issue first

pub mod types;
pub mod poller;
pub mod scheduler;

pub use poller::Poller;
pub use scheduler::PollTask;
pub use types::{parse_readings, TelemetryReading};
