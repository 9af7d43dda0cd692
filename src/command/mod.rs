//! # Command Module
//!
//! Drive commands sent to the vehicle controller.
//!
//! This module handles:
//! - The closed set of operator intents (forward, backward, left, right, stop)
//! - The 0-100 % speed setting
//! - Encoding `{"cmd": ..., "speedness": ...}` request bodies
//! - Sending exactly one POST per command and reporting the outcome

pub mod protocol;
pub mod dispatcher;

pub use dispatcher::{Ack, Dispatcher};
pub use protocol::{CommandIntent, CommandPayload, SpeedSetting};
