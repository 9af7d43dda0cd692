//! # Rover Remote Library
//!
//! Drive a rover over HTTP and watch its telemetry feed.
//!
//! This library provides the client core: a command dispatcher for
//! directional/speed commands, a periodic telemetry poller for temperature
//! and GPS readings, and the state store both of them feed.

pub mod config;
pub mod error;
pub mod command;
pub mod console;
pub mod logging;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod transport;
