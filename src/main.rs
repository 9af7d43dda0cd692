//! # Rover Remote
//!
//! Drive a rover over HTTP and watch its temperature/GPS telemetry feed.
//!
//! This application sends operator commands to the vehicle controller and
//! polls the reporting service for the latest readings.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use rover_remote::config::Config;
use rover_remote::console;
use rover_remote::logging;
use rover_remote::session::ClientSession;
use rover_remote::transport::ReqwestTransport;

/// Main entry point for Rover Remote
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (`ROVER_REMOTE_CONFIG` file and `ROVER_*` variables)
///    - Set up logging with tracing subscriber
///    - Build one HTTP transport per endpoint
///
/// 2. **Session**
///    - Telemetry is polled immediately, then every `poll_interval_ms`
///    - Operator console reads commands from stdin on a dedicated thread
///    - Commands are sent concurrently; acks are printed as they arrive
///    - Ends on `quit`, end of input, or Ctrl+C
///
/// 3. **Graceful Shutdown**
///    - Stop the poll timer
///    - Drop any poll result that arrives late
///
/// # Errors
///
/// Returns error if:
/// - Configuration is missing or invalid
/// - HTTP client cannot be created
/// - Console I/O fails
///
/// # Examples
///
/// ```bash
/// ROVER_CONTROL_URL=http://10.0.0.2:4040/status \
/// ROVER_TELEMETRY_URL=https://telemetry.example.com/prod/readings \
/// ROVER_CONTROL_API_KEY=... cargo run --release
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::discover().context("failed to load configuration")?;
    let _log_guard = logging::init(&config.logging);

    info!("Rover Remote v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Control endpoint: {}", config.control.url);
    info!("Telemetry endpoint: {}", config.telemetry.url);

    let control = Arc::new(ReqwestTransport::new(Duration::from_millis(
        config.control.request_timeout_ms,
    ))?);
    let telemetry = Arc::new(ReqwestTransport::new(Duration::from_millis(
        config.telemetry.request_timeout_ms,
    ))?);

    let session = ClientSession::start(&config, control, telemetry)?;

    println!("{}", console::render(&session.state()));
    println!("Commands: forward|backward|left|right|stop (w/s/a/d/x), speed <0-100>, status, quit");

    // Blocking stdin lives on its own thread so Ctrl+C does not wait for Enter
    let input = console::spawn_line_reader(std::io::BufReader::new(std::io::stdin()))
        .context("failed to start console input")?;
    tokio::select! {
        result = console::run(&session, input, tokio::io::stdout()) => {
            result.context("console I/O failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    session.shutdown().await;
    Ok(())
}
