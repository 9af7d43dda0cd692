//! # Error Types
//!
//! Custom error types for Rover Remote using `thiserror`.
//!
//! Two error families never escape the session: [`DispatchError`] is turned
//! into the operator-visible `last_error`, [`PollError`] is only logged.

use thiserror::Error;

/// Main error type for Rover Remote
#[derive(Debug, Error)]
pub enum RoverRemoteError {
    /// Invalid configuration values
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parsing errors
    #[error("Configuration parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(String),

    /// Speed outside of 0-100 %
    #[error("Speed {0} is out of range (must be 0-100)")]
    SpeedOutOfRange(i64),

    /// Command token not in the supported set
    #[error("Unknown command: {0}")]
    UnknownIntent(String),
}

/// Failure while sending a drive command to the vehicle controller.
///
/// The `Display` output is what the operator sees in the error banner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Connection refused, DNS failure, timeout...
    #[error("Failed to send command to the server: {0}")]
    Network(String),

    /// Controller answered with a non-2xx status
    #[error("Command rejected by the server (HTTP {status})")]
    Status { status: u16, body: String },

    /// Request body could not be encoded
    #[error("Failed to encode command: {0}")]
    Serialization(String),

    /// Response body could not be read
    #[error("Malformed response from the server: {0}")]
    MalformedResponse(String),
}

/// Failure while fetching the telemetry feed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// Connection refused, DNS failure, timeout...
    #[error("Telemetry request failed: {0}")]
    Network(String),

    /// Reporting service answered with a non-2xx status
    #[error("Telemetry service returned HTTP {0}")]
    Status(u16),

    /// Body is not JSON or `readings` has the wrong shape
    #[error("Malformed telemetry response: {0}")]
    Malformed(String),
}

/// Result type alias for Rover Remote
pub type Result<T> = std::result::Result<T, RoverRemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_messages_are_not_empty() {
        let errors = [
            DispatchError::Network("connection refused".to_string()),
            DispatchError::Status { status: 500, body: String::new() },
            DispatchError::Serialization("bad".to_string()),
            DispatchError::MalformedResponse("truncated".to_string()),
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }

    #[test]
    fn test_status_error_mentions_code() {
        let err = DispatchError::Status { status: 503, body: "busy".to_string() };
        assert!(err.to_string().contains("503"));

        assert!(PollError::Status(404).to_string().contains("404"));
    }

    #[test]
    fn test_speed_out_of_range_message() {
        let err = RoverRemoteError::SpeedOutOfRange(101);
        assert_eq!(err.to_string(), "Speed 101 is out of range (must be 0-100)");
    }
}
