//! # Command Protocol Types
//!
//! Intents, speed setting and the JSON body understood by the vehicle
//! controller.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, RoverRemoteError};

/// Lowest accepted speed (%)
pub const SPEED_MIN: u8 = 0;

/// Highest accepted speed (%)
pub const SPEED_MAX: u8 = 100;

/// Speed used when the configuration does not say otherwise
pub const SPEED_DEFAULT: u8 = 50;

/// Directional or stop command issued by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandIntent {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

impl CommandIntent {
    /// Every intent, in joystick order
    pub const ALL: [CommandIntent; 5] = [
        CommandIntent::Forward,
        CommandIntent::Backward,
        CommandIntent::Left,
        CommandIntent::Right,
        CommandIntent::Stop,
    ];

    /// Uppercase wire token
    ///
    /// # Examples
    ///
    /// ```
    /// use rover_remote::command::CommandIntent;
    ///
    /// assert_eq!(CommandIntent::Forward.as_token(), "FORWARD");
    /// ```
    pub fn as_token(self) -> &'static str {
        match self {
            CommandIntent::Forward => "FORWARD",
            CommandIntent::Backward => "BACKWARD",
            CommandIntent::Left => "LEFT",
            CommandIntent::Right => "RIGHT",
            CommandIntent::Stop => "STOP",
        }
    }
}

impl fmt::Display for CommandIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for CommandIntent {
    type Err = RoverRemoteError;

    /// Case-insensitive: "forward", "Forward" and "FORWARD" are the same intent
    fn from_str(s: &str) -> Result<Self> {
        let token = s.trim();
        CommandIntent::ALL
            .into_iter()
            .find(|intent| intent.as_token().eq_ignore_ascii_case(token))
            .ok_or_else(|| RoverRemoteError::UnknownIntent(token.to_string()))
    }
}

/// Throttle percentage, always within 0-100
///
/// Out-of-range values are rejected, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SpeedSetting(u8);

impl SpeedSetting {
    /// Validate a raw speed value
    ///
    /// # Errors
    ///
    /// Returns [`RoverRemoteError::SpeedOutOfRange`] outside 0-100
    ///
    /// # Examples
    ///
    /// ```
    /// use rover_remote::command::SpeedSetting;
    ///
    /// assert_eq!(SpeedSetting::new(75).unwrap().value(), 75);
    /// assert!(SpeedSetting::new(101).is_err());
    /// ```
    pub fn new(value: i64) -> Result<Self> {
        if value < SPEED_MIN as i64 || value > SPEED_MAX as i64 {
            return Err(RoverRemoteError::SpeedOutOfRange(value));
        }
        Ok(Self(value as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for SpeedSetting {
    fn default() -> Self {
        Self(SPEED_DEFAULT)
    }
}

impl fmt::Display for SpeedSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Request body for the command endpoint
///
/// Serializes as `{"cmd": "FORWARD", "speedness": 75}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandPayload {
    pub cmd: &'static str,
    pub speedness: SpeedSetting,
}

impl CommandPayload {
    pub fn new(intent: CommandIntent, speed: SpeedSetting) -> Self {
        Self { cmd: intent.as_token(), speedness: speed }
    }
}
