//! # Operator Console
//!
//! Line-oriented stand-in for the joystick panel: reads operator input,
//! turns it into intents or speed changes, and renders the state store.
//!
//! ## Input
//!
//! | Input | Action |
//! |-------|--------|
//! | `forward` / `w` | Drive forward |
//! | `backward` / `s` | Drive backward |
//! | `left` / `a` | Turn left |
//! | `right` / `d` | Turn right |
//! | `stop` / `x` | Stop |
//! | `speed <0-100>` | Change speed (no command sent) |
//! | `status` / empty line | Show speed, telemetry and errors |
//! | `quit` / `q` | End the session |

use async_trait::async_trait;
use chrono::{Local, TimeZone};
use std::fmt;
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt, Lines};
use tokio::sync::mpsc;
use tracing::warn;

use crate::command::CommandIntent;
use crate::session::ClientSession;
use crate::state::ClientState;

/// Shown instead of the table while there is no telemetry
pub const NO_DATA_PLACEHOLDER: &str = "Loading data...";

/// Lines queued between the input thread and the console
const INPUT_QUEUE_DEPTH: usize = 16;

/// Where operator input lines come from
#[async_trait]
pub trait LineSource: Send {
    /// Next line without its terminator, `None` at end of input
    async fn next_line(&mut self) -> std::io::Result<Option<String>>;
}

#[async_trait]
impl<R> LineSource for Lines<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        Lines::next_line(self).await
    }
}

#[async_trait]
impl LineSource for mpsc::Receiver<String> {
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        Ok(self.recv().await)
    }
}

/// Read lines from a blocking reader on a dedicated thread
///
/// Used for stdin: tokio's stdin blocks a runtime thread that cannot be
/// cancelled, which would hold shutdown until the operator presses Enter.
/// A plain thread is not joined at exit.
///
/// # Errors
///
/// Returns error if the thread cannot be spawned
pub fn spawn_line_reader<R>(reader: R) -> std::io::Result<mpsc::Receiver<String>>
where
    R: std::io::BufRead + Send + 'static,
{
    let (line_tx, line_rx) = mpsc::channel(INPUT_QUEUE_DEPTH);

    std::thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            for line in reader.lines() {
                match line {
                    Ok(line) => {
                        if line_tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to read operator input: {}", e);
                        break;
                    }
                }
            }
        })?;

    Ok(line_rx)
}

/// One parsed line of operator input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorInput {
    Command(CommandIntent),
    Speed(i64),
    Status,
    Quit,
    Invalid(String),
}

/// Parse one line of input
///
/// # Examples
///
/// ```
/// use rover_remote::command::CommandIntent;
/// use rover_remote::console::{parse_input, OperatorInput};
///
/// assert_eq!(parse_input("w"), OperatorInput::Command(CommandIntent::Forward));
/// assert_eq!(parse_input("speed 75"), OperatorInput::Speed(75));
/// ```
pub fn parse_input(line: &str) -> OperatorInput {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return OperatorInput::Status;
    };
    let first = first.to_ascii_lowercase();

    let shortcut = match first.as_str() {
        "w" => Some(CommandIntent::Forward),
        "s" => Some(CommandIntent::Backward),
        "a" => Some(CommandIntent::Left),
        "d" => Some(CommandIntent::Right),
        "x" => Some(CommandIntent::Stop),
        _ => None,
    };

    let input = match first.as_str() {
        "quit" | "q" | "exit" => OperatorInput::Quit,
        "status" => OperatorInput::Status,
        "speed" => match words.next().map(str::parse::<i64>) {
            Some(Ok(value)) => OperatorInput::Speed(value),
            _ => return OperatorInput::Invalid("usage: speed <0-100>".to_string()),
        },
        _ => match shortcut.map(Ok).unwrap_or_else(|| first.parse::<CommandIntent>()) {
            Ok(intent) => OperatorInput::Command(intent),
            Err(e) => return OperatorInput::Invalid(e.to_string()),
        },
    };

    if words.next().is_some() {
        return OperatorInput::Invalid(format!("unexpected input after '{}'", first));
    }
    input
}

/// Render the state with times in the local timezone
pub fn render(state: &ClientState) -> String {
    render_in(state, &Local)
}

/// Render the state with times shown in `tz`
pub fn render_in<Tz>(state: &ClientState, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    StateView { state, tz }.to_string()
}

/// Text view of a [`ClientState`]
pub struct StateView<'a, Tz: TimeZone> {
    pub state: &'a ClientState,
    pub tz: &'a Tz,
}

impl<Tz> fmt::Display for StateView<'_, Tz>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state;

        writeln!(f, "Speed: {}", state.speed)?;
        writeln!(f, "{:<10} {:>10} {:>10} {:>10}", "Time", "Temp (°C)", "Latitude", "Longitude")?;

        if state.readings.is_empty() {
            writeln!(f, "{}", NO_DATA_PLACEHOLDER)?;
        }
        for reading in &state.readings {
            writeln!(
                f,
                "{:<10} {:>10} {:>10.4} {:>10.4}",
                reading.timestamp.with_timezone(self.tz).format("%H:%M:%S"),
                reading.temperature_celsius,
                reading.latitude,
                reading.longitude,
            )?;
        }

        match state.last_update {
            Some(at) => writeln!(f, "Last update: {}", at.with_timezone(self.tz).format("%H:%M:%S"))?,
            None => writeln!(f, "Last update: --")?,
        }

        if let Some(error) = &state.last_error {
            writeln!(f, "Error: {}", error)?;
        }
        Ok(())
    }
}

/// Drive `session` from `input` until `quit` or end of input
///
/// Every command is sent on its own task, so a slow controller never holds
/// up the next line; its ack or error is written when it arrives. On exit
/// the console waits for commands still in flight and reports them.
///
/// # Errors
///
/// Returns error if reading input or writing output fails
pub async fn run<L, W>(session: &ClientSession, mut input: L, mut output: W) -> std::io::Result<()>
where
    L: LineSource,
    W: AsyncWrite + Unpin,
{
    let commands = session.commands();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<String>();

    loop {
        tokio::select! {
            Some(reply) = reply_rx.recv() => {
                write_reply(&mut output, &reply).await?;
            }

            line = input.next_line() => {
                let Some(line) = line? else { break };

                let reply = match parse_input(&line) {
                    OperatorInput::Quit => break,
                    OperatorInput::Status => render(&session.state()),
                    OperatorInput::Speed(value) => match session.set_speed(value) {
                        Ok(speed) => format!("Speed set to {}\n", speed),
                        Err(e) => format!("{}\n", e),
                    },
                    OperatorInput::Command(intent) => {
                        let pending = commands.issue(intent);
                        let reply_tx = reply_tx.clone();
                        tokio::spawn(async move {
                            let reply = match pending.await {
                                Ok(ack) => format!("{} sent: {}\n", intent, ack.as_str()),
                                Err(e) => format!("Error: {}\n", e),
                            };
                            // Receiver is gone only if the console was dropped
                            let _ = reply_tx.send(reply);
                        });
                        continue;
                    }
                    OperatorInput::Invalid(msg) => format!("{}\n", msg),
                };

                write_reply(&mut output, &reply).await?;
            }
        }
    }

    drop(reply_tx);
    while let Some(reply) = reply_rx.recv().await {
        write_reply(&mut output, &reply).await?;
    }

    Ok(())
}

async fn write_reply<W: AsyncWrite + Unpin>(output: &mut W, reply: &str) -> std::io::Result<()> {
    output.write_all(reply.as_bytes()).await?;
    output.flush().await
}
