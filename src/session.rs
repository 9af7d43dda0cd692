//! # Client Session
//!
//! Wires the store, the dispatcher and the telemetry poll task together for
//! the lifetime of one running client.
//!
//! ## Usage
//!
//! ```no_run
//! use rover_remote::command::CommandIntent;
//! use rover_remote::config::Config;
//! use rover_remote::session::ClientSession;
//! use rover_remote::transport::ReqwestTransport;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::discover()?;
//!     let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(5))?);
//!     let session = ClientSession::start(&config, transport.clone(), transport)?;
//!
//!     session.set_speed(75)?;
//!     session.send(CommandIntent::Forward).await.ok();
//!     println!("{:?}", session.state());
//!
//!     session.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::command::{Ack, CommandIntent, Dispatcher, SpeedSetting};
use crate::config::Config;
use crate::error::{DispatchError, Result};
use crate::state::{ClientState, StateStore};
use crate::telemetry::{PollTask, Poller};
use crate::transport::HttpTransport;

/// Cheap, cloneable handle for issuing commands
///
/// Reads the speed at issue time, sends, and records the outcome.
#[derive(Debug, Clone)]
pub struct CommandHandle {
    dispatcher: Arc<Dispatcher>,
    store: Arc<StateStore>,
}

impl CommandHandle {
    /// Dispatch `intent` at the current speed and record the result
    ///
    /// A failure sets `last_error`; the speed setting is left alone and
    /// nothing is retried.
    pub async fn send(&self, intent: CommandIntent) -> std::result::Result<Ack, DispatchError> {
        self.issue(intent).await
    }

    /// Like [`CommandHandle::send`], but the speed is read now and the
    /// returned future owns everything it needs, so it can be spawned
    pub fn issue(
        &self,
        intent: CommandIntent,
    ) -> impl Future<Output = std::result::Result<Ack, DispatchError>> + Send + 'static {
        let speed = self.store.speed();
        let dispatcher = Arc::clone(&self.dispatcher);
        let store = Arc::clone(&self.store);

        async move {
            let result = dispatcher.dispatch(intent, speed).await;
            store.record_dispatch_result(&result);
            result
        }
    }
}

/// One running client instance
#[derive(Debug)]
pub struct ClientSession {
    store: Arc<StateStore>,
    commands: CommandHandle,
    poll_task: PollTask,
}

impl ClientSession {
    /// Build the session and start polling telemetry
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `control` - Transport for the command endpoint
    /// * `telemetry` - Transport for the readings endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the configured initial speed is outside 0-100
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start(
        config: &Config,
        control: Arc<dyn HttpTransport>,
        telemetry: Arc<dyn HttpTransport>,
    ) -> Result<Self> {
        let initial_speed = SpeedSetting::new(config.client.initial_speed)?;
        let store = Arc::new(StateStore::new(initial_speed));

        let dispatcher = Arc::new(Dispatcher::new(
            control,
            config.control.url.clone(),
            config.control.api_key.clone(),
        ));
        let poller = Arc::new(Poller::new(
            telemetry,
            config.telemetry.url.clone(),
            config.telemetry.api_key.clone(),
        ));

        let poll_task = PollTask::spawn(
            poller,
            Arc::clone(&store),
            Duration::from_millis(config.telemetry.poll_interval_ms),
        );

        info!("Session started (speed {})", initial_speed);
        Ok(Self {
            commands: CommandHandle {
                dispatcher,
                store: Arc::clone(&store),
            },
            store,
            poll_task,
        })
    }

    /// Validate and store a new speed; does not send a command
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::RoverRemoteError::SpeedOutOfRange`] outside
    /// 0-100, leaving the current speed unchanged.
    pub fn set_speed(&self, value: i64) -> Result<SpeedSetting> {
        let speed = SpeedSetting::new(value)?;
        self.store.set_speed(speed);
        Ok(speed)
    }

    /// Send one command at the current speed
    pub async fn send(&self, intent: CommandIntent) -> std::result::Result<Ack, DispatchError> {
        self.commands.send(intent).await
    }

    pub fn commands(&self) -> CommandHandle {
        self.commands.clone()
    }

    pub fn store(&self) -> Arc<StateStore> {
        Arc::clone(&self.store)
    }

    /// Consistent snapshot for display
    pub fn state(&self) -> ClientState {
        self.store.snapshot()
    }

    /// Stop polling and discard any result that arrives afterwards
    pub async fn shutdown(self) {
        self.poll_task.stop().await;
        self.store.close();
        info!("Session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, ControlConfig, LoggingConfig, TelemetryConfig};
    use crate::error::RoverRemoteError;
    use crate::transport::http_trait::mocks::{Scripted, ScriptedTransport};
    use chrono::{TimeZone, Utc};
    use tokio::time::sleep;

    const SCENARIO_BODY: &str = r#"{"readings":[{"timestamp":"2024-01-01T00:00:00Z","sensors":{"temperature":21.5},"location":{"lat":10.1234,"lon":20.5678}}]}"#;

    fn config() -> Config {
        Config {
            control: ControlConfig {
                url: "http://rover.test/status".to_string(),
                api_key: "control-key".to_string(),
                request_timeout_ms: 5000,
            },
            telemetry: TelemetryConfig {
                url: "http://rover.test/readings".to_string(),
                api_key: "telemetry-key".to_string(),
                poll_interval_ms: 10_000,
                request_timeout_ms: 5000,
            },
            client: ClientConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    fn start(
        control: &ScriptedTransport,
        telemetry: &ScriptedTransport,
    ) -> ClientSession {
        ClientSession::start(&config(), Arc::new(control.clone()), Arc::new(telemetry.clone())).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_poll_scenario() {
        let control = ScriptedTransport::new(vec![]);
        let telemetry = ScriptedTransport::new(vec![Scripted::ok(SCENARIO_BODY)]);
        let session = start(&control, &telemetry);

        let before = Utc::now();
        sleep(Duration::from_millis(10)).await;
        let state = session.state();

        assert_eq!(state.speed.value(), 50);
        assert_eq!(state.last_error, None);
        assert_eq!(state.readings.len(), 1);
        let reading = &state.readings[0];
        assert_eq!(reading.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(reading.temperature_celsius, 21.5);
        assert_eq!(reading.latitude, 10.1234);
        assert_eq!(reading.longitude, 20.5678);
        assert!(state.last_update.unwrap() >= before);

        assert_eq!(telemetry.requests()[0].api_key, "telemetry-key");
        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_dispatch_scenario() {
        let control = ScriptedTransport::new(vec![Scripted::status(500)]);
        let telemetry = ScriptedTransport::new(vec![Scripted::ok(r#"{"readings":[]}"#)]);
        let session = start(&control, &telemetry);
        sleep(Duration::from_millis(10)).await;
        let readings_before = session.state().readings;

        session.set_speed(75).unwrap();
        let result = session.send("forward".parse().unwrap()).await;
        assert!(result.is_err());

        let state = session.state();
        assert!(state.last_error.as_deref().is_some_and(|e| !e.is_empty()));
        assert_eq!(state.speed.value(), 75);
        assert_eq!(state.readings, readings_before);

        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_uses_speed_at_issue_time() {
        let control = ScriptedTransport::new(vec![Scripted::ok("ok"), Scripted::ok("ok")]);
        let telemetry = ScriptedTransport::new(vec![]);
        let session = start(&control, &telemetry);

        for v in [0, 100] {
            session.set_speed(v).unwrap();
            session.send(CommandIntent::Backward).await.unwrap();
        }

        let speeds: Vec<_> = control
            .requests()
            .iter()
            .map(|r| r.body.clone().unwrap()["speedness"].clone())
            .collect();
        assert_eq!(speeds, vec![serde_json::json!(0), serde_json::json!(100)]);
        assert_eq!(control.requests()[0].api_key, "control-key");

        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_issue_captures_speed_before_it_changes() {
        let control = ScriptedTransport::new(vec![Scripted::ok("ok")]);
        let telemetry = ScriptedTransport::new(vec![]);
        let session = start(&control, &telemetry);

        session.set_speed(20).unwrap();
        let pending = session.commands().issue(CommandIntent::Forward);
        session.set_speed(90).unwrap();
        tokio::spawn(pending).await.unwrap().unwrap();

        assert_eq!(control.requests()[0].body.clone().unwrap()["speedness"], 20);
        assert_eq!(session.state().speed.value(), 90);

        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_clears_previous_error() {
        let control = ScriptedTransport::new(vec![Scripted::network_error(), Scripted::ok("ok")]);
        let telemetry = ScriptedTransport::new(vec![]);
        let session = start(&control, &telemetry);

        session.send(CommandIntent::Left).await.unwrap_err();
        assert!(session.state().last_error.is_some());

        session.commands().send(CommandIntent::Left).await.unwrap();
        assert_eq!(session.state().last_error, None);

        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_speed_rejects_out_of_range() {
        let session = start(&ScriptedTransport::new(vec![]), &ScriptedTransport::new(vec![]));
        session.set_speed(80).unwrap();

        assert!(matches!(session.set_speed(101), Err(RoverRemoteError::SpeedOutOfRange(101))));
        assert!(matches!(session.set_speed(-5), Err(RoverRemoteError::SpeedOutOfRange(-5))));
        assert_eq!(session.state().speed.value(), 80);

        session.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_initial_speed() {
        let mut config = config();
        config.client.initial_speed = 150;
        let transport: Arc<dyn HttpTransport> = Arc::new(ScriptedTransport::new(vec![]));

        let result = ClientSession::start(&config, transport.clone(), transport);
        assert!(matches!(result, Err(RoverRemoteError::SpeedOutOfRange(150))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_poll_after_shutdown_is_discarded() {
        let control = ScriptedTransport::new(vec![]);
        let telemetry = ScriptedTransport::new(vec![
            Scripted::ok(SCENARIO_BODY).after(Duration::from_secs(3)),
        ]);
        let session = start(&control, &telemetry);
        let store = session.store();

        sleep(Duration::from_secs(1)).await;
        session.shutdown().await;
        assert!(store.is_closed());

        sleep(Duration::from_secs(5)).await;
        assert!(store.snapshot().readings.is_empty());
        assert_eq!(store.snapshot().last_update, None);
    }
}
