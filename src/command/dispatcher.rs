//! # Command Dispatcher
//!
//! Sends one drive command to the vehicle controller and reports the result.
//! There is no retry: a failed command must be re-issued by the operator.

use std::sync::Arc;
use tracing::{info, warn};

use super::protocol::{CommandIntent, CommandPayload, SpeedSetting};
use crate::error::DispatchError;
use crate::transport::{HttpTransport, TransportError};

/// Acknowledgement text returned by the controller (opaque)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack(pub String);

impl Ack {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Posts drive commands to the configured control endpoint
pub struct Dispatcher {
    transport: Arc<dyn HttpTransport>,
    url: String,
    api_key: String,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    /// Send `intent` at `speed` as a single POST
    ///
    /// # Returns
    ///
    /// * `Ok(Ack)` - controller answered 2xx, body kept as-is
    /// * `Err(DispatchError)` - network failure, non-2xx status, or an
    ///   unreadable body
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rover_remote::command::{CommandIntent, Dispatcher, SpeedSetting};
    /// use rover_remote::transport::ReqwestTransport;
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(5))?);
    ///     let dispatcher = Dispatcher::new(transport, "http://10.0.0.2:4040/status", "key");
    ///
    ///     let ack = dispatcher.dispatch(CommandIntent::Forward, SpeedSetting::new(75)?).await?;
    ///     println!("controller said: {}", ack.as_str());
    ///     Ok(())
    /// }
    /// ```
    pub async fn dispatch(
        &self,
        intent: CommandIntent,
        speed: SpeedSetting,
    ) -> Result<Ack, DispatchError> {
        info!("Command: {}, speed: {}", intent, speed);

        let result = self.send(intent, speed).await;
        match &result {
            Ok(ack) => info!("Command {} acknowledged: {}", intent, ack.as_str()),
            Err(e) => warn!("Command {} failed: {}", intent, e),
        }
        result
    }

    async fn send(&self, intent: CommandIntent, speed: SpeedSetting) -> Result<Ack, DispatchError> {
        let body = serde_json::to_value(CommandPayload::new(intent, speed))
            .map_err(|e| DispatchError::Serialization(e.to_string()))?;

        let response = self
            .transport
            .post_json(&self.url, &self.api_key, &body)
            .await
            .map_err(|e| match e {
                TransportError::Request(msg) => DispatchError::Network(msg),
                TransportError::Body(msg) => DispatchError::MalformedResponse(msg),
            })?;

        if !response.is_success() {
            return Err(DispatchError::Status {
                status: response.status,
                body: response.body,
            });
        }

        Ok(Ack(response.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::http_trait::mocks::{Scripted, ScriptedTransport};
    use crate::transport::http_trait::MockHttpTransport;
    use crate::transport::HttpResponse;

    const URL: &str = "http://rover.test/status";

    fn dispatcher_with(transport: &ScriptedTransport) -> Dispatcher {
        Dispatcher::new(Arc::new(transport.clone()), URL, "secret")
    }

    #[tokio::test]
    async fn test_dispatch_success_returns_ack() {
        let transport = ScriptedTransport::new(vec![Scripted::ok("moving forward")]);
        let dispatcher = dispatcher_with(&transport);

        let ack = dispatcher
            .dispatch(CommandIntent::Forward, SpeedSetting::new(75).unwrap())
            .await
            .unwrap();
        assert_eq!(ack, Ack("moving forward".to_string()));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1, "Exactly one request per dispatch");
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].url, URL);
        assert_eq!(requests[0].api_key, "secret");
        assert_eq!(
            requests[0].body,
            Some(serde_json::json!({"cmd": "FORWARD", "speedness": 75}))
        );
    }

    #[tokio::test]
    async fn test_dispatch_sends_every_intent_token() {
        for intent in CommandIntent::ALL {
            let transport = ScriptedTransport::new(vec![Scripted::ok("ok")]);
            let dispatcher = dispatcher_with(&transport);

            dispatcher.dispatch(intent, SpeedSetting::default()).await.unwrap();

            let body = transport.requests()[0].body.clone().unwrap();
            assert_eq!(body["cmd"], intent.as_token());
            assert_eq!(body["speedness"], 50);
        }
    }

    #[tokio::test]
    async fn test_dispatch_http_500() {
        let transport = ScriptedTransport::new(vec![Scripted::status(500)]);
        let dispatcher = dispatcher_with(&transport);

        let err = dispatcher
            .dispatch(CommandIntent::Forward, SpeedSetting::new(75).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Status { status: 500, .. }));
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_network_failure_is_not_retried() {
        let transport = ScriptedTransport::new(vec![Scripted::network_error(), Scripted::ok("ok")]);
        let dispatcher = dispatcher_with(&transport);

        let err = dispatcher
            .dispatch(CommandIntent::Stop, SpeedSetting::new(0).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Network(_)));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_unreadable_body() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_post_json()
            .times(1)
            .returning(|_, _, _| Err(TransportError::Body("connection reset".to_string())));

        let dispatcher = Dispatcher::new(Arc::new(transport), URL, "secret");
        let err = dispatcher
            .dispatch(CommandIntent::Left, SpeedSetting::new(10).unwrap())
            .await
            .unwrap_err();

        assert_eq!(err, DispatchError::MalformedResponse("connection reset".to_string()));
    }

    #[tokio::test]
    async fn test_dispatch_passes_url_and_key() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_post_json()
            .withf(|url, api_key, body| {
                url.to_string() == URL
                    && api_key.to_string() == "secret"
                    && body["cmd"] == "RIGHT"
                    && body["speedness"] == 100
            })
            .times(1)
            .returning(|_, _, _| Ok(HttpResponse::new(201, "")));
        transport.expect_get().never();

        let dispatcher = Dispatcher::new(Arc::new(transport), URL, "secret");
        let ack = dispatcher
            .dispatch(CommandIntent::Right, SpeedSetting::new(100).unwrap())
            .await
            .unwrap();

        assert_eq!(ack.as_str(), "");
    }
}
