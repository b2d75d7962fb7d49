//! Socket actor
//! - Own the connection to one endpoint, at most one at a time
//! - Reopen it after a fixed delay when it fails, and when it closes if asked to
//! - Publish its lifecycle state
//! - Stop on request, closing the connection and cancelling any pending retry

use log::{info, warn};
use tokio::{runtime::Builder, select, sync::watch, time::sleep};
use tokio_util::sync::CancellationToken;
use url::Url;

use connection::{Disconnect, run_session};
use crate::{error::{Error, Result}, handler::EventHandler};

pub use connection::{Connector, TungsteniteConnector, WsStream};
pub use policy::ReconnectPolicy;

mod connection;
mod policy;

/// Lifecycle of an [`EventSocket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    /// Opening a connection
    Connecting,
    /// Connected, frames are being handled
    Open,
    /// The last connection failed or was closed, no retry scheduled yet
    Closed,
    /// Waiting out the reconnect delay
    Reconnecting {
        /// Consecutive connections lost since the last successful open
        attempt: u32,
    },
    /// Stopped for good
    Stopped,
}

impl SocketState {
    pub fn is_open(self) -> bool {
        matches!(self, SocketState::Open)
    }
}

/// Handle to a resilient connection delivering beat, onset and tempo events to an [`EventHandler`].
///
/// Dropping the handle stops the socket.
pub struct EventSocket {
    cancel: CancellationToken,
    state: watch::Receiver<SocketState>,
}

impl EventSocket {
    /// Create a socket which runs on a new OS thread, for hosts without a tokio runtime.
    pub fn new<H: EventHandler>(endpoint: &str, handler: H, policy: ReconnectPolicy) -> Result<Self> {
        let endpoint = validate_endpoint(endpoint)?;

        // Create an async runtime
        let rt = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(Error::Runtime)?;

        let (socket, actor) = Self::actor(endpoint, TungsteniteConnector, handler, policy);

        // Create an OS thread, and then run the actor on our runtime
        std::thread::spawn(move || rt.block_on(actor.run()));

        Ok(socket)
    }

    /// Create a socket on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// When called outside of a tokio runtime.
    pub fn spawn<H: EventHandler>(endpoint: &str, handler: H, policy: ReconnectPolicy) -> Result<Self> {
        Self::with_connector(endpoint, TungsteniteConnector, handler, policy)
    }

    /// Create a socket on the current tokio runtime, opening connections through `connector`.
    ///
    /// # Panics
    ///
    /// When called outside of a tokio runtime.
    pub fn with_connector<C: Connector, H: EventHandler>(
        endpoint: &str,
        connector: C,
        handler: H,
        policy: ReconnectPolicy,
    ) -> Result<Self> {
        let endpoint = validate_endpoint(endpoint)?;
        let (socket, actor) = Self::actor(endpoint, connector, handler, policy);

        tokio::spawn(actor.run());

        Ok(socket)
    }

    fn actor<C: Connector, H: EventHandler>(
        endpoint: String,
        connector: C,
        handler: H,
        policy: ReconnectPolicy,
    ) -> (Self, Actor<C, H>) {
        let cancel = CancellationToken::new();
        let (state_tx, state) = watch::channel(SocketState::Connecting);

        let actor = Actor {
            endpoint,
            connector,
            handler,
            policy,
            cancel: cancel.clone(),
            state: state_tx,
        };

        (Self { cancel, state }, actor)
    }

    /// Stop the socket: closes the open connection or cancels the pending retry. No further
    /// connections are made.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Wait until the socket has fully stopped. Only returns after [`EventSocket::stop`].
    pub async fn stopped(&self) {
        let mut state = self.state.clone();
        // Errors once the actor is gone, which means it stopped
        let _ = state.wait_for(|state| *state == SocketState::Stopped).await;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SocketState {
        *self.state.borrow()
    }

    /// Receiver notified on every lifecycle change.
    pub fn state_receiver(&self) -> watch::Receiver<SocketState> {
        self.state.clone()
    }
}

impl Drop for EventSocket {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Only websocket URLs are accepted, malformed endpoints are reported to the caller.
fn validate_endpoint(endpoint: &str) -> Result<String> {
    let url = Url::parse(endpoint).map_err(|err| Error::Endpoint(format!("{endpoint}: {err}")))?;

    match url.scheme() {
        "ws" => Ok(endpoint.to_string()),
        scheme => Err(Error::Endpoint(format!("{endpoint}: unsupported scheme {scheme:?}"))),
    }
}

struct Actor<C, H> {
    endpoint: String,
    connector: C,
    handler: H,
    policy: ReconnectPolicy,
    cancel: CancellationToken,
    state: watch::Sender<SocketState>,
}

impl<C: Connector, H: EventHandler> Actor<C, H> {
    /// Connection loop: one connection at a time, retried according to the policy until cancelled.
    async fn run(self) {
        let mut attempt = 0_u32;

        loop {
            self.state.send_replace(SocketState::Connecting);

            let connected = select! {
                biased;
                _ = self.cancel.cancelled() => break,
                result = self.connector.connect(&self.endpoint) => result,
            };

            let disconnect = match connected {
                Ok(stream) => {
                    attempt = 0;
                    info!("Connected to socket server at {}", self.endpoint);
                    self.state.send_replace(SocketState::Open);

                    run_session(stream, &self.handler, &self.cancel).await
                },
                Err(err) => Disconnect::Failed(err.into()),
            };

            let retry = match disconnect {
                Disconnect::Stopped => break,
                Disconnect::Closed => {
                    warn!("Lost socket to {}: {}", self.endpoint, Error::Closed);
                    self.policy.reconnect_on_close
                },
                Disconnect::Failed(err) => {
                    warn!("Lost socket to {}: {}", self.endpoint, err);
                    self.policy.reconnect_on_error
                },
            };

            self.state.send_replace(SocketState::Closed);

            if !retry {
                info!("Not reconnecting to {}", self.endpoint);
                self.cancel.cancelled().await;
                break;
            }

            attempt = attempt.saturating_add(1);
            self.state.send_replace(SocketState::Reconnecting { attempt });
            info!("Retrying in {} ms (attempt {})", self.policy.delay.as_millis(), attempt);

            select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = sleep(self.policy.delay) => {},
            }
        }

        self.state.send_replace(SocketState::Stopped);
        info!("Stopped socket to {}", self.endpoint);
    }
}

#[cfg(test)]
mod tests {
    use super::{EventSocket, ReconnectPolicy, validate_endpoint};
    use crate::{error::Error, handler::Callbacks};

    #[test]
    fn accepts_ws_endpoints() {
        assert_eq!(validate_endpoint("ws://localhost:8765").unwrap(), "ws://localhost:8765");
    }

    #[test]
    fn rejects_malformed_endpoints() {
        assert!(matches!(validate_endpoint("localhost:8765 x"), Err(Error::Endpoint(_))));
        assert!(matches!(validate_endpoint("http://localhost:8765"), Err(Error::Endpoint(_))));
        assert!(matches!(validate_endpoint(""), Err(Error::Endpoint(_))));
    }

    #[test]
    fn construction_reports_bad_endpoint() {
        let result = EventSocket::new("not a url", Callbacks::new(), ReconnectPolicy::default());
        assert!(matches!(result, Err(Error::Endpoint(_))));
    }
}
