//! Job
//! - Open one websocket connection
//! - Decode every binary frame into an event and hand it to the handler
//! - Acknowledge each handled frame
//! - Report why the connection ended
//!
//! Some subtleties:
//! - Frames that cannot be decoded are logged and skipped, without acknowledgment
//! - The acknowledgment is a one character text message, which is what browser clients send

use std::future::Future;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use log::{debug, info, trace, warn};
use tokio::{net::TcpStream, select};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_tungstenite::tungstenite::{self, Message as WebSocketMessage};
use tokio_util::sync::CancellationToken;

use crate::{error::Error, event::{ACK, EventKind, FrameError}, handler::{EventHandler, dispatch}};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens connections for an [`EventSocket`](super::EventSocket).
///
/// Called once per connection attempt, each call must produce a fresh stream.
pub trait Connector: Send + Sync + 'static {
    type Stream: Stream<Item = Result<WebSocketMessage, tungstenite::Error>>
        + Sink<WebSocketMessage, Error = tungstenite::Error>
        + Unpin
        + Send
        + 'static;

    fn connect(&self, endpoint: &str) -> impl Future<Output = Result<Self::Stream, tungstenite::Error>> + Send;
}

/// Connects over TCP with `tokio-tungstenite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

impl Connector for TungsteniteConnector {
    type Stream = WsStream;

    async fn connect(&self, endpoint: &str) -> Result<WsStream, tungstenite::Error> {
        let (stream, response) = tokio_tungstenite::connect_async(endpoint).await?;
        debug!("Websocket handshake with {} completed: {}", endpoint, response.status());
        Ok(stream)
    }
}

/// Why a connection ended.
#[derive(Debug)]
pub(crate) enum Disconnect {
    /// Reading or acknowledging failed
    Failed(Error),
    /// Close frame received, or the stream ended
    Closed,
    /// The socket was asked to stop
    Stopped,
}

/// Service an open connection until it fails, closes or the token is cancelled.
pub(crate) async fn run_session<S, H>(mut stream: S, handler: &H, cancel: &CancellationToken) -> Disconnect
where
    S: Stream<Item = Result<WebSocketMessage, tungstenite::Error>>
        + Sink<WebSocketMessage, Error = tungstenite::Error>
        + Unpin,
    H: EventHandler,
{
    loop {
        let message = select! {
            biased;
            _ = cancel.cancelled() => None,
            message = stream.next() => Some(message),
        };

        let Some(message) = message else {
            if let Err(err) = stream.close().await {
                debug!("Error closing websocket: {}", err);
            }
            return Disconnect::Stopped;
        };

        match message {
            Some(Ok(WebSocketMessage::Binary(bytes))) => {
                if let Err(err) = handle_frame(&mut stream, &bytes, handler).await {
                    return Disconnect::Failed(err);
                }
            },
            Some(Ok(WebSocketMessage::Text(text))) => {
                warn!("Skipping frame {:?}: {}", text.as_str(), Error::Frame(FrameError::NotBinary));
            },
            Some(Ok(WebSocketMessage::Close(frame))) => {
                info!("Received close frame from server: {:?}", frame);
                return Disconnect::Closed;
            },
            Some(Ok(_)) => {}, // Ping-pong answered by tungstenite
            Some(Err(err)) => return Disconnect::Failed(err.into()),
            None => {
                info!("Websocket stream ended");
                return Disconnect::Closed;
            },
        }
    }
}

/// Decode, dispatch, then acknowledge a single binary frame.
///
/// Undecodable frames are skipped. Only a failed acknowledgment is an error.
async fn handle_frame<S, H>(sink: &mut S, payload: &[u8], handler: &H) -> Result<(), Error>
where
    S: Sink<WebSocketMessage, Error = tungstenite::Error> + Unpin,
    H: EventHandler,
{
    let event = match EventKind::decode(payload) {
        Ok(event) => event,
        Err(err) => {
            warn!("Skipping frame {:02x?}: {}", payload, Error::Frame(err));
            return Ok(());
        },
    };

    trace!("Dispatching {:?}", event);
    dispatch(handler, event);

    sink.send(WebSocketMessage::text(ACK)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use futures_util::{Sink, sink};
    use tokio::sync::mpsc;
    use tokio_tungstenite::tungstenite::{self, Message as WebSocketMessage};

    use super::handle_frame;
    use crate::{event::EventKind, handler::EventHandler};

    /// Records handler calls and acknowledgments in a single timeline.
    #[derive(Default)]
    struct Timeline(Mutex<Vec<String>>);

    impl EventHandler for Timeline {
        fn on_beat(&self) {
            self.0.lock().unwrap().push("beat".to_string());
        }

        fn on_tempo(&self, bpm: i16) {
            self.0.lock().unwrap().push(format!("tempo {bpm}"));
        }
    }

    /// A sink forwarding into a channel, failing once the receiver is gone.
    fn channel_sink(
        tx: mpsc::UnboundedSender<WebSocketMessage>,
    ) -> impl Sink<WebSocketMessage, Error = tungstenite::Error> + Unpin {
        Box::pin(sink::unfold(tx, |tx, message: WebSocketMessage| async move {
            tx.send(message).map_err(|_| tungstenite::Error::ConnectionClosed)?;
            Ok::<_, tungstenite::Error>(tx)
        }))
    }

    #[tokio::test]
    async fn acknowledges_after_dispatch() {
        let timeline = Arc::new(Timeline::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = channel_sink(tx);

        for event in [EventKind::Beat, EventKind::Tempo(-5)] {
            handle_frame(&mut sink, &event.encode(), &timeline).await.unwrap();

            // Dispatch already happened by the time the ack is observed
            let ack = rx.recv().await.unwrap();
            assert_eq!(ack, WebSocketMessage::text("k"));
            timeline.0.lock().unwrap().push("ack".to_string());
        }

        assert_eq!(*timeline.0.lock().unwrap(), vec!["beat", "ack", "tempo -5", "ack"]);
    }

    #[tokio::test]
    async fn short_frame_is_not_acknowledged() {
        let timeline = Arc::new(Timeline::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = channel_sink(tx);

        handle_frame(&mut sink, &[0], &timeline).await.unwrap();

        assert!(timeline.0.lock().unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_acknowledgment_is_an_error() {
        let timeline = Arc::new(Timeline::default());
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut sink = channel_sink(tx);

        let result = handle_frame(&mut sink, &EventKind::Beat.encode(), &timeline).await;

        assert!(result.is_err());
        // Still dispatched
        assert_eq!(*timeline.0.lock().unwrap(), vec!["beat"]);
    }
}
