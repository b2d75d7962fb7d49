use std::{error::Error as StdError, fmt, io};

use tokio_tungstenite::tungstenite;

use crate::event::FrameError;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the event socket.
///
/// Only [`Error::Endpoint`] and [`Error::Runtime`] are ever returned to callers. The others are logged and
/// handled inside the connection loop.
#[derive(Debug)]
pub enum Error {
    /// Connecting to, reading from or writing to the server failed
    Connection(tungstenite::Error),
    /// The server or the network closed the connection cleanly
    Closed,
    /// A frame could not be decoded
    Frame(FrameError),
    /// The endpoint is not a websocket URL
    Endpoint(String),
    /// The dedicated runtime could not be started
    Runtime(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(e) => write!(f, "connection error: {e}"),
            Self::Closed => write!(f, "connection closed"),
            Self::Frame(e) => write!(f, "protocol error: {e}"),
            Self::Endpoint(reason) => write!(f, "invalid endpoint: {reason}"),
            Self::Runtime(e) => write!(f, "failed to start runtime: {e}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Connection(e) => Some(e),
            Self::Frame(e) => Some(e),
            Self::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<tungstenite::Error> for Error {
    fn from(e: tungstenite::Error) -> Self {
        Self::Connection(e)
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}
