mod args;
mod client;
mod error;
mod event;
mod handler;
mod queue;

pub use args::{ArgType, ArgValue, ArgumentParser, Args, parse_defaults};
pub use client::{Connector, EventSocket, ReconnectPolicy, SocketState, TungsteniteConnector, WsStream};
pub use error::{Error, Result};
pub use event::{ACK, EventKind, FRAME_LEN, FrameError};
pub use handler::{Callbacks, EventHandler, dispatch};
pub use queue::EventQueue;
