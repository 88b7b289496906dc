//! wsdrop sends a file to a WebSocket peer as a sequence of chunk envelopes.
//!
//! The [`session::Session`] owns the connection and serializes every write.
//! The [`client::Client`] runs the handshake and transfer producers against
//! it and dispatches whatever the peer sends back.

pub mod client;
pub mod dispatch;
pub mod error;
pub mod handshake;
pub mod identity;
pub mod session;
pub mod transfer;

pub use client::{Client, RunOutcome};
pub use error::{ConnectError, ProducerError, SessionError, TransportError};
pub use session::{InboundFrames, Session, SessionState};
