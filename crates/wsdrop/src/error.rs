//! Error taxonomy for the client.

use std::path::PathBuf;

use tokio_tungstenite::tungstenite;
use wsdrop_core::{EncodeError, SplitError};

/// Startup failure. Fatal: nothing is sent.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("invalid server url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported url scheme {0:?}, expected ws")]
    UnsupportedScheme(String),

    #[error("failed to connect to {url}: {source}")]
    Dial {
        url: String,
        #[source]
        source: tungstenite::Error,
    },
}

/// I/O failure on the physical connection. Ends the session.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("write failed: {0}")]
    Write(#[source] tungstenite::Error),

    #[error("read failed: {0}")]
    Read(#[source] tungstenite::Error),
}

/// Why a `write_frame` call did not put its frame on the wire.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session closed")]
    Closed,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failure of one producer. Siblings keep running.
#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Split(#[from] SplitError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("producer task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
