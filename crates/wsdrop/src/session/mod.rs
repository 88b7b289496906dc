//! Transport session, the only owner of the WebSocket connection.
//!
//! The connection is split once. The sink half moves into a writer task that
//! drains a bounded queue, so each `write_frame` call becomes exactly one
//! WebSocket message no matter how many producers write at once. The stream
//! half moves into a reader task that forwards every inbound frame to
//! [`InboundFrames`].

mod state;

pub use state::SessionState;

use std::sync::Arc;

use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use url::Url;

use crate::error::{ConnectError, SessionError, TransportError};
use state::StateCell;

/// Frames waiting for the writer. Producers block once it is full.
const OUTBOUND_QUEUE: usize = 64;

struct WriteRequest {
    message: Message,
    reply: oneshot::Sender<Result<(), SessionError>>,
}

/// Cloneable handle to one live connection.
#[derive(Clone)]
pub struct Session {
    outbound: mpsc::Sender<WriteRequest>,
    state: StateCell,
    tasks: Arc<[AbortHandle; 2]>,
}

/// Inbound frames in arrival order. Ends when the connection does.
pub struct InboundFrames {
    rx: mpsc::UnboundedReceiver<Bytes>,
}

impl InboundFrames {
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }
}

impl Session {
    /// Dial `raw_url` and attach a session to the connection.
    pub async fn connect(raw_url: &str) -> Result<(Session, InboundFrames), ConnectError> {
        let url = Url::parse(raw_url).map_err(|source| ConnectError::InvalidUrl {
            url: raw_url.to_string(),
            source,
        })?;
        // no TLS backend: plain ws only
        if url.scheme() != "ws" {
            return Err(ConnectError::UnsupportedScheme(url.scheme().to_string()));
        }

        let (stream, response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|source| ConnectError::Dial {
                url: url.to_string(),
                source,
            })?;
        tracing::info!(%url, status = %response.status(), "connected");

        Ok(Self::attach(stream))
    }

    /// Take ownership of an established message stream.
    pub fn attach<S>(stream: S) -> (Session, InboundFrames)
    where
        S: Stream<Item = Result<Message, tungstenite::Error>>
            + Sink<Message, Error = tungstenite::Error>
            + Send
            + 'static,
    {
        let (sink, source) = stream.split();
        let state = StateCell::new();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let writer = tokio::spawn(write_loop(sink, outbound_rx, state.clone()));
        let reader = tokio::spawn(read_loop(source, inbound_tx, state.clone()));

        let session = Session {
            outbound: outbound_tx,
            state,
            tasks: Arc::new([writer.abort_handle(), reader.abort_handle()]),
        };
        (session, InboundFrames { rx: inbound_rx })
    }

    /// Write one frame. Resolves once the frame is on the wire.
    ///
    /// Fails with `SessionError::Closed` without touching the connection once
    /// the session has left `Connected`.
    pub async fn write_frame(&self, frame: Vec<u8>) -> Result<(), SessionError> {
        if self.state.current() != SessionState::Connected {
            return Err(SessionError::Closed);
        }
        let (reply, done) = oneshot::channel();
        self.outbound
            .send(WriteRequest {
                message: frame_message(frame),
                reply,
            })
            .await
            .map_err(|_| SessionError::Closed)?;
        done.await.map_err(|_| SessionError::Closed)?
    }

    pub fn state(&self) -> SessionState {
        self.state.current()
    }

    /// Graceful close: the writer sends a close frame, then the session is Closed.
    pub fn close(&self) {
        if self.state.begin_closing() {
            tracing::debug!("session close requested");
        }
    }

    /// Hard stop. In-flight writes are abandoned.
    pub fn shutdown(&self) {
        self.state.begin_closing();
        for task in self.tasks.iter() {
            task.abort();
        }
        self.state.mark_closed();
    }

    /// Resolves once the session is Closed.
    pub async fn closed(&self) {
        self.state.closed().await;
    }
}

/// Envelopes are JSON, so frames normally go out as text messages.
fn frame_message(frame: Vec<u8>) -> Message {
    match String::from_utf8(frame) {
        Ok(text) => Message::Text(text),
        Err(e) => Message::Binary(e.into_bytes()),
    }
}

async fn write_loop<K>(mut sink: K, mut requests: mpsc::Receiver<WriteRequest>, state: StateCell)
where
    K: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    loop {
        let request = tokio::select! {
            biased;
            _ = state.leaving_connected() => break,
            request = requests.recv() => match request {
                Some(r) => r,
                None => break,
            },
        };

        match sink.send(request.message).await {
            Ok(()) => {
                let _ = request.reply.send(Ok(()));
            }
            Err(e) => {
                tracing::warn!(error = %e, "frame write failed, closing session");
                state.begin_closing();
                let _ = request.reply.send(Err(TransportError::Write(e).into()));
                break;
            }
        }
    }

    requests.close();
    while let Ok(request) = requests.try_recv() {
        let _ = request.reply.send(Err(SessionError::Closed));
    }
    if let Err(e) = sink.close().await {
        tracing::debug!(error = %e, "close handshake did not complete");
    }
    state.mark_closed();
    tracing::debug!("session writer stopped");
}

async fn read_loop<R>(mut source: R, frames: mpsc::UnboundedSender<Bytes>, state: StateCell)
where
    R: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(next) = source.next().await {
        match next {
            Ok(Message::Text(text)) => {
                let _ = frames.send(Bytes::from(text));
            }
            Ok(Message::Binary(data)) => {
                let _ = frames.send(Bytes::from(data));
            }
            Ok(Message::Close(frame)) => {
                tracing::debug!(?frame, "peer closed the connection");
                break;
            }
            // ping/pong is answered by tungstenite
            Ok(_) => {}
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => break,
            Err(e) => {
                let e = TransportError::Read(e);
                tracing::warn!(error = %e, "session read failed");
                break;
            }
        }
    }

    if state.begin_closing() {
        tracing::debug!("inbound stream ended, closing session");
    }
}
