//! wsdrop integration test harness.
//!
//! Every test runs the real client against an in-process WebSocket server
//! bound to 127.0.0.1:0. The server accepts one connection, sends its
//! scripted greeting, and records every text frame the client writes.

mod failures;
mod session;
mod transfer;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use wsdrop::identity::FixedEntropy;
use wsdrop::{Client, RunOutcome};
use wsdrop_core::config::WsdropConfig;
use wsdrop_core::{Envelope, EnvelopeKind, FileChunk};

// ── Test server ──────────────────────────────────────────────────────────────

/// How long any single wait on the server may take.
pub const WAIT: Duration = Duration::from_secs(5);

/// What the server does besides recording.
#[derive(Default)]
pub struct ServerScript {
    /// Text frames sent right after the WebSocket handshake.
    pub greeting: Vec<String>,
    /// Send a close frame after this many frames were received.
    pub close_after: Option<usize>,
}

pub struct TestServer {
    pub url: String,
    received: mpsc::UnboundedReceiver<String>,
    pub handle: JoinHandle<Result<()>>,
}

impl TestServer {
    /// Next recorded frame, or an error after `WAIT`.
    pub async fn next_frame(&mut self) -> Result<String> {
        tokio::time::timeout(WAIT, self.received.recv())
            .await
            .context("timed out waiting for a frame")?
            .context("server stopped before the frame arrived")
    }

    pub async fn frames(&mut self, n: usize) -> Result<Vec<String>> {
        let mut frames = Vec::with_capacity(n);
        for _ in 0..n {
            frames.push(self.next_frame().await?);
        }
        Ok(frames)
    }

    /// Frames recorded after the connection ended.
    pub async fn remaining(mut self) -> Result<Vec<String>> {
        tokio::time::timeout(WAIT, self.handle)
            .await
            .context("server did not finish")???;
        let mut frames = Vec::new();
        while let Ok(frame) = self.received.try_recv() {
            frames.push(frame);
        }
        Ok(frames)
    }
}

pub async fn spawn_server(script: ServerScript) -> Result<TestServer> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, received) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await?;
        let mut ws = tokio_tungstenite::accept_async(tcp).await?;

        for text in script.greeting {
            ws.send(Message::Text(text)).await?;
        }

        let mut seen = 0;
        while let Some(msg) = ws.next().await {
            if let Message::Text(text) = msg? {
                seen += 1;
                let _ = tx.send(text);
                if script.close_after == Some(seen) {
                    ws.close(None).await?;
                }
            }
        }
        Ok(())
    });

    Ok(TestServer {
        url: format!("ws://{addr}/ws"),
        received,
        handle,
    })
}

// ── Frame helpers ────────────────────────────────────────────────────────────

/// A recorded frame, decoded.
pub enum Seen {
    Initial(String),
    Chunk(FileChunk),
}

pub fn decode(frame: &str) -> Result<Seen> {
    let envelope = Envelope::decode(frame.as_bytes())?;
    match envelope.kind {
        EnvelopeKind::Initial => Ok(Seen::Initial(String::from_utf8(envelope.payload.to_vec())?)),
        EnvelopeKind::File => Ok(Seen::Chunk(FileChunk::from_envelope(&envelope)?)),
        other => anyhow::bail!("unexpected envelope kind {other}"),
    }
}

/// Split recorded frames into handshake payloads and file chunks (in wire order).
pub fn partition(frames: &[String]) -> Result<(Vec<String>, Vec<FileChunk>)> {
    let mut initials = Vec::new();
    let mut chunks = Vec::new();
    for frame in frames {
        match decode(frame)? {
            Seen::Initial(identity) => initials.push(identity),
            Seen::Chunk(chunk) => chunks.push(chunk),
        }
    }
    Ok((initials, chunks))
}

// ── Client helpers ───────────────────────────────────────────────────────────

/// Config pointing at `server`, with a deterministic suffix of 42.
pub fn client_for(server: &TestServer, file: &Path) -> (WsdropConfig, Arc<FixedEntropy>) {
    let mut config = WsdropConfig::default();
    config.server.url = server.url.clone();
    config.transfer.file_path = file.to_path_buf();
    config.transfer.close_when_done = true;
    (config, Arc::new(FixedEntropy(42)))
}

pub fn client(config: WsdropConfig, entropy: Arc<FixedEntropy>) -> Client {
    Client::new(config).with_entropy(entropy)
}

// ── ScratchDir ───────────────────────────────────────────────────────────────

static SCRATCH_SEQ: AtomicUsize = AtomicUsize::new(0);

/// Unique temp directory, removed on drop (also during a test panic).
pub struct ScratchDir(PathBuf);

impl ScratchDir {
    pub fn new(tag: &str) -> Self {
        let n = SCRATCH_SEQ.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!("wsdrop-it-{tag}-{}-{n}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).expect("create scratch dir");
        Self(dir)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn write(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.0.join(name);
        std::fs::write(&path, content).expect("write scratch file");
        path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}
