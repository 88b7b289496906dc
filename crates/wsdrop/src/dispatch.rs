//! Routes inbound frames by envelope kind.
//!
//! A frame that fails to decode is logged and skipped; one bad frame never
//! ends the inbound loop.

use std::path::{Path, PathBuf};

use wsdrop_core::chunk::{content_digest, CompletedTransfer, ReassemblyError};
use wsdrop_core::{DecodeError, Envelope, EnvelopeKind, FileChunk, Reassembler, ReassemblyLimits};

use crate::session::InboundFrames;

/// Outcome of one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// The peer announced itself.
    Identity(String),
    /// A file chunk was buffered; its transfer is not finished yet.
    ChunkAccepted { file_name: String, sequence: u32 },
    FileCompleted(ReceivedFile),
    /// Valid envelope of a kind this client does not handle.
    Ignored(EnvelopeKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFile {
    pub file_name: String,
    pub bytes: usize,
    pub parts: u32,
    pub digest: [u8; 32],
    pub saved_to: Option<PathBuf>,
}

/// Totals reported when the inbound sequence ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundSummary {
    pub frames: usize,
    pub rejected: usize,
    pub identities: Vec<String>,
    pub files: Vec<ReceivedFile>,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Reassembly(#[from] ReassemblyError),

    #[error("refusing to store file under name {0:?}")]
    UnsafeName(String),

    #[error("failed to store {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct InboundDispatcher {
    reassembler: Reassembler,
    /// Where completed files are written. None = log only.
    storage: Option<PathBuf>,
}

impl InboundDispatcher {
    pub fn new(storage: Option<PathBuf>) -> Self {
        Self {
            reassembler: Reassembler::new(),
            storage,
        }
    }

    /// Bound what the peer can make us buffer.
    pub fn with_limits(mut self, limits: ReassemblyLimits) -> Self {
        self.reassembler = Reassembler::with_limits(limits);
        self
    }

    pub async fn handle_frame(&mut self, frame: &[u8]) -> Result<Dispatched, DispatchError> {
        let envelope = Envelope::decode(frame)?;
        tracing::debug!(kind = %envelope.kind, len = envelope.payload.len(), "recv");

        match &envelope.kind {
            EnvelopeKind::Initial => {
                let identity = String::from_utf8_lossy(&envelope.payload).into_owned();
                tracing::info!(identity, "peer identified");
                Ok(Dispatched::Identity(identity))
            }
            EnvelopeKind::File => {
                let chunk = FileChunk::from_envelope(&envelope)?;
                if chunk.sequence == 1 && self.reassembler.is_active(&chunk.file_name) {
                    tracing::warn!(
                        file_name = %chunk.file_name,
                        "peer restarted an inbound file, partial data discarded"
                    );
                }
                let (file_name, sequence) = (chunk.file_name.clone(), chunk.sequence);
                match self.reassembler.accept(chunk)? {
                    Some(done) => Ok(Dispatched::FileCompleted(self.complete(done).await?)),
                    None => Ok(Dispatched::ChunkAccepted {
                        file_name,
                        sequence,
                    }),
                }
            }
            other => {
                tracing::debug!(kind = %other, "ignoring envelope");
                Ok(Dispatched::Ignored(other.clone()))
            }
        }
    }

    async fn complete(&self, done: CompletedTransfer) -> Result<ReceivedFile, DispatchError> {
        let digest = content_digest(&done.content);
        let saved_to = match &self.storage {
            Some(dir) => Some(store(dir, &done).await?),
            None => None,
        };
        tracing::info!(
            file_name = %done.file_name,
            bytes = done.content.len(),
            parts = done.parts,
            digest = hex::encode(&digest[..8]),
            saved = saved_to.is_some(),
            "file received"
        );
        Ok(ReceivedFile {
            file_name: done.file_name,
            bytes: done.content.len(),
            parts: done.parts,
            digest,
            saved_to,
        })
    }

    /// Consume inbound frames until the session ends.
    pub async fn run(mut self, mut frames: InboundFrames) -> InboundSummary {
        let mut summary = InboundSummary::default();
        while let Some(frame) = frames.recv().await {
            summary.frames += 1;
            match self.handle_frame(&frame).await {
                Ok(Dispatched::Identity(identity)) => summary.identities.push(identity),
                Ok(Dispatched::FileCompleted(file)) => summary.files.push(file),
                Ok(_) => {}
                Err(e) => {
                    summary.rejected += 1;
                    tracing::warn!(error = %e, len = frame.len(), "inbound frame rejected");
                }
            }
        }

        let pending = self.reassembler.in_progress();
        if !pending.is_empty() {
            tracing::warn!(?pending, "connection ended with incomplete inbound files");
        }
        tracing::info!(
            frames = summary.frames,
            rejected = summary.rejected,
            "inbound stream ended"
        );
        summary
    }
}

/// Write under `dir`, keeping only the final component of the peer's name.
async fn store(dir: &Path, done: &CompletedTransfer) -> Result<PathBuf, DispatchError> {
    let name = Path::new(&done.file_name)
        .file_name()
        .ok_or_else(|| DispatchError::UnsafeName(done.file_name.clone()))?;
    let path = dir.join(name);

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| DispatchError::Store {
            path: dir.to_path_buf(),
            source,
        })?;
    tokio::fs::write(&path, &done.content)
        .await
        .map_err(|source| DispatchError::Store {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}
