//! Transfer producer. Reads one file, splits it and sends the chunks.
//!
//! Chunks are written one at a time and each write is awaited before the
//! next part is framed, so the peer always sees sequence numbers in order.

use std::path::PathBuf;

use bytes::Bytes;
use wsdrop_core::chunk::content_digest;
use wsdrop_core::{split, FileChunk, SplitPolicy};

use crate::error::ProducerError;
use crate::session::Session;

/// What one completed transfer put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub file_name: String,
    pub bytes: usize,
    pub parts: u32,
    /// BLAKE3 of the file content.
    pub digest: [u8; 32],
}

#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// Local file to read.
    pub path: PathBuf,
    /// Name announced to the peer.
    pub file_name: String,
    pub policy: SplitPolicy,
}

/// Read `request.path` and send it. A read failure stops only this producer.
pub async fn send_file(
    session: Session,
    request: TransferRequest,
) -> Result<TransferReport, ProducerError> {
    let content = tokio::fs::read(&request.path)
        .await
        .map_err(|source| ProducerError::Read {
            path: request.path.clone(),
            source,
        })?;
    tracing::debug!(path = %request.path.display(), bytes = content.len(), "file read");

    send_content(&session, &request.file_name, Bytes::from(content), request.policy).await
}

/// Send an in-memory payload as one transfer.
pub async fn send_content(
    session: &Session,
    file_name: &str,
    content: Bytes,
    policy: SplitPolicy,
) -> Result<TransferReport, ProducerError> {
    let digest = content_digest(&content);
    let parts = split(&content, policy)?;
    tracing::info!(
        file_name,
        bytes = content.len(),
        parts = parts.len(),
        digest = hex::encode(&digest[..8]),
        "sending file"
    );

    let mut sent = 0;
    for part in parts {
        let chunk = FileChunk::create(file_name, part);
        let frame = chunk.to_envelope()?.encode()?;
        session.write_frame(frame).await?;
        sent = chunk.sequence;
        tracing::debug!(
            file_name,
            number = chunk.sequence,
            is_last = chunk.is_last,
            len = chunk.data.len(),
            "chunk sent"
        );
    }

    tracing::info!(file_name, parts = sent, "file sent");
    Ok(TransferReport {
        file_name: file_name.to_string(),
        bytes: content.len(),
        parts: sent,
        digest,
    })
}
