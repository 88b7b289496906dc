//! File-transfer message: the payload of every `FILE` envelope.
//!
//! One `FileChunk` per part of a transfer:
//!
//! ```text
//! { "type": "CREATE", "fileName": <string>, "data": <base64>,
//!   "number": <positive integer>, "isLast": <bool> }
//! ```

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::chunk::Part;
use crate::wire::{decode_base64, encode_base64, DecodeError, EncodeError, Envelope, EnvelopeKind};

/// Wire tag of a chunk that creates (or appends to) a file on the peer.
pub const KIND_CREATE: &str = "CREATE";

/// Purpose of a chunk. Only `Create` is produced; other tags are carried
/// verbatim so a receiver can report them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChunkKind {
    Create,
    Other(String),
}

impl ChunkKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => KIND_CREATE,
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for ChunkKind {
    fn from(tag: String) -> Self {
        if tag == KIND_CREATE {
            Self::Create
        } else {
            Self::Other(tag)
        }
    }
}

impl From<ChunkKind> for String {
    fn from(kind: ChunkKind) -> String {
        match kind {
            ChunkKind::Create => KIND_CREATE.to_string(),
            ChunkKind::Other(tag) => tag,
        }
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One numbered part of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChunk {
    pub kind: ChunkKind,
    /// Destination name on the peer. Identical across a transfer.
    pub file_name: String,
    pub data: Bytes,
    /// 1-based position within the transfer.
    pub sequence: u32,
    /// Set on the final part only.
    pub is_last: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileChunkRecord<'a> {
    #[serde(rename = "type")]
    kind: ChunkKind,
    #[serde(borrow)]
    file_name: Cow<'a, str>,
    #[serde(borrow)]
    data: Cow<'a, str>,
    number: u32,
    is_last: bool,
}

impl FileChunk {
    /// Build the `CREATE` chunk for one splitter part.
    pub fn create(file_name: impl Into<String>, part: Part) -> Self {
        Self {
            kind: ChunkKind::Create,
            file_name: file_name.into(),
            data: part.data,
            sequence: part.sequence,
            is_last: part.is_last,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let record = FileChunkRecord {
            kind: self.kind.clone(),
            file_name: Cow::Borrowed(self.file_name.as_str()),
            data: Cow::Owned(encode_base64(&self.data)),
            number: self.sequence,
            is_last: self.is_last,
        };
        serde_json::to_vec(&record).map_err(|source| EncodeError::Serialize {
            what: "file chunk",
            source,
        })
    }

    pub fn decode(wire: &[u8]) -> Result<Self, DecodeError> {
        let record: FileChunkRecord<'_> =
            serde_json::from_slice(wire).map_err(|source| DecodeError::Malformed {
                what: "file chunk",
                source,
            })?;
        if record.number == 0 {
            return Err(DecodeError::ZeroSequence);
        }
        let data = decode_base64("file chunk", &record.data)?;
        Ok(Self {
            kind: record.kind,
            file_name: record.file_name.into_owned(),
            data: Bytes::from(data),
            sequence: record.number,
            is_last: record.is_last,
        })
    }

    /// Wrap this chunk in a `FILE` envelope.
    pub fn to_envelope(&self) -> Result<Envelope, EncodeError> {
        Ok(Envelope::file(self.encode()?))
    }

    /// Unwrap a chunk from a `FILE` envelope.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, DecodeError> {
        if envelope.kind != EnvelopeKind::File {
            return Err(DecodeError::UnexpectedKind(envelope.kind.clone()));
        }
        Self::decode(&envelope.payload)
    }
}
