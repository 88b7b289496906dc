//! wsdrop wire format. Every frame travels in the outer envelope defined here.
//!
//! An envelope is a JSON object with two fields:
//!
//! ```text
//! { "type": "INITIAL" | "FILE" | <other>, "data": <base64> }
//! ```
//!
//! `data` is standard, padded base64 so arbitrary payload bytes survive a
//! text channel. The envelope never inspects its payload; `FILE` payloads are
//! serialized [`FileChunk`](crate::message::FileChunk) records, so chunk bytes
//! end up base64-encoded twice on the wire.

use std::borrow::Cow;
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

// ── Envelope kinds ───────────────────────────────────────────────────────────

/// Wire tag of the handshake envelope.
pub const KIND_INITIAL: &str = "INITIAL";

/// Wire tag of the file-transfer envelope.
pub const KIND_FILE: &str = "FILE";

/// What an envelope carries.
///
/// Unknown tags are kept verbatim in `Other` so newer peers can add kinds
/// without breaking older clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EnvelopeKind {
    /// Handshake payload: the client identity string.
    Initial,
    /// File-transfer payload: one serialized `FileChunk`.
    File,
    Other(String),
}

impl EnvelopeKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Initial => KIND_INITIAL,
            Self::File => KIND_FILE,
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for EnvelopeKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            KIND_INITIAL => Self::Initial,
            KIND_FILE => Self::File,
            _ => Self::Other(tag),
        }
    }
}

impl From<EnvelopeKind> for String {
    fn from(kind: EnvelopeKind) -> String {
        match kind {
            EnvelopeKind::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Envelope ─────────────────────────────────────────────────────────────────

/// A decoded envelope. Immutable once built; handed to the session by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub kind: EnvelopeKind,
    pub payload: Bytes,
}

/// On-wire shape of an envelope.
#[derive(Serialize, Deserialize)]
struct EnvelopeRecord<'a> {
    #[serde(rename = "type")]
    kind: EnvelopeKind,
    #[serde(borrow)]
    data: Cow<'a, str>,
}

impl Envelope {
    pub fn new(kind: EnvelopeKind, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    pub fn initial(payload: impl Into<Bytes>) -> Self {
        Self::new(EnvelopeKind::Initial, payload)
    }

    pub fn file(payload: impl Into<Bytes>) -> Self {
        Self::new(EnvelopeKind::File, payload)
    }

    /// Serialize to wire text.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let record = EnvelopeRecord {
            kind: self.kind.clone(),
            data: Cow::Owned(encode_base64(&self.payload)),
        };
        serde_json::to_vec(&record).map_err(|source| EncodeError::Serialize {
            what: "envelope",
            source,
        })
    }

    /// Parse wire text. Fails on anything that is not an envelope record or
    /// whose `data` is not valid base64.
    pub fn decode(wire: &[u8]) -> Result<Self, DecodeError> {
        let record: EnvelopeRecord<'_> =
            serde_json::from_slice(wire).map_err(|source| DecodeError::Malformed {
                what: "envelope",
                source,
            })?;
        let payload = decode_base64("envelope", &record.data)?;
        Ok(Self {
            kind: record.kind,
            payload: Bytes::from(payload),
        })
    }
}

// ── Base64 ───────────────────────────────────────────────────────────────────

pub(crate) fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub(crate) fn decode_base64(what: &'static str, text: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD
        .decode(text)
        .map_err(|source| DecodeError::InvalidBase64 { what, source })
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// A value could not be serialized to wire text.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Wire text could not be interpreted.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed {what} record: {source}")]
    Malformed {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base64 in {what}: {source}")]
    InvalidBase64 {
        what: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("expected a {} envelope, got {0}", KIND_FILE)]
    UnexpectedKind(EnvelopeKind),

    #[error("chunk number must be positive")]
    ZeroSequence,
}

// ── Tests ────────────────────────────────────────────────────────────────────
