//! Chunking: splitting a payload into numbered parts and putting it back
//! together on the receiving side.
//!
//! Every split policy upholds the same contract:
//!   - parts concatenate, in sequence order, to the original payload
//!   - sequence numbers start at 1 and have no gaps
//!   - exactly the last part has `is_last` set
//!   - an empty payload still yields one (empty) terminating part

use std::collections::HashMap;
use std::num::NonZeroUsize;

use bytes::{Bytes, BytesMut};

use crate::message::{ChunkKind, FileChunk};

/// Default upper bound for a single part.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 32 * 1024; // 32KB

/// How a payload is divided into parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPolicy {
    /// Two parts, split at `len / 2`.
    Halves,
    /// `ceil(len / n)` parts of at most `n` bytes.
    MaxChunkSize(NonZeroUsize),
}

impl SplitPolicy {
    /// Map a configured byte limit to a policy. 0 selects `Halves`.
    pub fn from_max_bytes(max_bytes: usize) -> Self {
        match NonZeroUsize::new(max_bytes) {
            Some(n) => Self::MaxChunkSize(n),
            None => Self::Halves,
        }
    }
}

impl Default for SplitPolicy {
    fn default() -> Self {
        Self::from_max_bytes(DEFAULT_MAX_CHUNK_SIZE)
    }
}

/// One part of a split payload. `data` shares the source buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub sequence: u32,
    pub data: Bytes,
    pub is_last: bool,
}

/// Split `content` according to `policy`. Parts are produced lazily.
///
/// Fails when the payload would need more than `u32::MAX` parts, since the
/// wire carries sequence numbers as `u32`.
pub fn split(content: &Bytes, policy: SplitPolicy) -> Result<Parts, SplitError> {
    Ok(Parts {
        count: part_count(content.len(), policy)?,
        content: content.clone(),
        policy,
        next: 0,
    })
}

fn part_count(len: usize, policy: SplitPolicy) -> Result<u32, SplitError> {
    let parts = match policy {
        SplitPolicy::Halves if len == 0 => 1,
        SplitPolicy::Halves => 2,
        SplitPolicy::MaxChunkSize(max) => (len as u64).div_ceil(max.get() as u64).max(1),
    };
    u32::try_from(parts).map_err(|_| SplitError::TooManyParts { len, parts })
}

/// Iterator over the parts of one payload, in sequence order.
#[derive(Debug, Clone)]
pub struct Parts {
    content: Bytes,
    policy: SplitPolicy,
    count: u32,
    /// Parts already yielded.
    next: u32,
}

impl Parts {
    /// Byte range of the part at 0-based `index`.
    fn range(&self, index: usize) -> (usize, usize) {
        let len = self.content.len();
        match self.policy {
            SplitPolicy::Halves if self.count == 1 => (0, len),
            SplitPolicy::Halves if index == 0 => (0, len / 2),
            SplitPolicy::Halves => (len / 2, len),
            SplitPolicy::MaxChunkSize(max) => {
                let start = index * max.get();
                (start, len.min(start + max.get()))
            }
        }
    }
}

impl Iterator for Parts {
    type Item = Part;

    fn next(&mut self) -> Option<Part> {
        if self.next == self.count {
            return None;
        }
        let (start, end) = self.range(self.next as usize);
        self.next += 1;
        Some(Part {
            sequence: self.next,
            data: self.content.slice(start..end),
            is_last: self.next == self.count,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Parts {}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SplitError {
    #[error("{len} bytes would need {parts} parts, more than a u32 sequence can number")]
    TooManyParts { len: usize, parts: u64 },
}

/// BLAKE3 digest of a payload, used to identify transfers in logs.
pub fn content_digest(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

// ── Reassembly ───────────────────────────────────────────────────────────────

/// Default cap on inbound transfers assembled at the same time.
pub const DEFAULT_MAX_INBOUND_TRANSFERS: usize = 16;

/// Default cap on the size of one inbound transfer.
pub const DEFAULT_MAX_INBOUND_BYTES: usize = 64 * 1024 * 1024; // 64MB

/// Bounds on what a peer can make the receiving side buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReassemblyLimits {
    /// Unfinished transfers held at once.
    pub max_transfers: usize,
    /// Bytes buffered for a single transfer.
    pub max_bytes: usize,
}

impl Default for ReassemblyLimits {
    fn default() -> Self {
        Self {
            max_transfers: DEFAULT_MAX_INBOUND_TRANSFERS,
            max_bytes: DEFAULT_MAX_INBOUND_BYTES,
        }
    }
}

/// A transfer whose final part has arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTransfer {
    pub file_name: String,
    pub content: Bytes,
    pub parts: u32,
}

/// Rebuilds inbound transfers from their chunks.
///
/// Chunks of one transfer must arrive in order: 1, 2, ... up to the chunk
/// with `is_last`. A chunk that breaks the order, or pushes past the
/// limits, drops the whole transfer. Part 1 for a name already in progress
/// starts that transfer over.
#[derive(Debug, Default)]
pub struct Reassembler {
    active: HashMap<String, Assembly>,
    limits: ReassemblyLimits,
}

#[derive(Debug)]
struct Assembly {
    next_sequence: u32,
    data: BytesMut,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: ReassemblyLimits) -> Self {
        Self {
            active: HashMap::new(),
            limits,
        }
    }

    /// Feed one chunk. Returns the finished transfer once its last part is in.
    pub fn accept(&mut self, chunk: FileChunk) -> Result<Option<CompletedTransfer>, ReassemblyError> {
        if chunk.kind != ChunkKind::Create {
            return Err(ReassemblyError::UnsupportedKind {
                file_name: chunk.file_name,
                kind: chunk.kind.to_string(),
            });
        }

        let previous = self.active.remove(&chunk.file_name);
        let mut assembly = match previous {
            // part 1 always (re)starts the transfer
            _ if chunk.sequence == 1 => {
                if !chunk.is_last && self.active.len() >= self.limits.max_transfers {
                    return Err(ReassemblyError::TooManyTransfers {
                        file_name: chunk.file_name,
                        limit: self.limits.max_transfers,
                    });
                }
                Assembly {
                    next_sequence: 1,
                    data: BytesMut::new(),
                }
            }
            Some(assembly) if assembly.next_sequence == chunk.sequence => assembly,
            previous => {
                return Err(ReassemblyError::OutOfOrder {
                    file_name: chunk.file_name,
                    expected: previous.map_or(1, |a| a.next_sequence),
                    got: chunk.sequence,
                });
            }
        };

        if assembly.data.len() + chunk.data.len() > self.limits.max_bytes {
            return Err(ReassemblyError::TooLarge {
                file_name: chunk.file_name,
                limit: self.limits.max_bytes,
            });
        }
        assembly.data.extend_from_slice(&chunk.data);
        assembly.next_sequence += 1;

        if chunk.is_last {
            return Ok(Some(CompletedTransfer {
                file_name: chunk.file_name,
                content: assembly.data.freeze(),
                parts: chunk.sequence,
            }));
        }
        self.active.insert(chunk.file_name, assembly);
        Ok(None)
    }

    /// Whether part 1 of `file_name` arrived and its last part has not.
    pub fn is_active(&self, file_name: &str) -> bool {
        self.active.contains_key(file_name)
    }

    /// Names of transfers still waiting for parts.
    pub fn in_progress(&self) -> Vec<String> {
        self.active.keys().cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReassemblyError {
    #[error("{file_name}: expected part {expected}, got {got}")]
    OutOfOrder {
        file_name: String,
        expected: u32,
        got: u32,
    },

    #[error("{file_name}: unsupported chunk kind {kind}")]
    UnsupportedKind { file_name: String, kind: String },

    #[error("{file_name}: already assembling {limit} files")]
    TooManyTransfers { file_name: String, limit: usize },

    #[error("{file_name}: larger than {limit} bytes")]
    TooLarge { file_name: String, limit: usize },
}
