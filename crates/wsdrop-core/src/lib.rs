//! wsdrop-core: wire format, chunking, and configuration.
//! The client crate and the integration tests depend on this one.

pub mod chunk;
pub mod config;
pub mod message;
pub mod wire;

pub use chunk::{split, Part, Parts, Reassembler, ReassemblyLimits, SplitError, SplitPolicy};
pub use message::{ChunkKind, FileChunk};
pub use wire::{DecodeError, EncodeError, Envelope, EnvelopeKind};
