//! Chunked file reading, streaming MD5 digests and upload progress.
//!
//! Everything in this crate is local computation over a file the caller
//! selected; the network side of an upload lives in `zww-oss`.

mod chunked;
mod hasher;
mod mime;
mod progress;
mod types;

pub use chunked::{BodyStream, ChunkReader, ReadFailure, digest_bytes};
pub use hasher::{HashFileError, StreamingHasher, hash_file};
pub use mime::{DEFAULT_MIME_TYPE, sniff_mime_type};
pub use progress::{ProgressCallback, ProgressEvent, ProgressMonitor, percent_complete};
pub use types::{Chunk, ContentDigest, FileHandle};

/// Default chunk size: 64 KiB.
///
/// Bounds how much file data is held in memory while hashing or streaming.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Errors raised while reading a local byte source.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("source ended at byte {offset} of {expected}")]
    Truncated { offset: u64, expected: u64 },

    #[error("not a regular file: {0}")]
    NotAFile(String),
}

/// Misuse of a [`StreamingHasher`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashError {
    #[error("digest requested after {consumed} of {expected} bytes")]
    Incomplete { consumed: u64, expected: u64 },

    #[error("hasher already finalized")]
    Finalized,

    #[error("chunk at offset {offset} arrived out of order (expected offset {expected})")]
    OutOfOrder { offset: u64, expected: u64 },

    #[error("chunk runs past the expected length of {expected} bytes")]
    Overrun { expected: u64 },
}
