use md5::{Digest, Md5};

use crate::chunked::ChunkReader;
use crate::types::{Chunk, ContentDigest, FileHandle};
use crate::{HashError, ReadError};

/// Incremental MD5 over the chunks of a single file.
///
/// The hasher knows how many bytes the file holds, so it can refuse to
/// produce a digest over a prefix. Chunks must be fed in offset order.
pub struct StreamingHasher {
    state: Option<Md5>,
    expected: u64,
    consumed: u64,
}

impl StreamingHasher {
    /// Creates a hasher for a file of `expected_len` bytes.
    pub fn new(expected_len: u64) -> Self {
        Self {
            state: Some(Md5::new()),
            expected: expected_len,
            consumed: 0,
        }
    }

    /// Feeds the next chunk.
    pub fn update(&mut self, chunk: &Chunk) -> Result<(), HashError> {
        let Some(state) = self.state.as_mut() else {
            return Err(HashError::Finalized);
        };
        if chunk.offset != self.consumed {
            return Err(HashError::OutOfOrder {
                offset: chunk.offset,
                expected: self.consumed,
            });
        }
        let len = chunk.len() as u64;
        if self.consumed + len > self.expected {
            return Err(HashError::Overrun {
                expected: self.expected,
            });
        }

        state.update(&chunk.data);
        self.consumed += len;
        Ok(())
    }

    /// Produces the digest. Fails unless every byte has been fed.
    ///
    /// An incomplete hasher stays usable; a finalized one rejects all
    /// further calls.
    pub fn finalize(&mut self) -> Result<ContentDigest, HashError> {
        if self.state.is_none() {
            return Err(HashError::Finalized);
        }
        if self.consumed < self.expected {
            return Err(HashError::Incomplete {
                consumed: self.consumed,
                expected: self.expected,
            });
        }
        let Some(state) = self.state.take() else {
            return Err(HashError::Finalized);
        };

        let mut out = [0u8; 16];
        out.copy_from_slice(&state.finalize());
        Ok(ContentDigest::new(out))
    }

    /// Bytes fed so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn is_finalized(&self) -> bool {
        self.state.is_none()
    }
}

/// Errors from [`hash_file`].
#[derive(Debug, thiserror::Error)]
pub enum HashFileError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Digests the file behind `handle`, reading it in `chunk_size` chunks.
pub async fn hash_file(handle: &FileHandle, chunk_size: usize) -> Result<ContentDigest, HashFileError> {
    let mut reader = ChunkReader::open(handle, chunk_size).await?;
    let mut hasher = StreamingHasher::new(handle.size);
    while let Some(chunk) = reader.next_chunk().await? {
        hasher.update(&chunk)?;
    }
    Ok(hasher.finalize()?)
}
