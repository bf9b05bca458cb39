use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};

use futures_util::Stream;
use md5::{Digest, Md5};
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::oneshot;

use crate::progress::ProgressMonitor;
use crate::types::{Chunk, ContentDigest, FileHandle};
use crate::{DEFAULT_CHUNK_SIZE, ReadError};

// ---------------------------------------------------------------------------
// Digest helpers
// ---------------------------------------------------------------------------

/// Computes the MD5 digest of `data` in one pass.
pub fn digest_bytes(data: &[u8]) -> ContentDigest {
    let hash = Md5::digest(data);
    let mut out = [0u8; 16];
    out.copy_from_slice(&hash);
    ContentDigest::new(out)
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads a byte source sequentially in fixed-size chunks.
///
/// At most one chunk of data is buffered at a time. Chunk boundaries are
/// deterministic: chunk `i` covers `[i * chunk_size, min((i + 1) * chunk_size, size))`.
pub struct ChunkReader<R = File> {
    reader: R,
    chunk_size: usize,
    size: u64,
    offset: u64,
    index: u64,
    pending: Vec<u8>,
    filled: usize,
}

impl ChunkReader<File> {
    /// Opens the file behind `handle` for chunked reading.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] (64 KiB) is used.
    pub async fn open(handle: &FileHandle, chunk_size: usize) -> Result<Self, ReadError> {
        let file = File::open(&handle.path).await?;
        Ok(Self::new(file, handle.size, chunk_size))
    }
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    /// Wraps an arbitrary async reader expected to yield exactly `size` bytes.
    pub fn new(reader: R, size: u64, chunk_size: usize) -> Self {
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Self {
            reader,
            chunk_size,
            size,
            offset: 0,
            index: 0,
            pending: Vec::new(),
            filled: 0,
        }
    }

    /// Reads the next chunk. Returns `None` once `size` bytes were yielded.
    pub async fn next_chunk(&mut self) -> Result<Option<Chunk>, ReadError> {
        std::future::poll_fn(|cx| self.poll_next_chunk(cx)).await
    }

    /// Poll form of [`next_chunk`](Self::next_chunk).
    ///
    /// A partially filled chunk survives `Pending` and is completed on the
    /// next poll.
    pub fn poll_next_chunk(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<Chunk>, ReadError>> {
        let remaining = self.size - self.offset;
        if remaining == 0 {
            return Poll::Ready(Ok(None));
        }

        let want = remaining.min(self.chunk_size as u64) as usize;
        if self.pending.len() != want {
            self.pending = vec![0u8; want];
            self.filled = 0;
        }

        while self.filled < want {
            let mut buf = ReadBuf::new(&mut self.pending[self.filled..]);
            ready!(Pin::new(&mut self.reader).poll_read(cx, &mut buf))?;
            let n = buf.filled().len();
            if n == 0 {
                return Poll::Ready(Err(ReadError::Truncated {
                    offset: self.offset + self.filled as u64,
                    expected: self.size,
                }));
            }
            self.filled += n;
        }

        let chunk = Chunk {
            index: self.index,
            offset: self.offset,
            data: std::mem::take(&mut self.pending),
        };
        self.filled = 0;
        self.offset += want as u64;
        self.index += 1;
        Poll::Ready(Ok(Some(chunk)))
    }

    /// Converts the reader into a request body stream.
    pub fn into_body_stream(self, monitor: ProgressMonitor) -> BodyStream<R> {
        BodyStream {
            reader: self,
            monitor,
            start_signal: None,
            failure: Arc::new(Mutex::new(None)),
            done: false,
        }
    }

    /// Current byte offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Total bytes the source is expected to yield.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Bytes remaining to read.
    pub fn remaining(&self) -> u64 {
        self.size - self.offset
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

// ---------------------------------------------------------------------------
// BodyStream
// ---------------------------------------------------------------------------

/// Slot where a [`BodyStream`] parks the read error that ended it.
pub type ReadFailure = Arc<Mutex<Option<ReadError>>>;

/// Streams a [`ChunkReader`] as an HTTP request body.
///
/// Every yielded chunk advances the progress monitor. The optional start
/// signal fires the first time the transport polls the body, which is the
/// earliest point at which bytes can leave the process.
pub struct BodyStream<R = File> {
    reader: ChunkReader<R>,
    monitor: ProgressMonitor,
    start_signal: Option<oneshot::Sender<()>>,
    failure: ReadFailure,
    done: bool,
}

impl<R> BodyStream<R> {
    /// Fires `tx` on the first poll.
    pub fn with_start_signal(mut self, tx: oneshot::Sender<()>) -> Self {
        self.start_signal = Some(tx);
        self
    }

    /// Shared handle to the read error that terminated the stream, if any.
    ///
    /// Transports only see an opaque body error; this keeps the original
    /// [`ReadError`] reachable for the caller.
    pub fn failure(&self) -> ReadFailure {
        Arc::clone(&self.failure)
    }
}

impl<R: AsyncRead + Unpin> Stream for BodyStream<R> {
    type Item = Result<Vec<u8>, std::io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let Some(tx) = this.start_signal.take() {
            let _ = tx.send(());
        }
        if this.done {
            return Poll::Ready(None);
        }

        match ready!(this.reader.poll_next_chunk(cx)) {
            Ok(Some(chunk)) => {
                this.monitor.advance(chunk.len() as u64);
                Poll::Ready(Some(Ok(chunk.data)))
            }
            Ok(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            Err(e) => {
                this.done = true;
                let io = std::io::Error::other(e.to_string());
                if let Ok(mut slot) = this.failure.lock() {
                    *slot = Some(e);
                }
                Poll::Ready(Some(Err(io)))
            }
        }
    }
}
