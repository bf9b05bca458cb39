use std::fmt;

use tokio_util::sync::CancellationToken;
use zww_transfer::ProgressCallback;

use crate::UploadError;

/// Terminal result of one upload call.
#[derive(Debug)]
pub enum TransferOutcome {
    /// The object was written; carries its URL.
    Success(String),
    /// Identical content was already stored; carries the existing URL.
    Skipped(String),
    Failed(UploadError),
}

impl TransferOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Object URL for successful and skipped uploads.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Success(url) | Self::Skipped(url) => Some(url),
            Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&UploadError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Per-call upload options.
#[derive(Clone, Default)]
pub struct UploadOptions {
    /// Name the object after its MD5 and skip it if it already exists.
    pub dedup: bool,
    pub on_progress: Option<ProgressCallback>,
    pub cancel: Option<CancellationToken>,
}

impl UploadOptions {
    pub fn dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Stage an upload is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Hashing,
    Authorizing,
    Probing,
    Transferring,
    Succeeded,
    Skipped,
    Failed,
}

impl UploadState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Hashing => "hashing",
            Self::Authorizing => "authorizing",
            Self::Probing => "probing",
            Self::Transferring => "transferring",
            Self::Succeeded => "succeeded",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Skipped | Self::Failed)
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
