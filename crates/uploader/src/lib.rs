//! Upload orchestration.
//!
//! [`Uploader::upload_file`] is the single entry point: it runs one file
//! through hashing (when deduplicating), authorization, an optional
//! existence probe and the transfer, and reports a [`TransferOutcome`].

pub mod analytics;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod types;

pub use analytics::{AnalyticsSink, NoopSink, TracingSink};
pub use config::UploaderConfig;
pub use error::UploadError;
pub use orchestrator::{UploadOrchestrator, Uploader};
pub use types::{TransferOutcome, UploadOptions, UploadState};

pub use zww_transfer::{FileHandle, ProgressCallback, ProgressEvent};
