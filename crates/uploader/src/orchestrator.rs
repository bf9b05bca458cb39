//! Upload pipeline: hash, authorize, probe, transfer.
//!
//! ```text
//! Idle -> [dedup] Hashing -> Authorizing -> [dedup] Probing -> Transferring
//!                                      \                   \-> Skipped
//!                                       \-> Failed          Transferring -> Succeeded | Failed
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use zww_oss::{
    Existence, ExistenceChecker, HttpTransport, PutTransport, TransferClient, UploadAuthorizer,
};
use zww_transfer::{FileHandle, hash_file};

use crate::analytics::{
    AnalyticsSink, TracingSink, UPLOAD_FAILED, UPLOAD_SKIPPED, UPLOAD_START, UPLOAD_SUCCESS,
    upload_payload,
};
use crate::config::UploaderConfig;
use crate::error::UploadError;
use crate::types::{TransferOutcome, UploadOptions, UploadState};

/// Shared, immutable upload machinery. Cheap to clone.
#[derive(Clone)]
pub struct Uploader {
    authorizer: UploadAuthorizer,
    checker: ExistenceChecker,
    transfer: Arc<TransferClient<Arc<dyn PutTransport>>>,
    analytics: Arc<dyn AnalyticsSink>,
    chunk_size: usize,
    stall_timeout: Duration,
}

impl Uploader {
    /// Builds an uploader with its own HTTP client.
    pub fn new(config: &UploaderConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("zww-upload/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(config, http))
    }

    /// Builds an uploader on top of an existing HTTP client.
    pub fn with_client(config: &UploaderConfig, http: reqwest::Client) -> Self {
        let chunk_size = config.chunk_size();
        let stall_timeout = config.stall_timeout();
        let transport: Arc<dyn PutTransport> = Arc::new(HttpTransport::new(http.clone()));

        Self {
            authorizer: UploadAuthorizer::new(http.clone(), config.authorizer_config()),
            checker: ExistenceChecker::new(http).with_timeout(config.probe_timeout()),
            transfer: Arc::new(transfer_client(transport, chunk_size, stall_timeout)),
            analytics: Arc::new(TracingSink),
            chunk_size,
            stall_timeout,
        }
    }

    /// Replaces the transport used for `PUT` requests.
    pub fn with_transport(mut self, transport: Arc<dyn PutTransport>) -> Self {
        self.transfer = Arc::new(transfer_client(
            transport,
            self.chunk_size,
            self.stall_timeout,
        ));
        self
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = analytics;
        self
    }

    /// Uploads one file. Never panics and always produces an outcome.
    pub async fn upload_file(&self, file: &FileHandle, options: UploadOptions) -> TransferOutcome {
        UploadOrchestrator::new(self, options).run(file).await
    }
}

fn transfer_client(
    transport: Arc<dyn PutTransport>,
    chunk_size: usize,
    stall_timeout: Duration,
) -> TransferClient<Arc<dyn PutTransport>> {
    TransferClient::new(transport)
        .with_chunk_size(chunk_size)
        .with_stall_timeout(stall_timeout)
}

/// Drives a single upload through its stages.
pub struct UploadOrchestrator<'a> {
    uploader: &'a Uploader,
    options: UploadOptions,
    cancel: CancellationToken,
    state: UploadState,
}

impl<'a> UploadOrchestrator<'a> {
    pub fn new(uploader: &'a Uploader, options: UploadOptions) -> Self {
        let cancel = options.cancel.clone().unwrap_or_default();
        Self {
            uploader,
            options,
            cancel,
            state: UploadState::Idle,
        }
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    /// Runs the pipeline to a terminal outcome.
    pub async fn run(mut self, file: &FileHandle) -> TransferOutcome {
        let payload = upload_payload(file, self.options.dedup);
        self.uploader.analytics.track(UPLOAD_START, payload.clone());

        let outcome = match self.execute(file).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.transition(file, UploadState::Failed);
                TransferOutcome::Failed(e)
            }
        };

        match &outcome {
            TransferOutcome::Success(url) => {
                info!(file = %file.name, url = %url, "upload succeeded");
                self.uploader
                    .analytics
                    .track(UPLOAD_SUCCESS, with_field(payload, "url", url));
            }
            TransferOutcome::Skipped(url) => {
                info!(file = %file.name, url = %url, "identical object already stored, skipped");
                self.uploader
                    .analytics
                    .track(UPLOAD_SKIPPED, with_field(payload, "url", url));
            }
            TransferOutcome::Failed(e) => {
                error!(file = %file.name, error = %e, "upload failed");
                self.uploader
                    .analytics
                    .track(UPLOAD_FAILED, with_field(payload, "error", &e.to_string()));
            }
        }
        outcome
    }

    async fn execute(&mut self, file: &FileHandle) -> Result<TransferOutcome, UploadError> {
        self.check_cancelled()?;
        let dedup = self.options.dedup;

        let object_name = if dedup {
            self.transition(file, UploadState::Hashing);
            let digest = self
                .cancellable(hash_file(file, self.uploader.chunk_size))
                .await??;
            debug!(file = %file.name, md5 = %digest, "content hashed");
            format!("{}{}", digest.to_hex(), file.extension())
        } else {
            file.name.clone()
        };

        self.check_cancelled()?;
        self.transition(file, UploadState::Authorizing);
        let authorization = self
            .cancellable(
                self.uploader
                    .authorizer
                    .authorize(&file.mime_type, &object_name),
            )
            .await??;

        if dedup {
            self.check_cancelled()?;
            self.transition(file, UploadState::Probing);
            let existence = self
                .cancellable(self.uploader.checker.probe(&authorization.destination_url))
                .await?;
            match existence {
                Existence::Exists => {
                    self.transition(file, UploadState::Skipped);
                    return Ok(TransferOutcome::Skipped(authorization.destination_url));
                }
                Existence::Absent => {}
                Existence::Unknown => {
                    debug!(url = %authorization.destination_url, "existence unknown, uploading anyway");
                }
            }
        }

        self.check_cancelled()?;
        self.transition(file, UploadState::Transferring);
        let url = self
            .uploader
            .transfer
            .transfer(
                &authorization,
                file,
                self.options.on_progress.clone(),
                &self.cancel,
            )
            .await?;

        self.transition(file, UploadState::Succeeded);
        Ok(TransferOutcome::Success(url))
    }

    fn transition(&mut self, file: &FileHandle, next: UploadState) {
        debug!(file = %file.name, from = %self.state, to = %next, "upload state change");
        self.state = next;
    }

    fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        Ok(())
    }

    /// Races `fut` against the cancellation token.
    async fn cancellable<F: Future>(&self, fut: F) -> Result<F::Output, UploadError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(UploadError::Cancelled),
            out = fut => Ok(out),
        }
    }
}

fn with_field(mut payload: serde_json::Value, key: &str, value: &str) -> serde_json::Value {
    if let Some(map) = payload.as_object_mut() {
        map.insert(key.into(), value.into());
    }
    payload
}
