use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use zww_transfer::{
    ChunkReader, FileHandle, ProgressCallback, ProgressEvent, ProgressMonitor, ReadFailure,
};

use crate::transport::{HttpTransport, PutRequest, PutResponse, PutTransport};
use crate::types::UploadAuthorization;
use crate::{DEFAULT_STALL_TIMEOUT, MAX_TRANSFER_ATTEMPTS, TransferError};

/// How a single attempt ended when it did not succeed.
enum AttemptError {
    /// Neither the body was polled nor the request finished before the
    /// stall deadline.
    Stalled,
    Failed(TransferError),
}

/// Uploads a file with one authorized `PUT`.
///
/// A transfer that has not started sending its body within the stall
/// timeout is aborted and retried once from the first byte. Once the body
/// is flowing there is no time limit.
pub struct TransferClient<T = HttpTransport> {
    transport: T,
    chunk_size: usize,
    stall_timeout: Duration,
}

impl TransferClient<HttpTransport> {
    pub fn http(http: reqwest::Client) -> Self {
        Self::new(HttpTransport::new(http))
    }
}

impl<T: PutTransport> TransferClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            chunk_size: zww_transfer::DEFAULT_CHUNK_SIZE,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_stall_timeout(mut self, stall_timeout: Duration) -> Self {
        self.stall_timeout = stall_timeout;
        self
    }

    pub fn stall_timeout(&self) -> Duration {
        self.stall_timeout
    }

    /// Streams `file` to `authorization.destination_url`.
    ///
    /// Progress for each attempt is reported through `on_progress`; a retry
    /// starts with an explicit `0` event. On success the final event is
    /// always `100` and the destination URL is returned.
    pub async fn transfer(
        &self,
        authorization: &UploadAuthorization,
        file: &FileHandle,
        on_progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<String, TransferError> {
        for attempt in 1..=MAX_TRANSFER_ATTEMPTS {
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }
            if attempt > 1 && authorization.is_expired() {
                warn!(url = %authorization.destination_url, "authorization expired, not retrying stalled transfer");
                return Err(TransferError::AuthorizationExpired);
            }

            match self
                .attempt(authorization, file, on_progress.clone(), cancel, attempt)
                .await
            {
                Ok(()) => {
                    info!(
                        url = %authorization.destination_url,
                        size = file.size,
                        attempt,
                        "transfer complete"
                    );
                    return Ok(authorization.destination_url.clone());
                }
                Err(AttemptError::Stalled) => {
                    warn!(
                        url = %authorization.destination_url,
                        attempt,
                        timeout_ms = self.stall_timeout.as_millis() as u64,
                        "transfer did not start in time"
                    );
                }
                Err(AttemptError::Failed(e)) => return Err(e),
            }
        }

        Err(TransferError::Stalled {
            attempts: MAX_TRANSFER_ATTEMPTS,
        })
    }

    async fn attempt(
        &self,
        authorization: &UploadAuthorization,
        file: &FileHandle,
        on_progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
        attempt: u32,
    ) -> Result<(), AttemptError> {
        let reader = ChunkReader::open(file, self.chunk_size)
            .await
            .map_err(|e| AttemptError::Failed(e.into()))?;

        let reported_full = Arc::new(AtomicBool::new(false));
        let mut monitor = ProgressMonitor::new(file.size, track_full(&on_progress, &reported_full));
        if attempt > 1 {
            monitor.reset();
        }

        let (start_tx, mut start_rx) = oneshot::channel();
        let body = reader.into_body_stream(monitor).with_start_signal(start_tx);
        let failure = body.failure();

        debug!(url = %authorization.destination_url, attempt, size = file.size, "starting PUT");
        let mut put = self.transport.put(PutRequest {
            url: authorization.destination_url.clone(),
            headers: authorization.required_headers.clone(),
            content_length: file.size,
            body,
        });

        // An empty body may never be polled; then only a finished request
        // beats the deadline.
        let stall = tokio::time::sleep(self.stall_timeout);
        tokio::pin!(stall);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AttemptError::Failed(TransferError::Cancelled)),
            result = &mut put => {
                return finish(result, &failure, &on_progress, &reported_full)
                    .map_err(AttemptError::Failed);
            }
            // A dropped sender means the transport discarded the body;
            // the put future reports why.
            _ = &mut start_rx => {}
            _ = &mut stall => return Err(AttemptError::Stalled),
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AttemptError::Failed(TransferError::Cancelled)),
            result = &mut put => {
                finish(result, &failure, &on_progress, &reported_full).map_err(AttemptError::Failed)
            }
        }
    }
}

/// Wraps the caller's callback so the client knows whether `100` went out.
fn track_full(
    on_progress: &Option<ProgressCallback>,
    reported_full: &Arc<AtomicBool>,
) -> Option<ProgressCallback> {
    let cb = on_progress.clone()?;
    let reported_full = Arc::clone(reported_full);
    Some(Arc::new(move |event: ProgressEvent| {
        if event.percent_complete == 100 {
            reported_full.store(true, Ordering::Relaxed);
        }
        cb(event);
    }))
}

fn finish(
    result: Result<PutResponse, TransferError>,
    failure: &ReadFailure,
    on_progress: &Option<ProgressCallback>,
    reported_full: &AtomicBool,
) -> Result<(), TransferError> {
    if let Ok(mut slot) = failure.lock()
        && let Some(e) = slot.take()
    {
        return Err(TransferError::Read(e));
    }

    let response = result?;
    if !response.is_success() {
        return Err(TransferError::Status {
            status: response.status,
            body: response.body,
        });
    }

    if !reported_full.load(Ordering::Relaxed)
        && let Some(cb) = on_progress
    {
        cb(ProgressEvent {
            percent_complete: 100,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_http::{MockResponse, MockServer};
    use crate::transport::PutFuture;
    use chrono::{TimeDelta, Utc};
    use futures_util::StreamExt;
    use std::io::Write;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicU32;
    use tempfile::TempDir;

    const STALL: Duration = Duration::from_millis(100);

    /// What the scripted transport does on a given attempt.
    #[derive(Clone, Copy)]
    enum Step {
        /// Never touches the body and never completes.
        Stall,
        /// Drains the body and answers with `status`.
        Respond(u16),
        /// Reads one chunk, waits `pause`, then drains and answers 200.
        SlowStart(Duration),
        /// Answers 200 without reading the body.
        RespondEarly,
    }

    struct ScriptedTransport {
        steps: Vec<Step>,
        calls: AtomicU32,
        received: Mutex<Vec<Vec<u8>>>,
        headers: Mutex<Vec<Vec<(String, String)>>>,
    }

    impl ScriptedTransport {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps,
                calls: AtomicU32::new(0),
                received: Mutex::new(Vec::new()),
                headers: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PutTransport for ScriptedTransport {
        fn put(&self, request: PutRequest) -> PutFuture<'_> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            let step = self.steps[n.min(self.steps.len() - 1)];
            self.headers.lock().unwrap().push(request.headers.clone());

            Box::pin(async move {
                let mut body = request.body;
                let mut bytes = Vec::new();
                match step {
                    Step::Stall => std::future::pending::<()>().await,
                    Step::RespondEarly => {
                        return Ok(PutResponse {
                            status: 200,
                            body: String::new(),
                        });
                    }
                    Step::SlowStart(pause) => {
                        if let Some(chunk) = body.next().await {
                            bytes.extend(chunk.map_err(|e| TransferError::Transport(e.to_string()))?);
                        }
                        tokio::time::sleep(pause).await;
                    }
                    Step::Respond(_) => {}
                }
                while let Some(chunk) = body.next().await {
                    bytes.extend(chunk.map_err(|e| TransferError::Transport(e.to_string()))?);
                }
                self.received.lock().unwrap().push(bytes);

                let status = match step {
                    Step::Respond(status) => status,
                    _ => 200,
                };
                Ok(PutResponse {
                    status,
                    body: if status == 200 { String::new() } else { "denied".into() },
                })
            })
        }
    }

    fn write_file(dir: &Path, name: &str, data: &[u8]) -> FileHandle {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(data).unwrap();
        FileHandle {
            path,
            name: name.into(),
            size: data.len() as u64,
            mime_type: "application/octet-stream".into(),
        }
    }

    fn authorization(url: &str, valid_for: TimeDelta) -> UploadAuthorization {
        UploadAuthorization {
            destination_url: url.into(),
            required_headers: vec![
                ("authorization".into(), "OSS key:sig".into()),
                ("Content-Type".into(), "application/octet-stream".into()),
                ("x-oss-date".into(), "Thu, 15 Oct 2026 08:00:00 GMT".into()),
            ],
            expires_at: Utc::now() + valid_for,
        }
    }

    fn recording() -> (ProgressCallback, Arc<Mutex<Vec<u8>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let cb: ProgressCallback = Arc::new(move |p: ProgressEvent| {
            s.lock().unwrap().push(p.percent_complete);
        });
        (cb, seen)
    }

    fn client(steps: Vec<Step>) -> TransferClient<ScriptedTransport> {
        TransferClient::new(ScriptedTransport::new(steps))
            .with_chunk_size(4)
            .with_stall_timeout(STALL)
    }

    #[tokio::test]
    async fn successful_transfer_reports_progress_to_hundred() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "a.bin", b"0123456789abcdef");
        let client = client(vec![Step::Respond(200)]);
        let (cb, seen) = recording();

        let url = client
            .transfer(
                &authorization("https://b/a.bin", TimeDelta::minutes(5)),
                &file,
                Some(cb),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(url, "https://b/a.bin");
        assert_eq!(client.transport.calls(), 1);
        assert_eq!(client.transport.received.lock().unwrap()[0], b"0123456789abcdef");
        assert_eq!(*seen.lock().unwrap(), vec![25, 50, 75, 100]);
        assert_eq!(
            client.transport.headers.lock().unwrap()[0][0],
            ("authorization".to_string(), "OSS key:sig".to_string())
        );
    }

    #[tokio::test]
    async fn stall_is_retried_once_with_progress_reset() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "a.bin", b"01234567");
        let client = client(vec![Step::Stall, Step::Respond(200)]);
        let (cb, seen) = recording();

        let result = client
            .transfer(
                &authorization("https://b/a.bin", TimeDelta::minutes(5)),
                &file,
                Some(cb),
                &CancellationToken::new(),
            )
            .await;

        assert!(result.is_ok());
        assert_eq!(client.transport.calls(), 2);
        assert_eq!(*seen.lock().unwrap(), vec![0, 50, 100]);
        assert_eq!(client.transport.received.lock().unwrap()[0], b"01234567");
    }

    #[tokio::test]
    async fn second_stall_fails() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "a.bin", b"01234567");
        let client = client(vec![Step::Stall]);

        let err = client
            .transfer(
                &authorization("https://b/a.bin", TimeDelta::minutes(5)),
                &file,
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::Stalled { attempts: 2 }));
        assert!(err.is_stall());
        assert_eq!(client.transport.calls(), 2);
    }

    #[tokio::test]
    async fn expired_authorization_is_not_retried() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "a.bin", b"01234567");
        let client = client(vec![Step::Stall, Step::Respond(200)]);

        // Expires while the first attempt waits for the stall deadline.
        let auth = authorization("https://b/a.bin", TimeDelta::milliseconds(20));
        let err = client
            .transfer(&auth, &file, None, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::AuthorizationExpired));
        assert_eq!(client.transport.calls(), 1);
    }

    #[tokio::test]
    async fn started_transfer_is_never_cut_off() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "a.bin", b"01234567");
        let client = client(vec![Step::SlowStart(STALL * 4)]);

        let result = client
            .transfer(
                &authorization("https://b/a.bin", TimeDelta::minutes(5)),
                &file,
                None,
                &CancellationToken::new(),
            )
            .await;

        assert!(result.is_ok());
        assert_eq!(client.transport.calls(), 1);
        assert_eq!(client.transport.received.lock().unwrap()[0], b"01234567");
    }

    #[tokio::test]
    async fn rejected_status_is_terminal() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "a.bin", b"01234567");
        let client = client(vec![Step::Respond(403)]);

        let err = client
            .transfer(
                &authorization("https://b/a.bin", TimeDelta::minutes(5)),
                &file,
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        match err {
            TransferError::Status { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "denied");
            }
            other => panic!("expected status error, got {other:?}"),
        }
        assert_eq!(client.transport.calls(), 1);
    }

    #[tokio::test]
    async fn early_success_still_reports_hundred() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "a.bin", b"01234567");
        let client = client(vec![Step::RespondEarly]);
        let (cb, seen) = recording();

        client
            .transfer(
                &authorization("https://b/a.bin", TimeDelta::minutes(5)),
                &file,
                Some(cb),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![100]);
    }

    #[tokio::test]
    async fn empty_file_completes_on_response() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "empty.txt", b"");
        let client = client(vec![Step::RespondEarly]);
        let (cb, seen) = recording();

        client
            .transfer(
                &authorization("https://b/empty.txt", TimeDelta::minutes(5)),
                &file,
                Some(cb),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(client.transport.calls(), 1);
        assert_eq!(*seen.lock().unwrap(), vec![100]);
    }

    #[tokio::test]
    async fn empty_file_stall_is_retried() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "empty.txt", b"");
        let client = client(vec![Step::Stall, Step::Respond(200)]);
        let (cb, seen) = recording();

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            client.transfer(
                &authorization("https://b/empty.txt", TimeDelta::minutes(5)),
                &file,
                Some(cb),
                &CancellationToken::new(),
            ),
        )
        .await
        .expect("empty transfer hung past the stall timeout");

        assert!(result.is_ok());
        assert_eq!(client.transport.calls(), 2);
        assert_eq!(seen.lock().unwrap().last(), Some(&100));
    }

    #[tokio::test]
    async fn empty_file_stalling_twice_fails() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "empty.txt", b"");
        let client = client(vec![Step::Stall]);

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            client.transfer(
                &authorization("https://b/empty.txt", TimeDelta::minutes(5)),
                &file,
                None,
                &CancellationToken::new(),
            ),
        )
        .await
        .expect("empty transfer hung past the stall timeout");

        assert!(matches!(result, Err(TransferError::Stalled { attempts: 2 })));
        assert_eq!(client.transport.calls(), 2);
    }

    #[tokio::test]
    async fn truncated_file_surfaces_read_error() {
        let dir = TempDir::new().unwrap();
        let mut file = write_file(dir.path(), "a.bin", b"0123");
        file.size = 8;
        let client = client(vec![Step::Respond(200)]);

        let err = client
            .transfer(
                &authorization("https://b/a.bin", TimeDelta::minutes(5)),
                &file,
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::Read(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn cancellation_aborts_pending_transfer() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "a.bin", b"01234567");
        let client = TransferClient::new(ScriptedTransport::new(vec![Step::Stall]))
            .with_stall_timeout(Duration::from_secs(30));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = client
            .transfer(
                &authorization("https://b/a.bin", TimeDelta::minutes(5)),
                &file,
                None,
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Cancelled));
        assert_eq!(client.transport.calls(), 1);
    }

    #[tokio::test]
    async fn http_transport_sends_headers_and_body() {
        let server = MockServer::start(vec![MockResponse::ok("")]).await;
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "a.bin", b"hello object storage");
        let client = TransferClient::http(reqwest::Client::new()).with_chunk_size(5);
        let url = format!("{}/abc.bin", server.url());

        let result = client
            .transfer(
                &authorization(&url, TimeDelta::minutes(5)),
                &file,
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(result, url);

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.method, "PUT");
        assert_eq!(req.target, "/abc.bin");
        assert_eq!(req.body, b"hello object storage");
        assert_eq!(req.header("content-length"), Some("20"));
        assert_eq!(req.header("authorization"), Some("OSS key:sig"));
        assert_eq!(req.header("content-type"), Some("application/octet-stream"));
        assert_eq!(req.header("x-oss-date"), Some("Thu, 15 Oct 2026 08:00:00 GMT"));

        let names = req.header_names();
        let pos = |n: &str| names.iter().position(|h| h == n).unwrap();
        assert!(pos("authorization") < pos("content-type"));
        assert!(pos("content-type") < pos("x-oss-date"));
    }

    #[tokio::test]
    async fn http_transport_reports_rejection() {
        let server = MockServer::start(vec![MockResponse::status(403, "<Error>SignatureDoesNotMatch</Error>")]).await;
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "a.bin", b"data");
        let client = TransferClient::http(reqwest::Client::new());

        let err = client
            .transfer(
                &authorization(&format!("{}/a.bin", server.url()), TimeDelta::minutes(5)),
                &file,
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        match err {
            TransferError::Status { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("SignatureDoesNotMatch"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }
}
