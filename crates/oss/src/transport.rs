use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use reqwest::header::CONTENT_LENGTH;
use zww_transfer::BodyStream;

use crate::TransferError;

/// A single `PUT` to hand to a transport.
pub struct PutRequest {
    pub url: String,
    /// Sent verbatim, in order.
    pub headers: Vec<(String, String)>,
    pub content_length: u64,
    pub body: BodyStream,
}

/// What the storage server answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutResponse {
    pub status: u16,
    /// Response body, only collected for non-2xx answers.
    pub body: String,
}

impl PutResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub type PutFuture<'a> = Pin<Box<dyn Future<Output = Result<PutResponse, TransferError>> + Send + 'a>>;

/// Sends `PUT` requests with a streamed body.
///
/// Dropping the returned future must abort the request.
pub trait PutTransport: Send + Sync {
    fn put(&self, request: PutRequest) -> PutFuture<'_>;
}

impl<T: PutTransport + ?Sized> PutTransport for Arc<T> {
    fn put(&self, request: PutRequest) -> PutFuture<'_> {
        (**self).put(request)
    }
}

/// [`PutTransport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl PutTransport for HttpTransport {
    fn put(&self, request: PutRequest) -> PutFuture<'_> {
        Box::pin(async move {
            let mut builder = self.http.put(&request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            let resp = builder
                .header(CONTENT_LENGTH, request.content_length)
                .body(reqwest::Body::wrap_stream(request.body))
                .send()
                .await?;

            let status = resp.status();
            let body = if status.is_success() {
                String::new()
            } else {
                resp.text().await.unwrap_or_default()
            };
            Ok(PutResponse {
                status: status.as_u16(),
                body,
            })
        })
    }
}
