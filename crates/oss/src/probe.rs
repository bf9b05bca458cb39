use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;

use crate::DEFAULT_PROBE_TIMEOUT;
use crate::types::Existence;

/// Checks whether an object already exists at a destination URL.
#[derive(Debug, Clone)]
pub struct ExistenceChecker {
    http: reqwest::Client,
    timeout: Duration,
}

impl ExistenceChecker {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Issues a `HEAD` against `url`.
    ///
    /// 2xx means the object exists, 404 means it does not. Anything else,
    /// including network errors and timeouts, is [`Existence::Unknown`].
    pub async fn probe(&self, url: &str) -> Existence {
        match self.http.head(url).timeout(self.timeout).send().await {
            Ok(resp) if resp.status().is_success() => Existence::Exists,
            Ok(resp) if resp.status() == StatusCode::NOT_FOUND => Existence::Absent,
            Ok(resp) => {
                debug!(url, status = resp.status().as_u16(), "unexpected probe status");
                Existence::Unknown
            }
            Err(e) => {
                debug!(url, error = %e, "existence probe failed");
                Existence::Unknown
            }
        }
    }
}
