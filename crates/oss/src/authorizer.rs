use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tracing::{debug, warn};

use crate::key::validate_object_key;
use crate::types::{AuthorizationPayload, UploadAuthorization};
use crate::{
    AuthorizationError, DEFAULT_AUTHORIZATION_TIMEOUT, DEFAULT_AUTHORIZATION_VALIDITY,
};

/// Metadata service that signs uploads.
pub const DEFAULT_METADATA_ENDPOINT: &str = "https://www.xiexinbao.com/oss_hz/params";

/// Settings for [`UploadAuthorizer`].
#[derive(Debug, Clone)]
pub struct AuthorizerConfig {
    /// Full URL of the metadata endpoint; `mime` and `filename` are appended
    /// as query parameters.
    pub endpoint: String,
    /// Scheme used to build destination URLs (`https` in production).
    pub destination_scheme: String,
    pub request_timeout: Duration,
    /// Pause before the single retry.
    pub retry_delay: Duration,
    /// Validity assumed when the payload has no `expire` field.
    pub validity: Duration,
}

impl Default for AuthorizerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_METADATA_ENDPOINT.into(),
            destination_scheme: "https".into(),
            request_timeout: DEFAULT_AUTHORIZATION_TIMEOUT,
            retry_delay: Duration::ZERO,
            validity: DEFAULT_AUTHORIZATION_VALIDITY,
        }
    }
}

/// Obtains short-lived upload authorizations from the metadata service.
#[derive(Debug, Clone)]
pub struct UploadAuthorizer {
    http: reqwest::Client,
    config: AuthorizerConfig,
}

impl UploadAuthorizer {
    pub fn new(http: reqwest::Client, config: AuthorizerConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &AuthorizerConfig {
        &self.config
    }

    /// Requests an authorization to store a `mime_type` object under
    /// `suggested_name`.
    ///
    /// Any failure (transport error, timeout, bad status or a payload that
    /// does not parse) is retried exactly once. The second failure is
    /// returned as is.
    pub async fn authorize(
        &self,
        mime_type: &str,
        suggested_name: &str,
    ) -> Result<UploadAuthorization, AuthorizationError> {
        match self.request(mime_type, suggested_name).await {
            Ok(auth) => Ok(auth),
            Err(e) => {
                warn!(error = %e, name = suggested_name, "authorization request failed, retrying once");
                if !self.config.retry_delay.is_zero() {
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                self.request(mime_type, suggested_name).await
            }
        }
    }

    async fn request(
        &self,
        mime_type: &str,
        suggested_name: &str,
    ) -> Result<UploadAuthorization, AuthorizationError> {
        let resp = self
            .http
            .get(&self.config.endpoint)
            .query(&[("mime", mime_type), ("filename", suggested_name)])
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthorizationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await?;
        let payload = parse_payload(&body)?;
        debug!(host = %payload.host, key = %payload.filename, "received upload authorization");

        let validity = TimeDelta::from_std(self.config.validity)
            .unwrap_or_else(|_| TimeDelta::seconds(DEFAULT_AUTHORIZATION_VALIDITY.as_secs() as i64));
        Ok(UploadAuthorization::from_payload(
            payload,
            &self.config.destination_scheme,
            Utc::now(),
            validity,
        ))
    }
}

/// Parses and checks a metadata response body.
pub fn parse_payload(body: &[u8]) -> Result<AuthorizationPayload, AuthorizationError> {
    let payload: AuthorizationPayload = serde_json::from_slice(body)
        .map_err(|e| AuthorizationError::Unrecognized(e.to_string()))?;

    if payload.host.trim().is_empty() {
        return Err(AuthorizationError::Unrecognized("empty host".into()));
    }
    if payload.authorization.is_empty() {
        return Err(AuthorizationError::Unrecognized("empty signature".into()));
    }
    validate_object_key(&payload.filename)?;

    Ok(payload)
}
