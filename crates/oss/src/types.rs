use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

/// Raw JSON answer of the metadata endpoint.
///
/// ```json
/// {"host":"bucket.oss-cn-hangzhou.aliyuncs.com","filename":"9f0c.png",
///  "authorization":"OSS ak:sig","mime":"image/png",
///  "date":"Thu, 15 Oct 2026 08:00:00 GMT"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthorizationPayload {
    pub host: String,
    pub filename: String,
    pub authorization: String,
    pub mime: String,
    pub date: String,
    /// Unix timestamp after which the signature is no longer accepted.
    #[serde(default)]
    pub expire: Option<i64>,
}

/// Everything needed to perform one authorized `PUT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadAuthorization {
    /// Absolute URL of the object to create.
    pub destination_url: String,
    /// Headers to send verbatim, in order.
    pub required_headers: Vec<(String, String)>,
    pub expires_at: DateTime<Utc>,
}

impl UploadAuthorization {
    /// Builds an authorization from a metadata payload.
    ///
    /// Without an explicit `expire`, the authorization is assumed valid for
    /// `validity` after `received_at`.
    pub fn from_payload(
        payload: AuthorizationPayload,
        scheme: &str,
        received_at: DateTime<Utc>,
        validity: TimeDelta,
    ) -> Self {
        let destination_url = format!(
            "{scheme}://{}/{}",
            payload.host.trim_end_matches('/'),
            payload.filename
        );
        let expires_at = payload
            .expire
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or(received_at + validity);

        Self {
            destination_url,
            required_headers: vec![
                ("authorization".into(), payload.authorization),
                ("Content-Type".into(), payload.mime),
                ("x-oss-date".into(), payload.date),
            ],
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Looks up a required header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.required_headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Result of a `HEAD` probe against a destination URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    Exists,
    Absent,
    /// The probe failed or returned something other than 2xx or 404.
    Unknown,
}
