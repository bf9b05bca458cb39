//! Best-effort usage events.

use serde_json::{Value, json};
use zww_transfer::FileHandle;

pub const UPLOAD_START: &str = "upload_start";
pub const UPLOAD_SKIPPED: &str = "upload_skipped";
pub const UPLOAD_SUCCESS: &str = "upload_success";
pub const UPLOAD_FAILED: &str = "upload_failed";

/// Receives analytics events. Implementations must not block.
pub trait AnalyticsSink: Send + Sync {
    fn track(&self, event: &str, payload: Value);
}

/// Emits each event as a `tracing` event on the `analytics` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
    fn track(&self, event: &str, payload: Value) {
        tracing::info!(target: "analytics", event, payload = %payload, "analytics event");
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl AnalyticsSink for NoopSink {
    fn track(&self, _event: &str, _payload: Value) {}
}

/// File size in MiB, rounded to two decimals.
pub fn size_mb(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}

/// Common payload for upload events.
pub fn upload_payload(file: &FileHandle, dedup: bool) -> Value {
    json!({
        "name": file.name,
        "size_mb": size_mb(file.size),
        "dedup": dedup,
    })
}
