//! Presigned object-storage client.
//!
//! An upload goes through three network steps, each with its own type:
//!
//! 1. [`UploadAuthorizer`] asks the metadata endpoint for a short-lived
//!    [`UploadAuthorization`] (destination URL plus signed headers).
//! 2. [`ExistenceChecker`] optionally probes the destination with `HEAD`.
//! 3. [`TransferClient`] streams the file in a single `PUT`, detecting
//!    transfers that never start and retrying them once.

pub mod authorizer;
pub mod error;
pub mod key;
pub mod probe;
pub mod put;
pub mod transport;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod mock_http;

pub use authorizer::{AuthorizerConfig, DEFAULT_METADATA_ENDPOINT, UploadAuthorizer, parse_payload};
pub use error::{AuthorizationError, TransferError};
pub use key::validate_object_key;
pub use probe::ExistenceChecker;
pub use put::TransferClient;
pub use transport::{HttpTransport, PutFuture, PutRequest, PutResponse, PutTransport};
pub use types::{AuthorizationPayload, Existence, UploadAuthorization};

use std::time::Duration;

/// How long a transfer may wait for its body to start flowing.
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(1);

/// Per-request timeout for the metadata endpoint.
pub const DEFAULT_AUTHORIZATION_TIMEOUT: Duration = Duration::from_millis(1500);

/// Validity assumed for an authorization that carries no explicit expiry.
pub const DEFAULT_AUTHORIZATION_VALIDITY: Duration = Duration::from_secs(15 * 60);

/// Timeout for a `HEAD` existence probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Attempts per transfer: the initial one plus a single stall retry.
pub const MAX_TRANSFER_ATTEMPTS: u32 = 2;
