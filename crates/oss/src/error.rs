use zww_transfer::ReadError;

/// Errors raised while obtaining an upload authorization.
#[derive(Debug, thiserror::Error)]
pub enum AuthorizationError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("metadata endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unrecognized authorization payload: {0}")]
    Unrecognized(String),

    #[error("invalid object key: {0}")]
    InvalidObjectKey(String),
}

/// Errors raised while transferring a file to its destination.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("read error: {0}")]
    Read(#[from] ReadError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage rejected upload with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transfer never started after {attempts} attempts")]
    Stalled { attempts: u32 },

    #[error("authorization expired before the transfer could be retried")]
    AuthorizationExpired,

    #[error("transfer cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(String),
}

impl TransferError {
    /// Whether the transfer never got any bytes out.
    pub fn is_stall(&self) -> bool {
        matches!(self, Self::Stalled { .. })
    }
}
