use zww_oss::{AuthorizationError, TransferError};
use zww_transfer::{HashError, HashFileError, ReadError};

/// Why an upload failed.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("read error: {0}")]
    Read(#[from] ReadError),

    #[error("hash error: {0}")]
    Hash(#[from] HashError),

    #[error("authorization failed: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("transfer failed: {0}")]
    Transfer(TransferError),

    #[error("cancelled")]
    Cancelled,
}

impl From<TransferError> for UploadError {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::Cancelled => Self::Cancelled,
            other => Self::Transfer(other),
        }
    }
}

impl From<HashFileError> for UploadError {
    fn from(e: HashFileError) -> Self {
        match e {
            HashFileError::Read(e) => Self::Read(e),
            HashFileError::Hash(e) => Self::Hash(e),
        }
    }
}
