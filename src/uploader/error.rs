use drive_api::ApiError;
use thiserror::Error;

/// Errors raised while moving a file into the drive
#[derive(Error, Debug)]
pub enum UploadError {
    /// Backend call failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Storage answered the direct write with a non-success status
    #[error("HTTP {status}: {message}")]
    StorageStatus { status: u16, message: String },

    /// Network failure during the direct write
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Local file could not be read
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Upload cancelled")]
    Cancelled,

    /// Parent folder for the file was never created
    #[error("Parent folder could not be created")]
    UnresolvedParent { folder: String },

    /// Backend returned fewer or more destinations than requested
    #[error("expected {expected} upload destinations, got {actual}")]
    DestinationMismatch { expected: usize, actual: usize },
}

impl UploadError {
    /// Whether the same direct write may succeed if attempted again
    pub fn is_transient(&self) -> bool {
        match self {
            UploadError::StorageStatus { status, .. } => {
                *status >= 500 || *status == 429 || *status == 408
            }
            UploadError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            UploadError::Api(e) => e.is_transient(),
            _ => false,
        }
    }
}

pub type UploadResult<T> = Result<T, UploadError>;
