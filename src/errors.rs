use axum::extract::multipart::MultipartError;
use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("File not found")]
    NotFound,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub(crate) fn from_io(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound,
            _ => StorageError::Io(err),
        }
    }
}

/// Failures surfaced to the user as an error flash on the listing page.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("No file selected")]
    NoFileSelected,
    #[error("File type not allowed")]
    DisallowedType,
    #[error("Invalid filename")]
    InvalidFilename,
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("File is too large (maximum is {} MiB)", .0 / (1024 * 1024))]
    TooLarge(usize),
    #[error("File not found")]
    NotFound,
    #[error("I/O error: {0}")]
    Io(std::io::Error),
}

impl AppError {
    pub fn from_multipart(err: MultipartError, limit: usize) -> Self {
        match err.status() {
            StatusCode::PAYLOAD_TOO_LARGE => AppError::TooLarge(limit),
            _ => AppError::BadRequest(err.body_text()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::FOUND,
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => AppError::NotFound,
            StorageError::Io(err) => AppError::Io(err),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    NotANumber { name: &'static str, value: String },
    #[error("SECRET_KEY must be at least 64 bytes, got {0}")]
    SecretKeyTooShort(usize),
    #[error("Invalid host or port: {0}")]
    InvalidAddress(String),
}
