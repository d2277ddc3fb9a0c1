// API error taxonomy
// Explicit kinds instead of exception strings; the status mapping is the
// contract, not the message text

use hyper::StatusCode;
use thiserror::Error;

use crate::storage::archive::ArchiveError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("multipart field 'file' is missing")]
    MissingFilePart,
    #[error("invalid multipart payload: {0}")]
    Multipart(#[from] multer::Error),
    #[error("unusable file name {0:?}")]
    InvalidName(String),
    #[error("invalid request body: {0}")]
    BadBody(String),
    #[error("no files selected")]
    EmptyFavorites,
    #[error("none of the requested files were found")]
    NoFilesFound,
    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl ApiError {
    /// HTTP status this error maps to
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingFilePart
            | Self::Multipart(_)
            | Self::InvalidName(_)
            | Self::BadBody(_)
            | Self::EmptyFavorites => StatusCode::BAD_REQUEST,
            Self::NoFilesFound => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidName(name) => Self::InvalidName(name),
            other => Self::Storage(other),
        }
    }
}

impl From<ArchiveError> for ApiError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::NoMatches => Self::NoFilesFound,
            ArchiveError::Storage(e) => e.into(),
        }
    }
}
