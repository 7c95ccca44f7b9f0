use crate::storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FinalizeError {
    /// Metadata was requested for an object that is not in storage.
    #[error("file `{0}` does not exist in storage")]
    FileNotFound(String),
    #[error("request input `{0}` is required to finalize the upload")]
    MissingInput(String),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for FinalizeError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => FinalizeError::FileNotFound(key),
            other => FinalizeError::Storage(other),
        }
    }
}

pub type FinalizeResult<T> = Result<T, FinalizeError>;
