use thiserror::Error;
use trun_model::RunKey;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("run {0} not found")]
    NotFound(RunKey),
    #[error("run {0} already exists")]
    AlreadyExists(RunKey),
    #[error("precondition failed for run {key}: expected uid {expected}, found {actual}")]
    PreconditionFailed {
        key: RunKey,
        expected: String,
        actual: String,
    },
    #[error("store error: {0}")]
    Other(String),
}

impl StoreError {
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
