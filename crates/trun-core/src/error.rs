use thiserror::Error;
use trun_model::RunKey;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("run {0} should not be cleaned up")]
    NotEligible(RunKey),
    #[error("unable to find the status of the finished run {0}")]
    MissingTerminalCondition(RunKey),
    #[error("unable to find the time when run {0} finished")]
    MissingFinishTime(RunKey),
    #[error(transparent)]
    Store(#[from] StoreError),
}
