use std::future::Future;

use super::WorkflowError;
use crate::database::DatabaseError;

/// Run a conditional write and classify a zero-row outcome.
///
/// `reread` is only awaited when `write` changed nothing. It yields `None`
/// for a missing entity, which becomes `NotFound`; any stored state becomes
/// the error produced by `rejected`.
pub async fn guarded<W, R, Fut, S, E>(write: W, reread: R, rejected: E) -> Result<(), WorkflowError>
where
    W: Future<Output = Result<u64, DatabaseError>>,
    R: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<S>, DatabaseError>>,
    E: FnOnce(S) -> WorkflowError,
{
    if write.await? > 0 {
        return Ok(());
    }

    match reread().await? {
        None => Err(WorkflowError::NotFound),
        Some(state) => Err(rejected(state)),
    }
}
