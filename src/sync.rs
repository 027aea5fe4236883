//! Bridge for driving storage futures from blocking code.

use std::future::Future;

use crate::error::{StorageError, StorageResult, ValidationError};

/// Runs a storage future to completion on a throwaway runtime.
///
/// Refuses to run when the calling thread is already inside a Tokio
/// runtime: blocking there would deadlock the executor, so the caller gets
/// a descriptive validation error directing them to the async variant.
/// This check is a hard requirement, not best effort — the existing
/// runtime is never reused or nested.
pub(crate) fn block_on<F>(future: F) -> StorageResult<F::Output>
where
    F: Future,
{
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(ValidationError::BlockingInAsyncContext.into());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            StorageError::backend("runtime", "failed to build blocking runtime", Some(Box::new(e)))
        })?;

    Ok(runtime.block_on(future))
}
