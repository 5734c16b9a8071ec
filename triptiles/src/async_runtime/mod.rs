use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::error::TileSourceError;

pub fn spawn<T>(future: T) -> JoinHandle<T::Output>
where
    T: Future + Send + 'static,
    T::Output: Send + 'static,
{
    tokio::spawn(future)
}

/// Runs a fallible lookup as a separate task with a time limit.
///
/// A panic inside the lookup is reported as an error instead of unwinding into the caller. The
/// task is aborted when the time limit is exceeded.
pub async fn run_guarded<T, F>(timeout: Duration, future: F) -> Result<T, TileSourceError>
where
    F: Future<Output = Result<T, TileSourceError>> + Send + 'static,
    T: Send + 'static,
{
    let mut task = spawn(future);
    match tokio::time::timeout(timeout, &mut task).await {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => Err(TileSourceError::Generic(format!("lookup task failed: {err}"))),
        Err(_) => {
            task.abort();
            Err(TileSourceError::Timeout(timeout))
        }
    }
}
