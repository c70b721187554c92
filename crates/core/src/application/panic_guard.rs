// Panic isolation for scheduled jobs and maintenance checks
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::error;

/// Result of a panic-guarded execution
#[derive(Debug)]
pub enum PanicGuardResult<T> {
    /// Execution completed (the value may itself be an error)
    Success(T),
    /// Execution panicked
    Panicked(String),
}

/// Await a future, converting a panic into `PanicGuardResult::Panicked`
///
/// A panicking job or check must never take the scheduler worker down.
///
/// # Example
/// ```text
/// match execute_guarded_async("weekly_maintenance", job.run(now)).await {
///     PanicGuardResult::Success(Ok(())) => {}
///     PanicGuardResult::Success(Err(e)) => warn!(error = %e, "job failed"),
///     PanicGuardResult::Panicked(msg) => warn!(panic = %msg, "job panicked"),
/// }
/// ```
pub async fn execute_guarded_async<F, T>(label: &str, future: F) -> PanicGuardResult<T>
where
    F: std::future::Future<Output = T>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(value) => PanicGuardResult::Success(value),
        Err(panic_info) => {
            let panic_msg = panic_message(panic_info.as_ref());
            error!(task = %label, panic_msg = %panic_msg, "Guarded task panicked");
            PanicGuardResult::Panicked(panic_msg)
        }
    }
}

fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_passes_value_through() {
        match execute_guarded_async("ok", async { 42 }).await {
            PanicGuardResult::Success(v) => assert_eq!(v, 42),
            PanicGuardResult::Panicked(msg) => panic!("unexpected panic: {}", msg),
        }
    }

    #[tokio::test]
    async fn test_panic_is_caught_with_message() {
        let result = execute_guarded_async("boom", async {
            tokio::task::yield_now().await;
            panic!("sheet service exploded");
        })
        .await;

        match result {
            PanicGuardResult::Panicked(msg) => assert_eq!(msg, "sheet service exploded"),
            PanicGuardResult::Success(()) => panic!("panic should have been caught"),
        }
    }
}
