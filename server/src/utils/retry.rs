//! Async retry helper with a fixed backoff schedule

use std::time::Duration;

/// Retry an async operation over an explicit delay schedule.
///
/// Runs the operation once, then once more per entry in `delays_ms`,
/// sleeping the entry's delay before the corresponding retry. Errors for
/// which `should_retry` returns false are returned immediately. Returns
/// `Ok((value, attempts))` on success or `Err((error, attempts))` once the
/// schedule is exhausted.
pub async fn retry_with_schedule<F, Fut, T, E, P>(
    delays_ms: &[u64],
    should_retry: P,
    mut operation: F,
) -> Result<(T, u32), (E, u32)>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match operation().await {
            Ok(value) => return Ok((value, attempts)),
            Err(e) => {
                if !should_retry(&e) {
                    return Err((e, attempts));
                }
                let Some(&delay_ms) = delays_ms.get(attempts as usize - 1) else {
                    return Err((e, attempts));
                };
                tracing::warn!(
                    error = %e,
                    attempt = attempts,
                    delay_ms,
                    "Retrying after transient error"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
