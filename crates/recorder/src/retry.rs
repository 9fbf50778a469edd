// Fixed-schedule retry used by the HTTP fetcher.
//
// Only transport failures go through here. A response with a non-success status
// is a result, not a failure, and is handed back to the caller untouched.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Run `operation` until it succeeds or the schedule is exhausted.
///
/// `schedule[i]` is the pause after the `i`-th failed attempt, so the schedule
/// length is the total number of attempts. No pause follows the final attempt.
/// The error of the last attempt is returned when every attempt fails.
pub async fn retry_with_schedule<F, Fut, T, E>(schedule: &[Duration], mut operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = schedule.len().max(1);
    let mut attempt = 0usize;

    loop {
        match operation(attempt as u32).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 >= attempts => return Err(err),
            Err(err) => {
                let delay = schedule[attempt];
                warn!(
                    attempt = attempt + 1,
                    max = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Request error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
