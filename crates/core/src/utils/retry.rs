//! Call-site retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use log::debug;

/// Runs `op` up to `retries + 1` times, sleeping `backoff * 2^attempt` between
/// failed attempts. Returns the last error once attempts are exhausted.
pub async fn async_retry<T, E, F, Fut>(retries: u32, backoff: Duration, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < retries => {
                debug!("Attempt {} failed, retrying: {}", attempt + 1, err);
                tokio::time::sleep(backoff * 2u32.saturating_pow(attempt)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
