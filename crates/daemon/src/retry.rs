use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Run `attempt` until it succeeds, sleeping a fixed `delay` after each
/// failure. There is no attempt limit; both upstream links are expected to
/// come back eventually.
pub async fn retry_forever<T, E, F, Fut>(what: &str, delay: Duration, mut attempt: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut failures: u64 = 0;

    loop {
        match attempt().await {
            Ok(value) => {
                if failures > 0 {
                    info!("{} succeeded after {} failed attempt(s)", what, failures);
                }
                return value;
            }
            Err(e) => {
                failures += 1;
                warn!(
                    "{} attempt {} failed ({}), retrying in {}s...",
                    what,
                    failures,
                    e,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
