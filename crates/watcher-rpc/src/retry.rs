//! Bounded exponential backoff for the facade's `retry_forever` calls.
//!
//! The distilled contract only says "bounded sleep between attempts" — this
//! is not an unbounded tight loop, and not a multi-hour wait either. Delay
//! grows by 1.5x per attempt up to a fixed cap.

use std::time::Duration;

#[derive(Clone, Copy, Debug)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(250),
            cap: Duration::from_secs(5),
        }
    }
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Delay before the `attempt`-th retry (1-indexed), 1.5x growth per step.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = 1.5f64.powi(attempt.min(32) as i32);
        let millis = (self.base.as_millis() as f64 * multiplier) as u64;
        Duration::from_millis(millis).min(self.cap)
    }
}

/// Calls `attempt` until it returns `Some`, sleeping with [`Backoff`] between
/// tries and logging once per failure at `warn`. Used for `retryForever`
/// facade calls where giving up is not an option (e.g. `getLatestHeight`
/// during catch-up).
pub async fn retry_forever<T, F, Fut>(what: &str, backoff: Backoff, mut attempt: F) -> T
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Option<T>>,
{
    let mut tries: u32 = 0;
    loop {
        if let Some(value) = attempt().await {
            return value;
        }
        tries += 1;
        tracing::warn!(what, tries, "rpc call failed, retrying");
        tokio::time::sleep(backoff.delay_for(tries)).await;
    }
}
