use rand;
use std::time::Duration;

/// Bounded exponential backoff with jitter, for transient store failures.
/// Used only inside persistence backends; the workflow core never retries.
#[derive(Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_max: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(500),
            jitter_max: Some(Duration::from_millis(50)),
        }
    }
}

impl RetryPolicy {
    /// Profile for writes that must not be given up on early.
    pub fn aggressive() -> Self {
        Self {
            max_attempts: 7,
            base_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(1000),
            jitter_max: Some(Duration::from_millis(100)),
        }
    }
}

pub async fn with_retries<F, Fut, T, E>(policy: RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut attempts_left = policy.max_attempts;
    let mut backoff = policy.base_backoff;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                attempts_left = attempts_left.saturating_sub(1);
                if attempts_left == 0 {
                    return Err(error);
                }

                let jitter = match policy.jitter_max {
                    Some(jitter_max) if jitter_max.as_millis() > 0 => {
                        let span = jitter_max.as_millis() as u64;
                        Duration::from_millis(rand::random::<u64>() % (span + 1))
                    }
                    _ => Duration::ZERO,
                };
                tokio::time::sleep(backoff + jitter).await;

                backoff = std::cmp::min(backoff * 2, policy.max_backoff);
            }
        }
    }
}
