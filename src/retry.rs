use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use log::{debug, warn};

/// Fixed-interval retry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Run `operation` until it succeeds, `should_retry` rejects the error, or
/// `policy.max_attempts` is reached. `sleep` is awaited between attempts;
/// the last error is returned unchanged.
pub async fn retry<T, E, Op, Fut, Sleep, SleepFut>(
    policy: RetryPolicy,
    mut sleep: Sleep,
    should_retry: impl Fn(&E) -> bool,
    mut operation: Op,
) -> Result<T, E>
where
    E: Display,
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    Sleep: FnMut(Duration) -> SleepFut,
    SleepFut: Future<Output = ()>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(val) => return Ok(val),
            Err(e) => {
                println!("嘗試 {attempt} 失敗：{e}");
                warn!("Attempt {attempt}/{max_attempts} failed: {e}");
                if attempt >= max_attempts || !should_retry(&e) {
                    return Err(e);
                }
                println!("等待 {} 秒後重試...", policy.delay.as_secs());
                debug!("Retrying in {:?}", policy.delay);
                sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

/// Pause used outside of tests
pub async fn tokio_sleep(delay: Duration) {
    tokio::time::sleep(delay).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[derive(Debug, PartialEq)]
    struct Flaky(&'static str);

    impl Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let attempts = Cell::new(0);
        let pauses = RefCell::new(Vec::new());

        let result = retry(
            RetryPolicy::default(),
            |d| {
                pauses.borrow_mut().push(d);
                async {}
            },
            |_: &Flaky| true,
            |_| {
                attempts.set(attempts.get() + 1);
                let n = attempts.get();
                async move { if n < 3 { Err(Flaky("hiccup")) } else { Ok("transcript") } }
            },
        )
        .await;

        assert_eq!(result, Ok("transcript"));
        assert_eq!(attempts.get(), 3);
        assert_eq!(*pauses.borrow(), vec![Duration::from_secs(2); 2]);
    }

    #[tokio::test]
    async fn test_returns_last_error_after_exhausting_attempts() {
        let attempts = Cell::new(0);
        let pauses = Cell::new(0);

        let result: Result<(), Flaky> = retry(
            RetryPolicy::default(),
            |_| {
                pauses.set(pauses.get() + 1);
                async {}
            },
            |_| true,
            |_| {
                attempts.set(attempts.get() + 1);
                async { Err(Flaky("always down")) }
            },
        )
        .await;

        assert_eq!(result, Err(Flaky("always down")));
        assert_eq!(attempts.get(), 3);
        assert_eq!(pauses.get(), 2);
    }

    #[tokio::test]
    async fn test_stops_on_non_retryable_error() {
        let attempts = Cell::new(0);
        let pauses = Cell::new(0);

        let result: Result<(), Flaky> = retry(
            RetryPolicy::default(),
            |_| {
                pauses.set(pauses.get() + 1);
                async {}
            },
            |e: &Flaky| e.0 != "disabled",
            |_| {
                attempts.set(attempts.get() + 1);
                async { Err(Flaky("disabled")) }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.get(), 1);
        assert_eq!(pauses.get(), 0);
    }

    #[tokio::test]
    async fn test_passes_attempt_number() {
        let seen = RefCell::new(Vec::new());
        let _: Result<(), Flaky> = retry(
            RetryPolicy {
                max_attempts: 2,
                delay: Duration::ZERO,
            },
            |_| async {},
            |_| true,
            |n| {
                seen.borrow_mut().push(n);
                async { Err(Flaky("nope")) }
            },
        )
        .await;
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }
}
