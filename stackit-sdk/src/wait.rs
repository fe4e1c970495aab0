//! Wait - Poll an asynchronous operation until it settles
//!
//! A check function is called every `throttle` until it reports the
//! operation done (`Ok(Some(_))`), still pending (`Ok(None)`), or failed
//! (`Err`). Gateway errors are retried a limited number of times.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::error::{SdkError, SdkResult};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type CheckFn<'a, T> = Box<dyn FnMut() -> BoxFuture<'a, SdkResult<Option<T>>> + Send + 'a>;

pub const DEFAULT_THROTTLE: Duration = Duration::from_secs(5);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_TEMP_ERROR_RETRY_LIMIT: u32 = 5;

pub struct AsyncActionHandler<'a, T> {
    check: CheckFn<'a, T>,
    throttle: Duration,
    timeout: Duration,
    sleep_before_wait: Duration,
    temp_error_retry_limit: u32,
}

impl<'a, T> AsyncActionHandler<'a, T> {
    pub fn new<F>(check: F) -> Self
    where
        F: FnMut() -> BoxFuture<'a, SdkResult<Option<T>>> + Send + 'a,
    {
        Self {
            check: Box::new(check),
            throttle: DEFAULT_THROTTLE,
            timeout: DEFAULT_TIMEOUT,
            sleep_before_wait: Duration::ZERO,
            temp_error_retry_limit: DEFAULT_TEMP_ERROR_RETRY_LIMIT,
        }
    }

    pub fn set_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn set_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn set_sleep_before_wait(mut self, duration: Duration) -> Self {
        self.sleep_before_wait = duration;
        self
    }

    pub fn set_temp_error_retry_limit(mut self, limit: u32) -> Self {
        self.temp_error_retry_limit = limit;
        self
    }

    pub async fn wait(mut self) -> SdkResult<T> {
        if !self.sleep_before_wait.is_zero() {
            sleep(self.sleep_before_wait).await;
        }

        let start = Instant::now();
        let mut retries = 0;
        loop {
            match (self.check)().await {
                Ok(Some(result)) => return Ok(result),
                Ok(None) => retries = 0,
                Err(e) if e.is_transient() && retries < self.temp_error_retry_limit => {
                    retries += 1;
                    log::debug!("transient error while waiting ({}/{}): {}", retries, self.temp_error_retry_limit, e);
                }
                Err(e) => return Err(e),
            }

            if start.elapsed() + self.throttle > self.timeout {
                return Err(SdkError::WaitTimeout(self.timeout));
            }
            sleep(self.throttle).await;
        }
    }
}

/// Turn a not-found error into `None`
pub fn found<T>(result: SdkResult<T>) -> SdkResult<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_handler<'a>(
        calls: Arc<AtomicU32>,
        outcome: impl Fn(u32) -> SdkResult<Option<u32>> + Send + Sync + 'a,
    ) -> AsyncActionHandler<'a, u32> {
        let outcome = Arc::new(outcome);
        AsyncActionHandler::new(move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            let outcome = outcome.clone();
            Box::pin(async move { outcome(n) })
        })
        .set_throttle(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn wait_returns_when_done() {
        let calls = Arc::new(AtomicU32::new(0));
        let handler = counting_handler(calls.clone(), |n| Ok(if n >= 3 { Some(n) } else { None }));
        assert_eq!(handler.wait().await.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn wait_propagates_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let handler = counting_handler(calls, |_| Err(SdkError::WaitFailed("broken".into())));
        assert!(matches!(handler.wait().await, Err(SdkError::WaitFailed(_))));
    }

    #[tokio::test]
    async fn wait_retries_gateway_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let handler = counting_handler(calls.clone(), |n| match n {
            1 | 2 => Err(SdkError::api(502, "bad gateway")),
            _ => Ok(Some(n)),
        });
        assert_eq!(handler.wait().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn wait_gives_up_after_retry_limit() {
        let calls = Arc::new(AtomicU32::new(0));
        let handler = counting_handler(calls.clone(), |_| Err(SdkError::api(503, "unavailable")))
            .set_temp_error_retry_limit(2);
        let err = handler.wait().await.unwrap_err();
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn wait_times_out() {
        let calls = Arc::new(AtomicU32::new(0));
        let handler = counting_handler(calls, |_| Ok(None)).set_timeout(Duration::from_millis(20));
        assert!(matches!(handler.wait().await, Err(SdkError::WaitTimeout(_))));
    }

    #[tokio::test]
    async fn wait_sleeps_before_first_check() {
        let calls = Arc::new(AtomicU32::new(0));
        let handler = counting_handler(calls, |n| Ok(Some(n))).set_sleep_before_wait(Duration::from_millis(30));
        let start = Instant::now();
        assert_eq!(handler.wait().await.unwrap(), 1);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn found_maps_not_found() {
        assert_eq!(found::<u32>(Err(SdkError::api(404, "x"))).unwrap(), None);
        assert_eq!(found(Ok(1)).unwrap(), Some(1));
        assert!(found::<u32>(Err(SdkError::api(500, "x"))).is_err());
    }
}
