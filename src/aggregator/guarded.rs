//! Timeout-and-fallback wrapper for dependent fetches.
//!
//! A guarded call never raises an error. It either yields the fetched value,
//! yields the fallback together with the reason it was used, or reports
//! that the parent context was cancelled so the caller can abort.

use crate::error::FetchError;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default time budget of a dependent fetch.
pub const DEFAULT_DEPENDENT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Why a guarded call fell back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The fetch returned an error.
    Failed(FetchError),
    /// The fetch did not finish within the time budget.
    TimedOut(Duration),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Failed(error) => write!(f, "failed: {}", error),
            FallbackReason::TimedOut(after) => write!(f, "timed out after {}ms", after.as_millis()),
        }
    }
}

/// Outcome of a guarded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<T> {
    /// The fetch succeeded in time; its value is returned verbatim.
    Fetched(T),
    /// The fetch failed or timed out and the fallback was used instead.
    Fallback { value: T, reason: FallbackReason },
    /// The parent context was cancelled. Nothing should be assembled.
    Cancelled,
}

impl<T> Guarded<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Guarded::Cancelled)
    }
}

/// Run `fetch` under a child of `parent` bounded by `timeout`.
///
/// The fetch is not invoked at all when `parent` is already cancelled. On
/// timeout or parent cancellation the fetch future is dropped and its
/// context is cancelled, so it never outlives this call.
pub async fn guarded<T, F, Fut>(
    parent: &CancellationToken,
    timeout: Duration,
    fallback: T,
    fetch: F,
) -> Guarded<T>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    if parent.is_cancelled() {
        return Guarded::Cancelled;
    }

    let ctx = parent.child_token();
    let _stop = ctx.clone().drop_guard();
    let bounded = tokio::time::timeout(timeout, fetch(ctx));

    tokio::select! {
        biased;
        _ = parent.cancelled() => Guarded::Cancelled,
        outcome = bounded => match outcome {
            Ok(Ok(value)) => Guarded::Fetched(value),
            Ok(Err(error)) => Guarded::Fallback {
                value: fallback,
                reason: FallbackReason::Failed(error),
            },
            Err(_) => Guarded::Fallback {
                value: fallback,
                reason: FallbackReason::TimedOut(timeout),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::{sleep, Instant};

    #[tokio::test]
    async fn test_success_is_returned_verbatim() {
        let parent = CancellationToken::new();
        let outcome = guarded(&parent, DEFAULT_DEPENDENT_TIMEOUT, Vec::new(), |_| async {
            Ok(vec![1, 2, 3])
        })
        .await;

        assert_eq!(outcome, Guarded::Fetched(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_error_falls_back() {
        let parent = CancellationToken::new();
        let outcome: Guarded<Vec<u8>> =
            guarded(&parent, DEFAULT_DEPENDENT_TIMEOUT, Vec::new(), |_| async {
                Err(FetchError::unavailable("comments", "boom"))
            })
            .await;

        assert_eq!(
            outcome,
            Guarded::Fallback {
                value: vec![],
                reason: FallbackReason::Failed(FetchError::unavailable("comments", "boom")),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back_and_stops_fetch() {
        let parent = CancellationToken::new();
        let seen: Arc<Mutex<Option<CancellationToken>>> = Arc::default();

        let captured = seen.clone();
        let outcome = guarded(&parent, DEFAULT_DEPENDENT_TIMEOUT, vec![0], move |ctx| {
            *captured.lock().unwrap() = Some(ctx);
            async {
                sleep(Duration::from_millis(3000)).await;
                Ok(vec![1])
            }
        })
        .await;

        assert_eq!(
            outcome,
            Guarded::Fallback {
                value: vec![0],
                reason: FallbackReason::TimedOut(DEFAULT_DEPENDENT_TIMEOUT),
            }
        );
        let ctx = seen.lock().unwrap().take().unwrap();
        assert!(ctx.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_parent_never_invokes_fetch() {
        let parent = CancellationToken::new();
        parent.cancel();
        let invoked = AtomicBool::new(false);

        let outcome: Guarded<Vec<u8>> =
            guarded(&parent, DEFAULT_DEPENDENT_TIMEOUT, Vec::new(), |_| {
                invoked.store(true, Ordering::SeqCst);
                async { Ok(vec![1]) }
            })
            .await;

        assert!(outcome.is_cancelled());
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_returns_promptly() {
        let parent = CancellationToken::new();
        let canceller = parent.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        let outcome: Guarded<Vec<u8>> =
            guarded(&parent, DEFAULT_DEPENDENT_TIMEOUT, Vec::new(), |_| async {
                sleep(Duration::from_secs(10)).await;
                Ok(vec![1])
            })
            .await;

        assert_eq!(outcome, Guarded::Cancelled);
        assert!(outcome.is_cancelled());
        assert!(start.elapsed() < DEFAULT_DEPENDENT_TIMEOUT);
    }

    #[test]
    fn test_fallback_reason_display() {
        assert_eq!(
            FallbackReason::TimedOut(Duration::from_millis(2000)).to_string(),
            "timed out after 2000ms"
        );
        assert_eq!(
            FallbackReason::Failed(FetchError::Interrupted).to_string(),
            "failed: fetch interrupted by cancellation"
        );
    }
}
