//! Single-flight fetching.
//!
//! Each key moves through [`FetchState`]: the first caller starts the work and
//! marks the key in flight; callers arriving before it finishes are queued as
//! waiters and receive the same result, in the order they arrived.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, oneshot};
use tokio::time::timeout;
use tracing::debug;

use crate::error::{DatebookError, DatebookResult};

/// Upper bound on a single fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

type Outcome<T> = Result<T, String>;

pub enum FetchState<T> {
    Idle,
    InFlight {
        request_id: u64,
        waiters: Vec<oneshot::Sender<Outcome<T>>>,
    },
    /// Only kept for keys fetched with caching on.
    Completed { result: T },
}

impl<T> fmt::Debug for FetchState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchState::Idle => write!(f, "Idle"),
            FetchState::InFlight { request_id, waiters } => f
                .debug_struct("InFlight")
                .field("request_id", request_id)
                .field("waiters", &waiters.len())
                .finish(),
            FetchState::Completed { .. } => write!(f, "Completed"),
        }
    }
}

/// Observable summary of a key's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    InFlight { request_id: u64, waiters: usize },
    Completed,
}

pub struct SingleFlight<K, T> {
    states: Arc<Mutex<HashMap<K, FetchState<T>>>>,
    next_request_id: Arc<AtomicU64>,
}

impl<K, T> Clone for SingleFlight<K, T> {
    fn clone(&self) -> Self {
        SingleFlight {
            states: Arc::clone(&self.states),
            next_request_id: Arc::clone(&self.next_request_id),
        }
    }
}

impl<K, T> Default for SingleFlight<K, T> {
    fn default() -> Self {
        SingleFlight {
            states: Arc::new(Mutex::new(HashMap::new())),
            next_request_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl<K, T> fmt::Debug for SingleFlight<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingleFlight").finish_non_exhaustive()
    }
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + 'static,
    T: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `op` for `key` unless a run is already in flight, in which case
    /// wait for that one instead. With `cache`, a successful result is kept
    /// and handed out until [`invalidate`](Self::invalidate). Failures are
    /// never cached.
    ///
    /// The work runs on its own task, so a caller giving up does not strand
    /// the others. A run that panics or times out is reported to every
    /// waiter as a `Fetch` error and leaves the key idle.
    pub async fn run<F, Fut>(&self, key: K, cache: bool, op: F) -> DatebookResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DatebookResult<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let work = {
            let mut states = self.states.lock().await;
            match states.get_mut(&key) {
                Some(FetchState::Completed { result }) => {
                    debug!(key = ?key, "Fetch served from cache");
                    return Ok(result.clone());
                }
                Some(FetchState::InFlight {
                    request_id,
                    waiters,
                }) => {
                    debug!(key = ?key, request_id = *request_id, "Joining in-flight fetch");
                    waiters.push(tx);
                    drop(states);
                    return receive(rx).await;
                }
                Some(FetchState::Idle) | None => {
                    let work = op();
                    let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
                    states.insert(
                        key.clone(),
                        FetchState::InFlight {
                            request_id,
                            waiters: vec![tx],
                        },
                    );
                    work
                }
            }
        };

        let states = Arc::clone(&self.states);
        let task = tokio::spawn(work);
        let abort = task.abort_handle();
        tokio::spawn(async move {
            let outcome = match timeout(FETCH_TIMEOUT, task).await {
                Ok(Ok(Ok(value))) => Ok(value),
                Ok(Ok(Err(DatebookError::Fetch(msg)))) => Err(msg),
                Ok(Ok(Err(e))) => Err(e.to_string()),
                Ok(Err(e)) if e.is_panic() => Err("fetch task panicked".to_string()),
                Ok(Err(e)) => Err(format!("fetch task failed: {e}")),
                Err(_) => {
                    abort.abort();
                    Err(format!("timed out after {}s", FETCH_TIMEOUT.as_secs()))
                }
            };
            let mut states = states.lock().await;
            let next = match &outcome {
                Ok(value) if cache => FetchState::Completed {
                    result: value.clone(),
                },
                _ => FetchState::Idle,
            };
            let previous = states.insert(key, next);
            drop(states);
            if let Some(FetchState::InFlight { waiters, .. }) = previous {
                for waiter in waiters {
                    // a waiter that hung up no longer wants the result
                    let _ = waiter.send(outcome.clone());
                }
            }
        });

        receive(rx).await
    }

    pub async fn status(&self, key: &K) -> FetchStatus {
        match self.states.lock().await.get(key) {
            None | Some(FetchState::Idle) => FetchStatus::Idle,
            Some(FetchState::InFlight {
                request_id,
                waiters,
            }) => FetchStatus::InFlight {
                request_id: *request_id,
                waiters: waiters.len(),
            },
            Some(FetchState::Completed { .. }) => FetchStatus::Completed,
        }
    }

    /// Forget a cached result. In-flight runs are left alone.
    pub async fn invalidate(&self, key: &K) {
        let mut states = self.states.lock().await;
        if matches!(states.get(key), Some(FetchState::Completed { .. })) {
            states.remove(key);
        }
    }

    /// Forget every cached result matching `pred`.
    pub async fn invalidate_where(&self, pred: impl Fn(&K) -> bool) {
        self.states
            .lock()
            .await
            .retain(|k, state| !(matches!(state, FetchState::Completed { .. }) && pred(k)));
    }
}

async fn receive<T>(rx: oneshot::Receiver<Outcome<T>>) -> DatebookResult<T> {
    match rx.await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(msg)) => Err(DatebookError::Fetch(msg)),
        Err(_) => Err(DatebookError::Fetch("fetch task ended without a result".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn slow_op(
        calls: &Arc<AtomicUsize>,
        value: &'static str,
    ) -> impl Future<Output = DatebookResult<String>> + Send + 'static {
        let calls = Arc::clone(calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(value.to_string())
        }
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_one_run() {
        let flight: SingleFlight<&str, String> = SingleFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            flight.run("a", false, || slow_op(&calls, "payload")),
            flight.run("a", false, || slow_op(&calls, "other")),
        );
        assert_eq!(a.unwrap(), "payload");
        assert_eq!(b.unwrap(), "payload");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(flight.status(&"a").await, FetchStatus::Idle);

        // not cached, so a later call runs again
        flight.run("a", false, || slow_op(&calls, "again")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_different_keys_run_separately() {
        let flight: SingleFlight<&str, String> = SingleFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let (a, b) = tokio::join!(
            flight.run("a", false, || slow_op(&calls, "one")),
            flight.run("b", false, || slow_op(&calls, "two")),
        );
        assert_eq!(a.unwrap(), "one");
        assert_eq!(b.unwrap(), "two");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cached_until_invalidated() {
        let flight: SingleFlight<&str, String> = SingleFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));
        flight.run("doc", true, || slow_op(&calls, "v1")).await.unwrap();
        let again = flight.run("doc", true, || slow_op(&calls, "v2")).await.unwrap();
        assert_eq!(again, "v1");
        assert_eq!(flight.status(&"doc").await, FetchStatus::Completed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        flight.invalidate(&"doc").await;
        let fresh = flight.run("doc", true, || slow_op(&calls, "v2")).await.unwrap();
        assert_eq!(fresh, "v2");
    }

    #[tokio::test]
    async fn test_failures_reach_all_waiters_and_are_not_cached() {
        let flight: SingleFlight<&str, String> = SingleFlight::new();
        let failing = || async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err::<String, _>(DatebookError::Fetch("404 Not Found".into()))
        };
        let (a, b) = tokio::join!(flight.run("x", true, failing), flight.run("x", true, failing));
        assert!(matches!(a, Err(DatebookError::Fetch(ref m)) if m.contains("404")));
        assert!(matches!(b, Err(DatebookError::Fetch(_))));
        assert_eq!(flight.status(&"x").await, FetchStatus::Idle);
    }

    async fn buggy_fetch() -> DatebookResult<String> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        panic!("fetcher bug");
    }

    #[tokio::test]
    async fn test_panicking_run_releases_waiters() {
        let flight: SingleFlight<&str, String> = SingleFlight::new();
        let (a, b) = tokio::join!(
            flight.run("k", false, buggy_fetch),
            flight.run("k", false, buggy_fetch),
        );
        assert!(matches!(a, Err(DatebookError::Fetch(ref m)) if m.contains("panicked")));
        assert!(matches!(b, Err(DatebookError::Fetch(_))));
        assert_eq!(flight.status(&"k").await, FetchStatus::Idle);

        let calls = Arc::new(AtomicUsize::new(0));
        let next = flight.run("k", false, || slow_op(&calls, "recovered")).await;
        assert_eq!(next.unwrap(), "recovered");
    }

    #[tokio::test]
    async fn test_in_flight_status_counts_waiters() {
        let flight: SingleFlight<&str, String> = SingleFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let runner = flight.clone();
        let c = Arc::clone(&calls);
        let handle = tokio::spawn(async move { runner.run("k", false, || slow_op(&c, "v")).await });
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(matches!(
            flight.status(&"k").await,
            FetchStatus::InFlight { waiters: 1, .. }
        ));
        assert_eq!(handle.await.unwrap().unwrap(), "v");
    }
}
