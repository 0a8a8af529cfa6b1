//! Single-flight, success-only memoization of an async fetch.

use std::{cell::RefCell, fmt};

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use tracing::{debug, warn};

type Fetch<T, E> = Box<dyn Fn() -> LocalBoxFuture<'static, Result<T, E>>>;

enum CacheState<T, E> {
    Unstarted,
    InFlight {
        attempt: u64,
        task: Shared<LocalBoxFuture<'static, Result<T, E>>>,
    },
    Completed(T),
}

/// Runs `fetch` lazily and at most once per successful result.
///
/// Callers arriving while an attempt is in flight await that same attempt.
/// A success is kept for the cache's lifetime. A failure is handed to every
/// caller of the failed attempt and then forgotten, so the next [`get`]
/// starts a fresh fetch.
///
/// [`get`]: LazyAsyncCache::get
pub struct LazyAsyncCache<T, E> {
    name: &'static str,
    fetch: Fetch<T, E>,
    state: RefCell<CacheState<T, E>>,
    attempts: RefCell<u64>,
}

impl<T, E> fmt::Debug for LazyAsyncCache<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.borrow() {
            CacheState::Unstarted => "unstarted",
            CacheState::InFlight { .. } => "in-flight",
            CacheState::Completed(_) => "completed",
        };
        f.debug_struct("LazyAsyncCache")
            .field("name", &self.name)
            .field("state", &state)
            .field("attempts", &*self.attempts.borrow())
            .finish()
    }
}

impl<T, E> LazyAsyncCache<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Display + 'static,
{
    pub fn new<F, Fut>(name: &'static str, fetch: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
    {
        Self {
            name,
            fetch: Box::new(move || fetch().boxed_local()),
            state: RefCell::new(CacheState::Unstarted),
            attempts: RefCell::new(0),
        }
    }

    /// Number of times the underlying fetch has been started.
    pub fn attempts(&self) -> u64 {
        *self.attempts.borrow()
    }

    pub fn is_completed(&self) -> bool {
        matches!(&*self.state.borrow(), CacheState::Completed(_))
    }

    pub async fn get(&self) -> Result<T, E> {
        let (attempt, task) = {
            let mut state = self.state.borrow_mut();
            match &*state {
                CacheState::Completed(value) => return Ok(value.clone()),
                CacheState::InFlight { attempt, task } => {
                    debug!(cache = self.name, attempt, "Joining in-flight fetch");
                    (*attempt, task.clone())
                }
                CacheState::Unstarted => {
                    let attempt = {
                        let mut attempts = self.attempts.borrow_mut();
                        *attempts += 1;
                        *attempts
                    };
                    debug!(cache = self.name, attempt, "Starting fetch");
                    let task = (self.fetch)().shared();
                    *state = CacheState::InFlight {
                        attempt,
                        task: task.clone(),
                    };
                    (attempt, task)
                }
            }
        };

        let result = task.await;

        let mut state = self.state.borrow_mut();
        // Only the first caller back from this attempt moves the state on.
        if matches!(&*state, CacheState::InFlight { attempt: current, .. } if *current == attempt)
        {
            *state = match &result {
                Ok(value) => CacheState::Completed(value.clone()),
                Err(err) => {
                    warn!(cache = self.name, attempt, error = %err, "Fetch failed, will retry on next access");
                    CacheState::Unstarted
                }
            };
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use tokio::sync::Notify;

    use super::*;

    fn counting_cache(
        calls: Rc<Cell<u32>>,
        gate: Rc<Notify>,
        fail_first: u32,
    ) -> LazyAsyncCache<Vec<u32>, String> {
        LazyAsyncCache::new("numbers", move || {
            let calls = Rc::clone(&calls);
            let gate = Rc::clone(&gate);
            async move {
                calls.set(calls.get() + 1);
                let n = calls.get();
                gate.notified().await;
                if n <= fail_first {
                    Err(format!("attempt {n} failed"))
                } else {
                    Ok(vec![1, 2, 3])
                }
            }
        })
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let calls = Rc::new(Cell::new(0));
        let gate = Rc::new(Notify::new());
        let cache = counting_cache(Rc::clone(&calls), Rc::clone(&gate), 0);

        let release = async {
            tokio::task::yield_now().await;
            gate.notify_one();
        };
        let (a, b, c, ()) = tokio::join!(cache.get(), cache.get(), cache.get(), release);

        assert_eq!(calls.get(), 1);
        assert_eq!(a, Ok(vec![1, 2, 3]));
        assert_eq!(b, a);
        assert_eq!(c, a);
        assert!(cache.is_completed());
    }

    #[tokio::test]
    async fn success_is_memoized() {
        let calls = Rc::new(Cell::new(0));
        let gate = Rc::new(Notify::new());
        let cache = counting_cache(Rc::clone(&calls), Rc::clone(&gate), 0);

        gate.notify_one();
        assert!(cache.get().await.is_ok());
        assert!(cache.get().await.is_ok());
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.attempts(), 1);
    }

    #[tokio::test]
    async fn failure_is_shared_then_retried() {
        let calls = Rc::new(Cell::new(0));
        let gate = Rc::new(Notify::new());
        let cache = counting_cache(Rc::clone(&calls), Rc::clone(&gate), 1);

        let release = async {
            tokio::task::yield_now().await;
            gate.notify_one();
        };
        let (a, b, ()) = tokio::join!(cache.get(), cache.get(), release);
        assert_eq!(a, Err("attempt 1 failed".to_string()));
        assert_eq!(b, a);
        assert_eq!(calls.get(), 1);
        assert!(!cache.is_completed());

        gate.notify_one();
        assert_eq!(cache.get().await, Ok(vec![1, 2, 3]));
        assert_eq!(calls.get(), 2);
        assert_eq!(cache.attempts(), 2);
    }

    #[tokio::test]
    async fn repeated_failures_refetch_every_time() {
        let calls = Rc::new(Cell::new(0));
        let gate = Rc::new(Notify::new());
        let cache = counting_cache(Rc::clone(&calls), Rc::clone(&gate), 3);

        for expected in 1..=3 {
            gate.notify_one();
            assert!(cache.get().await.is_err());
            assert_eq!(calls.get(), expected);
        }
        gate.notify_one();
        assert!(cache.get().await.is_ok());
    }
}
