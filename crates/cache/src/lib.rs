//! In-process single-flight artifact cache
//!
//! Maps an [`ArtifactKey`] to a fetched (and, where applicable, normalized)
//! artifact. Per key the lifecycle is `absent → pending → {ready | absent}`:
//! exactly one fetch runs for a key at a time, every concurrent caller for
//! that key shares its result, and failures are never stored — the next
//! request retries from scratch.
//!
//! The cache grows monotonically for the life of the process. Keys are
//! bounded by the distinct runtime versions and release triplets actually
//! requested, and artifacts are immutable per version, so there is no
//! eviction, TTL, or size bound.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::{debug, warn};

use carimbo_core::{Artifact, ArtifactKey, Error, Result};

type Flight = Shared<BoxFuture<'static, Result<Arc<Artifact>>>>;

enum Slot {
    /// Population finished; the artifact is immutable from here on.
    Ready(Arc<Artifact>),
    /// A fetch is in flight; waiters share its future.
    Pending(Flight),
}

/// Process-wide artifact cache with per-key single-flight retrieval.
///
/// Cheap to clone (all clones share one map). Constructed once at startup and
/// handed to the HTTP layer as explicit state; there is no global instance.
#[derive(Clone, Default)]
pub struct ArtifactCache {
    slots: Arc<Mutex<HashMap<ArtifactKey, Slot>>>,
}

impl ArtifactCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the artifact for `key`, fetching it with `fetch` on a miss.
    ///
    /// A ready entry returns immediately with no lock held beyond the map
    /// probe. On a miss the produced future runs on a spawned task, so a
    /// caller that disconnects mid-fetch cannot cancel the fetch for the
    /// other waiters; concurrent callers for the same key all await that one
    /// task and receive the same result. Callers for different keys only
    /// ever contend on the brief map probe, never on each other's I/O.
    ///
    /// # Errors
    ///
    /// Forwards whatever error the fetch produced, to every waiter of that
    /// flight. The key is left absent afterwards, so the next call retries.
    pub async fn get_or_fetch<F, Fut>(&self, key: ArtifactKey, fetch: F) -> Result<Arc<Artifact>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Artifact>> + Send + 'static,
    {
        let flight = {
            let mut slots = lock(&self.slots);
            match slots.get(&key) {
                Some(Slot::Ready(artifact)) => {
                    debug!(?key, "cache hit");
                    return Ok(Arc::clone(artifact));
                }
                Some(Slot::Pending(flight)) => {
                    debug!(?key, "joining in-flight fetch");
                    flight.clone()
                }
                None => {
                    debug!(?key, "cache miss, starting fetch");
                    let flight = spawn_flight(Arc::clone(&self.slots), key.clone(), fetch());
                    slots.insert(key, Slot::Pending(flight.clone()));
                    flight
                }
            }
        };

        flight.await
    }

    /// Number of ready entries, pending flights excluded.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.slots)
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    /// Whether the cache holds no ready entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run `fut` on its own task and return a sharable handle to its outcome.
///
/// The spawned task itself promotes the slot to ready or clears it on
/// failure, so the bookkeeping happens even if every waiter has gone away.
fn spawn_flight<Fut>(
    slots: Arc<Mutex<HashMap<ArtifactKey, Slot>>>,
    key: ArtifactKey,
    fut: Fut,
) -> Flight
where
    Fut: Future<Output = Result<Artifact>> + Send + 'static,
{
    let task = tokio::spawn(async move {
        let outcome = fut.await;
        let mut slots = lock(&slots);
        match outcome {
            Ok(artifact) => {
                let artifact = Arc::new(artifact);
                slots.insert(key, Slot::Ready(Arc::clone(&artifact)));
                Ok(artifact)
            }
            Err(error) => {
                warn!(?key, %error, "fetch failed, leaving key absent");
                slots.remove(&key);
                Err(error)
            }
        }
    });

    async move {
        match task.await {
            Ok(outcome) => outcome,
            Err(join_error) => Err(Error::internal(format!("fetch task failed: {join_error}"))),
        }
    }
    .boxed()
    .shared()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A poisoned guard only means another thread panicked while holding it;
    // the map is never left mid-update, so the data is still consistent.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Barrier;

    fn key(version: &str) -> ArtifactKey {
        ArtifactKey::Runtime {
            version: version.to_string(),
        }
    }

    fn bundle(bytes: &[u8]) -> Artifact {
        Artifact::Bundle(bytes.to_vec())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_callers_share_one_fetch() {
        let cache = ArtifactCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch(key("1.0.0"), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(bundle(b"payload"))
                    })
                    .await
            }));
        }

        for handle in handles {
            let artifact = handle.await.unwrap().unwrap();
            match artifact.as_ref() {
                Artifact::Bundle(bytes) => assert_eq!(bytes, b"payload"),
                other => panic!("unexpected artifact shape: {other:?}"),
            }
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn ready_entries_are_served_without_refetching() {
        let cache = ArtifactCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            cache
                .get_or_fetch(key("1.0.0"), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(bundle(b"payload"))
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = ArtifactCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = {
            let calls = Arc::clone(&calls);
            cache
                .get_or_fetch(key("1.0.0"), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(Error::transport("connection reset"))
                })
                .await
        };
        assert!(first.is_err());
        assert!(cache.is_empty());

        let second = {
            let calls = Arc::clone(&calls);
            cache
                .get_or_fetch(key("1.0.0"), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(bundle(b"recovered"))
                })
                .await
        };
        assert!(second.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn all_waiters_observe_the_same_failure() {
        let cache = ArtifactCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch(key("1.0.0"), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        Err(Error::upstream_status(503, "https://example.com"))
                    })
                    .await
            }));
        }

        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert!(matches!(err, Error::UpstreamStatus { status: 503, .. }), "got {err:?}");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn distinct_keys_do_not_serialize() {
        let cache = ArtifactCache::new();
        // Both fetches must be in flight at once to pass the barrier; if one
        // key's fetch blocked the other this would time out.
        let barrier = Arc::new(Barrier::new(2));

        let mut handles = Vec::new();
        for version in ["1.0.0", "2.0.0"] {
            let cache = cache.clone();
            let barrier = Arc::clone(&barrier);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch(key(version), move || async move {
                        barrier.wait().await;
                        Ok(bundle(version.as_bytes()))
                    })
                    .await
            }));
        }

        let joined = tokio::time::timeout(Duration::from_secs(5), async {
            for handle in handles {
                handle.await.unwrap().unwrap();
            }
        })
        .await;
        assert!(joined.is_ok(), "fetches for distinct keys blocked each other");
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fetch_survives_a_cancelled_requester() {
        let cache = ArtifactCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let requester = {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .get_or_fetch(key("1.0.0"), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(bundle(b"payload"))
                    })
                    .await
            })
        };

        // Simulate the client disconnecting mid-fetch.
        tokio::time::sleep(Duration::from_millis(20)).await;
        requester.abort();

        // The flight keeps going and populates the cache for later callers.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.len(), 1);

        let artifact = cache
            .get_or_fetch(key("1.0.0"), || async { Ok(bundle(b"should not run")) })
            .await
            .unwrap();
        match artifact.as_ref() {
            Artifact::Bundle(bytes) => assert_eq!(bytes, b"payload"),
            other => panic!("unexpected artifact shape: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
