//! Keyed registry of resources.
//!
//! A [`ResourceGroup`] maps string keys to [`Resource`]s and guarantees that a
//! key is bound to at most one resource for the group's lifetime. Concurrent
//! requests for the same key share that resource, and so share one load.
//!
//! Groups are ordinary values: create one per scope (a session, a request, a
//! view) and pass it by reference or `Arc`. There is no eviction; to
//! invalidate, use a fresh key or a fresh group.
//!
//! # Example
//!
//! ```rust
//! use reservoir::ResourceGroup;
//!
//! # tokio_test::block_on(async {
//! let group = ResourceGroup::<String, String>::new();
//!
//! let first = group.get("dataset/42", || async { Ok("cats".to_string()) });
//! let second = group.get("dataset/42", || async { Ok("dogs".to_string()) });
//!
//! // Same resource; the second loader was never called.
//! assert!(std::sync::Arc::ptr_eq(&first, &second));
//! assert_eq!(second.load().await.unwrap(), "cats");
//! # });
//! ```

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::resource::{Inflight, Resource, Status};

/// A keyed store of resources with single-flight loading per key.
pub struct ResourceGroup<T, E> {
    table: Mutex<HashMap<String, Arc<Resource<T, E>>>>,
}

impl<T, E> ResourceGroup<T, E> {
    /// Create an empty group.
    pub fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
        }
    }

    /// Create an empty group with room for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: Mutex::new(HashMap::with_capacity(capacity)),
        }
    }

    /// The resource registered under `key`, without creating one.
    pub fn peek(&self, key: &str) -> Option<Arc<Resource<T, E>>> {
        self.lock().get(key).cloned()
    }

    /// Returns true if `key` has a resource.
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no keys are registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of the registered keys, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Count resources by status.
    pub fn stats(&self) -> GroupStats {
        let table = self.lock();
        let mut stats = GroupStats {
            total: table.len(),
            ..GroupStats::default()
        };
        for resource in table.values() {
            match resource.status() {
                Status::Unstarted => stats.unstarted += 1,
                Status::Pending => stats.pending += 1,
                Status::Resolved => stats.resolved += 1,
                Status::Rejected => stats.rejected += 1,
            }
        }
        stats
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Resource<T, E>>>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, E> ResourceGroup<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// The resource for `key`, created from `loader` if the key is new.
    ///
    /// If `key` is already registered, the existing resource is returned and
    /// `loader` is dropped without being called, even if it would behave
    /// differently. Callers are expected to pass an equivalent loader for a
    /// given key every time.
    ///
    /// The returned resource has always had [`load`](Resource::load) called,
    /// so its loader has been invoked and [`read`](Resource::read) on it never
    /// reports `NotLoaded`. With the `async` feature, a call made inside a
    /// tokio runtime also keeps the load moving on a background task, so
    /// repeated `read`s observe its progress without awaiting anything.
    pub fn get<F, Fut>(&self, key: &str, loader: F) -> Arc<Resource<T, E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let resource = {
            let mut table = self.lock();
            match table.get(key) {
                Some(existing) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(key, "resource group hit");
                    Arc::clone(existing)
                }
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(key, "resource group insert");
                    let created = Arc::new(Resource::with_key(key, loader));
                    table.insert(key.to_owned(), Arc::clone(&created));
                    created
                }
            }
        };

        #[cfg(feature = "async")]
        resource.load_in_background();
        #[cfg(not(feature = "async"))]
        resource.load();

        resource
    }

    /// Shorthand for `get(key, loader).load()`.
    pub fn load<F, Fut>(&self, key: &str, loader: F) -> Inflight<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.get(key, loader).load()
    }
}

impl<T, E> Default for ResourceGroup<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for ResourceGroup<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceGroup")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Resource counts for a [`ResourceGroup`], by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupStats {
    /// All registered keys.
    pub total: usize,
    /// Registered but never loaded.
    pub unstarted: usize,
    /// Loads in flight.
    pub pending: usize,
    /// Loads that produced a value.
    pub resolved: usize,
    /// Loads that failed.
    pub rejected: usize,
}

impl GroupStats {
    /// Fraction of entries that have settled, or `0.0` for an empty group.
    pub fn settled_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.resolved + self.rejected) as f64 / self.total as f64
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for GroupStats {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("GroupStats", 5)?;
        state.serialize_field("total", &self.total)?;
        state.serialize_field("unstarted", &self.unstarted)?;
        state.serialize_field("pending", &self.pending)?;
        state.serialize_field("resolved", &self.resolved)?;
        state.serialize_field("rejected", &self.rejected)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReadError;
    use crate::testing::{gate, CallCounter};
    use std::time::Duration;

    #[test]
    fn test_empty_group() {
        let group = ResourceGroup::<i32, String>::new();
        assert!(group.is_empty());
        assert_eq!(group.len(), 0);
        assert!(group.peek("k").is_none());
        assert_eq!(group.stats(), GroupStats::default());
    }

    #[test]
    fn test_second_loader_for_same_key_is_ignored() {
        let first = CallCounter::new();
        let second = CallCounter::new();
        let group = ResourceGroup::<&'static str, String>::with_capacity(4);

        let a = group.get("k", first.ready(Ok("a")));
        let b = group.get("k", second.ready(Ok("b")));

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(futures::executor::block_on(b.load()), Ok("a"));
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 0);
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn test_get_starts_the_load() {
        let (_gate, loader) = gate::<i32, String>();
        let group = ResourceGroup::new();

        let resource = group.get("k", loader);
        assert_eq!(resource.status(), Status::Pending);
        assert!(resource.read().unwrap_err().is_not_ready());
    }

    #[test]
    fn test_get_invokes_loader_without_awaiting() {
        let counter = CallCounter::new();
        let group = ResourceGroup::<i32, String>::new();

        let resource = group.get("k", counter.ready(Ok(1)));
        assert_eq!(counter.calls(), 1);
        assert_eq!(resource.read().unwrap(), 1);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_get_progresses_between_reads() {
        let counter = CallCounter::new();
        let group = ResourceGroup::<i32, String>::new();
        let loader = || counter.wrap(|| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(1)
        });

        let resource = group.get("k", loader());
        assert!(resource.read().unwrap_err().is_not_ready());

        let mut value = None;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if let Ok(v) = group.get("k", loader()).read() {
                value = Some(v);
                break;
            }
        }
        assert_eq!(value, Some(1));
        assert_eq!(counter.calls(), 1);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_spawn_on_group_resource_drives_load() {
        let counter = CallCounter::new();
        let group = ResourceGroup::<i32, String>::new();

        let resource = group.get(
            "k",
            counter.wrap(|| async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(3)
            }),
        );
        drop(resource.spawn());
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(resource.status(), Status::Resolved);
        assert_eq!(resource.get(), Some(3));
        assert_eq!(counter.calls(), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let group = ResourceGroup::<i32, String>::new();

        let a = group.get("a", || async { Err("a failed".to_string()) });
        let b = group.get("b", || async { Ok(2) });

        assert_eq!(
            futures::executor::block_on(a.load()),
            Err("a failed".to_string())
        );
        assert_eq!(futures::executor::block_on(b.load()), Ok(2));

        assert!(matches!(a.read(), Err(ReadError::LoaderFailed(_))));
        assert_eq!(b.read().unwrap(), 2);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_failed_key_stays_failed() {
        let counter = CallCounter::new();
        let group = ResourceGroup::<i32, String>::new();

        let _ = futures::executor::block_on(group.load("k", counter.ready(Err("x".to_string()))));
        let again = futures::executor::block_on(group.load("k", counter.ready(Ok(1))));

        assert_eq!(again, Err("x".to_string()));
        assert_eq!(counter.calls(), 1);
    }

    #[test]
    fn test_peek_and_keys() {
        let group = ResourceGroup::<i32, String>::new();
        group.get("x", || async { Ok(1) });
        group.get("y", || async { Ok(2) });

        let mut keys = group.keys();
        keys.sort();
        assert_eq!(keys, vec!["x".to_string(), "y".to_string()]);
        assert!(group.contains_key("x"));
        assert!(!group.contains_key("z"));
        assert_eq!(group.peek("y").and_then(|r| r.key().map(str::to_owned)), Some("y".to_string()));
    }

    #[test]
    fn test_stats_by_status() {
        let (_gate, pending) = gate::<i32, String>();
        let group = ResourceGroup::<i32, String>::new();

        group.get("pending", pending);
        futures::executor::block_on(group.load("ok", || async { Ok(1) })).unwrap();
        let _ = futures::executor::block_on(group.load("err", || async { Err("e".to_string()) }));

        let stats = group.stats();
        assert_eq!(
            stats,
            GroupStats {
                total: 3,
                unstarted: 0,
                pending: 1,
                resolved: 1,
                rejected: 1,
            }
        );
        assert!((stats.settled_ratio() - 2.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(GroupStats::default().settled_ratio(), 0.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_gets_create_one_resource() {
        let counter = CallCounter::new();
        let group = Arc::new(ResourceGroup::<u32, String>::new());

        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let group = Arc::clone(&group);
                let counter = counter.clone();
                tokio::spawn(async move {
                    let resource = group.get(
                        "dataset/42",
                        counter.wrap(move || async move {
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            Ok(i)
                        }),
                    );
                    let value = resource.load().await;
                    (resource, value)
                })
            })
            .collect();

        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap());
        }

        let (first, first_value) = &results[0];
        for (resource, value) in &results {
            assert!(Arc::ptr_eq(first, resource));
            assert_eq!(value, first_value);
        }
        assert_eq!(counter.calls(), 1);
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn test_debug_shows_stats() {
        let group = ResourceGroup::<i32, String>::new();
        let debug = format!("{:?}", group);
        assert!(debug.starts_with("ResourceGroup"));
        assert!(debug.contains("total: 0"));
    }
}
