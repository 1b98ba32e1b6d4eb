//! Testing utilities for code built on resources.
//!
//! This module provides helpers for observing and controlling loaders in
//! tests: a call counter, a manually released loader, and assertion macros
//! for the synchronous read contract.
//!
//! # Examples
//!
//! ## Counting loader invocations
//!
//! ```rust
//! use reservoir::testing::CallCounter;
//! use reservoir::ResourceGroup;
//!
//! let counter = CallCounter::new();
//! let group = ResourceGroup::<i32, String>::new();
//!
//! let a = group.get("k", counter.ready(Ok(1)));
//! let b = group.get("k", counter.ready(Ok(2)));
//! futures::executor::block_on(b.load()).unwrap();
//!
//! assert_eq!(a.get(), Some(1));
//! assert_eq!(counter.calls(), 1);
//! ```
//!
//! ## Assertion macros
//!
//! ```rust
//! use reservoir::testing::gate;
//! use reservoir::{assert_not_ready, assert_resolved, Resource};
//!
//! let (gate, loader) = gate::<i32, String>();
//! let resource = Resource::new(loader);
//! let handle = resource.load();
//! assert_not_ready!(resource);
//!
//! gate.resolve(5);
//! futures::executor::block_on(handle).unwrap();
//! assert_resolved!(resource, 5);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::channel::oneshot;
use futures::future::{self, BoxFuture, FutureExt, Ready};

/// Counts how many times the loaders it wraps are invoked.
///
/// Clones share the same count.
#[derive(Debug, Clone, Default)]
pub struct CallCounter {
    calls: Arc<AtomicUsize>,
}

impl CallCounter {
    /// Create a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of wrapped loaders invoked so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wrap `loader` so invoking it bumps this counter.
    pub fn wrap<F, Fut>(&self, loader: F) -> impl FnOnce() -> Fut + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: 'static,
    {
        let calls = Arc::clone(&self.calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            loader()
        }
    }

    /// A counted loader that completes immediately with `outcome`.
    pub fn ready<T, E>(
        &self,
        outcome: Result<T, E>,
    ) -> impl FnOnce() -> Ready<Result<T, E>> + Send + 'static
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        self.wrap(move || future::ready(outcome))
    }
}

/// The release side of a [`gate`] loader.
#[derive(Debug)]
pub struct Gate<T, E> {
    tx: oneshot::Sender<Result<T, E>>,
}

impl<T, E> Gate<T, E> {
    /// Let the gated loader complete with `outcome`.
    pub fn settle(self, outcome: Result<T, E>) {
        // The loader may already be gone; nothing is waiting then.
        let _ = self.tx.send(outcome);
    }

    /// Let the gated loader succeed with `value`.
    pub fn resolve(self, value: T) {
        self.settle(Ok(value));
    }

    /// Let the gated loader fail with `error`.
    pub fn reject(self, error: E) {
        self.settle(Err(error));
    }
}

/// A loader that stays pending until its [`Gate`] is released.
///
/// Dropping the gate without releasing it leaves the loader pending forever,
/// like a stuck network call.
pub fn gate<T, E>() -> (
    Gate<T, E>,
    impl FnOnce() -> BoxFuture<'static, Result<T, E>> + Send + 'static,
)
where
    T: Send + 'static,
    E: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let loader = move || {
        async move {
            match rx.await {
                Ok(outcome) => outcome,
                Err(oneshot::Canceled) => future::pending().await,
            }
        }
        .boxed()
    };
    (Gate { tx }, loader)
}

/// A loader factory that delays `outcome` by `delay` on the tokio timer.
#[cfg(feature = "async")]
pub fn delayed<T, E>(
    delay: std::time::Duration,
    outcome: Result<T, E>,
) -> impl FnOnce() -> BoxFuture<'static, Result<T, E>> + Send + 'static
where
    T: Send + 'static,
    E: Send + 'static,
{
    move || {
        async move {
            tokio::time::sleep(delay).await;
            outcome
        }
        .boxed()
    }
}

/// Assert that a resource has resolved to the expected value.
///
/// Panics if the resource is pending, unloaded, or rejected.
///
/// # Example
///
/// ```rust
/// use reservoir::{assert_resolved, Resource};
///
/// let resource = Resource::<i32, String>::new(|| async { Ok(1) });
/// futures::executor::block_on(resource.load()).unwrap();
/// assert_resolved!(resource, 1);
/// ```
#[macro_export]
macro_rules! assert_resolved {
    ($resource:expr, $expected:expr) => {
        match $resource.read() {
            Ok(value) => assert_eq!(value, $expected),
            Err(e) => panic!("Expected Resolved, got {:?}", e),
        }
    };
}

/// Assert that a resource has rejected with the expected error.
///
/// # Example
///
/// ```rust
/// use reservoir::{assert_rejected, Resource};
///
/// let resource = Resource::<i32, String>::new(|| async { Err("boom".to_string()) });
/// let _ = futures::executor::block_on(resource.load());
/// assert_rejected!(resource, "boom".to_string());
/// ```
#[macro_export]
macro_rules! assert_rejected {
    ($resource:expr, $expected:expr) => {
        match $resource.read() {
            Err($crate::ReadError::LoaderFailed(e)) => assert_eq!(e, $expected),
            Ok(v) => panic!("Expected Rejected, got Resolved: {:?}", v),
            Err(other) => panic!("Expected Rejected, got {:?}", other),
        }
    };
}

/// Assert that a resource is still loading.
#[macro_export]
macro_rules! assert_not_ready {
    ($resource:expr) => {
        match $resource.read() {
            Err($crate::ReadError::NotReady(_)) => {}
            Ok(v) => panic!("Expected NotReady, got Resolved: {:?}", v),
            Err(other) => panic!("Expected NotReady, got {:?}", other),
        }
    };
}
