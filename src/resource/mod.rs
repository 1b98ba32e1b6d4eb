//! A single memoized asynchronous load.
//!
//! A [`Resource`] wraps a loader and runs it at most once. Callers can attach
//! to the load and await it with [`load`](Resource::load), or probe it
//! synchronously with [`read`](Resource::read) and [`get`](Resource::get).
//!
//! # Example
//!
//! ```rust
//! use reservoir::Resource;
//!
//! # tokio_test::block_on(async {
//! let resource = Resource::<String, String>::new(|| async { Ok("cats".to_string()) });
//!
//! // Two waiters, one loader invocation.
//! let (a, b) = futures::join!(resource.load(), resource.load());
//! assert_eq!(a, b);
//!
//! // Settled: synchronous access from now on.
//! assert_eq!(resource.get().as_deref(), Some("cats"));
//! assert_eq!(resource.read().unwrap(), "cats");
//! # });
//! ```
//!
//! # Laziness
//!
//! The first `load` calls the loader and polls its future once, on the calling
//! thread and outside any lock. A loader that is ready at once settles the
//! resource right there. Anything slower progresses only while someone polls
//! a handle: an awaited [`Inflight`], a `Wait` from [`read`](Resource::read),
//! or, with the `async` feature, the tokio task started by
//! [`Resource::spawn`]. Inside a tokio runtime a
//! [`ResourceGroup`](crate::ResourceGroup) starts that task for every load.
//!
//! # Panics
//!
//! A loader that panics does so in whichever call is polling it, including
//! the first `load`. The resource then stays `Pending`, and every later poll
//! of its handles panics as well.

mod inflight;
mod status;

pub use inflight::Inflight;
pub use status::Status;

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
#[cfg(feature = "async")]
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::FutureExt;

use crate::error::ReadError;

enum State<T, E> {
    Unstarted,
    Pending,
    Resolved(T),
    Rejected(E),
}

impl<T, E> State<T, E> {
    fn status(&self) -> Status {
        match self {
            State::Unstarted => Status::Unstarted,
            State::Pending => Status::Pending,
            State::Resolved(_) => Status::Resolved,
            State::Rejected(_) => Status::Rejected,
        }
    }
}

/// A memoized asynchronous load.
///
/// The value and error types are cloned out to every caller, so they must be
/// `Clone`; wrap large payloads in `Arc`.
///
/// See the [module documentation](self) for an overview.
pub struct Resource<T, E> {
    key: Option<Arc<str>>,
    state: Arc<Mutex<State<T, E>>>,
    inflight: Inflight<T, E>,
    #[cfg(feature = "async")]
    driven: AtomicBool,
}

impl<T, E> Resource<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create an unstarted resource around `loader`.
    pub fn new<F, Fut>(loader: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::build(None, loader)
    }

    /// Create an unstarted resource that reports `key` in logs and `Debug`.
    pub fn with_key<F, Fut>(key: impl Into<Arc<str>>, loader: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::build(Some(key.into()), loader)
    }

    fn build<F, Fut>(key: Option<Arc<str>>, loader: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let state = Arc::new(Mutex::new(State::Unstarted));
        let settle_into: Weak<Mutex<State<T, E>>> = Arc::downgrade(&state);

        // The loader runs inside the first poll, never under the state lock.
        let load = async move {
            let outcome = loader().await;
            if let Some(state) = settle_into.upgrade() {
                settle(&state, &outcome);
            }
            outcome
        };

        #[cfg(feature = "tracing")]
        let load = {
            use tracing::Instrument as _;
            load.instrument(tracing::debug_span!(
                "resource_load",
                key = key.as_deref().unwrap_or("-")
            ))
        };

        Self {
            key,
            state,
            inflight: Inflight::new(load.boxed()),
            #[cfg(feature = "async")]
            driven: AtomicBool::new(false),
        }
    }

    /// Start the load if needed and return the shared handle.
    ///
    /// The first call moves the resource from `Unstarted` to `Pending` and
    /// invokes the loader, polling its future once. Every call, concurrent or
    /// later, returns a handle on the same load, so the loader runs exactly
    /// once. After settlement the handle yields the stored value or error
    /// immediately.
    ///
    /// # Panics
    ///
    /// Panics if the loader panics while this call polls it. See the
    /// [module documentation](self#panics).
    pub fn load(&self) -> Inflight<T, E> {
        if self.start() {
            let _ = self.inflight.clone().now_or_never();
        }
        self.inflight.clone()
    }

    /// Like [`load`](Self::load), but also drives the load on a tokio task.
    ///
    /// At most one task is ever spawned per resource, whichever call started
    /// the load. A settled resource spawns nothing.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[cfg(feature = "async")]
    pub fn spawn(&self) -> Inflight<T, E> {
        let inflight = self.load();
        self.drive(&tokio::runtime::Handle::current(), &inflight);
        inflight
    }

    /// [`load`](Self::load), plus a driver task when a tokio runtime is
    /// current.
    #[cfg(feature = "async")]
    pub(crate) fn load_in_background(&self) -> Inflight<T, E> {
        let inflight = self.load();
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            self.drive(&runtime, &inflight);
        }
        inflight
    }

    #[cfg(feature = "async")]
    fn drive(&self, runtime: &tokio::runtime::Handle, inflight: &Inflight<T, E>) {
        if inflight.peek().is_some() || self.driven.swap(true, Ordering::AcqRel) {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(
            key = self.key.as_deref().unwrap_or("-"),
            "resource driver spawned"
        );

        runtime.spawn(inflight.clone().map(drop));
    }

    /// The value, if the load has resolved.
    ///
    /// Never starts a load and never fails.
    pub fn get(&self) -> Option<T> {
        match &*self.lock() {
            State::Resolved(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Synchronously probe the resource.
    ///
    /// Returns the value if resolved. Otherwise returns why not:
    /// [`ReadError::LoaderFailed`] with the original error (on every call),
    /// [`ReadError::NotReady`] with a handle to wait on while the load is in
    /// flight, or [`ReadError::NotLoaded`] if `load` was never called.
    ///
    /// `read` does not start loading and never blocks. It is only meaningful
    /// after at least one `load`; resources from a
    /// [`ResourceGroup`](crate::ResourceGroup) always satisfy that.
    ///
    /// `read` itself never polls the loader, but awaiting the `Wait` it returns
    /// for a load whose loader panicked panics too.
    pub fn read(&self) -> Result<T, ReadError<E>> {
        match &*self.lock() {
            State::Resolved(value) => Ok(value.clone()),
            State::Rejected(error) => Err(ReadError::LoaderFailed(error.clone())),
            State::Pending => Err(ReadError::NotReady(self.inflight.wait())),
            State::Unstarted => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    key = self.key.as_deref().unwrap_or("-"),
                    "resource read before load was called"
                );
                Err(ReadError::NotLoaded)
            }
        }
    }

    /// Returns true if this call moved the resource out of `Unstarted`.
    fn start(&self) -> bool {
        let mut state = self.lock();
        if !matches!(*state, State::Unstarted) {
            return false;
        }
        *state = State::Pending;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            key = self.key.as_deref().unwrap_or("-"),
            "resource load started"
        );

        true
    }
}

impl<T, E> Resource<T, E> {
    /// Current lifecycle status.
    pub fn status(&self) -> Status {
        self.lock().status()
    }

    /// The key this resource was registered under, if any.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, State<T, E>> {
        // No caller code runs under this lock, so a poisoned state is intact.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Record the loader's outcome. Only a pending resource can settle.
fn settle<T: Clone, E: Clone>(state: &Mutex<State<T, E>>, outcome: &Result<T, E>) {
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    if !matches!(*state, State::Pending) {
        return;
    }

    *state = match outcome {
        Ok(value) => {
            #[cfg(feature = "tracing")]
            tracing::debug!("resource resolved");
            State::Resolved(value.clone())
        }
        Err(error) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("resource rejected");
            State::Rejected(error.clone())
        }
    };
}

impl<T, E> fmt::Debug for Resource<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("key", &self.key())
            .field("status", &self.status())
            .finish()
    }
}
