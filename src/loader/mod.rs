//! Loader combinators: retries and timeouts.
//!
//! A [`Resource`](crate::Resource) never retries: a failed load stays failed.
//! When a load should survive transient errors, the retrying belongs inside the
//! loader, before the cache ever sees an outcome. The builders here take a
//! factory for one attempt and return a loader ready to hand to
//! [`ResourceGroup::get`](crate::ResourceGroup::get).
//!
//! Requires the `async` feature (delays and timeouts run on the tokio timer).
//!
//! # Example
//!
//! ```rust
//! use reservoir::loader::{retrying, RetryPolicy};
//! use reservoir::ResourceGroup;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let group = ResourceGroup::new();
//! let policy = RetryPolicy::constant(Duration::from_millis(1)).with_max_retries(2);
//!
//! let value = group
//!     .load("config", retrying(|| async { Ok::<_, String>(7) }, policy))
//!     .await;
//!
//! assert_eq!(value.unwrap(), 7);
//! # });
//! ```

mod error;
mod policy;

pub use error::{RetryExhausted, TimeoutError};
pub use policy::{RetryPolicy, RetryStrategy};

use std::future::Future;
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt};

/// A loader that runs `make_attempt` until it succeeds or `policy` gives up.
///
/// Each retry creates a fresh attempt from the factory, so attempts that hold
/// connections or request IDs are rebuilt rather than reused. On failure the
/// loader reports the last error together with the attempt count.
pub fn retrying<T, E, F, Fut>(
    make_attempt: F,
    policy: RetryPolicy,
) -> impl FnOnce() -> BoxFuture<'static, Result<T, RetryExhausted<E>>> + Send + 'static
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    move || {
        async move {
            let start = Instant::now();
            let mut attempt = 0u32;

            loop {
                match make_attempt().await {
                    Ok(value) => return Ok(value),
                    Err(error) => match policy.delay_for_attempt(attempt) {
                        Some(delay) => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!(
                                attempt = attempt + 1,
                                ?delay,
                                "loader attempt failed, retrying"
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                        None => {
                            return Err(RetryExhausted::new(
                                error,
                                attempt + 1,
                                start.elapsed(),
                            ));
                        }
                    },
                }
            }
        }
        .boxed()
    }
}

/// Like [`retrying`], but only retries errors accepted by `should_retry`.
///
/// Errors the predicate rejects are returned immediately, unchanged. When
/// retries run out, the last error is returned as is.
pub fn retry_if<T, E, F, Fut, P>(
    make_attempt: F,
    policy: RetryPolicy,
    should_retry: P,
) -> impl FnOnce() -> BoxFuture<'static, Result<T, E>> + Send + 'static
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    P: Fn(&E) -> bool + Send + 'static,
{
    move || {
        async move {
            let mut attempt = 0u32;

            loop {
                match make_attempt().await {
                    Ok(value) => return Ok(value),
                    Err(error) => {
                        if !should_retry(&error) {
                            return Err(error);
                        }
                        match policy.delay_for_attempt(attempt) {
                            Some(delay) => {
                                tokio::time::sleep(delay).await;
                                attempt += 1;
                            }
                            None => return Err(error),
                        }
                    }
                }
            }
        }
        .boxed()
    }
}

/// A loader that fails with [`TimeoutError::Timeout`] if `loader` takes
/// longer than `duration`.
///
/// The cache itself imposes no timeout; a loader that never finishes leaves its
/// resource pending forever. Wrap loaders that talk to the network.
pub fn with_timeout<T, E, F, Fut>(
    loader: F,
    duration: Duration,
) -> impl FnOnce() -> BoxFuture<'static, Result<T, TimeoutError<E>>> + Send + 'static
where
    T: Send + 'static,
    E: Send + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    move || {
        async move {
            match tokio::time::timeout(duration, loader()).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(TimeoutError::Inner(e)),
                Err(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(?duration, "loader timed out");
                    Err(TimeoutError::Timeout { duration })
                }
            }
        }
        .boxed()
    }
}
