//! The shared handle for a resource's single load.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::error::Wait;

/// An awaitable handle on a resource's load.
///
/// Every call to [`Resource::load`](crate::Resource::load) hands out a clone of
/// the same underlying future, so any number of waiters attach to one loader
/// invocation. Once the load has settled, awaiting a handle yields a clone of
/// the stored outcome immediately.
///
/// Dropping a handle does not cancel the load for other holders.
pub struct Inflight<T, E> {
    shared: Shared<BoxFuture<'static, Result<T, E>>>,
}

impl<T, E> Inflight<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(future: BoxFuture<'static, Result<T, E>>) -> Self {
        Self {
            shared: future.shared(),
        }
    }

    /// The outcome, if some holder has already driven the load to completion.
    pub fn peek(&self) -> Option<&Result<T, E>> {
        self.shared.peek()
    }

    /// A type-erased handle that completes together with this one.
    pub(crate) fn wait(&self) -> Wait {
        Wait::new(self.shared.clone().map(drop))
    }
}

impl<T, E> Clone for Inflight<T, E>
where
    T: Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> Future for Inflight<T, E>
where
    T: Clone,
    E: Clone,
{
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.shared).poll(cx)
    }
}

impl<T, E> fmt::Debug for Inflight<T, E>
where
    T: Clone,
    E: Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inflight")
            .field("settled", &self.shared.peek().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_one_outcome() {
        let inflight = Inflight::<i32, String>::new(async { Ok(42) }.boxed());
        let other = inflight.clone();

        assert!(inflight.peek().is_none());
        assert_eq!(futures::executor::block_on(other), Ok(42));
        assert_eq!(inflight.peek(), Some(&Ok(42)));
        assert_eq!(futures::executor::block_on(inflight), Ok(42));
    }

    #[test]
    fn test_debug_reports_settlement() {
        let inflight = Inflight::<i32, String>::new(async { Err("nope".to_string()) }.boxed());
        assert_eq!(format!("{:?}", inflight), "Inflight { settled: false }");

        let _ = futures::executor::block_on(inflight.clone());
        assert_eq!(format!("{:?}", inflight), "Inflight { settled: true }");
    }

    #[test]
    fn test_wait_follows_the_load() {
        let inflight = Inflight::<i32, String>::new(async { Ok(1) }.boxed());
        futures::executor::block_on(inflight.wait());
        assert_eq!(inflight.peek(), Some(&Ok(1)));
    }
}
