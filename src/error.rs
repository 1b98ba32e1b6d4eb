//! Error types for resource reads.
//!
//! A synchronous [`read`](crate::Resource::read) has three ways to not return a
//! value, and only one of them is a real failure:
//!
//! - [`ReadError::LoaderFailed`]: the loader completed with an error. The same
//!   error is replayed to every later caller.
//! - [`ReadError::NotReady`]: the load is still running. Await the carried
//!   [`Wait`] and read again.
//! - [`ReadError::NotLoaded`]: `read` was called before any `load`, so there is
//!   nothing to wait on.
//!
//! [`ResourceError`] is the terminal subset, returned by
//! [`suspend`](crate::suspend) once waiting has been handled.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;

/// A type-erased handle that completes when a pending load settles.
///
/// Carried by [`ReadError::NotReady`]. It yields `()` regardless of the
/// outcome; read the resource again afterwards to get the value or error.
pub struct Wait(BoxFuture<'static, ()>);

impl Wait {
    pub(crate) fn new<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Wait(Box::pin(future))
    }
}

impl Future for Wait {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.0.as_mut().poll(cx)
    }
}

impl fmt::Debug for Wait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Wait { .. }")
    }
}

/// Why a synchronous read did not produce a value.
///
/// # Examples
///
/// ```rust
/// use reservoir::testing::gate;
/// use reservoir::{ReadError, Resource};
///
/// let (gate, loader) = gate::<u32, String>();
/// let resource = Resource::new(loader);
///
/// // Nothing has called `load` yet.
/// assert!(matches!(resource.read(), Err(ReadError::NotLoaded)));
///
/// let handle = resource.load();
/// assert!(resource.read().unwrap_err().is_not_ready());
///
/// gate.resolve(7);
/// futures::executor::block_on(handle).unwrap();
/// assert_eq!(resource.read().unwrap(), 7);
/// ```
pub enum ReadError<E> {
    /// The loader failed with this error.
    LoaderFailed(E),
    /// The load is still in flight. Await the handle, then read again.
    NotReady(Wait),
    /// `read` was called before `load`.
    NotLoaded,
}

impl<E> ReadError<E> {
    /// Returns true if the load is still pending.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady(_))
    }

    /// Returns true if the loader failed.
    pub fn is_loader_failed(&self) -> bool {
        matches!(self, Self::LoaderFailed(_))
    }

    /// Get the loader's error, if that is what this is.
    pub fn loader_error(&self) -> Option<&E> {
        match self {
            Self::LoaderFailed(e) => Some(e),
            _ => None,
        }
    }

    /// Split into the wait handle or a terminal error.
    ///
    /// `Ok(wait)` means the caller should suspend on `wait` and retry.
    pub fn into_wait(self) -> Result<Wait, ResourceError<E>> {
        match self {
            Self::NotReady(wait) => Ok(wait),
            Self::LoaderFailed(e) => Err(ResourceError::LoaderFailed(e)),
            Self::NotLoaded => Err(ResourceError::NotLoaded),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for ReadError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoaderFailed(e) => f.debug_tuple("LoaderFailed").field(e).finish(),
            Self::NotReady(wait) => f.debug_tuple("NotReady").field(wait).finish(),
            Self::NotLoaded => f.write_str("NotLoaded"),
        }
    }
}

impl<E: fmt::Display> fmt::Display for ReadError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoaderFailed(e) => write!(f, "resource loader failed: {}", e),
            Self::NotReady(_) => write!(f, "resource is still loading"),
            Self::NotLoaded => write!(f, "resource read before load was called"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for ReadError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::LoaderFailed(e) => Some(e),
            _ => None,
        }
    }
}

/// A terminal resource failure, with pending states already handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError<E> {
    /// The loader failed with this error.
    LoaderFailed(E),
    /// A resource was read before anything loaded it.
    NotLoaded,
}

impl<E> ResourceError<E> {
    /// Get the loader's error if present.
    pub fn into_loader_error(self) -> Option<E> {
        match self {
            Self::LoaderFailed(e) => Some(e),
            Self::NotLoaded => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for ResourceError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoaderFailed(e) => write!(f, "resource loader failed: {}", e),
            Self::NotLoaded => write!(f, "resource read before load was called"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for ResourceError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::LoaderFailed(e) => Some(e),
            Self::NotLoaded => None,
        }
    }
}
