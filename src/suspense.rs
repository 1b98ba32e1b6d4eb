//! Driving synchronous readers to completion.
//!
//! A render-style function reads resources synchronously and bails out with
//! [`ReadError::NotReady`] when something is still loading. [`suspend`] is the
//! boundary that catches that signal, waits for the load, and calls the
//! function again until it produces a value or hits a terminal error.
//!
//! # Example
//!
//! ```rust
//! use reservoir::{suspend, ResourceGroup};
//!
//! # tokio_test::block_on(async {
//! let users = ResourceGroup::<String, String>::new();
//! let counts = ResourceGroup::<u32, String>::new();
//!
//! let summary = suspend(|| {
//!     let name = users.get("user/1", || async { Ok("ada".to_string()) }).read()?;
//!     let posts = counts.get("posts/1", || async { Ok(3) }).read()?;
//!     Ok(format!("{} wrote {} posts", name, posts))
//! })
//! .await;
//!
//! assert_eq!(summary.unwrap(), "ada wrote 3 posts");
//! # });
//! ```

use crate::error::{ReadError, ResourceError};

/// Run `render` until it stops reporting [`ReadError::NotReady`].
///
/// Each `NotReady` is awaited before `render` is called again. A loader
/// failure or a read-before-load ends the loop with the matching
/// [`ResourceError`], carrying the original cause.
///
/// `render` should be cheap and side-effect free apart from requesting
/// resources; it runs once per pending resource it encounters, plus once more
/// to finish.
pub async fn suspend<R, E, F>(mut render: F) -> Result<R, ResourceError<E>>
where
    F: FnMut() -> Result<R, ReadError<E>>,
{
    loop {
        match render() {
            Ok(output) => return Ok(output),
            Err(err) => {
                let wait = err.into_wait()?;
                #[cfg(feature = "tracing")]
                tracing::trace!("render suspended on pending resource");
                wait.await;
            }
        }
    }
}
