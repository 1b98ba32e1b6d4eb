//! # Reservoir
//!
//! > *Fill once, draw many times.*
//!
//! A keyed cache for asynchronous loads. Each key is backed by one
//! [`Resource`] whose loader runs at most once, however many callers ask for
//! it and however concurrently they do so.
//!
//! ## Two ways to access a resource
//!
//! - **Await it**: [`Resource::load`] returns a shared [`Inflight`] handle.
//!   Every caller attaches to the same load and receives the same outcome.
//! - **Probe it**: [`Resource::read`] answers immediately with the value, the
//!   loader's error, or [`ReadError::NotReady`] carrying a handle to wait on.
//!   [`suspend`] drives a synchronous reader until everything it reads has
//!   settled.
//!
//! Failures are stored and replayed to every later caller. Nothing is
//! retried, and nothing expires. For a fresh attempt, use a new key or a new
//! [`ResourceGroup`].
//!
//! ## Quick Example
//!
//! ```rust
//! use reservoir::ResourceGroup;
//!
//! # tokio_test::block_on(async {
//! #[derive(Debug, Clone, PartialEq)]
//! struct Dataset {
//!     name: String,
//! }
//!
//! let group = ResourceGroup::<Dataset, String>::new();
//! let fetch = || async { Ok(Dataset { name: "cats".to_string() }) };
//!
//! let resource = group.get("dataset/42", fetch);
//! let dataset = resource.load().await.unwrap();
//! assert_eq!(dataset.name, "cats");
//!
//! // Settled: later requests for the key are answered synchronously.
//! let again = group.get("dataset/42", fetch);
//! assert_eq!(again.read().unwrap(), dataset);
//! # });
//! ```
//!
//! ## Features
//!
//! - `async`: tokio integration ([`Resource::spawn`] and the [`loader`]
//!   retry/timeout combinators).
//! - `tracing`: emit load lifecycle events through `tracing`.
//! - `serde`: `Serialize` for [`Status`] and [`GroupStats`].

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod group;
#[cfg(feature = "async")]
pub mod loader;
pub mod resource;
pub mod suspense;
pub mod testing;

// Re-exports
pub use error::{ReadError, ResourceError, Wait};
pub use group::{GroupStats, ResourceGroup};
pub use resource::{Inflight, Resource, Status};
pub use suspense::suspend;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{ReadError, ResourceError};
    pub use crate::group::{GroupStats, ResourceGroup};
    pub use crate::resource::{Inflight, Resource, Status};
    pub use crate::suspense::suspend;
}
