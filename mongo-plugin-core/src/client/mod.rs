//! Client capability traits.
//!
//! Controllers never talk to a driver directly. They hold an `Arc` of some
//! [`DatabaseClient`], ask it to connect or close, and resolve a
//! [`DatabaseHandle`] for their database once connected. The MongoDB
//! implementation lives in [`mongodb`] behind the `mongodb` feature.
//!
//! # Module Structure
//! - `mongodb`: `MongoClient`, the driver-backed capability
//! - `slot`: generation-tracked storage for a live connection handle
//! - `testing`: in-memory doubles used by the crate's unit tests

use crate::Result;
use async_trait::async_trait;

pub use slot::{HandleSlot, Lease};

#[cfg(feature = "mongodb")]
pub mod mongodb;
pub mod slot;

#[cfg(test)]
pub(crate) mod testing;

/// A resolved handle to one named database.
///
/// Handles are cheap to clone; controllers hand out clones and keep their
/// own copy while connected.
pub trait DatabaseHandle: Clone + Send + Sync + 'static {
    /// Typed accessor for one collection.
    type Collection<T: Send + Sync>;

    /// Name of the database this handle points at.
    fn name(&self) -> &str;

    /// Returns the accessor for `name`. Names are not validated here.
    fn collection<T: Send + Sync>(&self, name: &str) -> Self::Collection<T>;
}

/// Physical connection shared by every controller minted from one plugin.
///
/// # Contract
/// - `connect` may be called on an already connected client and must then
///   succeed without side effects.
/// - `close` affects every holder of the client, not just the caller.
/// - A `close` that lands while a `connect` is in flight makes that
///   `connect` fail; it must not revive the closed connection.
/// - `database` must not perform I/O.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Handle type produced by [`DatabaseClient::database`].
    type Database: DatabaseHandle;

    /// Establishes (or re-establishes) the connection.
    ///
    /// # Errors
    /// Returns a connection error if the server cannot be reached.
    async fn connect(&self) -> Result<()>;

    /// Closes the connection.
    ///
    /// # Errors
    /// Returns a disconnection error if the client fails to shut down.
    async fn close(&self) -> Result<()>;

    /// Resolves the handle for database `name`.
    ///
    /// # Errors
    /// Returns [`crate::PluginError::ClientClosed`] if there is no live
    /// connection to resolve against.
    fn database(&self, name: &str) -> Result<Self::Database>;
}

/// Collection accessor type produced by a client's database handles.
pub type CollectionOf<C, T> = <<C as DatabaseClient>::Database as DatabaseHandle>::Collection<T>;
