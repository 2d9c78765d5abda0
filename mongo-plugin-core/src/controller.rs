//! Connection controller: one logical database over a shared client.
//!
//! A [`MongoController`] is a two-state machine:
//!
//! ```text
//!                reconnect() ok
//!  Disconnected ---------------> Connected
//!               <---------------
//!                disconnect() ok
//! ```
//!
//! Failed transitions leave the state untouched. The database handle is
//! stored inside the `Connected` state, so it exists exactly while the
//! controller is connected.
//!
//! # Failure model
//! Connect and close failures from the client are soft: they are logged
//! through `tracing` and reported as `false`, never retried. Calling a
//! gated operation while disconnected is a hard error
//! ([`PluginError::NotConnected`]).
//!
//! # Concurrency
//! `reconnect` and `disconnect` on one controller are serialized by a
//! per-controller async lock, so the final status is that of the last call
//! to complete. Status reads never wait on that lock.
//!
//! # Shared client hazard
//! All controllers minted by one plugin share one client. `disconnect` on
//! any of them closes that shared client for everyone; sibling controllers
//! keep reporting `Connected` while their handles point at a closed client.
//! Coordinate lifecycle calls externally when several controllers share a
//! client.

use crate::Result;
use crate::client::{CollectionOf, DatabaseClient, DatabaseHandle};
use crate::error::PluginError;
use crate::logging::{LogRequest, PluginLogger};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tokio::sync::Mutex;


/// Whether a controller currently holds a live database handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// The controller is connected and has resolved its database
    Connected,
    /// The controller is not connected; this is the initial state
    Disconnected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => f.write_str("connected"),
            Self::Disconnected => f.write_str("disconnected"),
        }
    }
}

enum LinkState<D> {
    Disconnected,
    Connected(D),
}

impl<D> LinkState<D> {
    const fn status(&self) -> ConnectionStatus {
        match self {
            Self::Disconnected => ConnectionStatus::Disconnected,
            Self::Connected(_) => ConnectionStatus::Connected,
        }
    }
}

/// Controls the connection lifecycle for one named database.
///
/// # Example
/// ```rust,ignore
/// let users = plugin.create_controller("app");
///
/// assert!(users.collection::<Document>("users").is_err());
/// if users.reconnect().await {
///     let collection = users.collection::<Document>("users")?;
/// }
/// ```
pub struct MongoController<C: DatabaseClient> {
    client: Arc<C>,
    database_name: String,
    logger: Arc<dyn PluginLogger>,
    state: RwLock<LinkState<C::Database>>,
    transition: Mutex<()>,
}

impl<C: DatabaseClient> fmt::Debug for MongoController<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoController")
            .field("database_name", &self.database_name)
            .field("status", &self.connection_status())
            .finish_non_exhaustive()
    }
}

impl<C: DatabaseClient> MongoController<C> {
    /// Creates a disconnected controller for `database_name`.
    ///
    /// Nothing is resolved until the first successful [`reconnect`].
    ///
    /// [`reconnect`]: MongoController::reconnect
    pub fn new(
        client: Arc<C>,
        database_name: impl Into<String>,
        logger: Arc<dyn PluginLogger>,
    ) -> Self {
        Self {
            client,
            database_name: database_name.into(),
            logger,
            state: RwLock::new(LinkState::Disconnected),
            transition: Mutex::new(()),
        }
    }

    /// Current connection status.
    pub fn connection_status(&self) -> ConnectionStatus {
        self.read_state().status()
    }

    /// Name of the database this controller selects.
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// The shared client this controller drives.
    pub const fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// The database handle, if connected.
    pub fn database(&self) -> Option<C::Database> {
        match &*self.read_state() {
            LinkState::Connected(database) => Some(database.clone()),
            LinkState::Disconnected => None,
        }
    }

    /// The database handle, assuming the caller already checked the status.
    ///
    /// # Panics
    /// Panics if the controller is disconnected. Use [`database`] or
    /// [`check_connection`] when the status is not known.
    ///
    /// [`database`]: MongoController::database
    /// [`check_connection`]: MongoController::check_connection
    #[allow(clippy::panic)]
    pub fn unsafe_database(&self) -> C::Database {
        match &*self.read_state() {
            LinkState::Connected(database) => database.clone(),
            LinkState::Disconnected => panic!(
                "database '{}' accessed while not connected",
                self.database_name
            ),
        }
    }

    /// Fails unless the controller is connected.
    ///
    /// # Errors
    /// Returns [`PluginError::NotConnected`] while disconnected.
    pub fn check_connection(&self) -> Result<()> {
        match self.connection_status() {
            ConnectionStatus::Connected => Ok(()),
            ConnectionStatus::Disconnected => {
                Err(PluginError::not_connected(&self.database_name))
            }
        }
    }

    /// Closes the shared client and moves to `Disconnected`.
    ///
    /// Returns `true` if the controller ends up disconnected, including the
    /// no-op case where it already was. Returns `false` if the client failed
    /// to close; the controller then stays `Connected`.
    pub async fn disconnect(&self) -> bool {
        let _transition = self.transition.lock().await;

        if self.connection_status() == ConnectionStatus::Disconnected {
            tracing::debug!(database = %self.database_name, "Already disconnected");
            return true;
        }

        if let Err(error) = self.client.close().await {
            tracing::warn!(
                database = %self.database_name,
                error = %error,
                "Failed to close database connection"
            );
            return false;
        }

        *self.write_state() = LinkState::Disconnected;

        self.logger.log(
            LogRequest::info(format!(
                "Connection to database {} closed",
                self.database_name
            ))
            .with_json(json!({ "milestone": "disconnect", "ok": true })),
        );

        true
    }

    /// Connects the shared client and selects this controller's database.
    ///
    /// Returns `true` if the controller ends up connected, including the
    /// no-op case where it already was. Returns `false` if the client failed
    /// to connect; the controller then stays `Disconnected` with no handle.
    pub async fn reconnect(&self) -> bool {
        let _transition = self.transition.lock().await;

        if self.connection_status() == ConnectionStatus::Connected {
            tracing::debug!(database = %self.database_name, "Already connected");
            return true;
        }

        let started = Instant::now();

        if let Err(error) = self.client.connect().await {
            tracing::warn!(
                database = %self.database_name,
                error = %error,
                "Failed to connect to database"
            );
            return false;
        }

        let database = match self.client.database(&self.database_name) {
            Ok(database) => database,
            Err(error) => {
                // Another holder closed the client between connect and select
                tracing::warn!(
                    database = %self.database_name,
                    error = %error,
                    "Failed to select database"
                );
                return false;
            }
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        *self.write_state() = LinkState::Connected(database);

        self.logger.log(
            LogRequest::info(format!(
                "Connection to database {} established in {:.3}ms",
                self.database_name, elapsed_ms
            ))
            .with_json(json!({
                "milestone": "connect",
                "ok": true,
                "time": elapsed_ms,
                "db": self.database_name,
            })),
        );

        true
    }

    /// Typed accessor for collection `name` in this controller's database.
    ///
    /// The name is passed to the database handle as-is.
    ///
    /// # Errors
    /// Returns [`PluginError::NotConnected`] while disconnected, without
    /// touching the client.
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Result<CollectionOf<C, T>> {
        match &*self.read_state() {
            LinkState::Connected(database) => Ok(database.collection(name)),
            LinkState::Disconnected => Err(PluginError::not_connected(&self.database_name)),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, LinkState<C::Database>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, LinkState<C::Database>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
