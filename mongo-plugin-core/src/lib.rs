//! MongoDB plugin with per-database connection controllers.
//!
//! A [`MongoPlugin`] owns a single client built from host configuration and
//! mints one [`MongoController`] per database name. Controllers track their
//! own connection status, resolve their database lazily on the first
//! successful connect, and gate collection access on being connected.
//!
//! # Architecture
//! - `client`: the [`DatabaseClient`] / [`DatabaseHandle`] seam and the
//!   MongoDB-backed [`client::mongodb::MongoClient`] (feature `mongodb`)
//! - `controller`: the connected/disconnected state machine
//! - `plugin`: the adapter that owns the client and mints controllers
//! - `logging`: the host logging capability and `tracing` setup
//! - `config`: host-supplied configuration and validation
//! - `error`: error taxonomy and credential redaction
//!
//! # Failure model
//! Connect and disconnect failures are reported as `false` from
//! [`MongoController::reconnect`] and [`MongoController::disconnect`].
//! Using a gated operation while disconnected returns
//! [`PluginError::NotConnected`].

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod plugin;

// Re-export commonly used types
pub use client::{CollectionOf, DatabaseClient, DatabaseHandle};
pub use config::{ClientSettings, MongoPluginConfig};
pub use controller::{ConnectionStatus, MongoController};
pub use error::{PluginError, Result};
pub use logging::{LogLevel, LogMessage, LogRequest, PluginLogger, TracingLogger};
pub use plugin::{MongoPlugin, Plugin};

#[cfg(feature = "mongodb")]
pub use client::mongodb::MongoClient;
