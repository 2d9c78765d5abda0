//! MongoDB client capability.
//!
//! [`MongoClient`] freezes its driver options when it is built and keeps at
//! most one live driver handle. The driver's `shutdown` is terminal, so a
//! `connect` after `close` builds a fresh handle from the same frozen
//! options; the capability object itself is never rebuilt.
//!
//! # Security Features
//! - Connection string credentials are never logged
//! - `Debug` output shows the redacted URI only

use super::{DatabaseClient, DatabaseHandle, HandleSlot};
use crate::Result;
use crate::config::{ClientSettings, MongoPluginConfig};
use crate::error::PluginError;
use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};

/// Driver-backed [`DatabaseClient`].
///
/// # Example
/// ```rust,no_run
/// use mongo_plugin_core::client::DatabaseClient;
/// use mongo_plugin_core::client::mongodb::MongoClient;
/// use mongo_plugin_core::config::MongoPluginConfig;
///
/// # async fn run() -> mongo_plugin_core::Result<()> {
/// let client = MongoClient::new(&MongoPluginConfig::new("mongodb://localhost:27017")).await?;
/// client.connect().await?;
/// let users = client.database("app")?.collection::<mongodb::bson::Document>("users");
/// # drop(users);
/// # Ok(())
/// # }
/// ```
pub struct MongoClient {
    /// Options frozen at construction
    options: ClientOptions,
    /// Connection target with credentials masked
    redacted_uri: String,
    /// Live driver handle, empty before the first connect and after close
    slot: HandleSlot<Client>,
}

impl std::fmt::Debug for MongoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoClient")
            .field("uri", &self.redacted_uri)
            .field("live", &self.is_live())
            // Note: options are omitted, they carry credentials
            .finish_non_exhaustive()
    }
}

impl MongoClient {
    /// Builds the client capability from plugin configuration.
    ///
    /// Parses the URI (this resolves SRV records for `mongodb+srv://`) and
    /// applies the configured client options. No connection is opened.
    ///
    /// # Errors
    /// Returns error if:
    /// - The configuration fails validation
    /// - The driver cannot parse the connection string
    pub async fn new(config: &MongoPluginConfig) -> Result<Self> {
        config.validate()?;

        let mut options = ClientOptions::parse(&config.connect_uri)
            .await
            .map_err(|e| {
                PluginError::configuration(format!(
                    "Failed to parse MongoDB connection options for {}: {e}",
                    config.redacted_uri()
                ))
            })?;

        if let Some(settings) = &config.client_options {
            apply_settings(&mut options, settings);
        }

        Ok(Self::build(options, config.redacted_uri()))
    }

    /// Wraps driver options supplied by the host as-is.
    ///
    /// Use this for anything [`ClientSettings`] does not cover (TLS,
    /// credentials, compressors, read and write concerns). Only the
    /// application name is defaulted when unset. The driver validates the
    /// options when the first connection is made.
    pub fn from_options(options: ClientOptions) -> Self {
        let hosts = options
            .hosts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        Self::build(options, format!("mongodb://{hosts}"))
    }

    fn build(mut options: ClientOptions, redacted_uri: String) -> Self {
        // Set application name for connection tracking
        if options.app_name.is_none() {
            options.app_name = Some(format!("mongo-plugin-{}", env!("CARGO_PKG_VERSION")));
        }

        Self {
            options,
            redacted_uri,
            slot: HandleSlot::new(),
        }
    }

    /// The frozen driver options.
    pub const fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Default database named in the URI path, if any.
    pub fn default_database(&self) -> Option<&str> {
        self.options.default_database.as_deref()
    }

    /// Whether a driver handle is currently live.
    pub fn is_live(&self) -> bool {
        self.slot.current().is_some()
    }
}

/// Layers `settings` over options parsed from the URI.
fn apply_settings(options: &mut ClientOptions, settings: &ClientSettings) {
    if let Some(app_name) = &settings.app_name {
        options.app_name = Some(app_name.clone());
    }
    if let Some(timeout) = settings.connect_timeout() {
        options.connect_timeout = Some(timeout);
    }
    if let Some(timeout) = settings.server_selection_timeout() {
        options.server_selection_timeout = Some(timeout);
    }
    if let Some(max_pool) = settings.max_pool_size {
        options.max_pool_size = Some(max_pool);
    }
    if let Some(min_pool) = settings.min_pool_size {
        options.min_pool_size = Some(min_pool);
    }
    if let Some(idle) = settings.max_idle_time() {
        options.max_idle_time = Some(idle);
    }
    if let Some(direct) = settings.direct_connection {
        options.direct_connection = Some(direct);
    }
    if let Some(retry) = settings.retry_reads {
        options.retry_reads = Some(retry);
    }
    if let Some(retry) = settings.retry_writes {
        options.retry_writes = Some(retry);
    }
}

#[async_trait]
impl DatabaseClient for MongoClient {
    type Database = Database;

    async fn connect(&self) -> Result<()> {
        let mut lease = self.slot.lease();
        let client = match lease.live.take() {
            Some(client) => client,
            None => Client::with_options(self.options.clone()).map_err(|e| {
                PluginError::connection_failed_with(
                    format!("Failed to create MongoDB client for {}", self.redacted_uri),
                    e,
                )
            })?,
        };

        // The driver connects lazily; a ping forces server selection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| {
                PluginError::connection_failed_with(
                    format!("MongoDB ping failed for {}", self.redacted_uri),
                    e,
                )
            })?;

        if !self.slot.install(lease, client) {
            tracing::debug!(
                "MongoDB client for {} was closed while connecting",
                self.redacted_uri
            );
            return Err(PluginError::ClientClosed);
        }

        tracing::debug!("MongoDB client connected to {}", self.redacted_uri);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        match self.slot.take() {
            Some(client) => {
                client.shutdown().await;
                tracing::debug!("MongoDB client for {} shut down", self.redacted_uri);
            }
            None => tracing::debug!("MongoDB client for {} already closed", self.redacted_uri),
        }

        Ok(())
    }

    fn database(&self, name: &str) -> Result<Database> {
        self.slot
            .current()
            .map(|client| client.database(name))
            .ok_or(PluginError::ClientClosed)
    }
}

impl DatabaseHandle for Database {
    type Collection<T: Send + Sync> = Collection<T>;

    fn name(&self) -> &str {
        Database::name(self)
    }

    fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        Database::collection(self, name)
    }
}
