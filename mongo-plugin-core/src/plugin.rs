//! Plugin adapter: owns the shared client and mints controllers.
//!
//! The host constructs a [`MongoPlugin`], awaits [`Plugin::on_initialize`]
//! before treating it as ready, then asks it for one controller per
//! database. Every controller shares the plugin's single client.

use crate::Result;
use crate::client::DatabaseClient;
use crate::controller::MongoController;
use crate::logging::PluginLogger;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "mongodb")]
use crate::client::mongodb::MongoClient;
#[cfg(feature = "mongodb")]
use crate::config::MongoPluginConfig;
#[cfg(feature = "mongodb")]
use mongodb::options::ClientOptions;

/// Lifecycle hook invoked by the plugin host.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Short identifier used in host logs.
    fn name(&self) -> &'static str;

    /// Brings the plugin to a usable state. The host awaits this before
    /// handing the plugin to application code.
    ///
    /// # Errors
    /// Returns error if the plugin cannot become ready.
    async fn on_initialize(&self) -> Result<()>;
}

/// Owns one shared client and hands out [`MongoController`]s.
///
/// The client is built once, when the plugin is built, and never replaced.
pub struct MongoPlugin<C: DatabaseClient> {
    client: Arc<C>,
    logger: Arc<dyn PluginLogger>,
    initialized: AtomicBool,
}

impl<C: DatabaseClient> fmt::Debug for MongoPlugin<C>
where
    C: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoPlugin")
            .field("client", &self.client)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "mongodb")]
impl MongoPlugin<MongoClient> {
    /// Builds the plugin and its MongoDB client from host configuration.
    ///
    /// No connection is opened until [`MongoPlugin::initialize`].
    ///
    /// # Errors
    /// Returns a configuration error if the URI or client options are
    /// invalid.
    ///
    /// # Example
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use mongo_plugin_core::{MongoPlugin, MongoPluginConfig, TracingLogger};
    ///
    /// # async fn run() -> mongo_plugin_core::Result<()> {
    /// let config = MongoPluginConfig::new("mongodb://localhost:27017");
    /// let plugin = MongoPlugin::new(config, Arc::new(TracingLogger::default())).await?;
    /// plugin.initialize().await?;
    ///
    /// let orders = plugin.create_controller("orders");
    /// assert!(orders.reconnect().await);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(config: MongoPluginConfig, logger: Arc<dyn PluginLogger>) -> Result<Self> {
        let client = MongoClient::new(&config).await?;
        tracing::debug!("Built MongoDB plugin client for {}", config.redacted_uri());
        Ok(Self::with_client(client, logger))
    }

    /// Builds the plugin from driver options the host assembled itself.
    ///
    /// The options reach the driver unchanged apart from a default
    /// application name. No connection is opened until
    /// [`MongoPlugin::initialize`].
    pub fn from_options(options: ClientOptions, logger: Arc<dyn PluginLogger>) -> Self {
        Self::with_client(MongoClient::from_options(options), logger)
    }
}

impl<C: DatabaseClient> MongoPlugin<C> {
    /// Wraps an already built client capability.
    pub fn with_client(client: C, logger: Arc<dyn PluginLogger>) -> Self {
        Self {
            client: Arc::new(client),
            logger,
            initialized: AtomicBool::new(false),
        }
    }

    /// Opens the connection on the shared client.
    ///
    /// # Errors
    /// Propagates the client's connection error; the plugin then stays
    /// uninitialized.
    pub async fn initialize(&self) -> Result<()> {
        self.client.connect().await?;
        self.initialized.store(true, Ordering::Release);
        tracing::info!("MongoDB plugin initialized");
        Ok(())
    }

    /// Whether [`MongoPlugin::initialize`] has completed successfully.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Creates an independent controller for `database_name`.
    ///
    /// The controller starts `Disconnected` and shares this plugin's client
    /// and logger. See [`MongoController`] for the shared-close hazard.
    pub fn create_controller(&self, database_name: impl Into<String>) -> MongoController<C> {
        MongoController::new(
            Arc::clone(&self.client),
            database_name,
            Arc::clone(&self.logger),
        )
    }

    /// The shared client.
    pub const fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// The host logging sink.
    pub fn logger(&self) -> &Arc<dyn PluginLogger> {
        &self.logger
    }
}

#[async_trait]
impl<C: DatabaseClient> Plugin for MongoPlugin<C> {
    fn name(&self) -> &'static str {
        "mongo"
    }

    async fn on_initialize(&self) -> Result<()> {
        self.initialize().await
    }
}
