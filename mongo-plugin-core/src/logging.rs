//! Host logging capability and local `tracing` setup.
//!
//! The plugin host hands every plugin a logging sink. Here that sink is the
//! [`PluginLogger`] trait: it receives a structured [`LogRequest`] carrying a
//! level, a message, an optional JSON payload and an optional condition gate.
//! [`TracingLogger`] is the default sink and forwards requests to `tracing`.

use crate::Result;
use crate::error::PluginError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Severity of a log request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Informational event
    Info,
    /// Something unexpected but recoverable
    Warning,
    /// A failed operation
    Error,
    /// A completed operation worth highlighting
    Success,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Success => "success",
        };
        f.write_str(name)
    }
}

/// Text decoration helper handed to formatter messages.
pub type DimFn<'a> = &'a dyn Fn(&str) -> String;

type Formatter = Arc<dyn Fn(DimFn<'_>) -> String + Send + Sync>;

/// Message content of a log request.
#[derive(Clone)]
pub enum LogMessage {
    /// A single literal line
    Text(String),
    /// Several lines, joined with newlines when rendered
    Lines(Vec<String>),
    /// Built lazily; receives a helper that de-emphasizes a fragment
    Formatted(Formatter),
}

impl LogMessage {
    /// Wraps a formatter closure.
    ///
    /// # Example
    /// ```rust
    /// use mongo_plugin_core::logging::{LogMessage, plain};
    ///
    /// let message = LogMessage::formatted(|dim| format!("ready {}", dim("(3ms)")));
    /// assert_eq!(message.render(&plain), "ready (3ms)");
    /// ```
    pub fn formatted<F>(formatter: F) -> Self
    where
        F: Fn(DimFn<'_>) -> String + Send + Sync + 'static,
    {
        Self::Formatted(Arc::new(formatter))
    }

    /// Renders the message, using `dim` for formatter messages.
    pub fn render(&self, dim: DimFn<'_>) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Lines(lines) => lines.join("\n"),
            Self::Formatted(formatter) => formatter(dim),
        }
    }
}

impl fmt::Debug for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Lines(lines) => f.debug_tuple("Lines").field(lines).finish(),
            Self::Formatted(_) => f.write_str("Formatted(<fn>)"),
        }
    }
}

impl From<String> for LogMessage {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for LogMessage {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<String>> for LogMessage {
    fn from(lines: Vec<String>) -> Self {
        Self::Lines(lines)
    }
}

/// A structured log request sent to the host sink.
#[derive(Debug, Clone)]
pub struct LogRequest {
    /// Severity
    pub level: LogLevel,
    /// Message content
    pub message: LogMessage,
    /// Optional structured payload
    pub json: Option<serde_json::Value>,
    /// When `Some(false)` the request is dropped
    pub condition: Option<bool>,
}

impl LogRequest {
    /// Creates an unconditional request without payload.
    pub fn new(level: LogLevel, message: impl Into<LogMessage>) -> Self {
        Self {
            level,
            message: message.into(),
            json: None,
            condition: None,
        }
    }

    /// Shorthand for an `info` request
    pub fn info(message: impl Into<LogMessage>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    /// Shorthand for a `warning` request
    pub fn warning(message: impl Into<LogMessage>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    /// Shorthand for an `error` request
    pub fn error(message: impl Into<LogMessage>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    /// Shorthand for a `success` request
    pub fn success(message: impl Into<LogMessage>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    /// Attaches a JSON payload.
    #[must_use]
    pub fn with_json(mut self, json: serde_json::Value) -> Self {
        self.json = Some(json);
        self
    }

    /// Gates the request on `condition`.
    #[must_use]
    pub fn when(mut self, condition: bool) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Whether a sink should emit this request at all.
    pub fn should_emit(&self) -> bool {
        self.condition.unwrap_or(true)
    }
}

/// Logging sink supplied by the plugin host.
///
/// Any `Fn(LogRequest) + Send + Sync` closure is a sink, so hosts can pass a
/// closure straight through.
pub trait PluginLogger: Send + Sync {
    /// Handles a single request. Sinks are expected to respect
    /// [`LogRequest::should_emit`].
    fn log(&self, request: LogRequest);
}

impl<F> PluginLogger for F
where
    F: Fn(LogRequest) + Send + Sync,
{
    fn log(&self, request: LogRequest) {
        self(request);
    }
}

/// Wraps `text` in ANSI faint/normal-intensity escapes.
pub fn dim(text: &str) -> String {
    format!("\x1b[2m{text}\x1b[22m")
}

/// Leaves `text` undecorated.
pub fn plain(text: &str) -> String {
    text.to_string()
}

/// Default sink: forwards requests to `tracing`.
///
/// `info` and `success` map to INFO, `warning` to WARN, `error` to ERROR.
/// The payload is attached as a `payload` field in compact JSON.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    plugin: String,
    ansi: bool,
}

impl TracingLogger {
    /// Creates a sink that tags every event with `plugin`.
    pub fn new(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            ansi: false,
        }
    }

    /// Enables ANSI decoration for formatter messages.
    #[must_use]
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Renders the request's message the way this sink would emit it.
    pub fn render(&self, request: &LogRequest) -> String {
        if self.ansi {
            request.message.render(&dim)
        } else {
            request.message.render(&plain)
        }
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("mongo")
    }
}

impl PluginLogger for TracingLogger {
    fn log(&self, request: LogRequest) {
        if !request.should_emit() {
            return;
        }

        let message = self.render(&request);
        let payload = request
            .json
            .as_ref()
            .map_or_else(String::new, serde_json::Value::to_string);
        let plugin = self.plugin.as_str();
        let level = request.level;

        match level {
            LogLevel::Info | LogLevel::Success => {
                tracing::info!(plugin, %level, %payload, "{message}");
            }
            LogLevel::Warning => {
                tracing::warn!(plugin, %level, %payload, "{message}");
            }
            LogLevel::Error => {
                tracing::error!(plugin, %level, %payload, "{message}");
            }
        }
    }
}

/// Maps a host's verbosity setting to a `tracing` level.
///
/// 0=INFO, 1=DEBUG, 2+=TRACE; `quiet` wins and selects ERROR.
pub const fn level_for(verbose: u8, quiet: bool) -> tracing::Level {
    match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    }
}

/// Builds the event filter for [`init_logging`].
///
/// Directives in `RUST_LOG` win; otherwise everything at or above
/// [`level_for`] passes.
pub fn env_filter(verbose: u8, quiet: bool) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level_for(verbose, quiet)).into())
        .from_env_lossy()
}

/// Installs a `tracing` subscriber for hosts that do not bring their own.
///
/// [`TracingLogger`] and the controllers' diagnostics only become visible
/// once some subscriber is installed. Hosts that already run one should
/// skip this; a second installation fails with a configuration error.
///
/// # Example
/// ```rust,no_run
/// use mongo_plugin_core::logging::init_logging;
///
/// init_logging(1, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose, quiet))
        .with_target(false)
        .try_init()
        .map_err(|e| PluginError::configuration(format!("Failed to initialize logging: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_verbosity_levels() {
        let test_cases = [
            ((true, 0), tracing::Level::ERROR),
            ((true, 5), tracing::Level::ERROR),
            ((false, 0), tracing::Level::INFO),
            ((false, 1), tracing::Level::DEBUG),
            ((false, 2), tracing::Level::TRACE),
            ((false, 10), tracing::Level::TRACE),
        ];

        for ((quiet, verbose), expected) in test_cases {
            assert_eq!(
                level_for(verbose, quiet),
                expected,
                "Failed for quiet={quiet}, verbose={verbose}"
            );
        }
    }

    #[test]
    fn test_env_filter_defaults_to_requested_level() {
        // Only meaningful when RUST_LOG does not override the default
        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(env_filter(1, false).max_level_hint(), Some(LevelFilter::DEBUG));
            assert_eq!(env_filter(3, true).max_level_hint(), Some(LevelFilter::ERROR));
        }
    }

    #[test]
    fn test_message_rendering() {
        assert_eq!(LogMessage::from("one").render(&plain), "one");

        let lines = LogMessage::from(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(lines.render(&plain), "a\nb");

        let formatted = LogMessage::formatted(|dim| format!("took {}", dim("12ms")));
        assert_eq!(formatted.render(&plain), "took 12ms");
        assert_eq!(formatted.render(&dim), "took \x1b[2m12ms\x1b[22m");
    }

    #[test]
    fn test_condition_gate() {
        assert!(LogRequest::info("x").should_emit());
        assert!(LogRequest::info("x").when(true).should_emit());
        assert!(!LogRequest::info("x").when(false).should_emit());
    }

    #[test]
    fn test_closure_is_a_logger() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |request: LogRequest| {
                seen.lock().unwrap().push((request.level, request.json));
            }
        };

        let logger: Arc<dyn PluginLogger> = Arc::new(sink);
        logger.log(LogRequest::success("done").with_json(json!({ "ok": true })));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, LogLevel::Success);
        assert_eq!(seen[0].1, Some(json!({ "ok": true })));
    }

    #[test]
    fn test_tracing_logger_render() {
        let request = LogRequest::warning(LogMessage::formatted(|dim| dim("slow").to_string()));

        assert_eq!(TracingLogger::default().render(&request), "slow");
        assert_eq!(
            TracingLogger::new("mongo").with_ansi(true).render(&request),
            "\x1b[2mslow\x1b[22m"
        );
    }

    #[test]
    fn test_tracing_logger_accepts_every_level() {
        let logger = TracingLogger::default();
        for request in [
            LogRequest::info("i"),
            LogRequest::warning("w"),
            LogRequest::error("e"),
            LogRequest::success("s").with_json(json!({ "milestone": "connect" })),
            LogRequest::error("suppressed").when(false),
        ] {
            logger.log(request);
        }
    }

    #[test]
    fn test_level_serde() {
        assert_eq!(serde_json::to_string(&LogLevel::Warning).unwrap(), "\"warning\"");
        let level: LogLevel = serde_json::from_str("\"success\"").unwrap();
        assert_eq!(level, LogLevel::Success);
        assert_eq!(level.to_string(), "success");
    }
}
