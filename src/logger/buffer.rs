// Application logger.
// Keeps the most recent entries in a bounded buffer and mirrors them to tracing.

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::{paths, store};
use crate::config::Config;
use crate::error::{Error, Result};

use super::sink::{HttpMonitoringSink, MonitoringSink};

/// Maximum number of retained log entries.
pub const MAX_LOG_ENTRIES: usize = 1000;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// A single immutable log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            data,
            stack: None,
            url: None,
            user_agent: None,
        }
    }
}

struct LoggerInner {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
    dev_mode: bool,
    environment: String,
    user_agent: Option<String>,
    location: Mutex<Option<String>>,
    error_tracking: bool,
    sink: Option<Arc<dyn MonitoringSink>>,
}

/// Leveled logger with bounded retention. Cloning shares the same buffer.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("entries", &self.inner.entries.lock().len())
            .field("capacity", &self.inner.capacity)
            .field("dev_mode", &self.inner.dev_mode)
            .field("error_tracking", &self.inner.error_tracking)
            .finish()
    }
}

impl Logger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    /// Logger configured from [`Config`], forwarding errors over HTTP when enabled.
    pub fn new(config: &Config) -> Self {
        let mut builder = Self::builder()
            .dev_mode(config.dev_mode)
            .environment(config.environment.clone())
            .user_agent(config.user_agent.clone())
            .error_tracking(config.enable_error_tracking);

        if let Some(dsn) = config.monitoring_dsn.as_deref().filter(|_| config.forwards_errors()) {
            builder = builder.sink(Arc::new(HttpMonitoringSink::new(dsn, &config.environment)));
        }

        builder.build()
    }

    pub fn debug(&self, message: impl Into<String>, data: Option<Value>) {
        self.log(LogEntry::new(LogLevel::Debug, message, data));
    }

    pub fn info(&self, message: impl Into<String>, data: Option<Value>) {
        self.log(LogEntry::new(LogLevel::Info, message, data));
    }

    pub fn warn(&self, message: impl Into<String>, data: Option<Value>) {
        self.log(LogEntry::new(LogLevel::Warn, message, data));
    }

    /// Record an error, capturing its source chain, and forward it to monitoring.
    pub fn error(&self, message: impl Into<String>, error: Option<&(dyn StdError + 'static)>) {
        let mut entry = LogEntry::new(
            LogLevel::Error,
            message,
            error.map(|err| serde_json::json!({ "error": err.to_string() })),
        );
        entry.stack = error.map(source_chain);
        entry.url = self.inner.location.lock().clone();
        entry.user_agent = self.inner.user_agent.clone();

        self.log(entry.clone());
        self.forward(entry);
    }

    /// Set the location stamped on subsequent error entries.
    pub fn set_location(&self, url: Option<String>) {
        *self.inner.location.lock() = url;
    }

    /// Snapshot of retained entries, oldest first.
    pub fn get_logs(&self) -> Vec<LogEntry> {
        self.inner.entries.lock().iter().cloned().collect()
    }

    pub fn clear_logs(&self) {
        self.inner.entries.lock().clear();
    }

    /// Serialize every retained entry as pretty JSON.
    pub fn export_logs(&self) -> Result<String> {
        let logs = self.get_logs();
        Ok(serde_json::to_string_pretty(&logs)?)
    }

    /// Write the JSON export to `path`.
    pub fn export_to_file(&self, path: &Path) -> Result<()> {
        store::write_text(path, &self.export_logs()?)
    }

    /// Write the JSON export under the cache directory and return its path.
    pub fn export_snapshot(&self) -> Result<PathBuf> {
        let dir = paths::logs_dir()
            .ok_or_else(|| Error::Other("no cache directory available".to_string()))?;
        self.export_snapshot_in(&dir)
    }

    /// Write a timestamped JSON export into `dir` and return its path.
    pub fn export_snapshot_in(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(paths::log_export_name(&self.inner.environment, Utc::now()));
        self.export_to_file(&path)?;
        Ok(path)
    }

    /// Whether error entries leave the process.
    pub fn forwards_errors(&self) -> bool {
        self.inner.error_tracking && self.inner.sink.is_some()
    }

    fn log(&self, entry: LogEntry) {
        self.emit(&entry);

        let mut entries = self.inner.entries.lock();
        entries.push_back(entry);
        while entries.len() > self.inner.capacity {
            entries.pop_front();
        }
    }

    /// Mirror an entry to tracing; debug and info only in dev mode.
    fn emit(&self, entry: &LogEntry) {
        let data = entry.data.as_ref().map(Value::to_string).unwrap_or_default();
        match entry.level {
            LogLevel::Debug if self.inner.dev_mode => {
                tracing::debug!(target: "tourdesk::log", %data, "{}", entry.message)
            }
            LogLevel::Info if self.inner.dev_mode => {
                tracing::info!(target: "tourdesk::log", %data, "{}", entry.message)
            }
            LogLevel::Debug | LogLevel::Info => {}
            LogLevel::Warn => tracing::warn!(target: "tourdesk::log", %data, "{}", entry.message),
            LogLevel::Error => tracing::error!(
                target: "tourdesk::log",
                %data,
                stack = entry.stack.as_deref().unwrap_or(""),
                "{}",
                entry.message
            ),
        }
    }

    /// Best-effort forward to monitoring. Failures are reported, never returned.
    fn forward(&self, entry: LogEntry) {
        if !self.inner.error_tracking {
            return;
        }
        let Some(sink) = self.inner.sink.clone() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = sink.capture(&entry).await {
                        tracing::warn!(error = %err, "failed to forward log entry to monitoring");
                    }
                });
            }
            Err(_) => {
                tracing::warn!("no async runtime available, monitoring forward skipped");
            }
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`Logger`].
pub struct LoggerBuilder {
    capacity: usize,
    dev_mode: bool,
    environment: String,
    user_agent: Option<String>,
    error_tracking: bool,
    sink: Option<Arc<dyn MonitoringSink>>,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self {
            capacity: MAX_LOG_ENTRIES,
            dev_mode: cfg!(debug_assertions),
            environment: crate::config::DEFAULT_ENVIRONMENT.to_string(),
            user_agent: None,
            error_tracking: false,
            sink: None,
        }
    }
}

impl LoggerBuilder {
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn dev_mode(mut self, enabled: bool) -> Self {
        self.dev_mode = enabled;
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn error_tracking(mut self, enabled: bool) -> Self {
        self.error_tracking = enabled;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn MonitoringSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> Logger {
        Logger {
            inner: Arc::new(LoggerInner {
                entries: Mutex::new(VecDeque::with_capacity(self.capacity.min(MAX_LOG_ENTRIES))),
                capacity: self.capacity,
                dev_mode: self.dev_mode,
                environment: self.environment,
                user_agent: self.user_agent,
                location: Mutex::new(None),
                error_tracking: self.error_tracking,
                sink: self.sink,
            }),
        }
    }
}

fn source_chain(error: &(dyn StdError + 'static)) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str("\n  caused by: ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}
