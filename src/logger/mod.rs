// Logger module.
// Bounded in-memory log store, monitoring forwarding and tracing setup.

pub mod buffer;
pub mod sink;
pub mod subscriber;

pub use buffer::{LogEntry, LogLevel, Logger, LoggerBuilder, MAX_LOG_ENTRIES};
pub use sink::{HttpMonitoringSink, MonitoringSink};
pub use subscriber::init_tracing;
