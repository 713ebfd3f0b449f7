// Monitoring sink for forwarded error entries.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::Result;

use super::buffer::LogEntry;

/// Destination for error entries when error tracking is enabled.
#[async_trait]
pub trait MonitoringSink: Send + Sync {
    async fn capture(&self, entry: &LogEntry) -> Result<()>;
}

#[derive(Serialize)]
struct Envelope<'a> {
    environment: &'a str,
    entry: &'a LogEntry,
}

/// Posts each entry as JSON to a monitoring DSN.
pub struct HttpMonitoringSink {
    client: Client,
    dsn: String,
    environment: String,
}

impl HttpMonitoringSink {
    pub fn new(dsn: &str, environment: &str) -> Self {
        Self {
            client: Client::new(),
            dsn: dsn.to_string(),
            environment: environment.to_string(),
        }
    }
}

#[async_trait]
impl MonitoringSink for HttpMonitoringSink {
    async fn capture(&self, entry: &LogEntry) -> Result<()> {
        let envelope = Envelope {
            environment: &self.environment,
            entry,
        };
        self.client
            .post(&self.dsn)
            .json(&envelope)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
