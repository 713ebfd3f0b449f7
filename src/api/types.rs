// Request and response types for the API client.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::Result;

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Extra headers merged over the defaults.
    pub headers: HeaderMap,
    /// Timeout for each attempt; the client default when None.
    pub timeout: Option<Duration>,
    /// Retries after the first attempt; the client default when None.
    pub retries: Option<u32>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }
}

/// Status and parsed JSON body of a successful exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
}

/// Successful response: the body's `data` field (or the whole body) plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiResponse<Value> {
    /// Unwrap the `data` envelope when present.
    pub fn from_body(body: Value, status: u16) -> Self {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);

        let data = match body {
            Value::Object(mut map) => match map.remove("data") {
                Some(data) => data,
                None => Value::Object(map),
            },
            other => other,
        };

        Self {
            data,
            status,
            message,
        }
    }

    /// Deserialize `data` into a concrete type.
    pub fn decode<T: DeserializeOwned>(self) -> Result<ApiResponse<T>> {
        Ok(ApiResponse {
            data: serde_json::from_value(self.data)?,
            status: self.status,
            message: self.message,
        })
    }
}

impl From<RawResponse> for ApiResponse<Value> {
    fn from(raw: RawResponse) -> Self {
        Self::from_body(raw.body, raw.status)
    }
}

/// One page of a collection plus the collection's total size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: u64) -> Self {
        Self { data, total }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
