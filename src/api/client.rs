// API HTTP client.
// Handles authentication, timeouts, retries and response/error decoding.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{
    Client, Method, RequestBuilder, Response,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::Config;
use crate::error::{ApiError, Error, Result};
use crate::logger::Logger;

use super::retry::RetryPolicy;
use super::token::{MemoryTokenStore, TokenStore};
use super::types::{ApiResponse, RawResponse, RequestConfig};

/// Client for the hosted backend's JSON API.
///
/// Connection failures and timeouts are retried with exponential backoff.
/// HTTP error responses are returned immediately as [`Error::Api`] and never
/// retried, so a rejected write is not replayed.
pub struct ApiClient {
    http: Client,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
    tokens: Arc<dyn TokenStore>,
    logger: Logger,
}

impl ApiClient {
    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder::new(base_url)
    }

    /// Create a client from configuration.
    pub fn new(config: &Config, tokens: Arc<dyn TokenStore>, logger: Logger) -> Result<Self> {
        Self::builder(config.api_base_url.clone())
            .timeout(config.api_timeout)
            .user_agent(config.user_agent.clone())
            .tokens(tokens)
            .logger(logger)
            .build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Full URL for an endpoint path.
    pub fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    /// Make a GET request.
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<ApiResponse<T>> {
        self.send(Method::GET, endpoint, None::<&()>, RequestConfig::default(), &CancellationToken::new())
            .await
    }

    /// Make a GET request with per-call config and cancellation.
    pub async fn get_with<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        config: RequestConfig,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse<T>> {
        self.send(Method::GET, endpoint, None::<&()>, config, cancel).await
    }

    /// Make a POST request with a JSON body.
    pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<ApiResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::POST, endpoint, Some(body), RequestConfig::default(), &CancellationToken::new())
            .await
    }

    /// Make a PUT request with a JSON body.
    pub async fn put<B, T>(&self, endpoint: &str, body: &B) -> Result<ApiResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::PUT, endpoint, Some(body), RequestConfig::default(), &CancellationToken::new())
            .await
    }

    /// Make a PATCH request with a JSON body.
    pub async fn patch<B, T>(&self, endpoint: &str, body: &B) -> Result<ApiResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::PATCH, endpoint, Some(body), RequestConfig::default(), &CancellationToken::new())
            .await
    }

    /// Make a DELETE request.
    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<ApiResponse<T>> {
        self.send(Method::DELETE, endpoint, None::<&()>, RequestConfig::default(), &CancellationToken::new())
            .await
    }

    /// Typed request: serialize the body, run [`ApiClient::request`], decode `data`.
    pub async fn send<B, T>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        config: RequestConfig,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = body.map(serde_json::to_value).transpose()?;
        self.request(method, endpoint, body, config, cancel)
            .await?
            .decode()
    }

    /// One logical call, unwrapping the `data` envelope.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
        config: RequestConfig,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse<Value>> {
        self.request_raw(method, endpoint, body, config, cancel)
            .await
            .map(ApiResponse::from)
    }

    /// One logical call returning the status and the complete JSON body.
    pub async fn request_raw(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
        config: RequestConfig,
        cancel: &CancellationToken,
    ) -> Result<RawResponse> {
        let url = self.url_for(endpoint);
        let timeout = config.timeout.unwrap_or(self.timeout);
        let policy = match config.retries {
            Some(retries) => self.retry.clone().with_max_retries(retries),
            None => self.retry.clone(),
        };

        let method_ref = &method;
        let url_ref = url.as_str();
        let body_ref = body.as_ref();
        let headers = &config.headers;
        let run = policy.run(
            move |attempt| self.attempt(method_ref, url_ref, body_ref, headers, timeout, attempt),
            Error::is_transient,
        );

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = run => result,
        };

        match &result {
            Ok(response) => {
                debug!(%method, %url, status = response.status, "API request succeeded");
            }
            Err(Error::Cancelled) => {
                debug!(%method, %url, "API request cancelled");
                self.logger
                    .debug(format!("API request cancelled: {} {}", method, url), None);
            }
            Err(err) => {
                self.logger
                    .error(format!("API request failed: {} {}", method, url), Some(err));
            }
        }

        result
    }

    /// A single attempt bounded by `timeout`.
    async fn attempt(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        headers: &HeaderMap,
        timeout: Duration,
        attempt: u32,
    ) -> Result<RawResponse> {
        debug!(attempt = attempt + 1, %method, url, "sending API request");
        self.logger.debug(
            format!("API request attempt: {} {}", method, url),
            Some(json!({ "attempt": attempt + 1 })),
        );

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .headers(headers.clone());

        if let Some(token) = self.tokens.token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let result = match tokio::time::timeout(timeout, Self::exchange(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(timeout)),
        };

        if let Err(err) = &result {
            if err.is_transient() {
                self.logger.warn(
                    format!("API request attempt failed: {} {}", method, url),
                    Some(json!({ "attempt": attempt + 1, "error": err.to_string() })),
                );
            }
        }

        result
    }

    async fn exchange(request: RequestBuilder) -> Result<RawResponse> {
        let response = request.send().await?;
        Self::read_response(response).await
    }

    /// Check response status and decode the body.
    async fn read_response(response: Response) -> Result<RawResponse> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(response).await.into());
        }

        let bytes = response.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };

        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }

    /// Build the typed error for a non-2xx response.
    async fn api_error(response: Response) -> ApiError {
        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or("Unknown Error").to_string();

        let payload = match response.text().await {
            Ok(text) if !text.trim().is_empty() => {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            }
            _ => Value::Null,
        };

        let code = payload
            .get("code")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP_{}", status.as_u16()));
        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(status_text);

        ApiError {
            code,
            message,
            status: status.as_u16(),
            payload,
        }
    }
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
    user_agent: Option<String>,
    tokens: Option<Arc<dyn TokenStore>>,
    logger: Option<Logger>,
}

impl ApiClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: crate::config::DEFAULT_API_TIMEOUT,
            retry: RetryPolicy::default(),
            user_agent: None,
            tokens: None,
            logger: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn tokens(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        if self.base_url.is_empty() {
            return Err(Error::Config("API base URL is empty".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder().default_headers(headers);
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        let http = builder.build()?;

        Ok(ApiClient {
            http,
            base_url: self.base_url,
            timeout: self.timeout,
            retry: self.retry,
            tokens: self
                .tokens
                .unwrap_or_else(|| Arc::new(MemoryTokenStore::new())),
            logger: self.logger.unwrap_or_default(),
        })
    }
}
