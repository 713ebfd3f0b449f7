// Typed collection endpoints.
// CRUD access to one backend table, with required-field checks before writes.

use std::marker::PhantomData;
use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::cache::ApiCache;
use crate::error::{Error, Result};

use super::client::ApiClient;
use super::models::{Record, RecordId};
use super::types::{ApiResponse, Page, RequestConfig};

/// CRUD handle for the records of one collection.
pub struct Collection<R: Record> {
    client: Arc<ApiClient>,
    cache: Option<Arc<ApiCache>>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Clone for Collection<R> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            cache: self.cache.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> Collection<R> {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            cache: None,
            _record: PhantomData,
        }
    }

    /// Invalidate cached reads of this collection after every successful write.
    pub fn with_cache(mut self, cache: Arc<ApiCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Endpoint path of the collection (`/packages`).
    pub fn endpoint(&self) -> String {
        format!("/{}", R::COLLECTION)
    }

    /// Endpoint path of one record (`/packages/7`).
    pub fn record_endpoint(&self, id: &RecordId) -> String {
        format!("/{}/{}", R::COLLECTION, id)
    }

    /// Endpoint path of one page (`/packages?page=2&pageSize=10`).
    pub fn page_endpoint(&self, page: u32, page_size: u32) -> String {
        format!("/{}?page={}&pageSize={}", R::COLLECTION, page, page_size)
    }

    /// Get every record.
    pub async fn list(&self) -> Result<Vec<R>> {
        let response: ApiResponse<Vec<R>> = self.client.get(&self.endpoint()).await?;
        Ok(response.data)
    }

    /// Get one page of records and the collection total.
    pub async fn list_page(&self, page: u32, page_size: u32) -> Result<Page<R>> {
        let raw = self
            .client
            .request_raw(
                Method::GET,
                &self.page_endpoint(page, page_size),
                None,
                RequestConfig::default(),
                &CancellationToken::new(),
            )
            .await?;

        let total = raw.body.get("total").and_then(Value::as_u64);
        let items: Vec<R> = ApiResponse::from(raw).decode()?.data;
        // Without a total, assume the collection ends with this page.
        let total = total.unwrap_or_else(|| {
            u64::from(page.saturating_sub(1)) * u64::from(page_size) + items.len() as u64
        });

        Ok(Page::new(items, total))
    }

    /// Get one record.
    pub async fn get(&self, id: &RecordId) -> Result<R> {
        let response: ApiResponse<R> = self.client.get(&self.record_endpoint(id)).await?;
        Ok(response.data)
    }

    /// Create a record after checking its required fields.
    pub async fn create(&self, record: &R) -> Result<R> {
        self.validate(record)?;
        let response: ApiResponse<R> = self.client.post(&self.endpoint(), record).await?;
        self.invalidate();
        Ok(response.data)
    }

    /// Replace a record after checking its required fields.
    pub async fn update(&self, id: &RecordId, record: &R) -> Result<R> {
        self.validate(record)?;
        let response: ApiResponse<R> = self.client.put(&self.record_endpoint(id), record).await?;
        self.invalidate();
        Ok(response.data)
    }

    /// Create the record when it has no id yet, otherwise replace it.
    pub async fn save(&self, record: &R) -> Result<R> {
        match record.id() {
            Some(id) => self.update(id, record).await,
            None => self.create(record).await,
        }
    }

    /// Delete a record.
    pub async fn delete(&self, id: &RecordId) -> Result<()> {
        let _: ApiResponse<Value> = self.client.delete(&self.record_endpoint(id)).await?;
        self.invalidate();
        Ok(())
    }

    fn validate(&self, record: &R) -> Result<()> {
        let fields = record.missing_fields();
        if fields.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation {
                collection: R::COLLECTION,
                fields,
            })
        }
    }

    fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            cache.clear(Some(R::COLLECTION));
        }
    }
}
