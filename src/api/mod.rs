// API module.
// Client, retry policy, token storage and typed collections for the hosted backend.

pub mod client;
pub mod collection;
pub mod models;
pub mod retry;
pub mod token;
pub mod types;

pub use client::{ApiClient, ApiClientBuilder};
pub use collection::Collection;
pub use models::*;
pub use retry::RetryPolicy;
pub use token::{FileTokenStore, MemoryTokenStore, TOKEN_KEY, TokenStore};
pub use types::{ApiResponse, Page, RawResponse, RequestConfig};
