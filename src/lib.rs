// tourdesk: client-side data access for the travel site.
// API client with retry, response cache, application logger and fetch state machines.

pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod logger;
pub mod state;

pub use api::{ApiClient, ApiResponse, Collection, RequestConfig, RetryPolicy};
pub use app::App;
pub use cache::ApiCache;
pub use config::Config;
pub use error::{ApiError, Error, Result, SharedError};
pub use logger::{LogLevel, Logger, init_tracing};
pub use state::{InfiniteScroll, Mutation, MutationMethod, Paginator, Query, QueryOptions, RequestState};
