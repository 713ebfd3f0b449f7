// State machines for fetching.
// Read, write, paged and incremental access over the API client and cache.

pub mod infinite;
pub mod mutation;
pub mod pagination;
pub mod query;
pub mod request;

pub use infinite::{InfiniteScroll, InfiniteScrollState};
pub use mutation::{Mutation, MutationMethod, MutationState};
pub use pagination::{PageFetcher, PaginationState, Paginator};
pub use query::{Query, QueryOptions};
pub use request::{ErrorCallback, RequestState, SuccessCallback};
