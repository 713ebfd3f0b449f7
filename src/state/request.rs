// Request state shared by the fetch state machines.

use std::sync::Arc;

use crate::error::SharedError;

/// Outcome of the latest read.
#[derive(Debug, Clone)]
pub enum RequestState<T> {
    Idle,
    Loading,
    Success {
        data: T,
        /// Served from the response cache without a network call.
        cached: bool,
    },
    Failed(SharedError),
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        RequestState::Idle
    }
}

impl<T> RequestState<T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, RequestState::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, RequestState::Loading)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RequestState::Success { .. })
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, RequestState::Success { cached: true, .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            RequestState::Success { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SharedError> {
        match self {
            RequestState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Called with the data of every successful outcome.
pub type SuccessCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Called with the error of every failed outcome.
pub type ErrorCallback = Arc<dyn Fn(&SharedError) + Send + Sync>;
