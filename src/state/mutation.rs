// Write state machine.
// Tracks running/error state of POST, PUT, PATCH and DELETE calls and re-raises failures.

use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::Method;
use serde::{Serialize, de::DeserializeOwned};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{ApiClient, ApiResponse, RequestConfig};
use crate::error::{Error, SharedError};

use super::request::{ErrorCallback, SuccessCallback};

/// HTTP method of a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationMethod {
    Post,
    Put,
    Patch,
    Delete,
}

impl From<MutationMethod> for Method {
    fn from(method: MutationMethod) -> Self {
        match method {
            MutationMethod::Post => Method::POST,
            MutationMethod::Put => Method::PUT,
            MutationMethod::Patch => Method::PATCH,
            MutationMethod::Delete => Method::DELETE,
        }
    }
}

/// State of the latest mutation. Carries no data; writes are not cached.
#[derive(Debug, Clone, Default)]
pub enum MutationState {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed(SharedError),
}

impl MutationState {
    pub fn is_running(&self) -> bool {
        matches!(self, MutationState::Running)
    }

    pub fn error(&self) -> Option<&SharedError> {
        match self {
            MutationState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

pub struct Mutation<T> {
    client: Arc<ApiClient>,
    method: MutationMethod,
    request: RequestConfig,
    state: Mutex<MutationState>,
    on_success: Option<SuccessCallback<ApiResponse<T>>>,
    on_error: Option<ErrorCallback>,
}

impl<T> Mutation<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(client: Arc<ApiClient>, method: MutationMethod) -> Self {
        Self {
            client,
            method,
            request: RequestConfig::default(),
            state: Mutex::new(MutationState::Idle),
            on_success: None,
            on_error: None,
        }
    }

    pub fn request(mut self, config: RequestConfig) -> Self {
        self.request = config;
        self
    }

    pub fn on_success(
        mut self,
        callback: impl Fn(&ApiResponse<T>) + Send + Sync + 'static,
    ) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&SharedError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn method(&self) -> MutationMethod {
        self.method
    }

    pub fn state(&self) -> MutationState {
        self.state.lock().clone()
    }

    /// Send `body` to `endpoint`.
    ///
    /// Failures are recorded in the state, passed to the error callback and
    /// then returned to the caller.
    pub async fn mutate<B>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> std::result::Result<ApiResponse<T>, SharedError>
    where
        B: Serialize + ?Sized,
    {
        self.run(endpoint, Some(body)).await
    }

    /// Call `endpoint` without a request body (typically DELETE).
    pub async fn mutate_without_body(
        &self,
        endpoint: &str,
    ) -> std::result::Result<ApiResponse<T>, SharedError> {
        self.run(endpoint, None::<&()>).await
    }

    /// Back to Idle, dropping any recorded error.
    pub fn reset(&self) {
        *self.state.lock() = MutationState::Idle;
    }

    async fn run<B>(
        &self,
        endpoint: &str,
        body: Option<&B>,
    ) -> std::result::Result<ApiResponse<T>, SharedError>
    where
        B: Serialize + ?Sized,
    {
        *self.state.lock() = MutationState::Running;

        let result = self
            .client
            .send::<B, T>(
                self.method.into(),
                endpoint,
                body,
                self.request.clone(),
                &CancellationToken::new(),
            )
            .await;

        match result {
            Ok(response) => {
                debug!(endpoint, method = ?self.method, status = response.status, "mutation succeeded");
                *self.state.lock() = MutationState::Succeeded;
                if let Some(callback) = &self.on_success {
                    callback(&response);
                }
                Ok(response)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn fail(&self, err: Error) -> SharedError {
        let err = Arc::new(err);
        *self.state.lock() = MutationState::Failed(err.clone());
        if let Some(callback) = &self.on_error {
            callback(&err);
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RetryPolicy;
    use serde::Deserialize;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Booking {
        id: u32,
        status: String,
    }

    fn client(server: &MockServer) -> Arc<ApiClient> {
        Arc::new(
            ApiClient::builder(server.uri())
                .retry(RetryPolicy::none())
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_post_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bookings"))
            .and(body_json(json!({"package_id": 3, "travelers": 2})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": {"id": 12, "status": "pending"},
                "message": "Booking received"
            })))
            .mount(&server)
            .await;

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let mutation = Mutation::<Booking>::new(client(&server), MutationMethod::Post).on_success(
            move |response| {
                assert_eq!(response.status, 201);
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        let response = mutation
            .mutate("/bookings", &json!({"package_id": 3, "travelers": 2}))
            .await
            .unwrap();

        assert_eq!(
            response.data,
            Booking {
                id: 12,
                status: "pending".to_string()
            }
        );
        assert_eq!(response.message.as_deref(), Some("Booking received"));
        assert!(matches!(mutation.state(), MutationState::Succeeded));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_recorded_and_reraised() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "code": "INVALID_EMAIL",
                "message": "Email is not valid"
            })))
            .mount(&server)
            .await;

        let errors = Arc::new(AtomicUsize::new(0));
        let counter = errors.clone();
        let mutation = Mutation::<Value>::new(client(&server), MutationMethod::Put).on_error(
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        let err = mutation
            .mutate("/admin_users/4", &json!({"email": "nope"}))
            .await
            .unwrap_err();

        match err.as_ref() {
            Error::Api(api) => {
                assert_eq!(api.code, "INVALID_EMAIL");
                assert_eq!(api.status, 422);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(mutation.state().error().is_some());
        assert_eq!(errors.load(Ordering::SeqCst), 1);

        mutation.reset();
        assert!(matches!(mutation.state(), MutationState::Idle));
    }

    #[tokio::test]
    async fn test_delete_without_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/testimonials/8"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let mutation = Mutation::<Value>::new(client(&server), MutationMethod::Delete);
        let response = mutation.mutate_without_body("/testimonials/8").await.unwrap();

        assert_eq!(response.status, 204);
        assert_eq!(response.data, Value::Null);
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(Method::from(MutationMethod::Patch), Method::PATCH);
        assert_eq!(Method::from(MutationMethod::Delete), Method::DELETE);
    }
}
