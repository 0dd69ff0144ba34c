use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::dispatcher::{RequestDispatcher, RequestSpec, TimeoutPolicy};
use crate::session::SessionContext;
use crate::{ClientError, QueryString};

/// Timeout applied to every request unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(100);

/// Async JSON REST client that waits for and decodes every response.
///
/// Statuses `>= 400` become [`ClientError::HttpStatus`]. A call that outlives
/// the configured timeout is reported the same way, with status
/// `504 Gateway Timeout` and the transport message as reason.
///
/// Verb methods always send session headers when a session provider is set;
/// use [`Self::execute`] with [`RequestSpec::without_session`] to opt out.
#[derive(Debug)]
pub struct StandardClient {
    dispatcher: RequestDispatcher,
    timeout: Duration,
}

impl StandardClient {
    /// Creates a new client with the given base URL.
    ///
    /// The URL is normalized to include a trailing slash, so relative endpoint
    /// paths join correctly.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        Ok(Self {
            dispatcher: RequestDispatcher::new(base_url)?,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Returns a new client that reads `Username`/`Session` headers from `session`.
    #[must_use]
    pub fn with_session(mut self, session: Arc<dyn SessionContext>) -> Self {
        self.dispatcher.set_session(session);
        self
    }

    /// Returns a new client with a different per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-request timeout; expiry is reported as `504 Gateway Timeout`.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Changes the per-request timeout for subsequent calls.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// The normalized base URL, always ending in `/`.
    pub fn base_url(&self) -> &Url {
        self.dispatcher.base_url()
    }

    /// Replaces the base URL used for subsequent requests.
    pub fn configure(&mut self, base_url: impl AsRef<str>) -> Result<(), ClientError> {
        self.dispatcher.configure(base_url)
    }

    /// Sends a `GET` request and decodes the response.
    ///
    /// Sends session headers; to skip them use [`Self::execute`] with
    /// [`RequestSpec::without_session`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(RequestSpec::get(path)).await
    }

    /// Sends a `GET` request with query parameters and decodes the response.
    ///
    /// Sends session headers; to skip them use [`Self::execute`] with
    /// [`RequestSpec::without_session`].
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &QueryString,
    ) -> Result<T, ClientError> {
        self.execute(RequestSpec::get(path).with_query(query.clone()))
            .await
    }

    /// Sends a `POST` request with a JSON body and decodes the response.
    ///
    /// Sends session headers; to skip them use [`Self::execute`] with
    /// [`RequestSpec::without_session`].
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(RequestSpec::post(path).with_json(body)?).await
    }

    /// Sends a `PUT` request with a JSON body and decodes the response.
    ///
    /// Sends session headers; to skip them use [`Self::execute`] with
    /// [`RequestSpec::without_session`].
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(RequestSpec::put(path).with_json(body)?).await
    }

    /// Sends a `PUT` request with a JSON body, ignoring any response body.
    ///
    /// Sends session headers; to skip them use [`Self::execute_no_content`]
    /// with [`RequestSpec::without_session`].
    pub async fn put_no_content<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ClientError> {
        self.execute_no_content(RequestSpec::put(path).with_json(body)?)
            .await
    }

    /// Sends a `PATCH` request with a JSON body, ignoring any response body.
    ///
    /// Sends session headers; to skip them use [`Self::execute_no_content`]
    /// with [`RequestSpec::without_session`].
    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ClientError> {
        self.execute_no_content(RequestSpec::patch(path).with_json(body)?)
            .await
    }

    /// Sends a `DELETE` request, ignoring any response body.
    ///
    /// Sends session headers; to skip them use [`Self::execute_no_content`]
    /// with [`RequestSpec::without_session`].
    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.execute_no_content(RequestSpec::delete(path)).await
    }

    /// Sends a request and decodes the response as `T`.
    ///
    /// An empty success body decodes as JSON `null`, so `Option<T>` and `()`
    /// accept it.
    pub async fn execute<T: DeserializeOwned>(&self, spec: RequestSpec) -> Result<T, ClientError> {
        let payload = self
            .dispatcher
            .dispatch(spec, self.timeout, TimeoutPolicy::Raise)
            .await?
            .unwrap_or_default();
        decode(&payload)
    }

    /// Sends a request and discards the response body.
    pub async fn execute_no_content(&self, spec: RequestSpec) -> Result<(), ClientError> {
        self.dispatcher
            .dispatch(spec, self.timeout, TimeoutPolicy::Raise)
            .await?;
        Ok(())
    }

    /// Releases the underlying transport. Closing twice is a no-op.
    pub fn close(&mut self) {
        self.dispatcher.close();
    }

    /// True once [`Self::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.dispatcher.is_closed()
    }
}

fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, ClientError> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        Ok(serde_json::from_slice(b"null")?)
    } else {
        Ok(serde_json::from_slice(payload)?)
    }
}
