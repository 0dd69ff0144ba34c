use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::ClientError;
use crate::dispatcher::{RequestDispatcher, RequestSpec, TimeoutPolicy};
use crate::session::SessionContext;

/// Per-request deadline of [`FireAndForgetClient`].
///
/// Long enough to put the request on the wire or collect an immediate
/// response, not to wait for the downstream operation to finish.
pub const DEADLINE: Duration = Duration::from_millis(500);

/// Async client for mutations whose completion the caller does not wait for.
///
/// Every request gets [`DEADLINE`]. When it expires the call returns `Ok(())`
/// and the caller cannot know whether the server finished processing. A
/// response that does arrive in time with status `>= 400` is still reported as
/// [`ClientError::HttpStatus`], and non-timeout transport failures such as a
/// refused connection are returned as [`ClientError::Request`].
#[derive(Debug)]
pub struct FireAndForgetClient {
    dispatcher: RequestDispatcher,
}

impl FireAndForgetClient {
    /// Creates a new client with the given base URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        Ok(Self {
            dispatcher: RequestDispatcher::new(base_url)?,
        })
    }

    /// Returns a new client that reads `Username`/`Session` headers from `session`.
    #[must_use]
    pub fn with_session(mut self, session: Arc<dyn SessionContext>) -> Self {
        self.dispatcher.set_session(session);
        self
    }

    /// The normalized base URL, always ending in `/`.
    pub fn base_url(&self) -> &Url {
        self.dispatcher.base_url()
    }

    /// Replaces the base URL used for subsequent requests.
    pub fn configure(&mut self, base_url: impl AsRef<str>) -> Result<(), ClientError> {
        self.dispatcher.configure(base_url)
    }

    /// Sends a `POST` request with a JSON body.
    ///
    /// Sends session headers; to skip them use [`Self::execute`] with
    /// [`RequestSpec::without_session`].
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ClientError> {
        self.execute(RequestSpec::post(path).with_json(body)?).await
    }

    /// Sends a `PUT` request with a JSON body.
    ///
    /// Sends session headers; to skip them use [`Self::execute`] with
    /// [`RequestSpec::without_session`].
    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ClientError> {
        self.execute(RequestSpec::put(path).with_json(body)?).await
    }

    /// Sends a `PATCH` request with a JSON body.
    ///
    /// Sends session headers; to skip them use [`Self::execute`] with
    /// [`RequestSpec::without_session`].
    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ClientError> {
        self.execute(RequestSpec::patch(path).with_json(body)?).await
    }

    /// Sends a `DELETE` request.
    ///
    /// Sends session headers; to skip them use [`Self::execute`] with
    /// [`RequestSpec::without_session`].
    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        self.execute(RequestSpec::delete(path)).await
    }

    /// Sends a request without waiting past [`DEADLINE`].
    pub async fn execute(&self, spec: RequestSpec) -> Result<(), ClientError> {
        self.dispatcher
            .dispatch(spec, DEADLINE, TimeoutPolicy::Suppress)
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
