//! Shared request dispatch for the standard and fire-and-forget clients.
//!
//! Both clients hand a [`RequestSpec`] to [`RequestDispatcher::dispatch`]
//! together with their own deadline and [`TimeoutPolicy`]. The dispatcher is
//! the only place that touches headers, the transport, and status
//! classification.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use hyper::ext::ReasonPhrase;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use tracing::{Span, debug, instrument, warn};
use url::Url;

use crate::session::{SessionContext, SessionHeaders};
use crate::{ClientError, QueryString};

/// What a client does when a request outlives its deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// Report the timeout as `504 Gateway Timeout`.
    Raise,
    /// Complete the call without a body and without an error.
    Suppress,
}

/// One outgoing request: verb, relative path, query, encoded body, headers.
#[derive(Clone, Debug)]
pub struct RequestSpec {
    method: Method,
    path: String,
    query: Option<QueryString>,
    body: Option<Vec<u8>>,
    headers: HeaderMap,
    include_session: bool,
}

impl RequestSpec {
    /// Creates a request for `path`, relative to the client's base URL.
    ///
    /// Session headers are included unless [`Self::without_session`] is used.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            body: None,
            headers: HeaderMap::new(),
            include_session: true,
        }
    }

    /// Shorthand for [`Self::new`] with `GET`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Shorthand for [`Self::new`] with `POST`.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Shorthand for [`Self::new`] with `PUT`.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Shorthand for [`Self::new`] with `PATCH`.
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// Shorthand for [`Self::new`] with `DELETE`.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Appends `query` to the path when the request is sent.
    #[must_use]
    pub fn with_query(mut self, query: QueryString) -> Self {
        self.query = Some(query);
        self
    }

    /// Encodes `body` as the JSON request payload.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    /// Sends this request without `Username`/`Session` headers.
    #[must_use]
    pub fn without_session(mut self) -> Self {
        self.include_session = false;
        self
    }

    /// HTTP verb of the request.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Headers set on this request so far, session headers included once
    /// [`RequestDispatcher::with_session`] has run.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Whether `Username`/`Session` headers will be stamped when sent.
    pub fn includes_session(&self) -> bool {
        self.include_session
    }

    /// The path with the encoded query appended.
    pub fn relative_url(&self) -> String {
        format!("{}{}", self.path, QueryString::encode(self.query.as_ref()))
    }
}

/// Result of sending one request.
#[derive(Debug)]
pub enum ResponseOutcome {
    /// Any status below 400, with the raw body.
    Success { status: StatusCode, body: Vec<u8> },
    /// Status 400 or above.
    Failure {
        status: StatusCode,
        reason: String,
        body: String,
    },
    /// The deadline expired before a complete response arrived.
    TimedOut { message: String },
}

impl ResponseOutcome {
    /// True for [`Self::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Applies `policy` and turns the outcome into the call result.
    ///
    /// Returns `Ok(None)` only for a suppressed timeout.
    pub fn resolve(self, policy: TimeoutPolicy) -> Result<Option<Vec<u8>>, ClientError> {
        match self {
            Self::Success { body, .. } => Ok(Some(body)),
            Self::Failure {
                status,
                reason,
                body,
            } => Err(ClientError::HttpStatus {
                status,
                reason,
                body,
            }),
            Self::TimedOut { message } => match policy {
                TimeoutPolicy::Raise => {
                    warn!(%message, "request deadline elapsed");
                    Err(ClientError::gateway_timeout(message))
                }
                TimeoutPolicy::Suppress => {
                    debug!(%message, "deadline elapsed; treating request as delivered");
                    Ok(None)
                }
            },
        }
    }
}

/// Owns the transport handle and sends requests on behalf of a client.
pub struct RequestDispatcher {
    base_url: Url,
    http: Option<reqwest::Client>,
    session: Option<Arc<dyn SessionContext>>,
}

impl RequestDispatcher {
    /// Creates a dispatcher for `base_url`.
    ///
    /// The URL is normalized to include a trailing slash, so relative endpoint
    /// paths join correctly.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        let base_url = parse_base_url(base_url.as_ref())?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .default_headers(default_headers)
            .build()?;

        Ok(Self {
            base_url,
            http: Some(http),
            session: None,
        })
    }

    /// Replaces the base URL.
    pub fn configure(&mut self, base_url: impl AsRef<str>) -> Result<(), ClientError> {
        self.base_url = parse_base_url(base_url.as_ref())?;
        Ok(())
    }

    /// The normalized base URL, always ending in `/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Sets the provider queried for session headers on every request.
    pub fn set_session(&mut self, session: Arc<dyn SessionContext>) {
        self.session = Some(session);
    }

    /// Stamps `Username`/`Session` headers from `session` onto `spec`.
    ///
    /// Leaves the headers untouched when `session` is `None` or yields a blank
    /// value; otherwise any previous session headers are replaced.
    pub fn with_session(
        spec: &mut RequestSpec,
        session: Option<&dyn SessionContext>,
    ) -> Result<(), ClientError> {
        match session.and_then(SessionHeaders::from_context) {
            Some(headers) => headers.apply(&mut spec.headers),
            None => Ok(()),
        }
    }

    /// Maps a status code to an outcome; anything `>= 400` is a failure.
    ///
    /// `reason` is the phrase from the status line; without one the canonical
    /// phrase of `status` is used. Redirects count as success because the
    /// transport follows them.
    pub fn classify(status: StatusCode, reason: Option<&str>, body: Vec<u8>) -> ResponseOutcome {
        if status.as_u16() >= 400 {
            let reason = reason
                .or_else(|| status.canonical_reason())
                .unwrap_or_default();
            ResponseOutcome::Failure {
                status,
                reason: reason.to_owned(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }
        } else {
            ResponseOutcome::Success { status, body }
        }
    }

    /// Sends `spec`, giving up after `deadline`.
    ///
    /// A deadline expiry while connecting or waiting for the status line is
    /// [`ResponseOutcome::TimedOut`]. Once a status `>= 400` has arrived the
    /// call is a [`ResponseOutcome::Failure`] even if the body read then runs
    /// out of time. Other transport failures are returned as
    /// [`ClientError::Request`].
    #[instrument(
        name = "rest_request",
        skip(self, spec),
        fields(
            http.method = %spec.method,
            http.url = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
        )
    )]
    pub async fn send(
        &self,
        mut spec: RequestSpec,
        deadline: Duration,
    ) -> Result<ResponseOutcome, ClientError> {
        let http = self.http.as_ref().ok_or(ClientError::Closed)?;

        if spec.include_session {
            Self::with_session(&mut spec, self.session.as_deref())?;
        }

        let url = self.build_url(&spec.relative_url())?;
        Span::current().record("http.url", url.as_str());

        let mut request = http
            .request(spec.method, url)
            .headers(spec.headers)
            .timeout(deadline);

        if let Some(body) = spec.body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) if err.is_timeout() => {
                return Ok(ResponseOutcome::TimedOut {
                    message: err.to_string(),
                });
            }
            Err(err) => return Err(err.into()),
        };

        let status = response.status();
        Span::current().record("http.status_code", status.as_u16());

        // hyper only records the phrase when it differs from the canonical one.
        let reason = response
            .extensions()
            .get::<ReasonPhrase>()
            .map(|phrase| String::from_utf8_lossy(phrase.as_bytes()).into_owned());

        match response.bytes().await {
            Ok(body) => Ok(Self::classify(status, reason.as_deref(), body.to_vec())),
            Err(err) if err.is_timeout() && status.as_u16() >= 400 => {
                debug!(%status, "deadline elapsed while reading an error body");
                Ok(Self::classify(status, reason.as_deref(), Vec::new()))
            }
            Err(err) if err.is_timeout() => Ok(ResponseOutcome::TimedOut {
                message: err.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Sends `spec` and resolves the outcome with `policy`.
    pub async fn dispatch(
        &self,
        spec: RequestSpec,
        deadline: Duration,
        policy: TimeoutPolicy,
    ) -> Result<Option<Vec<u8>>, ClientError> {
        self.send(spec, deadline).await?.resolve(policy)
    }

    /// Releases the transport handle. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.http.take().is_some() {
            debug!(base_url = %self.base_url, "transport released");
        }
    }

    /// True once [`Self::close`] has released the transport.
    pub fn is_closed(&self) -> bool {
        self.http.is_none()
    }

    /// Resolves `relative_url` below the base URL, even with a leading `/`.
    fn build_url(&self, relative_url: &str) -> Result<Url, ClientError> {
        match self.base_url.join(relative_url.trim_start_matches('/')) {
            Ok(url) => Ok(url),
            Err(_) => Err(ClientError::InvalidPath(relative_url.to_owned())),
        }
    }
}

impl fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDispatcher")
            .field("base_url", &self.base_url.as_str())
            .field("closed", &self.is_closed())
            .field("has_session", &self.session.is_some())
            .finish()
    }
}

/// Parses an absolute base URL and makes its path end with exactly one `/`.
fn parse_base_url(value: &str) -> Result<Url, ClientError> {
    let mut url = match Url::parse(value) {
        Ok(url) if !url.cannot_be_a_base() => url,
        _ => return Err(ClientError::InvalidBaseUrl(value.to_owned())),
    };
    if !url.path().ends_with('/') {
        let directory = format!("{}/", url.path());
        url.set_path(&directory);
    }
    Ok(url)
}
