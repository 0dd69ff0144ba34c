//! Session-aware JSON REST clients built on a shared request dispatcher.
//!
//! Public API layers:
//! - [`StandardClient`]: waits for every response, decodes success bodies,
//!   and reports failures (timeouts included, as `504`) as [`ClientError`].
//! - [`FireAndForgetClient`]: gives each request a 500 ms deadline and treats
//!   its expiry as success; in-time `>= 400` responses are still errors.
//! - [`RequestDispatcher`]: the shared send/classify routine both clients use.
//! - [`QueryString`]: query builder for `GET` requests.
//! - [`SessionContext`]: source of the `Username`/`Session` headers.

mod client;
mod dispatcher;
mod error;
pub mod fire_and_forget;
mod query;
pub mod session;
#[cfg(test)]
mod test_support;

/// Async client that waits for and decodes responses.
pub use client::{DEFAULT_TIMEOUT, StandardClient};
/// Shared dispatch types.
pub use dispatcher::{RequestDispatcher, RequestSpec, ResponseOutcome, TimeoutPolicy};
/// Error type returned by all client operations.
pub use error::ClientError;
/// Async client that does not wait for slow backends.
pub use fire_and_forget::FireAndForgetClient;
/// Query string builder and its date format.
pub use query::{QueryString, round_trip_date};
pub use session::{SessionContext, SessionHeaders, StaticSession};

pub use reqwest::{Method, StatusCode};
