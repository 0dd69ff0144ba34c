//! Session identity attached to outgoing requests.
//!
//! The identity travels as two plain headers, `Username` and `Session`. It is
//! a lightweight signal checked server-side, not a credential.

use reqwest::header::{HeaderMap, HeaderValue};

use crate::ClientError;

/// Header carrying the session token.
pub const SESSION_HEADER: &str = "session";
/// Header carrying the username.
pub const USERNAME_HEADER: &str = "username";

/// Source of the current username and session token.
///
/// Implementations are queried once per request, so they may return values
/// that change over the lifetime of a client.
pub trait SessionContext: Send + Sync {
    fn username(&self) -> Option<String>;
    fn session_token(&self) -> Option<String>;
}

/// A session context with fixed values.
#[derive(Clone, Debug, Default)]
pub struct StaticSession {
    username: Option<String>,
    session_token: Option<String>,
}

impl StaticSession {
    pub fn new(username: impl Into<String>, session_token: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            session_token: Some(session_token.into()),
        }
    }

    /// A context that yields neither value.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl SessionContext for StaticSession {
    fn username(&self) -> Option<String> {
        self.username.clone()
    }

    fn session_token(&self) -> Option<String> {
        self.session_token.clone()
    }
}

/// The username/token pair, present only when both values are non-blank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionHeaders {
    pub username: String,
    pub session_token: String,
}

impl SessionHeaders {
    /// Reads both values from `context`.
    ///
    /// Returns `None` when either value is absent, empty, or whitespace only.
    pub fn from_context(context: &dyn SessionContext) -> Option<Self> {
        let username = context.username().filter(|value| !value.trim().is_empty())?;
        let session_token = context
            .session_token()
            .filter(|value| !value.trim().is_empty())?;
        Some(Self {
            username,
            session_token,
        })
    }

    /// Replaces any existing `Session`/`Username` entries in `headers`.
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), ClientError> {
        let session = header_value("Session", &self.session_token)?;
        let username = header_value("Username", &self.username)?;

        headers.remove(SESSION_HEADER);
        headers.remove(USERNAME_HEADER);
        headers.insert(SESSION_HEADER, session);
        headers.insert(USERNAME_HEADER, username);
        Ok(())
    }
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(value).map_err(|err| ClientError::InvalidHeader {
        name,
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderMap;

    use super::{SESSION_HEADER, SessionHeaders, StaticSession, USERNAME_HEADER};
    use crate::ClientError;

    #[test]
    fn blank_values_yield_no_headers() {
        let cases = [
            StaticSession::anonymous(),
            StaticSession::new("", "token"),
            StaticSession::new("alice", ""),
            StaticSession::new("   ", "token"),
            StaticSession::new("alice", "\t\n"),
        ];
        for context in &cases {
            assert_eq!(SessionHeaders::from_context(context), None, "{context:?}");
        }
    }

    #[test]
    fn apply_replaces_previous_values() {
        let mut headers = HeaderMap::new();
        headers.append(SESSION_HEADER, "stale".parse().expect("valid header"));
        headers.append(SESSION_HEADER, "staler".parse().expect("valid header"));

        SessionHeaders::from_context(&StaticSession::new("alice", "s-1"))
            .expect("both values present")
            .apply(&mut headers)
            .expect("valid header values");

        assert_eq!(headers.get_all(SESSION_HEADER).iter().count(), 1);
        assert_eq!(headers[SESSION_HEADER], "s-1");
        assert_eq!(headers[USERNAME_HEADER], "alice");
    }

    #[test]
    fn apply_rejects_values_that_are_not_header_text() {
        let headers = SessionHeaders {
            username: "alice".to_owned(),
            session_token: "line\nbreak".to_owned(),
        };
        let error = headers
            .apply(&mut HeaderMap::new())
            .expect_err("newline is not valid header text");
        assert!(matches!(
            error,
            ClientError::InvalidHeader {
                name: "Session",
                ..
            }
        ));
    }
}
