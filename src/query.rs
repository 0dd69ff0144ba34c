use std::fmt;

use chrono::{DateTime, TimeZone};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters escaped in query keys and values.
///
/// Only what would break the `key=value&key=value` grammar is escaped, so
/// round-trip dates keep their `:` separators.
const QUERY_COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'=')
    .add(b'>');

/// Query string builder for GET requests.
///
/// Parameters render in insertion order as `?key=value&key=value`. An empty
/// builder renders as an empty string.
///
/// ```
/// use session_rest_client::QueryString;
///
/// let query = QueryString::new().param("id", 3).params("tags", ["a", "b"]);
/// assert_eq!(query.to_string(), "?id=3&tags=a&tags=b");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryString {
    pairs: Vec<(String, String)>,
}

impl QueryString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one `key=value` pair.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.pairs.push((key.into(), value.to_string()));
        self
    }

    /// Adds one `key=value` pair per element, repeating the key.
    #[must_use]
    pub fn params<I>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        let key = key.into();
        for value in values {
            self.pairs.push((key.clone(), value.to_string()));
        }
        self
    }

    /// Adds `key=value`, or `key=` with an empty value for `None`.
    #[must_use]
    pub fn optional(self, key: impl Into<String>, value: Option<impl fmt::Display>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self.param(key, ""),
        }
    }

    /// Adds a date in round-trip format (see [`round_trip_date`]).
    #[must_use]
    pub fn date<Tz: TimeZone>(self, key: impl Into<String>, value: &DateTime<Tz>) -> Self {
        self.param(key, round_trip_date(value))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Renders an optional query, with `None` yielding an empty string.
    pub fn encode(query: Option<&QueryString>) -> String {
        query.map(ToString::to_string).unwrap_or_default()
    }
}

impl fmt::Display for QueryString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (key, value)) in self.pairs.iter().enumerate() {
            let separator = if index == 0 { '?' } else { '&' };
            write!(
                f,
                "{separator}{}={}",
                utf8_percent_encode(key, QUERY_COMPONENT),
                utf8_percent_encode(value, QUERY_COMPONENT)
            )?;
        }
        Ok(())
    }
}

/// Formats a date as `YYYY-MM-DDTHH:MM:SS.fffffffZ`.
///
/// The fraction always has seven digits (100 ns ticks). A non-zero offset is
/// written as `+HH:MM`/`-HH:MM` instead of `Z`.
pub fn round_trip_date<Tz: TimeZone>(value: &DateTime<Tz>) -> String {
    let value = value.fixed_offset();
    let ticks = value.timestamp_subsec_nanos() / 100;
    let offset = if value.offset().local_minus_utc() == 0 {
        "Z".to_owned()
    } else {
        value.format("%:z").to_string()
    };
    format!("{}.{ticks:07}{offset}", value.format("%Y-%m-%dT%H:%M:%S"))
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone, Utc};

    use super::{QueryString, round_trip_date};

    #[test]
    fn repeats_keys_for_list_values() {
        let query = QueryString::new().param("id", 3).params("tags", ["a", "b"]);
        assert_eq!(query.to_string(), "?id=3&tags=a&tags=b");
    }

    #[test]
    fn empty_or_absent_query_renders_nothing() {
        assert_eq!(QueryString::new().to_string(), "");
        assert_eq!(QueryString::encode(None), "");
        assert!(QueryString::new().params("tags", Vec::<String>::new()).is_empty());
    }

    #[test]
    fn renders_utc_dates_in_round_trip_format() {
        let when = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
            + chrono::Duration::nanoseconds(123_456_700);
        let query = QueryString::new().date("when", &when);
        assert_eq!(query.to_string(), "?when=2024-03-09T14:05:07.1234567Z");
    }

    #[test]
    fn renders_offsets_in_place_of_z() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let when = offset.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(round_trip_date(&when), "2024-01-02T03:04:05.0000000+02:00");
    }

    #[test]
    fn absent_optional_value_renders_empty() {
        let query = QueryString::new()
            .optional("page", Some(2))
            .optional("filter", None::<&str>);
        assert_eq!(query.to_string(), "?page=2&filter=");
    }

    #[test]
    fn escapes_characters_that_break_the_query() {
        let query = QueryString::new().param("q", "a&b=c d");
        assert_eq!(query.to_string(), "?q=a%26b%3Dc%20d");
    }
}
