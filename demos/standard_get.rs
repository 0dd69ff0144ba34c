//! Fetch a JSON document with the standard client.
//!
//! Run:
//! `REST_BASE_URL=https://api.example.com cargo run --example standard_get -- items`
//!
//! Optional env vars:
//! - `REST_USERNAME` and `REST_SESSION` (session headers, sent only when both are set)
//! - `REST_TIMEOUT_MS` (defaults to 100 seconds)

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use session_rest_client::{QueryString, StandardClient, StaticSession};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Ok(base_url) = std::env::var("REST_BASE_URL") else {
        eprintln!("Set REST_BASE_URL before running this example.");
        std::process::exit(2);
    };
    let path = std::env::args().nth(1).unwrap_or_else(|| "items".to_owned());

    let mut client = StandardClient::new(base_url)?;
    if let (Ok(username), Ok(session)) =
        (std::env::var("REST_USERNAME"), std::env::var("REST_SESSION"))
    {
        client = client.with_session(Arc::new(StaticSession::new(username, session)));
    }
    if let Ok(millis) = std::env::var("REST_TIMEOUT_MS") {
        client = client.with_timeout(Duration::from_millis(millis.parse()?));
    }

    let query = QueryString::new().param("limit", 5).param("offset", 0);
    let document: Value = client.get_with_query(&path, &query).await?;
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}
