//! Post an event without waiting for the backend to finish.
//!
//! Run:
//! `REST_BASE_URL=https://api.example.com cargo run --example fire_and_forget_post`
//!
//! The call returns after at most 500 ms. Only responses that arrive within
//! that window with status >= 400 are reported.

use session_rest_client::FireAndForgetClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Ok(base_url) = std::env::var("REST_BASE_URL") else {
        eprintln!("Set REST_BASE_URL before running this example.");
        std::process::exit(2);
    };

    let client = FireAndForgetClient::new(base_url)?;
    client
        .post("events", &serde_json::json!({"kind": "demo", "source": "fire_and_forget_post"}))
        .await?;
    println!("event handed off");
    Ok(())
}
