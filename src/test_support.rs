//! Raw HTTP/1.1 responder for status lines and timings `wiremock` cannot produce.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Answers one connection with `status_line` and `body`, then closes it.
///
/// With `body_delay` the headers go out first and the body follows after the
/// delay. Returns the base URL of the listener.
pub(crate) async fn serve_once(
    status_line: &'static str,
    body: &'static str,
    body_delay: Option<Duration>,
) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local listener");
    let addr = listener.local_addr().expect("listener address");

    tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        let mut request = [0_u8; 4096];
        let _ = stream.read(&mut request).await;

        let head = format!(
            "{status_line}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            body.len()
        );
        if stream.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        let _ = stream.flush().await;
        if let Some(delay) = body_delay {
            tokio::time::sleep(delay).await;
        }
        let _ = stream.write_all(body.as_bytes()).await;
    });

    format!("http://{addr}")
}
