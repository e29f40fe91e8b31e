//! Canned TCP servers for exercising the HTTP client and both channels
//! without a real device on the network.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub(crate) fn http_json(body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
    .into_bytes()
}

pub(crate) fn http_error(code: u16, reason: &str) -> Vec<u8> {
    format!("HTTP/1.1 {code} {reason}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
        .into_bytes()
}

/// Response head for an event stream, followed by whatever frames the
/// test appends. No Content-Length: the body runs until the socket
/// closes, which is how the firmware serves `/events`.
pub(crate) fn sse_response(frames: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n{frames}"
    )
    .into_bytes()
}

/// Serve exactly one connection: read the request head, write `response`,
/// close. Returns the base URL to point a client at.
pub(crate) async fn serve_once(response: Vec<u8>) -> String {
    serve_once_then_hold(response, Duration::ZERO).await
}

/// Like `serve_once`, but keep the socket open for `hold` after writing.
/// Lets stall-detection tests hold a stream silent.
pub(crate) async fn serve_once_then_hold(response: Vec<u8>, hold: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut head = [0u8; 2048];
            let _ = socket.read(&mut head).await;
            let _ = socket.write_all(&response).await;
            if !hold.is_zero() {
                tokio::time::sleep(hold).await;
            }
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{addr}")
}

/// Serve every connection with the same response, delaying `delay`
/// between reading the request and answering it. The counter increments
/// once per accepted request, which is how the poll tests observe that
/// ticks never overlap.
pub(crate) async fn serve_counted(
    response: Vec<u8>,
    delay: Duration,
) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    let requests = counter.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            requests.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

            let response = response.clone();
            tokio::spawn(async move {
                let mut head = [0u8; 2048];
                let _ = socket.read(&mut head).await;
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let _ = socket.write_all(&response).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{addr}"), counter)
}
