// ABOUTME: Minimal scripted HTTP server on localhost for exercising the provider adapters offline.
// ABOUTME: Answers each connection with the next canned status and JSON body, and counts the requests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A running scripted server: its base URL and how many requests it has seen.
pub struct ScriptedServer {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
}

impl ScriptedServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Serve `replies` in order, one per connection. Requests past the end of
/// the script get the last reply again.
pub async fn serve(replies: Vec<(u16, String)>) -> ScriptedServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local test server");
    let addr = listener.local_addr().expect("local addr");
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = hits.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let seen = counter.fetch_add(1, Ordering::SeqCst);
            let (status, body) = replies
                .get(seen)
                .or_else(|| replies.last())
                .cloned()
                .unwrap_or((500, String::new()));
            if read_request(&mut socket).await.is_err() {
                continue;
            }
            let response = format!(
                "HTTP/1.1 {} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    ScriptedServer {
        base_url: format!("http://{}", addr),
        hits,
    }
}

/// Accept connections and never answer them.
pub async fn serve_silence() -> ScriptedServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local test server");
    let addr = listener.local_addr().expect("local addr");
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = hits.clone();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(socket);
        }
    });

    ScriptedServer {
        base_url: format!("http://{}", addr),
        hits,
    }
}

/// Read one request: headers, then as many body bytes as Content-Length says.
async fn read_request(socket: &mut TcpStream) -> std::io::Result<()> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        data.extend_from_slice(&buf[..n]);

        let Some(header_end) = data.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&data[..header_end]).to_lowercase();
        let body_len = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if data.len() >= header_end + 4 + body_len {
            return Ok(());
        }
    }
}
