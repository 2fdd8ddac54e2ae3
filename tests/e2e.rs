use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;

use flate2::read::GzDecoder;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use tiny_http_files::application::ServerData;
use tiny_http_files::infrastructure::server_impl::server::serve;

async fn start(dir: &TempDir) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_data = Arc::new(ServerData::new(dir.path()).unwrap());
    tokio::spawn(serve(listener, server_data));
    addr
}

async fn send(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    // The server closes right after replying; a reset at that point still
    // leaves the reply in `raw`.
    let mut raw = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => raw.extend_from_slice(&buf[..n]),
        }
    }
    raw
}

/// Splits a raw reply into (status line, header block, body as declared by
/// `Content-Length`).
fn split(raw: &[u8]) -> (String, String, Vec<u8>) {
    let text_end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("no header terminator");
    let head = String::from_utf8(raw[..text_end].to_vec()).unwrap();
    let (status, headers) = head.split_once("\r\n").unwrap_or((head.as_str(), ""));
    let length: usize = headers
        .lines()
        .find_map(|l| l.strip_prefix("Content-Length: "))
        .unwrap()
        .parse()
        .unwrap();
    let body_start = text_end + 4;
    (
        status.to_string(),
        headers.to_string(),
        raw[body_start..body_start + length].to_vec(),
    )
}

#[tokio::test]
async fn routing_table() {
    let dir = TempDir::new().unwrap();
    let addr = start(&dir).await;

    let cases: [(&[u8], &str); 6] = [
        (b"GET / HTTP/1.1\r\n\r\n", "HTTP/1.1 200 OK"),
        (b"GET /user-agent HTTP/1.1\r\nUser-Agent: t\r\n\r\n", "HTTP/1.1 200 OK"),
        (b"GET /echo/x HTTP/1.1\r\n\r\n", "HTTP/1.1 200 OK"),
        (b"GET /missing HTTP/1.1\r\n\r\n", "HTTP/1.1 404 Not Found"),
        (b"GET / HTTP/1.0\r\n\r\n", "HTTP/1.1 400 Bad Request"),
        (b"DELETE / HTTP/1.1\r\n\r\n", "HTTP/1.1 501 Not Implemented"),
    ];

    for (request, expected) in cases {
        let (status, _, _) = split(&send(addr, request).await);
        assert_eq!(status, expected, "{}", String::from_utf8_lossy(request));
    }
}

#[tokio::test]
async fn gzip_echo_over_tcp() {
    let dir = TempDir::new().unwrap();
    let addr = start(&dir).await;

    let raw = send(
        addr,
        b"GET /echo/abc HTTP/1.1\r\nAccept-Encoding: identity,  gzip \r\n\r\n",
    )
    .await;
    let (status, headers, body) = split(&raw);
    assert_eq!(status, "HTTP/1.1 200 OK");
    assert!(headers.contains("Content-Encoding: gzip"));
    assert!(headers.contains("Content-Type: text/plain"));

    let mut decoded = String::new();
    GzDecoder::new(&body[..]).read_to_string(&mut decoded).unwrap();
    assert_eq!(decoded, "abc");
}

#[tokio::test]
async fn upload_download_round_trip() {
    let dir = TempDir::new().unwrap();
    let addr = start(&dir).await;

    let payload: Vec<u8> = (0..=255u8).cycle().take(100_000).collect();
    let mut request = format!(
        "POST /files/data.bin HTTP/1.1\r\nContent-Length: {}\r\n\r\n",
        payload.len()
    )
    .into_bytes();
    request.extend_from_slice(&payload);

    let (status, _, _) = split(&send(addr, &request).await);
    assert_eq!(status, "HTTP/1.1 201 Created");

    let raw = send(addr, b"GET /files/data.bin HTTP/1.1\r\n\r\n").await;
    let (status, headers, body) = split(&raw);
    assert_eq!(status, "HTTP/1.1 200 OK");
    assert!(headers.contains("Content-Type: application/octet-stream"));
    assert_eq!(body, payload);
    assert!(raw.ends_with(&payload));
}

#[tokio::test]
async fn boundary_cases() {
    let dir = TempDir::new().unwrap();
    let addr = start(&dir).await;

    let raw = send(addr, b"GET /files/does-not-exist HTTP/1.1\r\n\r\n").await;
    let (status, _, _) = split(&raw);
    assert_eq!(status, "HTTP/1.1 404 Not Found");

    let (status, _, _) = split(&send(addr, b"GET /files/ HTTP/1.1\r\n\r\n").await);
    assert_eq!(status, "HTTP/1.1 500 Internal Server Error");

    let raw = send(addr, b"GET /echo/plain HTTP/1.1\r\nAccept-Encoding: \r\n\r\n").await;
    let (_, headers, body) = split(&raw);
    assert!(!headers.contains("Content-Encoding"));
    assert_eq!(body, b"plain");
}
