//! End-to-end exchanges against a real listener on 127.0.0.1.

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use staticd::config::Config;
use staticd::server::{Server, ServerHandle, ServerState};
use staticd::static_files::DocumentRoot;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

struct TestServer {
    _dir: TempDir,
    addr: SocketAddr,
    handle: ServerHandle,
    task: JoinHandle<anyhow::Result<()>>,
}

async fn spawn_server(max_connections: usize) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "<h1>hi</h1>").unwrap();
    fs::write(dir.path().join("a.txt"), "a".repeat(50_000)).unwrap();
    fs::write(dir.path().join("b.bin"), vec![7u8; 70_000]).unwrap();
    fs::write(dir.path().join("data.unknownext"), "raw").unwrap();
    fs::create_dir(dir.path().join("assets")).unwrap();

    let cfg = Config {
        bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        document_root: dir.path().to_path_buf(),
        max_connections,
        read_timeout_secs: 2,
        write_timeout_secs: 2,
        shutdown_grace_secs: 1,
    };

    let root = DocumentRoot::open(&cfg.document_root).unwrap();
    let server = Server::bind(&cfg, root).await.unwrap();
    let addr = server.local_addr().unwrap();
    let handle = server.handle();
    let task = tokio::spawn(server.run());

    TestServer {
        _dir: dir,
        addr,
        handle,
        task,
    }
}

struct RawResponse {
    head: String,
    body: Vec<u8>,
}

impl RawResponse {
    fn status_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim())
        })
    }
}

async fn send(addr: SocketAddr, raw: &[u8]) -> RawResponse {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw).await.unwrap();

    let mut received = Vec::new();
    stream.read_to_end(&mut received).await.unwrap();

    let split = received
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has a header block");

    RawResponse {
        head: String::from_utf8(received[..split].to_vec()).unwrap(),
        body: received[split + 4..].to_vec(),
    }
}

async fn get(addr: SocketAddr, path: &str) -> RawResponse {
    send(addr, format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n").as_bytes()).await
}

#[tokio::test]
async fn test_index_served_for_root() {
    let server = spawn_server(16).await;

    let root = get(server.addr, "/").await;
    let index = get(server.addr, "/index.html").await;

    assert_eq!(root.status_line(), "HTTP/1.1 200 OK");
    assert_eq!(root.body, b"<h1>hi</h1>");
    assert_eq!(root.header("Content-Type"), Some("text/html; charset=utf-8"));
    assert_eq!(root.body, index.body);
    assert_eq!(root.status_line(), index.status_line());
    assert!(root.header("Date").unwrap().ends_with("GMT"));
    assert_eq!(root.header("Connection"), Some("close"));

    server.handle.stop();
}

#[tokio::test]
async fn test_status_scenarios() {
    let server = spawn_server(16).await;

    let cases: [(&[u8], &str); 5] = [
        (b"GET /../../etc/passwd HTTP/1.1\r\n\r\n", "HTTP/1.1 403 Forbidden"),
        (b"POST /index.html HTTP/1.1\r\n\r\n", "HTTP/1.1 405 Method Not Allowed"),
        (b"GET /missing.txt HTTP/1.1\r\n\r\n", "HTTP/1.1 404 Not Found"),
        (b"GARBAGE\r\n\r\n", "HTTP/1.1 400 Bad Request"),
        (b"GET /assets HTTP/1.1\r\n\r\n", "HTTP/1.1 404 Not Found"),
    ];

    for (raw, expected) in cases {
        let response = send(server.addr, raw).await;
        assert_eq!(response.status_line(), expected);
        assert_eq!(
            response.header("Content-Length"),
            Some(response.body.len().to_string().as_str())
        );
        assert_eq!(response.header("Content-Type"), Some("text/html; charset=utf-8"));
    }

    server.handle.stop();
}

#[tokio::test]
async fn test_unknown_extension_is_octet_stream() {
    let server = spawn_server(16).await;

    let response = get(server.addr, "/data.unknownext").await;

    assert_eq!(response.status_line(), "HTTP/1.1 200 OK");
    assert_eq!(response.header("Content-Type"), Some("application/octet-stream"));
    assert_eq!(response.body, b"raw");

    server.handle.stop();
}

#[tokio::test]
async fn test_concurrent_requests_get_their_own_content() {
    let server = spawn_server(16).await;

    let (a, b) = tokio::join!(get(server.addr, "/a.txt"), get(server.addr, "/b.bin"));

    assert_eq!(a.body, "a".repeat(50_000).into_bytes());
    assert_eq!(a.header("Content-Length"), Some("50000"));
    assert_eq!(b.body, vec![7u8; 70_000]);
    assert_eq!(b.header("Content-Length"), Some("70000"));

    server.handle.stop();
}

#[tokio::test]
async fn test_saturated_server_defers_accept() {
    let server = spawn_server(1).await;

    // Hold the only slot with a connection that sends nothing yet
    let mut idle = TcpStream::connect(server.addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let waiting = tokio::spawn(get(server.addr, "/index.html"));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!waiting.is_finished());

    idle.write_all(b"GET /index.html HTTP/1.1\r\n\r\n").await.unwrap();
    let mut sink = Vec::new();
    idle.read_to_end(&mut sink).await.unwrap();

    let response = waiting.await.unwrap();
    assert_eq!(response.status_line(), "HTTP/1.1 200 OK");

    server.handle.stop();
}

#[tokio::test]
async fn test_stop_is_idempotent_and_closes_listener() {
    let server = spawn_server(4).await;
    assert_eq!(server.handle.state(), ServerState::Running);

    let remote = server.handle.clone();
    std::thread::spawn(move || remote.stop()).join().unwrap();
    server.handle.stop();

    assert!(!server.handle.is_running());
    assert_eq!(server.handle.state(), ServerState::Stopped);

    tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .expect("server exits after stop")
        .unwrap()
        .unwrap();

    assert!(TcpStream::connect(server.addr).await.is_err());
}
