//! Test helpers for integration tests.
//!
//! Provides an in-memory client handle, a TCP test client and a test server.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use camix::chat::{BroadcastReport, ClientHandle, ClientId, SendError};
use camix::config::ServerConfig;
use camix::{ChatServer, ServiceRegistry, SessionSettings};

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client handle that records every line it is sent.
pub struct RecordingClient {
    id: ClientId,
    nickname: String,
    direct: Mutex<Vec<String>>,
}

impl RecordingClient {
    /// Create a recording client.
    pub fn new(id: &str, nickname: &str) -> Arc<Self> {
        Arc::new(Self {
            id: ClientId::new(id),
            nickname: nickname.to_string(),
            direct: Mutex::new(Vec::new()),
        })
    }

    /// Lines received so far.
    pub fn received(&self) -> Vec<String> {
        self.direct.lock().unwrap().clone()
    }
}

impl ClientHandle for RecordingClient {
    fn id(&self) -> &ClientId {
        &self.id
    }

    fn nickname(&self) -> String {
        self.nickname.clone()
    }

    fn send_direct(&self, text: &str) -> Result<(), SendError> {
        self.direct.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn send_to_contacts(&self, _text: &str) -> BroadcastReport {
        BroadcastReport::default()
    }
}

/// Test client speaking the line protocol over TCP.
pub struct TestClient {
    lines: tokio::io::Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    /// Connect to the server at the given address.
    pub async fn connect(addr: SocketAddr) -> Result<Self, std::io::Error> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            lines: BufReader::new(reader).lines(),
            writer,
        })
    }

    /// Send raw bytes to the server.
    pub async fn send_raw(&mut self, data: &[u8]) -> Result<(), std::io::Error> {
        self.writer.write_all(data).await?;
        self.writer.flush().await
    }

    /// Send a line (with CRLF) to the server.
    pub async fn send_line(&mut self, line: &str) -> Result<(), std::io::Error> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await
    }

    /// Receive one line, without its terminator.
    ///
    /// Returns None on EOF or timeout.
    pub async fn recv_line(&mut self) -> Option<String> {
        match timeout(DEFAULT_TIMEOUT, self.lines.next_line()).await {
            Ok(Ok(Some(line))) => Some(line.trim_end_matches('\r').to_string()),
            _ => None,
        }
    }

    /// Receive lines until one contains `pattern`, returning that line.
    pub async fn recv_until(&mut self, pattern: &str) -> Option<String> {
        while let Some(line) = self.recv_line().await {
            if line.contains(pattern) {
                return Some(line);
            }
        }
        None
    }

    /// Check that the server closes the connection.
    pub async fn expect_closed(&mut self) -> bool {
        matches!(
            timeout(DEFAULT_TIMEOUT, self.lines.next_line()).await,
            Ok(Ok(None)) | Ok(Err(_))
        )
    }
}

/// Chat server running in the background on an ephemeral port.
pub struct TestServer {
    addr: SocketAddr,
    registry: Arc<ServiceRegistry>,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Start a server with the default settings.
    pub async fn start() -> Self {
        Self::start_with(SessionSettings::default(), 16).await
    }

    /// Start a server with custom session settings and connection limit.
    pub async fn start_with(settings: SessionSettings, max_connections: usize) -> Self {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_connections,
        };
        let server = ChatServer::bind(&config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let registry = Arc::new(ServiceRegistry::new("general").unwrap());

        let shared = Arc::clone(&registry);
        let task = tokio::spawn(async move {
            let _ = server.serve(shared, settings).await;
        });

        Self {
            addr,
            registry,
            task,
        }
    }

    /// Address clients should connect to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The registry shared by every session.
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Connect a client and consume its welcome line.
    pub async fn connect(&self) -> TestClient {
        let mut client = TestClient::connect(self.addr).await.unwrap();
        let welcome = client.recv_line().await.unwrap();
        assert!(welcome.starts_with("* Welcome to Camix"), "{welcome}");
        client
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
