#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Mock Icecast/SHOUTcast source
//!
//! Speaks just enough HTTP/1.1 over raw TCP to serve an ICY stream:
//! `metaint` bytes of audio, a length byte, the padded metadata block, then
//! endless filler audio until the client hangs up. A client that tries to
//! drain the stream never finishes.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

const AUDIO_BYTE: u8 = 0x55;
const FILLER_CHUNK: usize = 1024;
const MAX_FILLER_CHUNKS: usize = 2_000;

/// How the mock answers each connection
#[derive(Debug, Clone)]
pub struct MockStream {
    pub status: u16,
    pub metaint: Option<usize>,
    /// Unpadded block text; empty means a zero-length block
    pub metadata: Vec<u8>,
    /// Body bytes per write
    pub chunk_size: usize,
    /// Wait this long before sending the status line
    pub response_delay: Duration,
    /// Accept and read the request, then never answer
    pub stall: bool,
    /// Close the connection after this many body bytes
    pub truncate_after: Option<usize>,
}

impl MockStream {
    /// Stream announcing `StreamTitle='<full_title>';` every `metaint` bytes
    pub fn titled(metaint: usize, full_title: &str) -> Self {
        Self::with_metadata(metaint, format!("StreamTitle='{}';", full_title).into_bytes())
    }

    /// Stream with a raw metadata block payload
    pub fn with_metadata(metaint: usize, metadata: Vec<u8>) -> Self {
        Self {
            status: 200,
            metaint: Some(metaint),
            metadata,
            chunk_size: 4096,
            response_delay: Duration::ZERO,
            stall: false,
            truncate_after: None,
        }
    }

    /// Plain audio stream without `icy-metaint`
    pub fn without_metaint() -> Self {
        Self {
            metaint: None,
            ..Self::with_metadata(0, Vec::new())
        }
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.response_delay = delay;
        self
    }

    pub fn stalled(mut self) -> Self {
        self.stall = true;
        self
    }

    pub fn truncated_after(mut self, body_bytes: usize) -> Self {
        self.truncate_after = Some(body_bytes);
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Audio prefix, length byte and padded block
    fn body_prefix(&self) -> Vec<u8> {
        let Some(metaint) = self.metaint else {
            return vec![AUDIO_BYTE; FILLER_CHUNK];
        };

        let blocks = self.metadata.len().div_ceil(16);
        assert!(blocks <= 255, "metadata too long for one ICY block");

        let mut body = vec![AUDIO_BYTE; metaint];
        body.push(blocks as u8);
        body.extend_from_slice(&self.metadata);
        body.resize(metaint + 1 + blocks * 16, 0);
        body
    }
}

/// Request line and headers the mock saw
#[derive(Debug, Clone, Default)]
pub struct RecordedRequest {
    pub path: String,
    pub icy_metadata: Option<String>,
    pub user_agent: Option<String>,
}

/// Mock Icecast server
pub struct MockIcecastServer {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl MockIcecastServer {
    /// Start a mock stream server on a random port
    pub async fn start(stream: MockStream) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let connections_clone = connections.clone();
        let requests_clone = requests.clone();
        let handle = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                connections_clone.fetch_add(1, Ordering::SeqCst);
                let stream = stream.clone();
                let requests = requests_clone.clone();
                tokio::spawn(async move {
                    handle_connection(socket, stream, requests).await;
                });
            }
        });

        Self {
            addr,
            connections,
            requests,
            handle,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stream URL for this server
    pub fn url(&self) -> String {
        format!("http://{}/stream", self.addr)
    }

    /// Connections accepted so far
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub async fn stop(self) {
        self.handle.abort();
    }
}

async fn handle_connection(
    socket: TcpStream,
    stream: MockStream,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);

    let Some(request) = read_request(&mut reader).await else {
        return;
    };
    requests.lock().unwrap().push(request);

    if stream.stall {
        // Keep both halves alive so the client sees an open, silent socket
        tokio::time::sleep(Duration::from_secs(3600)).await;
        drop(reader);
        return;
    }

    if !stream.response_delay.is_zero() {
        tokio::time::sleep(stream.response_delay).await;
    }

    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: audio/mpeg\r\nConnection: close\r\n",
        stream.status,
        if stream.status == 200 { "OK" } else { "Error" }
    );
    if let Some(metaint) = stream.metaint {
        head.push_str(&format!("icy-metaint: {}\r\n", metaint));
    }
    head.push_str("\r\n");
    if writer.write_all(head.as_bytes()).await.is_err() {
        return;
    }
    if stream.status != 200 {
        return;
    }

    let mut body = stream.body_prefix();
    if let Some(limit) = stream.truncate_after {
        body.truncate(limit);
    }

    for chunk in body.chunks(stream.chunk_size) {
        if writer.write_all(chunk).await.is_err() {
            return;
        }
        let _ = writer.flush().await;
        if stream.chunk_size < body.len() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    if stream.truncate_after.is_some() {
        return;
    }

    // Live stream: keep sending audio until the client goes away
    let filler = [AUDIO_BYTE; FILLER_CHUNK];
    for _ in 0..MAX_FILLER_CHUNKS {
        if writer.write_all(&filler).await.is_err() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

async fn read_request<R>(reader: &mut BufReader<R>) -> Option<RecordedRequest>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    reader.read_line(&mut line).await.ok()?;
    let mut request = RecordedRequest {
        path: line.split_whitespace().nth(1)?.to_string(),
        ..Default::default()
    };

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => return None,
            Ok(_) => {}
        }
        let header = line.trim_end();
        if header.is_empty() {
            return Some(request);
        }
        if let Some((name, value)) = header.split_once(':') {
            let value = Some(value.trim().to_string());
            match name.trim().to_ascii_lowercase().as_str() {
                "icy-metadata" => request.icy_metadata = value,
                "user-agent" => request.user_agent = value,
                _ => {}
            }
        }
    }
}
