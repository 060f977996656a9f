//! End-to-end HTTP contract tests
//!
//! Runs the real router on a local TCP listener with the camera stubbed
//! out, and inspects the raw HTTP exchange: status line, media type, and
//! the exact multipart framing of every chunk.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use camserve::state::{AppState, SourceFactory};
use camserve::stream::PART_HEADER;
use camserve::video::frame::is_valid_jpeg;
use camserve::video::{CaptureConfig, FrameSource, PixelFormat, Resolution, VideoFrame};
use camserve::web::create_router;
use camserve::Result;

fn fake_jpeg() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    data.extend(vec![0u8; 200]);
    data.extend([0xFF, 0xD9]);
    data
}

/// Camera stub: produces a fixed number of JPEG frames (or endless when
/// `frames` is None), counts opens and releases.
struct StubSource {
    remaining: Option<usize>,
    sequence: u64,
    delay: Option<Duration>,
    releases: Arc<AtomicUsize>,
}

impl FrameSource for StubSource {
    fn read(&mut self) -> Result<Option<VideoFrame>> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Ok(None);
            }
            *remaining -= 1;
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.sequence += 1;
        Ok(Some(VideoFrame::from_vec(
            fake_jpeg(),
            Resolution::VGA,
            PixelFormat::Mjpeg,
            self.sequence,
        )))
    }
}

impl Drop for StubSource {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

struct StubCamera {
    opens: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl StubCamera {
    fn new() -> Self {
        Self {
            opens: Arc::new(AtomicUsize::new(0)),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn factory(&self, frames: Option<usize>, delay: Option<Duration>) -> SourceFactory {
        let opens = self.opens.clone();
        let releases = self.releases.clone();
        Arc::new(move || {
            opens.fetch_add(1, Ordering::SeqCst);
            Box::new(StubSource {
                remaining: frames,
                sequence: 0,
                delay,
                releases: releases.clone(),
            })
        })
    }

    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    async fn wait_for_releases(&self, expected: usize) {
        for _ in 0..200 {
            if self.releases() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} releases, saw {}", expected, self.releases());
    }
}

async fn spawn_server(factory: SourceFactory) -> SocketAddr {
    let state = AppState::with_source_factory(
        CaptureConfig::default(),
        factory,
        CancellationToken::new(),
    );
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn send_get(addr: SocketAddr) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    stream
}

/// Read the whole response (connection: close), returning the head and
/// the de-chunked body.
async fn read_response(mut stream: TcpStream) -> (String, Vec<u8>) {
    let mut raw = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut raw))
        .await
        .expect("response not complete within timeout")
        .unwrap();

    let head_end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("no header terminator");
    let head = String::from_utf8_lossy(&raw[..head_end]).to_string();
    let body = if head.to_lowercase().contains("transfer-encoding: chunked") {
        decode_chunked(&raw[head_end + 4..])
    } else {
        raw[head_end + 4..].to_vec()
    };
    (head, body)
}

/// Minimal chunked transfer decoding, tolerant of a truncated tail.
fn decode_chunked(mut data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    loop {
        let Some(line_end) = data.windows(2).position(|w| w == b"\r\n") else {
            break;
        };
        let size_line = String::from_utf8_lossy(&data[..line_end]);
        let size = match usize::from_str_radix(size_line.trim(), 16) {
            Ok(size) => size,
            Err(_) => break,
        };
        if size == 0 {
            break;
        }
        let start = line_end + 2;
        if data.len() < start + size + 2 {
            break;
        }
        body.extend_from_slice(&data[start..start + size]);
        data = &data[start + size + 2..];
    }
    body
}

/// Split a multipart body into its parts and validate their exact framing.
fn split_parts(body: &[u8]) -> Vec<Vec<u8>> {
    let mut parts = Vec::new();
    let mut rest = body;
    while !rest.is_empty() {
        assert!(
            rest.starts_with(PART_HEADER),
            "chunk does not start with boundary + header"
        );
        let after = &rest[PART_HEADER.len()..];
        let payload_end = after
            .windows(PART_HEADER.len())
            .position(|w| w == PART_HEADER)
            .map_or(after.len() - 2, |p| p - 2);
        let payload = &after[..payload_end];
        assert_eq!(&after[payload_end..payload_end + 2], b"\r\n");
        parts.push(payload.to_vec());
        rest = &after[payload_end + 2..];
    }
    parts
}

#[tokio::test]
async fn three_frames_then_exhaustion() {
    let camera = StubCamera::new();
    let addr = spawn_server(camera.factory(Some(3), None)).await;

    let (head, body) = read_response(send_get(addr).await).await;

    assert!(head.starts_with("HTTP/1.1 200"), "head: {}", head);
    assert!(
        head.to_lowercase()
            .contains("content-type: multipart/x-mixed-replace; boundary=frame"),
        "head: {}",
        head
    );

    let parts = split_parts(&body);
    assert_eq!(parts.len(), 3, "expected exactly 3 chunks");
    for payload in &parts {
        assert!(is_valid_jpeg(payload), "payload is not a well-formed JPEG");
    }

    camera.wait_for_releases(1).await;

    // Natural exhaustion must not take the server down
    let (head, body) = read_response(send_get(addr).await).await;
    assert!(head.starts_with("HTTP/1.1 200"));
    assert_eq!(split_parts(&body).len(), 3);
}

#[tokio::test]
async fn unavailable_device_closes_with_zero_chunks() {
    let camera = StubCamera::new();
    let addr = spawn_server(camera.factory(Some(0), None)).await;

    let (head, body) = read_response(send_get(addr).await).await;

    assert!(head.starts_with("HTTP/1.1 200"), "head: {}", head);
    assert!(body.is_empty(), "expected zero chunks, got {} bytes", body.len());

    camera.wait_for_releases(1).await;
}

#[tokio::test]
async fn client_disconnect_releases_source_and_keeps_serving() {
    let camera = StubCamera::new();
    // Endless source; only the disconnect ends the session
    let addr = spawn_server(camera.factory(None, Some(Duration::from_millis(5)))).await;

    let mut stream = send_get(addr).await;

    // Read until at least one full part went by, then hang up mid-stream
    let mut seen = Vec::new();
    let mut buf = [0u8; 1024];
    while !seen
        .windows(PART_HEADER.len())
        .any(|w| w == PART_HEADER)
    {
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("no stream data within timeout")
            .unwrap();
        assert!(n > 0, "stream ended before first chunk");
        seen.extend_from_slice(&buf[..n]);
    }
    drop(stream);

    // The session-scoped source is released exactly once, and the process
    // keeps serving other clients (no self-termination on disconnect).
    camera.wait_for_releases(1).await;
    assert_eq!(camera.releases(), 1);

    let mut probe = send_get(addr).await;
    let mut head = Vec::new();
    let mut buf = [0u8; 256];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = tokio::time::timeout(Duration::from_secs(5), probe.read(&mut buf))
            .await
            .expect("no response head within timeout")
            .unwrap();
        assert!(n > 0, "connection closed before response head");
        head.extend_from_slice(&buf[..n]);
    }
    assert!(head.starts_with(b"HTTP/1.1 200"));
    drop(probe);

    camera.wait_for_releases(2).await;
}

#[tokio::test]
async fn overlapping_requests_get_independent_sessions() {
    let camera = StubCamera::new();
    let addr = spawn_server(camera.factory(None, Some(Duration::from_millis(5)))).await;

    let mut first = send_get(addr).await;
    let mut second = send_get(addr).await;

    for stream in [&mut first, &mut second] {
        let mut seen = Vec::new();
        let mut buf = [0u8; 1024];
        while !seen
            .windows(PART_HEADER.len())
            .any(|w| w == PART_HEADER)
        {
            let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
                .await
                .expect("no stream data within timeout")
                .unwrap();
            assert!(n > 0, "stream ended before first chunk");
            seen.extend_from_slice(&buf[..n]);
        }
    }

    // Two live streams, two independent capture sessions
    assert_eq!(camera.opens(), 2);
    assert_eq!(camera.releases(), 0);

    drop(first);
    drop(second);
    camera.wait_for_releases(2).await;
}
