use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::video::{CameraSource, CaptureConfig, FrameSource};

/// Factory producing a fresh capture source per stream request.
///
/// Each request acquires its own source; nothing about capture is shared
/// between streams, and release is scoped to the request's session.
pub type SourceFactory = Arc<dyn Fn() -> Box<dyn FrameSource> + Send + Sync>;

/// Application-wide state shared across handlers
pub struct AppState {
    /// Capture configuration (device index, geometry, quality)
    pub capture: CaptureConfig,
    /// Capture source factory
    sources: SourceFactory,
    /// Root cancellation token; child tokens scope each stream session
    shutdown: CancellationToken,
}

impl AppState {
    /// Create state backed by real V4L2 camera sources
    pub fn new(capture: CaptureConfig, shutdown: CancellationToken) -> Arc<Self> {
        let source_config = capture.clone();
        let sources: SourceFactory =
            Arc::new(move || Box::new(CameraSource::open(source_config.clone())));
        Self::with_source_factory(capture, sources, shutdown)
    }

    /// Create state with a custom source factory (used by tests to stub
    /// the camera)
    pub fn with_source_factory(
        capture: CaptureConfig,
        sources: SourceFactory,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            capture,
            sources,
            shutdown,
        })
    }

    /// Acquire a fresh capture source for one stream request
    pub fn open_source(&self) -> Box<dyn FrameSource> {
        (self.sources)()
    }

    /// Child token scoping one stream session; cancelled by shutdown
    pub fn session_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}
