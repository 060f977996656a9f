//! Video capture and encoding
//!
//! # Components
//!
//! - `CameraSource` - V4L2 pull-based capture source
//! - `JpegEncoder` - JPEG encoding for raw capture formats
//! - `VideoFrame` - transient frame container

pub mod capture;
pub mod encoder;
pub mod format;
pub mod frame;

pub use capture::{CameraSource, CaptureConfig, FrameSource};
pub use encoder::JpegEncoder;
pub use format::{PixelFormat, Resolution};
pub use frame::VideoFrame;
