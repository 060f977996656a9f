//! HTTP video streaming
//!
//! # Components
//!
//! - `StreamSession` - per-request capture-to-chunk worker
//! - `mjpeg` - multipart framing constants and helpers

pub mod mjpeg;
pub mod session;

pub use mjpeg::{mjpeg_part, BOUNDARY, CONTENT_TYPE, PART_HEADER};
pub use session::StreamSession;
