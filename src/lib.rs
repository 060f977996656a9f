//! camserve - webcam MJPEG streaming server
//!
//! Serves a live V4L2 webcam feed over HTTP as a
//! `multipart/x-mixed-replace` MJPEG stream. Each request owns its capture
//! session; the device is acquired on stream start and released on every
//! exit path.

pub mod error;
pub mod state;
pub mod stream;
pub mod video;
pub mod web;

pub use error::{AppError, Result};
