//! Per-request stream session
//!
//! Each HTTP stream request owns one session: a blocking capture worker
//! that pulls frames from its `FrameSource`, encodes them to JPEG, and
//! pushes multipart chunks through a bounded channel to the response body.
//!
//! The worker owns the source, so the device is released exactly once on
//! every exit path: natural exhaustion, encode failure, cancellation, and
//! client disconnect all end the loop and drop the source.

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::mjpeg::mjpeg_part;
use crate::error::{AppError, Result};
use crate::video::frame::is_valid_jpeg;
use crate::video::{FrameSource, JpegEncoder, VideoFrame};

/// Channel capacity of 1: the previous chunk must be consumed by the HTTP
/// client before the next read starts. This is the backpressure point and
/// the second place disconnect is observed.
const CHANNEL_CAPACITY: usize = 1;

/// A running capture-to-chunk session
pub struct StreamSession;

impl StreamSession {
    /// Start the capture worker for one request.
    ///
    /// Returns the receiving end of the chunk channel; the stream ends when
    /// the worker exits and the channel closes. Cancelling the token stops
    /// the worker before its next blocking read.
    pub fn open(
        source: Box<dyn FrameSource>,
        jpeg_quality: u8,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<Bytes> {
        let (tx, rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);

        tokio::task::spawn_blocking(move || {
            pump_frames(source, jpeg_quality, cancel, tx);
        });

        rx
    }
}

/// Capture loop (runs on a blocking worker)
fn pump_frames(
    mut source: Box<dyn FrameSource>,
    jpeg_quality: u8,
    cancel: CancellationToken,
    tx: mpsc::Sender<Bytes>,
) {
    let mut encoder: Option<JpegEncoder> = None;
    let mut frames_sent = 0u64;

    loop {
        // Cancellation is observed before each blocking read; a read in
        // progress cannot be interrupted.
        if cancel.is_cancelled() || tx.is_closed() {
            debug!("Stream session cancelled");
            break;
        }

        let frame = match source.read() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("Capture source exhausted");
                break;
            }
            Err(e) => {
                error!("Capture read error: {}", e);
                break;
            }
        };

        let jpeg = match encode_frame(&mut encoder, &frame, jpeg_quality) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                error!("Frame encode failed: {}", e);
                break;
            }
        };

        // Never emit a payload that is not a complete JPEG
        if !is_valid_jpeg(&jpeg) {
            warn!("Dropping malformed JPEG frame ({} bytes)", jpeg.len());
            continue;
        }

        if tx.blocking_send(mjpeg_part(&jpeg)).is_err() {
            debug!("Client disconnected");
            break;
        }
        frames_sent += 1;
    }

    // Dropping the source here is the single release point
    info!(frames_sent, "Stream session closed");
}

fn encode_frame(
    encoder: &mut Option<JpegEncoder>,
    frame: &VideoFrame,
    jpeg_quality: u8,
) -> Result<Bytes> {
    if frame.format.is_compressed() {
        return Ok(frame.data_bytes());
    }

    // Raw source: create the encoder lazily from the first frame's geometry
    if encoder.is_none() {
        *encoder = Some(JpegEncoder::new(frame.resolution, jpeg_quality)?);
    }
    match encoder.as_mut() {
        Some(encoder) => encoder.encode_frame(frame),
        None => Err(AppError::Internal("JPEG encoder unavailable".to_string())),
    }
}
