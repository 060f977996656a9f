//! V4L2 capture source
//!
//! Pull-based frame acquisition: open a device by index, read one frame at
//! a time, release on drop. Reads are blocking and have no timeout, so they
//! belong on a blocking worker, never on the async scheduler.

use bytes::Bytes;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;

use super::format::{PixelFormat, Resolution};
use super::frame::VideoFrame;
use crate::error::{AppError, Result};

/// Number of memory-mapped capture buffers
const BUFFER_COUNT: u32 = 4;
/// Minimum valid frame size (bytes)
const MIN_FRAME_SIZE: usize = 128;

/// Capture configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Device index (/dev/video<N>)
    pub device_index: usize,
    /// Desired resolution
    pub resolution: Resolution,
    /// Desired frame rate (0 = driver default)
    pub fps: u32,
    /// JPEG quality (1-100) used when re-encoding raw frames
    pub jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            resolution: Resolution::VGA,
            fps: 30,
            jpeg_quality: 80,
        }
    }
}

/// Pull-based frame source
///
/// `read` blocks until the next frame is available. `Ok(None)` is the
/// end-of-stream signal; callers must not retry after seeing it. Whatever
/// the source holds open is released when it is dropped, which happens
/// exactly once per session.
pub trait FrameSource: Send {
    fn read(&mut self) -> Result<Option<VideoFrame>>;
}

/// Webcam capture source backed by V4L2 memory-mapped streaming I/O.
///
/// The stream keeps the device handle alive through its arena, so the
/// `Device` itself does not need to outlive `open_device`.
pub struct CameraSource {
    config: CaptureConfig,
    stream: Option<MmapStream<'static>>,
    format: PixelFormat,
    resolution: Resolution,
    sequence: u64,
}

impl CameraSource {
    /// Open the capture device at the configured index.
    ///
    /// A missing or unopenable device is not an error here: the returned
    /// source reports end-of-stream on its first read, so the only failure
    /// path callers handle is the read path.
    pub fn open(config: CaptureConfig) -> Self {
        let (stream, format, resolution) = match Self::open_device(&config) {
            Ok((stream, format, resolution)) => {
                info!(
                    "Opened /dev/video{} at {} {}",
                    config.device_index, resolution, format
                );
                (Some(stream), format, resolution)
            }
            Err(e) => {
                warn!("Failed to open /dev/video{}: {}", config.device_index, e);
                (None, PixelFormat::Mjpeg, config.resolution)
            }
        };

        Self {
            config,
            stream,
            format,
            resolution,
            sequence: 0,
        }
    }

    /// Whether a device is actually open behind this source
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn open_device(
        config: &CaptureConfig,
    ) -> Result<(MmapStream<'static>, PixelFormat, Resolution)> {
        let device = v4l::Device::new(config.device_index).map_err(|e| {
            AppError::VideoError(format!(
                "Failed to open /dev/video{}: {}",
                config.device_index, e
            ))
        })?;

        let (format, resolution) = Self::negotiate_format(&device, config)?;

        if config.fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(config.fps);
            if let Err(e) = device.set_params(&params) {
                warn!(
                    "Failed to set {} fps on /dev/video{}: {}",
                    config.fps, config.device_index, e
                );
            }
        }

        let stream = MmapStream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| {
                AppError::VideoError(format!("Failed to start capture stream: {}", e))
            })?;

        Ok((stream, format, resolution))
    }

    /// Negotiate a pixel format with the driver, most preferred first.
    /// The driver has the last word; whatever it reports back is what the
    /// produced frames are tagged with.
    fn negotiate_format(
        device: &v4l::Device,
        config: &CaptureConfig,
    ) -> Result<(PixelFormat, Resolution)> {
        for wanted in PixelFormat::capture_preference() {
            let mut fmt = device
                .format()
                .map_err(|e| AppError::VideoError(format!("Failed to read format: {}", e)))?;
            fmt.width = config.resolution.width;
            fmt.height = config.resolution.height;
            fmt.fourcc = wanted.to_fourcc();

            let actual = match device.set_format(&fmt) {
                Ok(actual) => actual,
                Err(e) => {
                    debug!("set_format {} rejected: {}", wanted, e);
                    continue;
                }
            };

            if PixelFormat::from_fourcc(actual.fourcc) == Some(*wanted) {
                let resolution = Resolution::new(actual.width, actual.height);
                if resolution != config.resolution {
                    warn!("Requested {}, driver gave {}", config.resolution, resolution);
                }
                return Ok((*wanted, resolution));
            }
        }

        // None of the preferred formats stuck; take what the driver has
        // if we can express it at all.
        let fmt = device
            .format()
            .map_err(|e| AppError::VideoError(format!("Failed to read format: {}", e)))?;
        match PixelFormat::from_fourcc(fmt.fourcc) {
            Some(format) => Ok((format, Resolution::new(fmt.width, fmt.height))),
            None => Err(AppError::VideoError(format!(
                "Device reports unsupported pixel format {}",
                fmt.fourcc
            ))),
        }
    }
}

impl FrameSource for CameraSource {
    fn read(&mut self) -> Result<Option<VideoFrame>> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };

        loop {
            // Copy out of the mmap buffer before it is requeued
            let result = stream.next().map(|(buf, meta)| {
                let len = match meta.bytesused as usize {
                    0 => buf.len(),
                    used => used.min(buf.len()),
                };
                buf[..len].to_vec()
            });

            let data = match result {
                Ok(data) => data,
                Err(e) => {
                    // A failed read ends the stream; there is no retry policy.
                    warn!(
                        "Capture read failed on /dev/video{}: {}",
                        self.config.device_index, e
                    );
                    return Ok(None);
                }
            };

            if data.len() < MIN_FRAME_SIZE {
                debug!("Dropping short frame: {} bytes", data.len());
                continue;
            }

            self.sequence += 1;
            return Ok(Some(VideoFrame::new(
                Bytes::from(data),
                self.resolution,
                self.format,
                self.sequence,
            )));
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if self.stream.take().is_some() {
            info!(
                "Released /dev/video{} after {} frames",
                self.config.device_index, self.sequence
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_device_opens_silently() {
        // An index no machine has; open must not fail, reads must end
        // the stream immediately.
        let config = CaptureConfig {
            device_index: 4095,
            ..Default::default()
        };
        let mut source = CameraSource::open(config);
        assert!(!source.is_open());
        assert!(source.read().unwrap().is_none());
        assert!(source.read().unwrap().is_none());
    }
}
