//! JPEG encoder for raw capture formats
//!
//! Compressed (MJPEG/JPEG) frames pass through untouched. Raw frames are
//! converted to I420 and handed to turbojpeg, except packed RGB/BGR and
//! grayscale which turbojpeg compresses directly.
//!
//! Note: the encoder is not thread-safe; each stream session owns its own.

use bytes::Bytes;

use super::format::{PixelFormat, Resolution};
use super::frame::VideoFrame;
use crate::error::{AppError, Result};

/// JPEG encoder using turbojpeg
pub struct JpegEncoder {
    resolution: Resolution,
    compressor: turbojpeg::Compressor,
    /// I420 buffer for YUV encoding (Y + U + V planes)
    i420_buffer: Vec<u8>,
}

impl JpegEncoder {
    /// Create a new JPEG encoder for the given frame geometry
    pub fn new(resolution: Resolution, quality: u8) -> Result<Self> {
        let mut compressor = turbojpeg::Compressor::new().map_err(|e| {
            AppError::EncodeError(format!("Failed to create turbojpeg compressor: {}", e))
        })?;

        compressor
            .set_quality(quality.min(100) as i32)
            .map_err(|e| AppError::EncodeError(format!("Failed to set JPEG quality: {}", e)))?;
        compressor
            .set_subsamp(turbojpeg::Subsamp::Sub2x2)
            .map_err(|e| AppError::EncodeError(format!("Failed to set subsampling: {}", e)))?;

        Ok(Self {
            resolution,
            compressor,
            i420_buffer: vec![0u8; i420_size(resolution)],
        })
    }

    /// Encode a frame to JPEG bytes.
    ///
    /// Compressed input is passed through as-is; the caller validates the
    /// payload before emitting it.
    pub fn encode_frame(&mut self, frame: &VideoFrame) -> Result<Bytes> {
        if frame.format.is_compressed() {
            return Ok(frame.data_bytes());
        }

        if frame.resolution != self.resolution {
            self.resolution = frame.resolution;
            self.i420_buffer.resize(i420_size(frame.resolution), 0);
        }

        match frame.format {
            PixelFormat::Yuyv => self.encode_yuyv(frame.data()),
            PixelFormat::Rgb24 => self.encode_packed(frame.data(), turbojpeg::PixelFormat::RGB),
            PixelFormat::Bgr24 => self.encode_packed(frame.data(), turbojpeg::PixelFormat::BGR),
            PixelFormat::Grey => self.encode_packed(frame.data(), turbojpeg::PixelFormat::GRAY),
            format => Err(AppError::EncodeError(format!(
                "Unsupported input format for JPEG: {}",
                format
            ))),
        }
    }

    /// Encode a YUYV (YUV 4:2:2 packed) frame
    fn encode_yuyv(&mut self, data: &[u8]) -> Result<Bytes> {
        let width = self.resolution.width as usize;
        let height = self.resolution.height as usize;
        let expected = width * height * 2;

        if data.len() < expected {
            return Err(AppError::EncodeError(format!(
                "YUYV data too small: {} < {}",
                data.len(),
                expected
            )));
        }
        if width % 2 != 0 || height % 2 != 0 {
            return Err(AppError::EncodeError(format!(
                "YUYV requires even dimensions, got {}",
                self.resolution
            )));
        }

        yuyv_to_i420(data, &mut self.i420_buffer, width, height);

        let yuv_image = turbojpeg::YuvImage {
            pixels: self.i420_buffer.as_slice(),
            width,
            height,
            align: 1,
            subsamp: turbojpeg::Subsamp::Sub2x2,
        };

        let jpeg = self
            .compressor
            .compress_yuv_to_vec(yuv_image)
            .map_err(|e| AppError::EncodeError(format!("JPEG compression failed: {}", e)))?;

        Ok(Bytes::from(jpeg))
    }

    /// Encode a packed RGB/BGR/grayscale frame
    fn encode_packed(&mut self, data: &[u8], format: turbojpeg::PixelFormat) -> Result<Bytes> {
        let width = self.resolution.width as usize;
        let height = self.resolution.height as usize;
        let pitch = width * format.size();
        let expected = pitch * height;

        if data.len() < expected {
            return Err(AppError::EncodeError(format!(
                "Pixel data too small: {} < {}",
                data.len(),
                expected
            )));
        }

        let image = turbojpeg::Image {
            pixels: &data[..expected],
            width,
            pitch,
            height,
            format,
        };

        let jpeg = self
            .compressor
            .compress_to_vec(image)
            .map_err(|e| AppError::EncodeError(format!("JPEG compression failed: {}", e)))?;

        Ok(Bytes::from(jpeg))
    }
}

fn i420_size(resolution: Resolution) -> usize {
    resolution.pixels() as usize * 3 / 2
}

/// Convert packed YUYV 4:2:2 to planar I420, dropping chroma on odd rows.
fn yuyv_to_i420(src: &[u8], dst: &mut [u8], width: usize, height: usize) {
    let (y_plane, uv) = dst.split_at_mut(width * height);
    let (u_plane, v_plane) = uv.split_at_mut(width * height / 4);

    for row in 0..height {
        for col in (0..width).step_by(2) {
            let i = (row * width + col) * 2;
            let y0 = src[i];
            let u = src[i + 1];
            let y1 = src[i + 2];
            let v = src[i + 3];

            y_plane[row * width + col] = y0;
            y_plane[row * width + col + 1] = y1;

            if row % 2 == 0 {
                let ci = (row / 2) * (width / 2) + col / 2;
                u_plane[ci] = u;
                v_plane[ci] = v;
            }
        }
    }
}
