//! MJPEG multipart framing
//!
//! One part per frame on the wire:
//!
//! ```text
//! --frame\r\n
//! Content-Type: image/jpeg\r\n
//! \r\n
//! <JPEG bytes>\r\n
//! ```

use bytes::{BufMut, Bytes, BytesMut};

/// Multipart boundary token
pub const BOUNDARY: &str = "frame";

/// Content-Type of the streaming response
pub const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Boundary marker and part header preceding every JPEG payload
pub const PART_HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";

/// Build one multipart chunk around a JPEG payload
pub fn mjpeg_part(jpeg: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(PART_HEADER.len() + jpeg.len() + 2);
    buf.put_slice(PART_HEADER);
    buf.put_slice(jpeg);
    buf.put_slice(b"\r\n");
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_layout() {
        let jpeg = [0xFFu8, 0xD8, 0x00, 0xFF, 0xD9];
        let part = mjpeg_part(&jpeg);

        assert!(part.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));
        assert!(part.ends_with(b"\r\n"));

        let payload = &part[PART_HEADER.len()..part.len() - 2];
        assert_eq!(payload, jpeg);
    }

    #[test]
    fn test_content_type_names_boundary() {
        assert!(CONTENT_TYPE.contains(BOUNDARY));
        assert_eq!(CONTENT_TYPE, "multipart/x-mixed-replace; boundary=frame");
    }
}
