//! Generic `Camera` trait and the stale-frame-draining [`CaptureDevice`].

use chrono::{DateTime, Utc};
use fieldbot_types::FieldError;
use tracing::debug;

/// A raw image frame returned by a camera driver.  The pixel buffer is opaque
/// to the control loop.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Raw pixel data (e.g. BGR24 or greyscale).
    pub data: Vec<u8>,
    /// Per-device read counter, starting at 1.
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
}

/// A camera or image-capture device.
pub trait Camera: Send {
    /// Stable identifier for this camera, e.g. `"cam0"`.
    fn id(&self) -> &str;

    /// Read the next frame from the device's buffer.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Capture`] if the device cannot produce a frame
    /// (disconnected, end of stream, …).
    fn read_frame(&mut self) -> Result<CameraFrame, FieldError>;
}

/// Wraps a [`Camera`] and hands out frames that are not stale.
///
/// Video devices queue frames internally, so the first read after an idle
/// period returns an image that may be seconds old.  [`capture_frame`]
/// discards a fixed number of buffered frames first.
///
/// [`capture_frame`]: CaptureDevice::capture_frame
pub struct CaptureDevice {
    camera: Box<dyn Camera>,
}

impl CaptureDevice {
    pub fn new(camera: Box<dyn Camera>) -> Self {
        Self { camera }
    }

    pub fn id(&self) -> &str {
        self.camera.id()
    }

    /// Discard `flush_count` frames and return the one read after them.
    ///
    /// Exactly `flush_count + 1` reads are issued unless one fails, in which
    /// case no further reads happen.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Capture`] naming the failing read, or without
    /// reading at all when `flush_count + 1` does not fit in a `usize`.
    pub fn capture_frame(&mut self, flush_count: usize) -> Result<CameraFrame, FieldError> {
        let total = flush_count.checked_add(1).ok_or_else(|| FieldError::Capture {
            component: self.camera.id().to_string(),
            details: format!("flush count {flush_count} is out of range"),
        })?;
        debug!(camera = self.camera.id(), flush_count, "capturing image");
        let mut frame = self.read(1, total)?;
        for n in 2..=total {
            frame = self.read(n, total)?;
        }
        Ok(frame)
    }

    fn read(&mut self, n: usize, total: usize) -> Result<CameraFrame, FieldError> {
        self.camera.read_frame().map_err(|e| FieldError::Capture {
            component: self.camera.id().to_string(),
            details: format!("read {n} of {total} failed: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockCamera {
        id: String,
        reads: u64,
        fail_on: Option<u64>,
    }

    impl Camera for MockCamera {
        fn id(&self) -> &str {
            &self.id
        }

        fn read_frame(&mut self) -> Result<CameraFrame, FieldError> {
            self.reads += 1;
            if self.fail_on == Some(self.reads) {
                return Err(FieldError::Capture {
                    component: self.id.clone(),
                    details: "no frame".to_string(),
                });
            }
            Ok(CameraFrame {
                width: 2,
                height: 2,
                data: vec![0u8; 2 * 2 * 3], // 2×2 BGR24
                sequence: self.reads,
                captured_at: Utc::now(),
            })
        }
    }

    fn device(fail_on: Option<u64>) -> CaptureDevice {
        CaptureDevice::new(Box::new(MockCamera {
            id: "cam0".to_string(),
            reads: 0,
            fail_on,
        }))
    }

    #[test]
    fn flush_thirty_returns_thirty_first_frame() {
        let mut dev = device(None);
        let frame = dev.capture_frame(30).unwrap();
        assert_eq!(frame.sequence, 31);
        assert_eq!(frame.data.len(), 12);
    }

    #[test]
    fn zero_flush_reads_once() {
        let mut dev = device(None);
        assert_eq!(dev.capture_frame(0).unwrap().sequence, 1);
        assert_eq!(dev.capture_frame(0).unwrap().sequence, 2);
    }

    #[test]
    fn failure_mid_flush_is_capture_error() {
        let mut dev = device(Some(12));
        let err = dev.capture_frame(30).unwrap_err();
        match err {
            FieldError::Capture { component, details } => {
                assert_eq!(component, "cam0");
                assert!(details.contains("read 12 of 31"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn oversized_flush_count_fails_before_reading() {
        let mut dev = device(None);
        assert!(matches!(
            dev.capture_frame(usize::MAX),
            Err(FieldError::Capture { .. })
        ));
        assert_eq!(dev.capture_frame(0).unwrap().sequence, 1);
    }

    #[test]
    fn failure_on_final_read_is_capture_error() {
        let mut dev = device(Some(31));
        assert!(matches!(dev.capture_frame(30), Err(FieldError::Capture { .. })));
    }
}
