//! OpenCV-backed [`Camera`] for V4L/UVC devices.
//!
//! Only built with the `opencv` cargo feature, which needs the system OpenCV
//! development libraries.

use chrono::Utc;
use fieldbot_types::FieldError;
use opencv::{
    core::{Mat, MatTraitConst, MatTraitConstManual},
    videoio::{self, VideoCapture, VideoCaptureTrait, VideoCaptureTraitConst},
};
use tracing::info;

use crate::camera::{Camera, CameraFrame};

/// A camera opened by device index (`/dev/video<N>` on Linux).
pub struct OpenCvCamera {
    id: String,
    capture: VideoCapture,
    mat: Mat,
    reads: u64,
}

impl OpenCvCamera {
    /// Open camera `index` with whichever backend OpenCV picks.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Init`] if the device cannot be opened.
    pub fn open(index: i32) -> Result<Self, FieldError> {
        let id = format!("cam{index}");
        info!(camera = %id, "initializing camera");
        let init_err = |details: String| FieldError::Init {
            component: format!("cam{index}"),
            details,
        };
        let capture =
            VideoCapture::new(index, videoio::CAP_ANY).map_err(|e| init_err(e.to_string()))?;
        if !capture.is_opened().map_err(|e| init_err(e.to_string()))? {
            return Err(init_err("device did not open".to_string()));
        }
        Ok(Self {
            id,
            capture,
            mat: Mat::default(),
            reads: 0,
        })
    }

    fn capture_err(&self, details: impl Into<String>) -> FieldError {
        FieldError::Capture {
            component: self.id.clone(),
            details: details.into(),
        }
    }
}

impl Camera for OpenCvCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn read_frame(&mut self) -> Result<CameraFrame, FieldError> {
        let grabbed = self
            .capture
            .read(&mut self.mat)
            .map_err(|e| self.capture_err(e.to_string()))?;
        if !grabbed || self.mat.empty() {
            return Err(self.capture_err("device returned no frame"));
        }
        let data = self
            .mat
            .data_bytes()
            .map_err(|e| self.capture_err(e.to_string()))?
            .to_vec();
        self.reads += 1;
        Ok(CameraFrame {
            width: self.mat.cols().max(0) as u32,
            height: self.mat.rows().max(0) as u32,
            data,
            sequence: self.reads,
            captured_at: Utc::now(),
        })
    }
}
