//! `fieldbot-hal` – hardware abstraction for the field robot.
//!
//! The runtime never talks to a serial port or a video device directly; it
//! talks to the traits in this crate:
//!
//! - [`actuation`] – [`ActuationChannel`][actuation::ActuationChannel]: one
//!   byte-stream connection to the actuation controller (write a command,
//!   read a status line).
//! - [`serial`] – [`SerialChannel`][serial::SerialChannel]: the
//!   `serialport`-backed driver for microcontroller boards.
//! - [`camera`] – [`Camera`][camera::Camera] and
//!   [`CaptureDevice`][camera::CaptureDevice], which drains stale buffered
//!   frames before handing out a current one.
//! - `opencv_camera` – `OpenCvCamera`, a V4L/UVC camera driver (requires the
//!   `opencv` cargo feature and system OpenCV libraries).
//! - [`sim`] – in-process controller and camera stand-ins for CI and
//!   bench runs without hardware.

pub mod actuation;
pub mod camera;
#[cfg(feature = "opencv")]
pub mod opencv_camera;
pub mod serial;
pub mod sim;

pub use actuation::ActuationChannel;
pub use camera::{Camera, CameraFrame, CaptureDevice};
#[cfg(feature = "opencv")]
pub use opencv_camera::OpenCvCamera;
pub use serial::SerialChannel;
pub use sim::{ChannelLog, ChannelStats, SimCamera, SimController};
