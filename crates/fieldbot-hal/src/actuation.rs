//! Generic `ActuationChannel` trait for line-oriented actuation controllers.
//!
//! The controller protocol is half-duplex text: the host writes one encoded
//! command, the controller eventually answers with one newline-terminated
//! status line.  Drivers implement this trait; the command executor in
//! `fieldbot-runtime` owns the retry policy on top of it.

use fieldbot_types::FieldError;

/// A byte-stream connection to an actuation controller (Arduino, motor
/// driver board, …).
pub trait ActuationChannel: Send {
    /// Stable identifier for this channel, e.g. the device path
    /// `"/dev/ttyACM0"`.
    fn id(&self) -> &str;

    /// Write one encoded command to the controller.  No terminator is added.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Controller`] for a transient write failure, or
    /// [`FieldError::FatalChannel`] when the connection itself is gone.
    fn write_command(&mut self, command: &str) -> Result<(), FieldError>;

    /// Read one status line, including its terminator.
    ///
    /// Returns an empty string when the controller has not produced a
    /// complete line within the driver's read timeout.  That is the
    /// "not ready yet" signal, not an error.
    ///
    /// # Errors
    ///
    /// Same classification as [`write_command`][Self::write_command].
    fn read_line(&mut self) -> Result<String, FieldError>;
}

impl<A: ActuationChannel + ?Sized> ActuationChannel for Box<A> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn write_command(&mut self, command: &str) -> Result<(), FieldError> {
        (**self).write_command(command)
    }

    fn read_line(&mut self) -> Result<String, FieldError> {
        (**self).read_line()
    }
}
