//! [`SerialChannel`] – `serialport`-backed [`ActuationChannel`].
//!
//! The port is opened with a read timeout; a read that times out before a
//! full line has arrived yields `""` (not ready) and keeps the partial bytes
//! for the next call, so a status line split across timeouts is never torn
//! in half.
//!
//! Before each command is written, any unread input is discarded so a late
//! acknowledgement for an earlier command cannot be mistaken for the reply
//! to the new one.

use std::io::{self, Read, Write};
use std::time::Duration;

use fieldbot_types::FieldError;
use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, info, warn};

use crate::actuation::ActuationChannel;

/// Serial connection to a microcontroller-based actuation controller.
pub struct SerialChannel {
    id: String,
    port: Box<dyn SerialPort>,
    lines: LineBuffer,
}

impl SerialChannel {
    /// Open `path` at `baud` with the given per-read `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Init`] if the device cannot be opened.
    pub fn open(path: &str, baud: u32, timeout: Duration) -> Result<Self, FieldError> {
        info!(device = path, baud, timeout_ms = timeout.as_millis() as u64, "opening serial controller");
        let port = serialport::new(path, baud)
            .timeout(timeout)
            .open()
            .map_err(|e| FieldError::Init {
                component: path.to_string(),
                details: e.to_string(),
            })?;
        Ok(Self {
            id: path.to_string(),
            port,
            lines: LineBuffer::default(),
        })
    }
}

impl ActuationChannel for SerialChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn write_command(&mut self, command: &str) -> Result<(), FieldError> {
        if !self.lines.is_empty() {
            warn!(device = %self.id, stale_bytes = self.lines.len(), "discarding unread controller output");
        }
        self.lines.clear();
        if let Err(e) = self.port.clear(ClearBuffer::Input) {
            debug!(device = %self.id, error = %e, "input buffer clear failed");
        }
        self.port
            .write_all(command.as_bytes())
            .and_then(|()| self.port.flush())
            .map_err(|e| classify_io(&self.id, e))
    }

    fn read_line(&mut self) -> Result<String, FieldError> {
        self.lines
            .read_line(&mut self.port)
            .map_err(|e| classify_io(&self.id, e))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Line framing
// ─────────────────────────────────────────────────────────────────────────────

/// Longest status line accepted before the buffered bytes are dropped.
const MAX_LINE: usize = 4096;

/// Accumulates bytes until a `\n` completes a line.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
    /// Prefix of `pending` already known to hold no `\n`.
    scanned: usize,
}

impl LineBuffer {
    fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn len(&self) -> usize {
        self.pending.len()
    }

    fn clear(&mut self) {
        self.pending.clear();
        self.scanned = 0;
    }

    /// Return the next complete line, or `""` once `reader` times out without
    /// completing one.
    ///
    /// More than [`MAX_LINE`] bytes without a terminator is an
    /// [`io::ErrorKind::InvalidData`] error and empties the buffer.
    fn read_line<R: Read + ?Sized>(&mut self, reader: &mut R) -> io::Result<String> {
        let mut chunk = [0u8; 256];
        loop {
            if let Some(at) = self.pending[self.scanned..].iter().position(|&b| b == b'\n') {
                let end = self.scanned + at;
                let line: Vec<u8> = self.pending.drain(..=end).collect();
                self.scanned = 0;
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }
            self.scanned = self.pending.len();
            if self.pending.len() > MAX_LINE {
                let dropped = self.pending.len();
                self.clear();
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("no line terminator within {dropped} bytes"),
                ));
            }
            match reader.read(&mut chunk) {
                Ok(0) => return Ok(String::new()),
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                    return Ok(String::new());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Map an I/O failure to the error taxonomy: a vanished device is fatal,
/// anything else only spoils the current exchange.
pub(crate) fn classify_io(component: &str, err: io::Error) -> FieldError {
    // EIO, ENXIO and ENODEV are what a yanked USB serial adapter reports.
    let device_gone = matches!(err.raw_os_error(), Some(5 | 6 | 19))
        || matches!(
            err.kind(),
            io::ErrorKind::BrokenPipe
                | io::ErrorKind::NotConnected
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::UnexpectedEof
                | io::ErrorKind::NotFound
        );
    if device_gone {
        FieldError::FatalChannel {
            component: component.to_string(),
            details: err.to_string(),
        }
    } else {
        FieldError::Controller {
            component: component.to_string(),
            details: err.to_string(),
        }
    }
}
