//! In-process simulation drivers for CI and bench runs without hardware.
//!
//! [`SimController`] behaves like a controller board that needs a moment
//! before it can acknowledge: after every command it reports "not ready" for
//! a configurable number of reads and then replies with an acknowledgement
//! line.  Scripted lines can be queued ahead of that behavior for tests.
//!
//! [`SimCamera`] produces small synthetic greyscale frames and can be told to
//! fail from a given read onwards.
//!
//! Both drivers share their counters through cheap cloneable handles so a
//! test can keep observing a driver after handing it to the runtime.
//!
//! # Example
//!
//! ```rust
//! use fieldbot_hal::{ActuationChannel, SimController};
//!
//! let mut ctrl = SimController::new("sim-arduino").with_not_ready_reads(1);
//! let log = ctrl.log();
//! ctrl.write_command("'F'").unwrap();
//! assert_eq!(ctrl.read_line().unwrap(), "");
//! assert_eq!(ctrl.read_line().unwrap(), "{'ok': True}\n");
//! assert_eq!(log.snapshot().writes, vec!["'F'".to_string()]);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use fieldbot_types::FieldError;

use crate::actuation::ActuationChannel;
use crate::camera::{Camera, CameraFrame};

// ────────────────────────────────────────────────────────────────────────────
// Simulated controller
// ────────────────────────────────────────────────────────────────────────────

/// What a [`SimController`] has seen so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Every command written, in order.
    pub writes: Vec<String>,
    /// Number of `read_line` calls.
    pub reads: usize,
}

/// Shared view of a [`SimController`]'s traffic.
#[derive(Debug, Clone, Default)]
pub struct ChannelLog(Arc<Mutex<ChannelStats>>);

impl ChannelLog {
    pub fn snapshot(&self) -> ChannelStats {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, f: impl FnOnce(&mut ChannelStats)) {
        f(&mut self.0.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

/// Simulated actuation controller.
pub struct SimController {
    id: String,
    scripted: VecDeque<String>,
    not_ready_reads: usize,
    ack: String,
    remaining_not_ready: usize,
    awaiting_ack: bool,
    disconnected: bool,
    log: ChannelLog,
}

impl SimController {
    /// A controller that acknowledges every command with `{'ok': True}` after
    /// one "not ready" read.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            scripted: VecDeque::new(),
            not_ready_reads: 1,
            ack: "{'ok': True}\n".to_string(),
            remaining_not_ready: 0,
            awaiting_ack: false,
            disconnected: false,
            log: ChannelLog::default(),
        }
    }

    /// Lines returned verbatim by the next reads, before the automatic
    /// acknowledgement behavior applies.  Use `""` for "not ready".
    pub fn with_script<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scripted.extend(lines.into_iter().map(Into::into));
        self
    }

    pub fn with_not_ready_reads(mut self, reads: usize) -> Self {
        self.not_ready_reads = reads;
        self
    }

    pub fn with_ack(mut self, line: impl Into<String>) -> Self {
        self.ack = line.into();
        self
    }

    /// Every subsequent operation fails as if the cable had been pulled.
    pub fn disconnected(mut self) -> Self {
        self.disconnected = true;
        self
    }

    pub fn log(&self) -> ChannelLog {
        self.log.clone()
    }

    fn gone(&self) -> FieldError {
        FieldError::FatalChannel {
            component: self.id.clone(),
            details: "simulated disconnect".to_string(),
        }
    }
}

impl ActuationChannel for SimController {
    fn id(&self) -> &str {
        &self.id
    }

    fn write_command(&mut self, command: &str) -> Result<(), FieldError> {
        if self.disconnected {
            return Err(self.gone());
        }
        self.log.record(|s| s.writes.push(command.to_string()));
        self.awaiting_ack = true;
        self.remaining_not_ready = self.not_ready_reads;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, FieldError> {
        self.log.record(|s| s.reads += 1);
        if self.disconnected {
            return Err(self.gone());
        }
        if let Some(line) = self.scripted.pop_front() {
            return Ok(line);
        }
        if !self.awaiting_ack {
            return Ok(String::new());
        }
        if self.remaining_not_ready > 0 {
            self.remaining_not_ready -= 1;
            return Ok(String::new());
        }
        self.awaiting_ack = false;
        Ok(self.ack.clone())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated camera
// ────────────────────────────────────────────────────────────────────────────

/// Simulated camera returning 4×4 greyscale frames whose pixels all hold the
/// low byte of the read counter.
pub struct SimCamera {
    id: String,
    fail_from: Option<u64>,
    reads: Arc<AtomicU64>,
}

impl SimCamera {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fail_from: None,
            reads: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Reads number `read` (1-based) and later fail with a capture error.
    pub fn failing_from(mut self, read: u64) -> Self {
        self.fail_from = Some(read);
        self
    }

    /// Shared counter of `read_frame` calls.
    pub fn read_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.reads)
    }
}

impl Camera for SimCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn read_frame(&mut self) -> Result<CameraFrame, FieldError> {
        let n = self.reads.fetch_add(1, Ordering::Relaxed) + 1;
        if self.fail_from.is_some_and(|from| n >= from) {
            return Err(FieldError::Capture {
                component: self.id.clone(),
                details: "simulated end of stream".to_string(),
            });
        }
        Ok(CameraFrame {
            width: 4,
            height: 4,
            data: vec![n as u8; 16],
            sequence: n,
            captured_at: Utc::now(),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
