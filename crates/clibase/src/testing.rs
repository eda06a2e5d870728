//! Test utilities for the clibase crate
//!
//! Reusable doubles for unit and integration tests: an in-memory log sink
//! and writers that fail in controlled ways.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// In-memory writer for capturing formatted log output.
///
/// Clones share the same buffer, so hand one clone to
/// [`Logging::subscriber`](crate::Logging::subscriber) and read the other.
#[derive(Clone, Default)]
pub struct CaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CaptureWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}

impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CaptureWriter {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Writer that accepts `capacity` bytes, then fails every write with
/// `BrokenPipe`, like a pipe whose reader went away.
pub struct ClosedPipe {
    capacity: usize,
    pub written: Vec<u8>,
    pub attempts: usize,
}

impl ClosedPipe {
    pub fn after(capacity: usize) -> Self {
        Self {
            capacity,
            written: Vec::new(),
            attempts: 0,
        }
    }
}

impl Write for ClosedPipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.attempts += 1;
        let room = self.capacity.saturating_sub(self.written.len());
        if room == 0 {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        let n = room.min(buf.len());
        self.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.written.len() >= self.capacity {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        Ok(())
    }
}
