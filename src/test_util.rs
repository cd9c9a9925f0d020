//! Shared test fixtures.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// A cloneable in-memory sink that captures everything written to it, used
/// as the outbound stream in tests.
#[derive(Clone, Default)]
pub struct CaptureStream {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl CaptureStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// The captured output split into lines.
    pub fn lines(&self) -> Vec<String> {
        let buf = self.buf.lock().unwrap();
        String::from_utf8_lossy(&buf)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Write for CaptureStream {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
