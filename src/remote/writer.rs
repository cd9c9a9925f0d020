//! Serialized outbound packet writing.
//!
//! All sessions share one outbound byte stream, so encode+write+flush must be
//! one atomic unit or two sessions' packets could interleave mid-line. A
//! single mutex around the stream is enough; packets are flushed immediately
//! because a remote viewer must see updates promptly.

use std::io::{self, Write};
use std::sync::Mutex;

use thiserror::Error;

use crate::proto::Packet;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Failed to write packet to outbound stream: {0}")]
    Io(#[source] io::Error),
}

/// The shared, mutually-exclusive writer for the outbound stream.
pub struct PacketWriter {
    stream: Mutex<Box<dyn Write + Send>>,
    prefix: String,
}

impl PacketWriter {
    pub fn new(stream: impl Write + Send + 'static) -> Self {
        Self::with_prefix(stream, "")
    }

    /// A writer that prepends `prefix` to every line, for transports where
    /// protocol records share the stream with other output.
    pub fn with_prefix(stream: impl Write + Send + 'static, prefix: impl Into<String>) -> Self {
        Self {
            stream: Mutex::new(Box::new(stream)),
            prefix: prefix.into(),
        }
    }

    /// A writer over the process's stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Encode and write one packet for the given session, flushing
    /// immediately. The whole operation holds the stream lock.
    pub fn send(&self, session: i32, packet: &Packet) -> Result<(), WriteError> {
        let line = format!("{}{}", self.prefix, packet.encode(session));
        let mut stream = self
            .stream
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        stream.write_all(line.as_bytes()).map_err(WriteError::Io)?;
        stream.flush().map_err(WriteError::Io)
    }
}
