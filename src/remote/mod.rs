//! Remote transport: the I/O half of the protocol.
//!
//! One process hosts exactly one inbound reader and one outbound writer,
//! shared across all sessions (the single-stdio-pair transport model):
//!
//! ```text
//! Terminal ──mutations──▶ RemoteBridge ──Packet──▶ PacketWriter ──▶ stream
//! stream ──▶ InputRouter ──InputCommand──▶ SessionQueue ──tick──▶ Guest
//! ```
//!
//! - **writer**: serialized, immediately-flushed line output
//! - **router**: background reader thread plus the lazy session registry
//! - **bridge**: per-session observer, visibility/resync, tick-time drain

pub mod bridge;
pub mod router;
pub mod writer;

pub use bridge::{Guest, RemoteBridge};
pub use router::{ControlAction, InputCommand, InputRouter, SessionQueue};
pub use writer::{PacketWriter, WriteError};
