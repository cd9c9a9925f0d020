//! tror - a remote terminal protocol host for sandboxed computer emulators.
//!
//! TRoR ("Terminal-over-Remote") lets a detached display process render an
//! emulated computer's 16-colour character terminal and inject input events
//! over two plain byte streams. Each record is one UTF-8 line,
//! `CODE:ID;PAYLOAD`, multiplexing any number of sessions over a single
//! stream pair.
//!
//! # Architecture
//!
//! ```text
//! core::Terminal ──mutations──▶ remote::RemoteBridge
//!                                   │ proto::Packet
//!                                   ▼
//!                               remote::PacketWriter ──▶ outbound stream
//!
//! inbound stream ──▶ remote::InputRouter ──▶ per-session queue
//!                                   │ tick
//!                                   ▼
//!                               remote::Guest (the emulated computer)
//! ```
//!
//! - [`proto`] is the pure codec: packet framing and event argument parsing
//! - [`core`] is the observable terminal state a guest computer mutates
//! - [`remote`] is the transport: shared writer, reader thread, per-session
//!   bridge with visibility-driven full resync
//!
//! Outbound packets for one session arrive at the viewer in production
//! order; a viewer that attaches late is brought up to date with one
//! full-state resync rather than a replay of history.

pub mod config;
pub mod core;
pub mod proto;
pub mod remote;

#[cfg(test)]
pub(crate) mod test_util;
