//! Wire protocol: packet codec and event argument parsing.
//!
//! - **packet**: the outbound `Packet` enum, line encoding, and inbound line
//!   decoding (`CODE:ID;PAYLOAD` framing)
//! - **event**: the quote-aware argument parser for inbound `EV` payloads
//!
//! Both halves are pure: no I/O, no state. The I/O side lives in
//! [`crate::remote`].

pub mod event;
pub mod packet;

pub use event::{parse_event, Event, Value};
pub use packet::{decode_line, Packet, RawCommand};
