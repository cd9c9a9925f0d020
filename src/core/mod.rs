//! Core emulation-facing components.
//!
//! This module contains the guest-visible terminal model:
//!
//! - **palette**: 16-entry colour table and hex colour code resolution
//! - **term**: character grid, cursor, and the mutation-listener contract
//!
//! # Architecture
//!
//! ```text
//! Terminal
//! ├── Palette (16 RGB entries, code d → entry 15 - d)
//! ├── Lines (text + fg/bg colour code strings)
//! ├── Cursor (position + blink)
//! └── Listeners (diff callbacks, one per mutation kind)
//! ```

pub mod palette;
pub mod term;

pub use palette::{Palette, Rgb};
pub use term::{LineData, Snapshot, TermListener, Terminal};
