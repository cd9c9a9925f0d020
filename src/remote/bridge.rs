//! The per-session terminal bridge.
//!
//! A [`RemoteBridge`] connects one emulated computer's terminal to the shared
//! wire: it observes terminal mutations (as a [`TermListener`]) and turns each
//! into an outbound packet, drains the session's inbound queue once per tick,
//! and owns the viewer visibility state machine.
//!
//! While the session is hidden, mutation packets are dropped rather than
//! queued; the full-state resync sent on the next hidden-to-visible
//! transition makes replaying history unnecessary. A bridge starts hidden and
//! every show performs the resync, so a viewer that attaches at any point
//! reconstructs exact state without needing any history.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::core::palette::Rgb;
use crate::core::term::{LineData, Snapshot, TermListener, Terminal};
use crate::proto::{Packet, Value};

use super::router::{ControlAction, InputCommand, InputRouter, SessionQueue};
use super::writer::PacketWriter;

/// The guest-input sink a bridge applies drained commands to.
///
/// Implemented by whatever hosts the emulated computer; the bridge forwards
/// remote events and the shutdown/reboot control actions through it. The
/// `close` action never touches the guest; it only fires the bridge's
/// closed listeners.
pub trait Guest {
    fn queue_event(&mut self, name: &str, args: &[Value]);
    fn shutdown(&mut self);
    fn reboot(&mut self);
}

type ClosedListener = Box<dyn Fn() + Send + Sync>;

struct Shared {
    session: i32,
    writer: Arc<PacketWriter>,
    visible: AtomicBool,
    // Cleared by dispose or a fatal write error; no packets leave afterwards
    alive: AtomicBool,
    announced: AtomicBool,
    capabilities: Vec<String>,
    closed_listeners: Mutex<Vec<ClosedListener>>,
}

impl Shared {
    fn send(&self, packet: Packet) {
        if !self.alive.load(Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.writer.send(self.session, &packet) {
            // The remote endpoint is presumed gone; tear the session down
            warn!(session = self.session, "outbound write failed: {e}");
            if self.alive.swap(false, Ordering::SeqCst) {
                self.notify_closed();
            }
        }
    }

    fn send_if_visible(&self, packet: Packet) {
        if self.visible.load(Ordering::SeqCst) {
            self.send(packet);
        }
    }

    fn notify_closed(&self) {
        let listeners = self
            .closed_listeners
            .lock()
            .unwrap_or_else(|p| p.into_inner());
        for listener in listeners.iter() {
            listener();
        }
    }
}

// Every mutation maps 1:1 onto its wire packet, gated on visibility.
impl TermListener for Shared {
    fn resize(&self, width: u16, height: u16) {
        self.send_if_visible(Packet::Resize(width, height));
    }

    fn set_cursor_pos(&self, x: i32, y: i32) {
        self.send_if_visible(Packet::CursorPos(x, y));
    }

    fn set_cursor_blink(&self, blink: bool) {
        self.send_if_visible(Packet::CursorBlink(blink));
    }

    fn set_text_colour(&self, code: char) {
        self.send_if_visible(Packet::TextColour(code));
    }

    fn set_background_colour(&self, code: char) {
        self.send_if_visible(Packet::BackgroundColour(code));
    }

    fn write(&self, text: &str) {
        self.send_if_visible(Packet::Write(text.to_string()));
    }

    fn blit_line(&self, text: &str, fg: &str, bg: &str) {
        self.send_if_visible(Packet::BlitLine(LineData::new(text, fg, bg)));
    }

    fn scroll(&self, lines: i32) {
        self.send_if_visible(Packet::Scroll(lines));
    }

    fn clear(&self) {
        self.send_if_visible(Packet::Clear);
    }

    fn clear_line(&self) {
        self.send_if_visible(Packet::ClearLine);
    }

    fn palette_changed(&self, index: usize, colour: Rgb) {
        self.send_if_visible(Packet::PaletteEntry(index, colour));
    }
}

/// One emulated computer's protocol channel.
pub struct RemoteBridge {
    shared: Arc<Shared>,
    queue: Arc<SessionQueue>,
}

impl RemoteBridge {
    /// Create a bridge for the given session over the shared writer and
    /// router. The bridge starts hidden; call [`set_visible`] to attach a
    /// viewer.
    ///
    /// [`set_visible`]: RemoteBridge::set_visible
    pub fn new(session: i32, writer: Arc<PacketWriter>, router: &InputRouter) -> Self {
        Self::with_capabilities(session, writer, router, Vec::new())
    }

    /// As [`RemoteBridge::new`], but announcing the given capability set with
    /// a legacy `SP` record on the first attach.
    pub fn with_capabilities(
        session: i32,
        writer: Arc<PacketWriter>,
        router: &InputRouter,
        capabilities: Vec<String>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                session,
                writer,
                visible: AtomicBool::new(false),
                alive: AtomicBool::new(true),
                announced: AtomicBool::new(false),
                capabilities,
                closed_listeners: Mutex::new(Vec::new()),
            }),
            queue: router.attach(session),
        }
    }

    pub fn session(&self) -> i32 {
        self.shared.session
    }

    /// The mutation observer to register with the session's terminal.
    pub fn listener(&self) -> Arc<dyn TermListener> {
        self.shared.clone()
    }

    pub fn is_visible(&self) -> bool {
        self.shared.visible.load(Ordering::SeqCst)
    }

    /// Whether the bridge can still emit packets (not disposed, no fatal
    /// write failure).
    pub fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }

    /// Register a callback fired when the remote side closes the session or
    /// the outbound stream fails.
    pub fn on_closed(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.shared
            .closed_listeners
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(Box::new(listener));
    }

    /// Toggle viewer visibility. Becoming visible resynchronises the viewer
    /// from the terminal's current state; becoming hidden emits nothing and
    /// only suppresses future packets.
    pub fn set_visible(&self, visible: bool, term: &Terminal) {
        let was = self.shared.visible.swap(visible, Ordering::SeqCst);
        if visible && !was {
            self.resync(&term.snapshot());
        }
    }

    // Full-state retransmission: cursor, blink, size, every row, then the
    // whole palette. A freshly attached viewer needs nothing else.
    fn resync(&self, snapshot: &Snapshot) {
        info!(session = self.shared.session, "viewer attached, resyncing");

        if !self.shared.capabilities.is_empty()
            && !self.shared.announced.swap(true, Ordering::SeqCst)
        {
            self.shared
                .send(Packet::Capabilities(self.shared.capabilities.clone()));
        }

        self.shared
            .send(Packet::CursorPos(snapshot.cursor_x, snapshot.cursor_y));
        self.shared.send(Packet::CursorBlink(snapshot.cursor_blink));
        self.shared
            .send(Packet::Resize(snapshot.width, snapshot.height));
        self.shared.send(Packet::Resync(snapshot.rows.clone()));
        for index in 0..16 {
            self.shared
                .send(Packet::PaletteEntry(index, snapshot.palette.entry(index)));
        }
    }

    /// Drain and apply everything that arrived since the last tick. Events go
    /// to the guest's input queue; control actions act on the host.
    pub fn tick(&self, guest: &mut dyn Guest) {
        for command in self.queue.drain() {
            match command {
                InputCommand::Event(event) => {
                    guest.queue_event(&event.name, &event.args);
                }
                InputCommand::Control(ControlAction::Shutdown) => guest.shutdown(),
                InputCommand::Control(ControlAction::Reboot) => guest.reboot(),
                InputCommand::Control(ControlAction::Close) => {
                    debug!(session = self.shared.session, "remote requested close");
                    self.shared.notify_closed();
                }
            }
        }
    }

    /// Tear the session down, emitting the session-closed record as its last
    /// act. The shared reader keeps running for other sessions.
    pub fn dispose(&self) {
        if self.shared.alive.load(Ordering::SeqCst) {
            self.shared.send(Packet::Closed);
            self.shared.alive.store(false, Ordering::SeqCst);
        }
    }
}
