//! Inbound stream reading and per-session routing.
//!
//! One background thread owns the inbound byte stream for the life of the
//! process, reading it line by line until end-of-stream. Decoded commands are
//! routed to an unbounded per-session queue, created lazily the first time a
//! session id is seen (by the reader or by a bridge attaching). The reader
//! never blocks on queue capacity and downstream consumers drain their queue
//! without blocking the reader.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::debug;

use crate::proto::{decode_line, parse_event, Event};

/// An out-of-band command from the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Shutdown,
    Reboot,
    Close,
}

impl ControlAction {
    /// Parse an `XA` payload, case-insensitively.
    pub fn parse(payload: &str) -> Option<Self> {
        match payload.to_ascii_lowercase().as_str() {
            "shutdown" => Some(ControlAction::Shutdown),
            "reboot" => Some(ControlAction::Reboot),
            "close" => Some(ControlAction::Close),
            _ => None,
        }
    }
}

/// One interpreted inbound record.
#[derive(Debug, Clone, PartialEq)]
pub enum InputCommand {
    /// `EV`: a guest event to queue.
    Event(Event),
    /// `XA`: a host control action.
    Control(ControlAction),
}

/// A session's unbounded inbound FIFO.
///
/// Multi-producer (in practice the single reader thread), single consumer
/// (the session's own tick).
pub struct SessionQueue {
    tx: Sender<InputCommand>,
    rx: Mutex<Receiver<InputCommand>>,
}

impl SessionQueue {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    pub fn push(&self, command: InputCommand) {
        // The receiver lives as long as the queue, so this cannot fail
        let _ = self.tx.send(command);
    }

    /// Remove and return everything currently queued, without blocking.
    pub fn drain(&self) -> Vec<InputCommand> {
        let rx = self.rx.lock().unwrap_or_else(|p| p.into_inner());
        let mut out = Vec::new();
        while let Ok(command) = rx.try_recv() {
            out.push(command);
        }
        out
    }
}

type QueueMap = Arc<Mutex<HashMap<i32, Arc<SessionQueue>>>>;

/// Owns the single reader of the inbound stream and the session registry.
pub struct InputRouter {
    queues: QueueMap,
}

impl InputRouter {
    /// Spawn the background read loop over the given stream. The loop ends
    /// when the stream does; there is no explicit cancellation.
    pub fn spawn(stream: impl Read + Send + 'static) -> Self {
        let queues: QueueMap = Arc::new(Mutex::new(HashMap::new()));
        let routed = queues.clone();
        thread::spawn(move || read_loop(stream, routed));
        Self { queues }
    }

    /// The queue for a session, created on first reference.
    pub fn attach(&self, session: i32) -> Arc<SessionQueue> {
        get_or_create(&self.queues, session)
    }
}

fn get_or_create(queues: &QueueMap, session: i32) -> Arc<SessionQueue> {
    let mut queues = queues.lock().unwrap_or_else(|p| p.into_inner());
    queues
        .entry(session)
        .or_insert_with(|| Arc::new(SessionQueue::new()))
        .clone()
}

fn read_loop(stream: impl Read, queues: QueueMap) {
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                debug!("inbound stream read failed: {e}");
                break;
            }
        };

        let Some(raw) = decode_line(&line) else {
            debug!("dropping malformed inbound line");
            continue;
        };

        let command = match raw.code.as_str() {
            "EV" => InputCommand::Event(parse_event(&raw.payload)),
            "XA" => match ControlAction::parse(&raw.payload) {
                Some(action) => InputCommand::Control(action),
                None => {
                    debug!("dropping unknown control action: {}", raw.payload);
                    continue;
                }
            },
            code => {
                debug!("dropping inbound record with unknown code: {code}");
                continue;
            }
        };

        get_or_create(&queues, raw.session).push(command);
    }
    debug!("inbound stream closed, reader exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::Value;
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    // The reader runs on its own thread; poll until it has caught up.
    fn drain_eventually(queue: &SessionQueue, expected: usize) -> Vec<InputCommand> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut out = Vec::new();
        while out.len() < expected && Instant::now() < deadline {
            out.extend(queue.drain());
            thread::sleep(Duration::from_millis(1));
        }
        out
    }

    #[test]
    fn test_routes_by_session_id() {
        let input = "EV:1;char,\"a\"\nEV:2;key,28\nEV:1;terminate\n";
        let router = InputRouter::spawn(Cursor::new(input.to_owned()));

        let one = router.attach(1);
        let commands = drain_eventually(&one, 2);
        assert_eq!(commands.len(), 2);
        assert_eq!(
            commands[0],
            InputCommand::Event(Event {
                name: "char".into(),
                args: vec![Value::Text("a".into())],
            })
        );
        assert_eq!(
            commands[1],
            InputCommand::Event(Event {
                name: "terminate".into(),
                args: vec![],
            })
        );

        let two = router.attach(2);
        let commands = drain_eventually(&two, 1);
        assert_eq!(
            commands,
            vec![InputCommand::Event(Event {
                name: "key".into(),
                args: vec![Value::Number(28.0)],
            })]
        );
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let input = "garbage\nEV:x;char\nXA:0;frobnicate\nXA:0;ShUtDoWn\n";
        let router = InputRouter::spawn(Cursor::new(input.to_owned()));

        let queue = router.attach(0);
        let commands = drain_eventually(&queue, 1);
        assert_eq!(
            commands,
            vec![InputCommand::Control(ControlAction::Shutdown)]
        );
    }

    #[test]
    fn test_attach_before_input_arrives() {
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        struct ChannelStream(Receiver<Vec<u8>>, Vec<u8>);
        impl Read for ChannelStream {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.1.is_empty() {
                    match self.0.recv() {
                        Ok(data) => self.1 = data,
                        Err(_) => return Ok(0),
                    }
                }
                let n = self.1.len().min(buf.len());
                buf[..n].copy_from_slice(&self.1[..n]);
                self.1.drain(..n);
                Ok(n)
            }
        }

        let router = InputRouter::spawn(ChannelStream(rx, Vec::new()));
        let queue = router.attach(7);
        assert!(queue.drain().is_empty());

        tx.send(b"XA:7;close\n".to_vec()).unwrap();
        let commands = drain_eventually(&queue, 1);
        assert_eq!(commands, vec![InputCommand::Control(ControlAction::Close)]);
        drop(tx);
    }

    #[test]
    fn test_control_action_parsing() {
        assert_eq!(ControlAction::parse("shutdown"), Some(ControlAction::Shutdown));
        assert_eq!(ControlAction::parse("REBOOT"), Some(ControlAction::Reboot));
        assert_eq!(ControlAction::parse("Close"), Some(ControlAction::Close));
        assert_eq!(ControlAction::parse("halt"), None);
    }
}
