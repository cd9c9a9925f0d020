//! tror - remote terminal protocol host.
//!
//! Runs one emulated session over the stdin/stdout pair: terminal updates go
//! out as protocol lines on stdout, input events and control actions come in
//! on stdin. The guest is a small echo program, which makes the binary a
//! self-contained way to exercise a remote viewer against a live session.
//!
//! # Quick Start
//!
//! ```text
//! tror                    # 51x19 terminal, session id 0
//! tror --id 3             # multiplex-friendly session id
//! tror --width 26 --height 20
//! ```
//!
//! Because stdout carries the wire protocol, logging goes to
//! `~/.tror/tror.log`.

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tror::config::Config;
use tror::core::Terminal;
use tror::proto::Value;
use tror::remote::{Guest, InputRouter, PacketWriter, RemoteBridge};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command-line overrides on top of the config file
#[derive(Default)]
struct Options {
    width: Option<u16>,
    height: Option<u16>,
    id: Option<i32>,
    prefix: Option<String>,
}

fn print_version() {
    eprintln!("tror {}", VERSION);
}

fn print_help() {
    eprintln!("tror {} - remote terminal protocol host", VERSION);
    eprintln!();
    eprintln!("Usage: tror [OPTIONS]");
    eprintln!();
    eprintln!("Hosts one emulated terminal session over stdin/stdout using the");
    eprintln!("TRoR line protocol (CODE:ID;PAYLOAD).");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --width <COLS>        Terminal width (default from config, 51)");
    eprintln!("  --height <ROWS>       Terminal height (default from config, 19)");
    eprintln!("  --id <ID>             Session id (default from config, 0)");
    eprintln!("  --prefix <STR>        Prefix prepended to every outbound line");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Configuration is read from ~/.tror/config.toml; command line");
    eprintln!("options override it. Logs are written to ~/.tror/tror.log.");
}

fn parse_args() -> Result<Options, String> {
    let mut options = Options::default();
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "--width" => {
                let value = args.next().ok_or("--width requires a value")?;
                options.width = Some(value.parse().map_err(|_| "invalid --width value")?);
            }
            "--height" => {
                let value = args.next().ok_or("--height requires a value")?;
                options.height = Some(value.parse().map_err(|_| "invalid --height value")?);
            }
            "--id" => {
                let value = args.next().ok_or("--id requires a value")?;
                options.id = Some(value.parse().map_err(|_| "invalid --id value")?);
            }
            "--prefix" => {
                options.prefix = Some(args.next().ok_or("--prefix requires a value")?);
            }
            other => return Err(format!("unknown option: {}", other)),
        }
    }

    Ok(options)
}

fn init_logging() {
    let home = std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(std::path::PathBuf::from);

    let log_path = home
        .map(|h| h.join(".tror").join("tror.log"))
        .unwrap_or_else(|| std::path::PathBuf::from("tror.log"));

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

/// What the echo guest wants applied to the terminal.
enum EchoAction {
    Text(String),
    Newline,
}

/// A minimal guest program: echoes typed characters back to the terminal.
#[derive(Default)]
struct EchoGuest {
    actions: Vec<EchoAction>,
    shutdown: bool,
    reboot: bool,
}

// Keycode the viewer sends for the return key
const KEY_ENTER: f64 = 28.0;

impl Guest for EchoGuest {
    fn queue_event(&mut self, name: &str, args: &[Value]) {
        match name {
            "char" | "paste" => {
                if let Some(Value::Text(text)) = args.first() {
                    self.actions.push(EchoAction::Text(text.clone()));
                }
            }
            "key" => {
                if let Some(Value::Number(code)) = args.first() {
                    if *code == KEY_ENTER {
                        self.actions.push(EchoAction::Newline);
                    }
                }
            }
            "terminate" => self.shutdown = true,
            _ => {}
        }
    }

    fn shutdown(&mut self) {
        self.shutdown = true;
    }

    fn reboot(&mut self) {
        self.reboot = true;
    }
}

fn newline(term: &mut Terminal) {
    let (_, y) = term.cursor_pos();
    if y + 1 >= term.height() as i32 {
        term.scroll(1);
        term.set_cursor_pos(0, term.height() as i32 - 1);
    } else {
        term.set_cursor_pos(0, y + 1);
    }
}

fn echo(term: &mut Terminal, text: &str) {
    for ch in text.chars() {
        if ch == '\n' {
            newline(term);
            continue;
        }
        if term.cursor_pos().0 >= term.width() as i32 {
            newline(term);
        }
        term.write(&ch.to_string());
    }
}

fn banner(term: &mut Terminal) {
    term.clear();
    term.set_cursor_pos(0, 0);
    echo(term, &format!("tror {} demo host\n", VERSION));
    echo(term, "typed characters are echoed below\n\n");
    term.set_cursor_blink(true);
}

fn main() -> anyhow::Result<()> {
    let options = match parse_args() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging();

    let config = Config::load();
    let width = options.width.unwrap_or(config.terminal.width);
    let height = options.height.unwrap_or(config.terminal.height);
    let id = options.id.unwrap_or(config.session.id);
    let prefix = options
        .prefix
        .unwrap_or_else(|| config.protocol.prefix.clone());

    info!("tror {} starting, session {} at {}x{}", VERSION, id, width, height);

    let writer = Arc::new(PacketWriter::with_prefix(std::io::stdout(), prefix));
    let router = InputRouter::spawn(std::io::stdin());
    let bridge = RemoteBridge::with_capabilities(
        id,
        writer,
        &router,
        config.announced_capabilities(),
    );

    let running = Arc::new(AtomicBool::new(true));
    let closed = running.clone();
    bridge.on_closed(move || {
        closed.store(false, Ordering::SeqCst);
    });

    let mut term = Terminal::new(width, height);
    term.add_listener(bridge.listener());

    banner(&mut term);
    bridge.set_visible(true, &term);

    let mut guest = EchoGuest::default();
    while running.load(Ordering::SeqCst) && bridge.is_alive() {
        bridge.tick(&mut guest);

        if guest.shutdown {
            info!("guest shut down, exiting");
            break;
        }
        if guest.reboot {
            guest.reboot = false;
            info!("guest rebooting");
            banner(&mut term);
        }
        for action in guest.actions.drain(..) {
            match action {
                EchoAction::Text(text) => echo(&mut term, &text),
                EchoAction::Newline => newline(&mut term),
            }
        }

        std::thread::sleep(Duration::from_millis(50));
    }

    bridge.dispose();
    info!("session {} closed", id);
    Ok(())
}
