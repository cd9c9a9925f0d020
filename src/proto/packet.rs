//! Wire packet encoding and line decoding.
//!
//! A record on the wire is one UTF-8 line: `CODE:ID;PAYLOAD\n`, where CODE is
//! a two-letter tag and ID the numeric session the record belongs to.
//! Decoding scans for the *first* `:` and the *first* `;` only, so payloads
//! may freely contain further colons, semicolons and commas without any
//! escaping. The one invariant is that a payload never contains a raw
//! newline; guest-visible text has CR/LF collapsed to a space at encode time.

use crate::core::palette::{int_to_base16, Rgb};
use crate::core::term::LineData;

/// An outbound protocol record.
///
/// One variant per wire code; the session id is supplied at encode time
/// since the same packet value is meaningful on any session.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// `TW`: write text at the cursor.
    Write(String),
    /// `TC`: set cursor position.
    CursorPos(i32, i32),
    /// `TB`: set cursor blink.
    CursorBlink(bool),
    /// `TF`: set current text colour.
    TextColour(char),
    /// `TK`: set current background colour.
    BackgroundColour(char),
    /// `TM`: set one palette entry.
    PaletteEntry(usize, Rgb),
    /// `TR`: resize the terminal.
    Resize(u16, u16),
    /// `TS`: scroll by a signed line count.
    Scroll(i32),
    /// `TE`: clear the whole terminal.
    Clear,
    /// `TL`: clear the cursor's line.
    ClearLine,
    /// `TY`: blit one full line.
    BlitLine(LineData),
    /// `TV`: full-state resync, all rows.
    Resync(Vec<LineData>),
    /// `SP`: legacy capability announcement.
    Capabilities(Vec<String>),
    /// `SC`: session closed.
    Closed,
}

impl Packet {
    /// The two-letter wire code for this packet.
    pub fn code(&self) -> &'static str {
        match self {
            Packet::Write(_) => "TW",
            Packet::CursorPos(..) => "TC",
            Packet::CursorBlink(_) => "TB",
            Packet::TextColour(_) => "TF",
            Packet::BackgroundColour(_) => "TK",
            Packet::PaletteEntry(..) => "TM",
            Packet::Resize(..) => "TR",
            Packet::Scroll(_) => "TS",
            Packet::Clear => "TE",
            Packet::ClearLine => "TL",
            Packet::BlitLine(_) => "TY",
            Packet::Resync(_) => "TV",
            Packet::Capabilities(_) => "SP",
            Packet::Closed => "SC",
        }
    }

    /// The payload portion of the wire record.
    pub fn payload(&self) -> String {
        match self {
            Packet::Write(text) => text.clone(),
            Packet::CursorPos(x, y) => format!("{x},{y}"),
            Packet::CursorBlink(blink) => blink.to_string(),
            Packet::TextColour(code) => code.to_string(),
            Packet::BackgroundColour(code) => code.to_string(),
            Packet::PaletteEntry(index, colour) => format!(
                "{},{:.4},{:.4},{:.4}",
                int_to_base16(*index),
                colour.r,
                colour.g,
                colour.b
            ),
            Packet::Resize(width, height) => format!("{width},{height}"),
            Packet::Scroll(lines) => lines.to_string(),
            Packet::Clear | Packet::ClearLine | Packet::Closed => String::new(),
            Packet::BlitLine(line) => line.to_string(),
            Packet::Resync(rows) => rows
                .iter()
                .map(LineData::to_string)
                .collect::<Vec<_>>()
                .join(":"),
            Packet::Capabilities(caps) => format!("-{}-", caps.join("-")),
        }
    }

    /// Format the full wire line for the given session.
    pub fn encode(&self, session: i32) -> String {
        encode(self.code(), session, &self.payload())
    }
}

/// Format one wire line. Embedded CR/LF in the payload are collapsed to a
/// single space so the line framing can never be broken.
pub fn encode(code: &str, session: i32, payload: &str) -> String {
    let payload = sanitize(payload);
    format!("{code}:{session};{payload}\n")
}

fn sanitize(payload: &str) -> String {
    payload.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

/// An inbound record before interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCommand {
    pub code: String,
    pub session: i32,
    pub payload: String,
}

/// Split one inbound line into code, session id and payload.
///
/// Returns `None` for malformed lines (missing delimiters, `;` before `:`,
/// or a non-numeric id); bad lines are dropped, never an error, so one of
/// them cannot desynchronise the rest of the stream.
pub fn decode_line(line: &str) -> Option<RawCommand> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let meta_start = line.find(':')?;
    let meta_end = line.find(';')?;
    if meta_end <= meta_start {
        return None;
    }

    let session = line[meta_start + 1..meta_end].parse::<i32>().ok()?;
    Some(RawCommand {
        code: line[..meta_start].to_string(),
        session,
        payload: line[meta_end + 1..].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_wire_strings() {
        assert_eq!(Packet::BackgroundColour('a').encode(0), "TK:0;a\n");
        assert_eq!(Packet::BackgroundColour('0').encode(1), "TK:1;0\n");
        assert_eq!(Packet::TextColour('3').encode(0), "TF:0;3\n");
        assert_eq!(
            Packet::BlitLine(LineData::new("text", "aaaa", "dddd")).encode(0),
            "TY:0;aaaa,dddd,text\n"
        );
        assert_eq!(Packet::CursorPos(3, 5).encode(0), "TC:0;3,5\n");
        assert_eq!(Packet::CursorBlink(false).encode(0), "TB:0;false\n");
        assert_eq!(Packet::Resize(51, 19).encode(0), "TR:0;51,19\n");
        assert_eq!(Packet::Scroll(3).encode(0), "TS:0;3\n");
        assert_eq!(Packet::Scroll(-2).encode(0), "TS:0;-2\n");
        assert_eq!(Packet::Clear.encode(0), "TE:0;\n");
        assert_eq!(Packet::ClearLine.encode(0), "TL:0;\n");
        assert_eq!(Packet::Write("text".into()).encode(0), "TW:0;text\n");
        assert_eq!(Packet::Closed.encode(7), "SC:7;\n");
    }

    #[test]
    fn test_palette_entry_fixed_decimals() {
        let packet = Packet::PaletteEntry(10, Rgb::new(1.0, 0.5, 0.0));
        assert_eq!(packet.encode(0), "TM:0;a,1.0000,0.5000,0.0000\n");
    }

    #[test]
    fn test_resync_joins_rows_with_colons() {
        let rows = vec![
            LineData::new("ab", "00", "ff"),
            LineData::new("cd", "11", "ee"),
        ];
        assert_eq!(Packet::Resync(rows).encode(2), "TV:2;00,ff,ab:11,ee,cd\n");
    }

    #[test]
    fn test_capabilities_payload() {
        let packet = Packet::Capabilities(vec!["ccemux".into(), "tror".into()]);
        assert_eq!(packet.encode(0), "SP:0;-ccemux-tror-\n");
    }

    #[test]
    fn test_newlines_collapsed_to_space() {
        assert_eq!(Packet::Write("a\r\nb\nc".into()).encode(0), "TW:0;a b c\n");
    }

    #[test]
    fn test_round_trip_with_embedded_delimiters() {
        let payload = "x:y;z,w:;";
        let line = encode("TW", 42, payload);
        let raw = decode_line(&line).unwrap();
        assert_eq!(raw.code, "TW");
        assert_eq!(raw.session, 42);
        assert_eq!(raw.payload, payload);
    }

    #[test]
    fn test_round_trip_all_codes() {
        let packets = [
            Packet::Write("hello".into()),
            Packet::CursorPos(1, 2),
            Packet::CursorBlink(true),
            Packet::TextColour('0'),
            Packet::BackgroundColour('f'),
            Packet::PaletteEntry(0, Rgb::new(0.0, 0.0, 0.0)),
            Packet::Resize(51, 19),
            Packet::Scroll(-1),
            Packet::Clear,
            Packet::ClearLine,
            Packet::BlitLine(LineData::new("a", "0", "f")),
            Packet::Resync(vec![LineData::new("a", "0", "f")]),
            Packet::Capabilities(vec!["tror".into()]),
            Packet::Closed,
        ];
        for packet in packets {
            let raw = decode_line(&packet.encode(9)).unwrap();
            assert_eq!(raw.code, packet.code());
            assert_eq!(raw.session, 9);
            assert_eq!(raw.payload, packet.payload());
        }
    }

    #[test]
    fn test_malformed_lines_are_dropped() {
        assert_eq!(decode_line("no delimiters"), None);
        assert_eq!(decode_line("EV:0 missing semicolon"), None);
        assert_eq!(decode_line("EV;0:reversed"), None);
        assert_eq!(decode_line("EV:abc;bad id"), None);
        assert_eq!(decode_line(""), None);
    }

    #[test]
    fn test_negative_session_id_decodes() {
        let raw = decode_line("EV:-1;foo").unwrap();
        assert_eq!(raw.session, -1);
    }
}
