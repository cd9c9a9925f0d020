//! Emulated terminal state.
//!
//! This module holds the observable state of a guest computer's screen: a
//! character grid with per-cell foreground/background colour codes, a cursor,
//! and a 16-entry palette. Every mutation is fanned out to registered
//! [`TermListener`]s, which is how the remote bridge observes the terminal
//! without the terminal knowing anything about the wire protocol.
//!
//! Coordinates are 0-based throughout. Colour codes are single hex digits
//! (see [`crate::core::palette`] for how they resolve).

use std::sync::Arc;

use super::palette::{int_to_base16, Palette, Rgb};

/// Default text colour code (resolves to white).
pub const DEFAULT_TEXT_COLOUR: char = '0';
/// Default background colour code (resolves to black).
pub const DEFAULT_BACKGROUND_COLOUR: char = 'f';

/// One observed mutation callback per kind of terminal change.
///
/// All methods default to no-ops so observers only implement what they care
/// about. The terminal invokes these synchronously, after its own state has
/// been updated, in listener registration order.
pub trait TermListener: Send + Sync {
    fn resize(&self, _width: u16, _height: u16) {}
    fn set_cursor_pos(&self, _x: i32, _y: i32) {}
    fn set_cursor_blink(&self, _blink: bool) {}
    fn set_text_colour(&self, _code: char) {}
    fn set_background_colour(&self, _code: char) {}
    fn write(&self, _text: &str) {}
    fn blit_line(&self, _text: &str, _fg: &str, _bg: &str) {}
    fn scroll(&self, _lines: i32) {}
    fn clear(&self) {}
    fn clear_line(&self) {}
    fn palette_changed(&self, _index: usize, _colour: Rgb) {}
}

/// One row of the grid: characters plus matching colour code strings.
///
/// The three strings always have equal length (the terminal width).
#[derive(Debug, Clone, PartialEq)]
pub struct LineData {
    pub text: String,
    pub fg: String,
    pub bg: String,
}

impl LineData {
    pub fn new(text: impl Into<String>, fg: impl Into<String>, bg: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fg: fg.into(),
            bg: bg.into(),
        }
    }
}

// Wire form of a row: colours first, text last.
impl std::fmt::Display for LineData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{}", self.fg, self.bg, self.text)
    }
}

/// The full observable state of a terminal at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub width: u16,
    pub height: u16,
    pub cursor_x: i32,
    pub cursor_y: i32,
    pub cursor_blink: bool,
    pub palette: Palette,
    pub rows: Vec<LineData>,
}

// Internal row storage; Vec<char> for cheap cell updates, converted to
// strings only when observed.
#[derive(Clone)]
struct Line {
    text: Vec<char>,
    fg: Vec<char>,
    bg: Vec<char>,
}

impl Line {
    fn blank(width: usize, fg: char, bg: char) -> Self {
        Self {
            text: vec![' '; width],
            fg: vec![fg; width],
            bg: vec![bg; width],
        }
    }

    fn data(&self) -> LineData {
        LineData {
            text: self.text.iter().collect(),
            fg: self.fg.iter().collect(),
            bg: self.bg.iter().collect(),
        }
    }
}

/// An emulated character terminal.
pub struct Terminal {
    width: u16,
    height: u16,
    cursor_x: i32,
    cursor_y: i32,
    cursor_blink: bool,
    text_colour: char,
    background_colour: char,
    palette: Palette,
    lines: Vec<Line>,
    listeners: Vec<Arc<dyn TermListener>>,
}

impl Terminal {
    /// Create a terminal of the given size with a blank grid and the default
    /// palette. Width and height are clamped to at least 1.
    pub fn new(width: u16, height: u16) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            cursor_x: 0,
            cursor_y: 0,
            cursor_blink: false,
            text_colour: DEFAULT_TEXT_COLOUR,
            background_colour: DEFAULT_BACKGROUND_COLOUR,
            palette: Palette::default(),
            lines: vec![
                Line::blank(
                    width as usize,
                    DEFAULT_TEXT_COLOUR,
                    DEFAULT_BACKGROUND_COLOUR
                );
                height as usize
            ],
            listeners: Vec::new(),
        }
    }

    /// Register a mutation observer.
    pub fn add_listener(&mut self, listener: Arc<dyn TermListener>) {
        self.listeners.push(listener);
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn cursor_pos(&self) -> (i32, i32) {
        (self.cursor_x, self.cursor_y)
    }

    pub fn cursor_blink(&self) -> bool {
        self.cursor_blink
    }

    pub fn text_colour(&self) -> char {
        self.text_colour
    }

    pub fn background_colour(&self) -> char {
        self.background_colour
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Contents of one row, or `None` when out of range.
    pub fn line(&self, y: usize) -> Option<LineData> {
        self.lines.get(y).map(Line::data)
    }

    /// Capture the complete observable state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            width: self.width,
            height: self.height,
            cursor_x: self.cursor_x,
            cursor_y: self.cursor_y,
            cursor_blink: self.cursor_blink,
            palette: self.palette.clone(),
            rows: self.lines.iter().map(Line::data).collect(),
        }
    }

    fn notify(&self, f: impl Fn(&dyn TermListener)) {
        for listener in &self.listeners {
            f(listener.as_ref());
        }
    }

    /// Resize the grid, preserving the top-left region of the old contents.
    pub fn resize(&mut self, width: u16, height: u16) {
        let width = width.max(1);
        let height = height.max(1);
        if width == self.width && height == self.height {
            return;
        }

        let (fg, bg) = (self.text_colour, self.background_colour);
        let mut lines = vec![Line::blank(width as usize, fg, bg); height as usize];
        for (new, old) in lines.iter_mut().zip(&self.lines) {
            let n = (width as usize).min(old.text.len());
            new.text[..n].copy_from_slice(&old.text[..n]);
            new.fg[..n].copy_from_slice(&old.fg[..n]);
            new.bg[..n].copy_from_slice(&old.bg[..n]);
        }

        self.width = width;
        self.height = height;
        self.lines = lines;
        self.notify(|l| l.resize(width, height));
    }

    /// Move the cursor. Positions outside the grid are allowed; writes there
    /// are clipped.
    pub fn set_cursor_pos(&mut self, x: i32, y: i32) {
        self.cursor_x = x;
        self.cursor_y = y;
        self.notify(|l| l.set_cursor_pos(x, y));
    }

    pub fn set_cursor_blink(&mut self, blink: bool) {
        self.cursor_blink = blink;
        self.notify(|l| l.set_cursor_blink(blink));
    }

    /// Set the current text colour by palette-order index (0-15). Out-of-range
    /// values fall back to the default.
    pub fn set_text_colour(&mut self, colour: usize) {
        self.text_colour = if colour < 16 {
            int_to_base16(colour)
        } else {
            DEFAULT_TEXT_COLOUR
        };
        let code = self.text_colour;
        self.notify(|l| l.set_text_colour(code));
    }

    /// Set the current background colour by palette-order index (0-15).
    pub fn set_background_colour(&mut self, colour: usize) {
        self.background_colour = if colour < 16 {
            int_to_base16(colour)
        } else {
            DEFAULT_BACKGROUND_COLOUR
        };
        let code = self.background_colour;
        self.notify(|l| l.set_background_colour(code));
    }

    /// Write text at the cursor using the current colours, advancing the
    /// cursor past the written text. Cells outside the grid are clipped.
    pub fn write(&mut self, text: &str) {
        let (fg, bg) = (self.text_colour, self.background_colour);
        let y = self.cursor_y;
        for (i, ch) in text.chars().enumerate() {
            self.put(self.cursor_x + i as i32, y, ch, fg, bg);
        }
        self.cursor_x += text.chars().count() as i32;
        self.notify(|l| l.write(text));
    }

    /// Write a run of characters with per-character colours at the cursor.
    /// The colour strings are truncated to the text length. Observers see the
    /// complete resulting row.
    pub fn blit(&mut self, text: &str, fg: &str, bg: &str) {
        let y = self.cursor_y;
        let mut n = 0;
        for ((ch, f), b) in text.chars().zip(fg.chars()).zip(bg.chars()) {
            self.put(self.cursor_x + n, y, ch, f, b);
            n += 1;
        }
        self.cursor_x += n;

        if let Some(row) = self.line_in_bounds(y) {
            self.notify(|l| l.blit_line(&row.text, &row.fg, &row.bg));
        }
    }

    /// Replace one whole row. The cursor does not move, but observers are
    /// told the target row via a cursor callback before the row contents.
    pub fn set_line(&mut self, y: usize, text: &str, fg: &str, bg: &str) {
        if y >= self.height as usize {
            return;
        }
        for (x, ((ch, f), b)) in text.chars().zip(fg.chars()).zip(bg.chars()).enumerate() {
            self.put(x as i32, y as i32, ch, f, b);
        }
        let row = self.lines[y].data();
        self.notify(|l| l.set_cursor_pos(0, y as i32));
        self.notify(|l| l.blit_line(&row.text, &row.fg, &row.bg));
    }

    /// Scroll the grid contents up (`lines > 0`) or down (`lines < 0`),
    /// filling vacated rows with blanks in the current colours.
    pub fn scroll(&mut self, lines: i32) {
        if lines == 0 {
            return;
        }
        let height = self.height as usize;
        let (fg, bg) = (self.text_colour, self.background_colour);
        let mut next = vec![Line::blank(self.width as usize, fg, bg); height];
        for y in 0..height {
            let src = y as i32 + lines;
            if src >= 0 && (src as usize) < height {
                next[y] = self.lines[src as usize].clone();
            }
        }
        self.lines = next;
        self.notify(|l| l.scroll(lines));
    }

    /// Blank the whole grid in the current colours.
    pub fn clear(&mut self) {
        let (fg, bg) = (self.text_colour, self.background_colour);
        for line in &mut self.lines {
            *line = Line::blank(self.width as usize, fg, bg);
        }
        self.notify(|l| l.clear());
    }

    /// Blank the cursor's row in the current colours.
    pub fn clear_line(&mut self) {
        let y = self.cursor_y;
        if y >= 0 && (y as usize) < self.lines.len() {
            let (fg, bg) = (self.text_colour, self.background_colour);
            self.lines[y as usize] = Line::blank(self.width as usize, fg, bg);
        }
        self.notify(|l| l.clear_line());
    }

    /// Replace one palette entry. Out-of-range indices are ignored.
    pub fn set_palette_entry(&mut self, index: usize, colour: Rgb) {
        if index >= 16 {
            return;
        }
        self.palette.set_entry(index, colour);
        let colour = self.palette.entry(index);
        self.notify(|l| l.palette_changed(index, colour));
    }

    fn put(&mut self, x: i32, y: i32, ch: char, fg: char, bg: char) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width as usize || y >= self.lines.len() {
            return;
        }
        let line = &mut self.lines[y];
        line.text[x] = ch;
        line.fg[x] = fg;
        line.bg[x] = bg;
    }

    fn line_in_bounds(&self, y: i32) -> Option<LineData> {
        if y < 0 {
            return None;
        }
        self.lines.get(y as usize).map(Line::data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl TermListener for Recorder {
        fn resize(&self, w: u16, h: u16) {
            self.calls.lock().unwrap().push(format!("resize {w}x{h}"));
        }
        fn set_cursor_pos(&self, x: i32, y: i32) {
            self.calls.lock().unwrap().push(format!("cursor {x},{y}"));
        }
        fn write(&self, text: &str) {
            self.calls.lock().unwrap().push(format!("write {text}"));
        }
        fn blit_line(&self, text: &str, fg: &str, bg: &str) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("blit {fg},{bg},{text}"));
        }
        fn scroll(&self, lines: i32) {
            self.calls.lock().unwrap().push(format!("scroll {lines}"));
        }
    }

    #[test]
    fn test_write_advances_cursor_and_sets_cells() {
        let mut term = Terminal::new(10, 3);
        term.set_cursor_pos(2, 1);
        term.write("hi");

        assert_eq!(term.cursor_pos(), (4, 1));
        let line = term.line(1).unwrap();
        assert_eq!(line.text, "  hi      ");
        assert_eq!(&line.fg[2..4], "00");
        assert_eq!(&line.bg[2..4], "ff");
    }

    #[test]
    fn test_write_clips_outside_grid() {
        let mut term = Terminal::new(4, 2);
        term.set_cursor_pos(2, 0);
        term.write("abcdef");

        assert_eq!(term.line(0).unwrap().text, "  ab");
        // Cursor still advances past the edge
        assert_eq!(term.cursor_pos(), (8, 0));

        term.set_cursor_pos(0, 5);
        term.write("x");
        assert_eq!(term.line(0).unwrap().text, "  ab");
        assert_eq!(term.line(1).unwrap().text, "    ");
    }

    #[test]
    fn test_blit_uses_per_char_colours() {
        let mut term = Terminal::new(4, 1);
        term.set_cursor_pos(0, 0);
        term.blit("text", "0123", "89ab");

        let line = term.line(0).unwrap();
        assert_eq!(line.text, "text");
        assert_eq!(line.fg, "0123");
        assert_eq!(line.bg, "89ab");
    }

    #[test]
    fn test_scroll_up_fills_with_blanks() {
        let mut term = Terminal::new(3, 3);
        term.set_line(0, "aaa", "000", "fff");
        term.set_line(1, "bbb", "000", "fff");
        term.set_line(2, "ccc", "000", "fff");

        term.scroll(1);
        assert_eq!(term.line(0).unwrap().text, "bbb");
        assert_eq!(term.line(1).unwrap().text, "ccc");
        assert_eq!(term.line(2).unwrap().text, "   ");

        term.scroll(-1);
        assert_eq!(term.line(0).unwrap().text, "   ");
        assert_eq!(term.line(1).unwrap().text, "bbb");
    }

    #[test]
    fn test_resize_preserves_top_left() {
        let mut term = Terminal::new(4, 2);
        term.set_line(0, "abcd", "0000", "ffff");
        term.resize(2, 3);

        assert_eq!(term.line(0).unwrap().text, "ab");
        assert_eq!(term.line(2).unwrap().text, "  ");
        assert_eq!(term.width(), 2);
        assert_eq!(term.height(), 3);
    }

    #[test]
    fn test_listener_sees_mutations_in_order() {
        let recorder = Arc::new(Recorder::default());
        let mut term = Terminal::new(5, 2);
        term.add_listener(recorder.clone());

        term.set_cursor_pos(1, 0);
        term.write("ok");
        term.scroll(1);

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                "cursor 1,0".to_string(),
                "write ok".to_string(),
                "scroll 1".to_string()
            ]
        );
    }

    #[test]
    fn test_snapshot_matches_state() {
        let mut term = Terminal::new(3, 2);
        term.set_cursor_pos(1, 1);
        term.set_cursor_blink(true);
        term.write("x");

        let snap = term.snapshot();
        assert_eq!(snap.width, 3);
        assert_eq!(snap.height, 2);
        assert_eq!((snap.cursor_x, snap.cursor_y), (2, 1));
        assert!(snap.cursor_blink);
        assert_eq!(snap.rows[1].text, " x ");
        assert_eq!(snap.rows.len(), 2);
    }
}
