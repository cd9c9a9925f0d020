//! The 16-entry terminal colour palette.
//!
//! Guest colour codes are single hexadecimal digits. A digit `d` resolves to
//! palette entry `15 - d`, so code `0` is the brightest entry (white by
//! default) and code `f` the darkest (black). Codes that do not resolve to a
//! valid entry fall back to entry 0.

/// An RGB colour with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Build a colour from a packed 24-bit hex value.
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f64 / 255.0,
            g: ((hex >> 8) & 0xff) as f64 / 255.0,
            b: (hex & 0xff) as f64 / 255.0,
        }
    }

    /// Clamp all channels to `[0, 1]`.
    pub fn clamped(self) -> Self {
        Self {
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
        }
    }
}

/// Default palette, entry 0 (black) through entry 15 (white).
const DEFAULT_COLOURS: [u32; 16] = [
    0x111111, // black
    0xCC4C4C, // red
    0x57A64E, // green
    0x7F664C, // brown
    0x3366CC, // blue
    0xB266E5, // purple
    0x4C99B2, // cyan
    0x999999, // light grey
    0x4C4C4C, // grey
    0xF2B2CC, // pink
    0x7FCC19, // lime
    0xDEDE6C, // yellow
    0xF2B233, // orange
    0xE57FD8, // magenta
    0x99B2F2, // light blue
    0xF0F0F0, // white
];

const BASE_16: &[u8; 16] = b"0123456789abcdef";

/// Converts a single hexadecimal character to its value, or `None` if the
/// character is not a lowercase hex digit.
pub fn base16_to_int(c: char) -> Option<usize> {
    BASE_16.iter().position(|&b| b as char == c.to_ascii_lowercase())
}

/// Converts a value on `[0, 15]` to its hexadecimal character.
pub fn int_to_base16(v: usize) -> char {
    BASE_16[v & 0xf] as char
}

/// An indexed table of 16 colours that terminal colour codes resolve through.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    entries: [Rgb; 16],
}

impl Default for Palette {
    fn default() -> Self {
        let mut entries = [Rgb::new(0.0, 0.0, 0.0); 16];
        for (i, hex) in DEFAULT_COLOURS.iter().enumerate() {
            entries[i] = Rgb::from_hex(*hex);
        }
        Self { entries }
    }
}

impl Palette {
    /// Get a palette entry by index. Out-of-range indices fall back to
    /// entry 0.
    pub fn entry(&self, index: usize) -> Rgb {
        if index < 16 {
            self.entries[index]
        } else {
            self.entries[0]
        }
    }

    /// Replace a palette entry. Indices outside `[0, 15]` are ignored.
    pub fn set_entry(&mut self, index: usize, colour: Rgb) {
        if index < 16 {
            self.entries[index] = colour.clamped();
        }
    }

    /// Resolve a colour code digit to a palette colour. Digit `d` maps to
    /// entry `15 - d`; anything unresolvable maps to entry 0.
    pub fn resolve(&self, code: char) -> Rgb {
        match base16_to_int(code) {
            Some(d) => self.entry(15 - d),
            None => self.entry(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base16_round_trip() {
        for v in 0..16 {
            assert_eq!(base16_to_int(int_to_base16(v)), Some(v));
        }
        assert_eq!(base16_to_int('g'), None);
        assert_eq!(base16_to_int('A'), Some(10));
    }

    #[test]
    fn test_colour_code_reversal() {
        let palette = Palette::default();

        // Code 0 is white, code f is black
        assert_eq!(palette.resolve('0'), Rgb::from_hex(0xF0F0F0));
        assert_eq!(palette.resolve('f'), Rgb::from_hex(0x111111));

        for d in 0..16 {
            let code = int_to_base16(d);
            assert_eq!(palette.resolve(code), palette.entry(15 - d));
        }
    }

    #[test]
    fn test_invalid_code_falls_back_to_entry_zero() {
        let palette = Palette::default();
        assert_eq!(palette.resolve('z'), palette.entry(0));
        assert_eq!(palette.resolve(' '), palette.entry(0));
    }

    #[test]
    fn test_set_entry_clamps() {
        let mut palette = Palette::default();
        palette.set_entry(3, Rgb::new(2.0, -1.0, 0.5));
        assert_eq!(palette.entry(3), Rgb::new(1.0, 0.0, 0.5));

        // Out of range writes are dropped
        let before = palette.clone();
        palette.set_entry(16, Rgb::new(1.0, 1.0, 1.0));
        assert_eq!(palette, before);
    }
}
