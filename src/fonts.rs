//! Text measurement for the layout engine.
//!
//! The PDF is written with the standard Helvetica faces, so measurement
//! defaults to the Helvetica / Helvetica-Bold advance widths. A TrueType file
//! can be loaded instead (via `ttf-parser`) when a template is designed
//! against a specific face.

use std::collections::HashMap;

use crate::error::BackendError;

/// Helvetica advance widths for U+0020..=U+007E, in 1/1000 em.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const ASCENDER: f32 = 718.0;
const DESCENDER: f32 = -207.0;

/// Map accented Latin-1 letters to their base letter for width lookup.
fn base_letter(ch: char) -> char {
    match ch {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ñ' => 'n',
        'Ñ' => 'N',
        '\u{00A0}' => ' ',
        'º' | 'ª' => 'o',
        other => other,
    }
}

fn builtin_advance(ch: char, bold: bool) -> u16 {
    let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
    let code = base_letter(ch) as u32;
    match code {
        0x20..=0x7E => table[(code - 0x20) as usize],
        _ => 556,
    }
}

/// A TrueType face loaded for measurement.
#[derive(Clone)]
pub struct FontData {
    /// Raw font bytes (kept alive for ttf-parser's zero-copy API).
    pub bytes: Vec<u8>,
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct FontKey {
    pub bold: bool,
    pub italic: bool,
}

/// Measures text with loaded faces, falling back to builtin Helvetica metrics.
#[derive(Default)]
pub struct FontManager {
    fonts: HashMap<FontKey, FontData>,
}

impl FontManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a TTF/OTF face used to measure text in the given variant.
    pub fn load_font(&mut self, bold: bool, italic: bool, bytes: Vec<u8>) -> Result<(), BackendError> {
        let face = ttf_parser::Face::parse(&bytes, 0)
            .map_err(|e| BackendError::Layout(format!("failed to parse font: {e}")))?;
        let data = FontData {
            units_per_em: f32::from(face.units_per_em()),
            ascender: f32::from(face.ascender()),
            descender: f32::from(face.descender()),
            bytes,
        };
        self.fonts.insert(FontKey { bold, italic }, data);
        Ok(())
    }

    /// Width of `text` in points at `font_size`.
    pub fn measure_text_width(&self, text: &str, font_size: f32, bold: bool, italic: bool) -> f32 {
        if let Some(data) = self.fonts.get(&FontKey { bold, italic }) {
            if let Ok(face) = ttf_parser::Face::parse(&data.bytes, 0) {
                let scale = font_size / data.units_per_em;
                return text
                    .chars()
                    .map(|ch| {
                        face.glyph_index(ch)
                            .and_then(|gid| face.glyph_hor_advance(gid))
                            .map(|adv| f32::from(adv) * scale)
                            .unwrap_or(font_size * 0.5)
                    })
                    .sum();
            }
        }
        let units: u32 = text.chars().map(|ch| u32::from(builtin_advance(ch, bold))).sum();
        units as f32 * font_size / 1000.0
    }

    /// Distance from the top of a line box to the baseline.
    pub fn ascender_px(&self, font_size: f32, bold: bool, italic: bool) -> f32 {
        match self.fonts.get(&FontKey { bold, italic }) {
            Some(data) => data.ascender * font_size / data.units_per_em,
            None => ASCENDER * font_size / 1000.0,
        }
    }

    /// Height of the glyph box (ascender to descender).
    pub fn glyph_height(&self, font_size: f32, bold: bool, italic: bool) -> f32 {
        match self.fonts.get(&FontKey { bold, italic }) {
            Some(data) => (data.ascender - data.descender) * font_size / data.units_per_em,
            None => (ASCENDER - DESCENDER) * font_size / 1000.0,
        }
    }
}

/// Word-wrap text to fit within `max_width` points. Newlines start a new
/// line; words wider than the line are broken between characters.
pub fn wrap_text(
    text: &str,
    font_size: f32,
    bold: bool,
    italic: bool,
    max_width: f32,
    fonts: &FontManager,
) -> Vec<String> {
    let measure = |s: &str| fonts.measure_text_width(s, font_size, bold, italic);
    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if max_width <= 0.0 || measure(&candidate) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if measure(word) <= max_width {
                current = word.to_string();
                continue;
            }
            for ch in word.chars() {
                current.push(ch);
                if measure(&current) > max_width && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(ch);
                }
            }
        }
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_helvetica_widths() {
        let mgr = FontManager::default();
        // H(722) e(556) l(222) l(222) o(556) = 2278
        let w = mgr.measure_text_width("Hello", 10.0, false, false);
        assert!((w - 22.78).abs() < 0.01);
        let bold = mgr.measure_text_width("Hello", 10.0, true, false);
        assert!(bold > w);
        assert_eq!(
            mgr.measure_text_width("ação", 10.0, false, false),
            mgr.measure_text_width("acao", 10.0, false, false)
        );
    }

    #[test]
    fn word_wrap_basic() {
        let mgr = FontManager::default();
        let lines = wrap_text("Hello world foo bar", 16.0, false, false, 60.0, &mgr);
        assert!(lines.len() >= 2, "Expected wrapping, got {:?}", lines);
        assert!(lines
            .iter()
            .all(|l| mgr.measure_text_width(l, 16.0, false, false) <= 60.0));
    }

    #[test]
    fn long_words_and_newlines() {
        let mgr = FontManager::default();
        let lines = wrap_text("AAAAAAAAAAAA\nb", 10.0, false, false, 20.0, &mgr);
        assert_eq!(lines.last().map(String::as_str), Some("b"));
        assert!(lines.len() > 2);
        assert_eq!(wrap_text("", 10.0, false, false, 20.0, &mgr), vec![String::new()]);
    }

    #[test]
    fn rejects_garbage_font_bytes() {
        let mut mgr = FontManager::new();
        assert!(mgr.load_font(false, false, vec![0, 1, 2, 3]).is_err());
    }
}
