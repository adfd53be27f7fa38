//! Glyph metrics for the PDF base-14 Helvetica faces and text wrapping.
//!
//! The built-in fonts carry no metrics inside the PDF, so line breaking uses
//! the standard AFM advance widths (1/1000 em) for the printable ASCII range.

/// Font face used by the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFace {
    Regular,
    Bold,
    Oblique,
}

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 222, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    222, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 278, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    278, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const FALLBACK_WIDTH: u16 = 556;

fn glyph_width(face: FontFace, ch: char) -> u16 {
    let table = match face {
        FontFace::Bold => &HELVETICA_BOLD,
        FontFace::Regular | FontFace::Oblique => &HELVETICA,
    };
    let code = ch as u32;
    if (32..127).contains(&code) {
        table[(code - 32) as usize]
    } else {
        FALLBACK_WIDTH
    }
}

/// Advance width of `text` in points.
pub fn text_width(text: &str, face: FontFace, size: f32) -> f32 {
    let units: u32 = text.chars().map(|ch| glyph_width(face, ch) as u32).sum();
    units as f32 * size / 1000.0
}

/// Map text onto what a WinAnsi-encoded base-14 font can show. Typographic
/// punctuation is folded to ASCII, other Latin-1 characters pass through,
/// anything else (emoji, CJK) becomes `?`.
pub fn to_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{00AB}' | '\u{00BB}' => out.push('"'),
            '\u{2013}' | '\u{2014}' | '\u{2212}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{20AC}' => out.push_str("EUR"),
            '\u{00A0}' | '\u{202F}' | '\t' => out.push(' '),
            '\u{FE0F}' | '\u{200B}' | '\u{200D}' => {}
            c if c.is_control() => {}
            c if (c as u32) < 0x100 => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Greedy word wrap into lines no wider than `max_width`. Explicit newlines
/// start new lines; words longer than a line are split by characters.
pub fn wrap_text(text: &str, face: FontFace, size: f32, max_width: f32) -> Vec<String> {
    let space = text_width(" ", face, size);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let first_line = lines.len();
        let mut current = String::new();
        let mut current_width = 0.0_f32;

        for word in paragraph.split_whitespace() {
            let word_width = text_width(word, face, size);

            if word_width > max_width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0.0;
                }
                for piece in split_long_word(word, face, size, max_width) {
                    let piece_width = text_width(&piece, face, size);
                    if piece_width >= max_width * 0.999 {
                        lines.push(piece);
                    } else {
                        current_width = piece_width;
                        current = piece;
                    }
                }
                continue;
            }

            let needed = if current.is_empty() {
                word_width
            } else {
                current_width + space + word_width
            };

            if needed > max_width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
                current_width = word_width;
            } else {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                current_width = needed;
            }
        }

        if !current.is_empty() || lines.len() == first_line {
            lines.push(current);
        }
    }

    lines
}

fn split_long_word(word: &str, face: FontFace, size: f32, max_width: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut width = 0.0_f32;

    for ch in word.chars() {
        let w = glyph_width(face, ch) as f32 * size / 1000.0;
        if width + w > max_width && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
            width = 0.0;
        }
        current.push(ch);
        width += w;
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
