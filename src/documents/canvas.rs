//! Page canvas with a top-down text cursor on top of printpdf.
//!
//! Coordinates are PDF points measured from the top-left corner of the page;
//! conversion to printpdf's bottom-left millimetre space happens here only.

use image::DynamicImage;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Pt, Rect, Rgb,
};

use super::metrics::{text_width, to_pdf_text, wrap_text, FontFace};
use super::DocumentError;

pub const A4_WIDTH: f32 = 595.28;
pub const A4_HEIGHT: f32 = 841.89;
pub const MARGIN: f32 = 50.0;

/// Line box height as a multiple of the font size (Helvetica ascender,
/// descender and line gap).
const LINE_HEIGHT: f32 = 1.156;
const ASCENT: f32 = 0.718;
const LAYER_NAME: &str = "Layer 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
    Justify,
}

/// `#rrggbb` colour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hex(pub &'static str);

impl Hex {
    fn to_color(self) -> Color {
        let digits = self.0.trim_start_matches('#');
        let channel = |i: usize| {
            digits
                .get(i..i + 2)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .unwrap_or(0) as f32
                / 255.0
        };
        Color::Rgb(Rgb::new(channel(0), channel(2), channel(4), None))
    }
}

/// Draws the fixed furniture of a page (letterheads and the like) each time
/// a page is created, and leaves the cursor where content should start.
pub trait PageDecorator {
    fn decorate(&self, canvas: &mut PdfCanvas);
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    oblique: IndirectFontRef,
}

impl Fonts {
    fn get(&self, face: FontFace) -> &IndirectFontRef {
        match face {
            FontFace::Regular => &self.regular,
            FontFace::Bold => &self.bold,
            FontFace::Oblique => &self.oblique,
        }
    }
}

pub struct PdfCanvas {
    doc: PdfDocumentReference,
    fonts: Fonts,
    pages: Vec<PdfLayerReference>,
    current: usize,
    /// Cursor: top of the next line, in points from the top of the page.
    pub y: f32,
    face: FontFace,
    size: f32,
    color: Hex,
    decorator: Option<Box<dyn PageDecorator>>,
}

fn mm(points: f32) -> Mm {
    Mm::from(Pt(points))
}

fn pdf_err(err: printpdf::Error) -> DocumentError {
    DocumentError::Pdf(format!("{:?}", err))
}

impl PdfCanvas {
    /// New A4 document with one page. The decorator, if any, runs for every
    /// page including the first.
    pub fn new(title: &str, decorator: Option<Box<dyn PageDecorator>>) -> Result<Self, DocumentError> {
        let (doc, page, layer) = PdfDocument::new(
            to_pdf_text(title),
            mm(A4_WIDTH),
            mm(A4_HEIGHT),
            LAYER_NAME,
        );
        let fonts = Fonts {
            regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?,
            bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?,
            oblique: doc.add_builtin_font(BuiltinFont::HelveticaOblique).map_err(pdf_err)?,
        };
        let first = doc.get_page(page).get_layer(layer);

        let mut canvas = Self {
            doc,
            fonts,
            pages: vec![first],
            current: 0,
            y: MARGIN,
            face: FontFace::Regular,
            size: 12.0,
            color: Hex("#000000"),
            decorator,
        };
        canvas.decorate_current_page();
        Ok(canvas)
    }

    pub fn page_width(&self) -> f32 {
        A4_WIDTH
    }

    pub fn page_height(&self) -> f32 {
        A4_HEIGHT
    }

    pub fn content_width(&self) -> f32 {
        A4_WIDTH - 2.0 * MARGIN
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn font(&mut self, face: FontFace, size: f32) -> &mut Self {
        self.face = face;
        self.size = size;
        self
    }

    pub fn color(&mut self, color: Hex) -> &mut Self {
        self.color = color;
        self
    }

    /// Height of one line at the current font size.
    pub fn line_height(&self) -> f32 {
        self.size * LINE_HEIGHT
    }

    pub fn move_down(&mut self, lines: f32) -> &mut Self {
        self.y += lines * self.line_height();
        self
    }

    /// Start a new page when the cursor has passed `limit`.
    pub fn break_if_below(&mut self, limit: f32) {
        if self.y > limit {
            self.add_page();
        }
    }

    pub fn add_page(&mut self) {
        let (page, layer) = self.doc.add_page(mm(A4_WIDTH), mm(A4_HEIGHT), LAYER_NAME);
        self.pages.push(self.doc.get_page(page).get_layer(layer));
        self.current = self.pages.len() - 1;
        self.y = MARGIN;
        self.decorate_current_page();
    }

    /// Select the page subsequent drawing goes to.
    pub fn switch_to_page(&mut self, index: usize) {
        if index < self.pages.len() {
            self.current = index;
        }
    }

    fn decorate_current_page(&mut self) {
        if let Some(decorator) = self.decorator.take() {
            let saved = (self.face, self.size, self.color);
            decorator.decorate(self);
            (self.face, self.size, self.color) = saved;
            self.decorator = Some(decorator);
        }
    }

    fn layer(&self) -> &PdfLayerReference {
        &self.pages[self.current]
    }

    fn draw_str(&self, text: &str, x: f32, top: f32) {
        let layer = self.layer();
        layer.set_fill_color(self.color.to_color());
        layer.use_text(
            to_pdf_text(text),
            self.size,
            mm(x),
            mm(A4_HEIGHT - (top + self.size * ASCENT)),
            self.fonts.get(self.face),
        );
    }

    fn draw_line(&self, line: &str, x: f32, top: f32, width: f32, align: Align, last: bool) {
        match align {
            Align::Left => self.draw_str(line, x, top),
            Align::Center => {
                let w = text_width(line, self.face, self.size);
                self.draw_str(line, x + (width - w).max(0.0) / 2.0, top);
            }
            Align::Right => {
                let w = text_width(line, self.face, self.size);
                self.draw_str(line, x + (width - w).max(0.0), top);
            }
            Align::Justify => {
                let words: Vec<&str> = line.split(' ').filter(|w| !w.is_empty()).collect();
                if last || words.len() < 2 {
                    self.draw_str(line, x, top);
                    return;
                }
                let words_width: f32 = words
                    .iter()
                    .map(|w| text_width(w, self.face, self.size))
                    .sum();
                let gap = (width - words_width) / (words.len() - 1) as f32;
                let mut cursor = x;
                for word in words {
                    self.draw_str(word, cursor, top);
                    cursor += text_width(word, self.face, self.size) + gap;
                }
            }
        }
    }

    /// Flowing text across the content width, breaking onto new pages at
    /// the bottom margin. Leaves the cursor under the last line.
    pub fn text(&mut self, text: &str, align: Align, line_gap: f32) -> &mut Self {
        let width = self.content_width();
        for paragraph in text.split('\n') {
            let lines = wrap_text(paragraph, self.face, self.size, width);
            let count = lines.len();
            for (i, line) in lines.iter().enumerate() {
                if self.y + self.line_height() > A4_HEIGHT - MARGIN {
                    self.add_page();
                }
                self.draw_line(line, MARGIN, self.y, width, align, i + 1 == count);
                self.y += self.line_height() + line_gap;
            }
        }
        self
    }

    /// Text in a fixed box starting at (`x`, `y`); no page breaks. The
    /// cursor ends up under the box.
    pub fn text_at(&mut self, text: &str, x: f32, y: f32, width: f32, align: Align, line_gap: f32) -> &mut Self {
        let mut top = y;
        for paragraph in text.split('\n') {
            let lines = wrap_text(paragraph, self.face, self.size, width);
            let count = lines.len();
            for (i, line) in lines.iter().enumerate() {
                self.draw_line(line, x, top, width, align, i + 1 == count);
                top += self.line_height() + line_gap;
            }
        }
        self.y = top;
        self
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Hex) {
        let layer = self.layer();
        layer.set_fill_color(color.to_color());
        layer.add_rect(Rect::new(
            mm(x),
            mm(A4_HEIGHT - (y + height)),
            mm(x + width),
            mm(A4_HEIGHT - y),
        ));
    }

    /// Horizontal rule at `y`.
    pub fn rule(&mut self, x1: f32, x2: f32, y: f32, thickness: f32, color: Hex) {
        let layer = self.layer();
        layer.set_outline_color(color.to_color());
        layer.set_outline_thickness(thickness);
        layer.add_line(Line {
            points: vec![
                (Point::new(mm(x1), mm(A4_HEIGHT - y)), false),
                (Point::new(mm(x2), mm(A4_HEIGHT - y)), false),
            ],
            is_closed: false,
        });
    }

    fn place_image(&self, image: &DynamicImage, x: f32, y: f32, width: f32, height: f32) {
        let px_width = image.width().max(1) as f32;
        // at this dpi the image's natural size is exactly `width` points
        let dpi = px_width * 72.0 / width;
        Image::from_dynamic_image(image).add_to_layer(
            self.layer().clone(),
            ImageTransform {
                translate_x: Some(mm(x)),
                translate_y: Some(mm(A4_HEIGHT - (y + height))),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
    }

    /// Scale `image` to fit in `max_width` × `max_height`, centred on the
    /// content column at the cursor. Returns the drawn height.
    pub fn image_fit(&mut self, image: &DynamicImage, max_width: f32, max_height: f32) -> f32 {
        let (w, h) = fit_size(image.width(), image.height(), max_width, max_height);
        let x = MARGIN + (self.content_width() - w).max(0.0) / 2.0;
        self.place_image(image, x, self.y, w, h);
        self.y += h;
        h
    }

    /// Draw `image` at a fixed position with the given width, keeping its
    /// aspect ratio. The cursor does not move.
    pub fn image_at(&mut self, image: &DynamicImage, x: f32, y: f32, width: f32) {
        let ratio = image.height().max(1) as f32 / image.width().max(1) as f32;
        self.place_image(image, x, y, width, width * ratio);
    }

    pub fn finish(self) -> Result<Vec<u8>, DocumentError> {
        let Self { doc, pages, .. } = self;
        drop(pages);
        doc.save_to_bytes().map_err(pdf_err)
    }
}

/// Largest size with the image's aspect ratio that fits the box.
pub fn fit_size(px_width: u32, px_height: u32, max_width: f32, max_height: f32) -> (f32, f32) {
    let w = px_width.max(1) as f32;
    let h = px_height.max(1) as f32;
    let scale = (max_width / w).min(max_height / h);
    (w * scale, h * scale)
}
