//! Generic report: title, introduction, numbered sections with optional
//! images, conclusion and a page footer on every page.

use serde::Deserialize;
use utoipa::ToSchema;

use super::canvas::{Align, Hex, PdfCanvas, MARGIN};
use super::common::{epoch_millis, format_french_date, sanitize_filename};
use super::metrics::FontFace;
use super::{DocumentError, GeneratedDocument, Generator, SectionImage, Validator};
use crate::images::{decode_for_pdf, ImageSource};

const TITLE_BLUE: Hex = Hex("#1e40af");
const RULE_BLUE: Hex = Hex("#3b82f6");
const HEADING: Hex = Hex("#1f2937");
const BODY: Hex = Hex("#374151");
const MUTED: Hex = Hex("#6b7280");
const FAINT: Hex = Hex("#9ca3af");
const ERROR_RED: Hex = Hex("#ef4444");

const BODY_LINE_GAP: f32 = 3.0;
const SECTION_BREAK_MARGIN: f32 = 150.0;
const IMAGE_MAX_HEIGHT: f32 = 300.0;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportSection {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub image_path: Option<String>,
    /// Inline base64 image, data-URL prefix allowed.
    pub image: Option<String>,
    pub image_caption: Option<String>,
}

impl ReportSection {
    pub fn image_source(&self) -> Option<ImageSource> {
        ImageSource::pick(
            self.image_url.as_deref(),
            self.image_path.as_deref(),
            self.image.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReportContent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub introduction: String,
    pub sections: Option<Vec<ReportSection>>,
    #[serde(default)]
    pub conclusion: String,
}

impl ReportContent {
    pub fn sections(&self) -> &[ReportSection] {
        self.sections.as_deref().unwrap_or_default()
    }
}

impl Validator for ReportContent {
    fn validate(&self) -> Result<(), String> {
        let mut missing = Vec::new();
        if self.title.is_empty() {
            missing.push("title");
        }
        if self.introduction.is_empty() {
            missing.push("introduction");
        }
        if self.sections.is_none() {
            missing.push("sections");
        }
        if self.conclusion.is_empty() {
            missing.push("conclusion");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("Champs requis: {}", missing.join(", ")))
        }
    }
}

/// A report with its section images already fetched, one entry per section.
#[derive(Debug, Clone)]
pub struct ReportJob {
    pub content: ReportContent,
    pub images: Vec<SectionImage>,
}

pub struct ReportGenerator;

impl Generator<ReportJob> for ReportGenerator {
    fn generate(&self, job: ReportJob) -> Result<GeneratedDocument, DocumentError> {
        let bytes = render_report(&job.content, &job.images, &format_french_date())?;
        Ok(GeneratedDocument {
            filename: report_filename(&job.content.title),
            bytes,
        })
    }
}

pub fn report_filename(title: &str) -> String {
    format!(
        "rapport_{}_{}.pdf",
        sanitize_filename(title).to_lowercase(),
        epoch_millis()
    )
}

fn heading(canvas: &mut PdfCanvas, label: &str) {
    canvas
        .font(FontFace::Bold, 16.0)
        .color(HEADING)
        .text(label, Align::Left, 0.0);
    canvas.move_down(0.5);
}

fn body(canvas: &mut PdfCanvas, text: &str) {
    canvas
        .font(FontFace::Regular, 11.0)
        .color(BODY)
        .text(text, Align::Justify, BODY_LINE_GAP);
}

fn image_notice(canvas: &mut PdfCanvas, message: &str) {
    canvas
        .font(FontFace::Regular, 10.0)
        .color(ERROR_RED)
        .text("Erreur lors du chargement de l'image", Align::Center, 0.0);
    canvas
        .font(FontFace::Regular, 8.0)
        .color(FAINT)
        .text(&format!("({})", message), Align::Center, 0.0);
    canvas.move_down(1.0);
}

fn section_image(canvas: &mut PdfCanvas, section: &ReportSection, image: &SectionImage) {
    let bytes = match image {
        SectionImage::None => return,
        SectionImage::Failed(message) => {
            log::error!("Section image unavailable: {}", message);
            image_notice(canvas, message);
            return;
        }
        SectionImage::Loaded(bytes) => bytes,
    };

    let decoded = match decode_for_pdf(bytes) {
        Ok(decoded) => decoded,
        Err(e) => {
            log::error!("Section image could not be embedded: {}", e);
            image_notice(canvas, &e.to_string());
            return;
        }
    };

    if canvas.y > canvas.page_height() - IMAGE_MAX_HEIGHT - 100.0 {
        canvas.add_page();
    }
    let max_width = canvas.content_width();
    canvas.image_fit(&decoded, max_width, IMAGE_MAX_HEIGHT);
    canvas.move_down(1.0);

    if let Some(caption) = section.image_caption.as_deref().filter(|c| !c.is_empty()) {
        canvas
            .font(FontFace::Oblique, 9.0)
            .color(MUTED)
            .text(caption, Align::Center, 0.0);
        canvas.move_down(1.0);
    }
}

/// Lay out the whole report. `images` lines up with the sections; missing
/// entries mean "no image".
pub fn render_report(
    content: &ReportContent,
    images: &[SectionImage],
    date: &str,
) -> Result<Vec<u8>, DocumentError> {
    let mut canvas = PdfCanvas::new(&content.title, None)?;
    let page_width = canvas.page_width();
    let section_limit = canvas.page_height() - SECTION_BREAK_MARGIN;

    canvas
        .font(FontFace::Bold, 26.0)
        .color(TITLE_BLUE)
        .text(&content.title, Align::Center, 0.0);
    canvas.move_down(0.5);
    let rule_y = canvas.y;
    canvas.rule(MARGIN, page_width - MARGIN, rule_y, 2.0, RULE_BLUE);
    canvas.move_down(1.0);

    canvas
        .font(FontFace::Regular, 10.0)
        .color(MUTED)
        .text(&format!("Date: {}", date), Align::Right, 0.0);
    canvas.move_down(2.0);

    if !content.introduction.is_empty() {
        heading(&mut canvas, "Introduction");
        body(&mut canvas, &content.introduction);
        canvas.move_down(2.0);
    }

    for (index, section) in content.sections().iter().enumerate() {
        canvas.break_if_below(section_limit);

        let title = section
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("Section");
        canvas
            .font(FontFace::Bold, 14.0)
            .color(TITLE_BLUE)
            .text(&format!("{}. {}", index + 1, title), Align::Left, 0.0);
        canvas.move_down(0.5);

        if let Some(text) = section.content.as_deref().filter(|c| !c.is_empty()) {
            body(&mut canvas, text);
            canvas.move_down(1.0);
        }

        if let Some(image) = images.get(index) {
            section_image(&mut canvas, section, image);
        }

        canvas.move_down(1.5);
    }

    if !content.conclusion.is_empty() {
        canvas.break_if_below(section_limit);
        heading(&mut canvas, "Conclusion");
        body(&mut canvas, &content.conclusion);
    }

    let pages = canvas.page_count();
    let footer_y = canvas.page_height() - MARGIN;
    let footer_width = canvas.content_width();
    for i in 0..pages {
        canvas.switch_to_page(i);
        canvas.font(FontFace::Regular, 8.0).color(FAINT).text_at(
            &format!("Page {} sur {}", i + 1, pages),
            MARGIN,
            footer_y,
            footer_width,
            Align::Center,
            0.0,
        );
    }

    canvas.finish()
}
