//! Commercial offer on company letterhead.
//!
//! The letterhead (coloured bars, entity address, logo) is redrawn on every
//! page through a [`PageDecorator`]. Offers carry no page numbers.

use image::DynamicImage;
use serde::Deserialize;
use utoipa::ToSchema;

use super::canvas::{Align, Hex, PageDecorator, PdfCanvas, MARGIN};
use super::common::{epoch_millis, format_french_date};
use super::metrics::FontFace;
use super::{DocumentError, GeneratedDocument, Generator};
use crate::images::{decode_base64, normalize, validate, ImageError};

const BRAND_BLUE: Hex = Hex("#0b5fa5");
const INK: Hex = Hex("#111827");
const BODY: Hex = Hex("#374151");
const SECTION_BLUE: Hex = Hex("#1e40af");
const BANNER: Hex = Hex("#dbeafe");
const MUTED: Hex = Hex("#6b7280");
const FAINT: Hex = Hex("#9ca3af");
const ERROR_RED: Hex = Hex("#ef4444");

const TOP_BAR_HEIGHT: f32 = 16.0;
const HEADER_BLOCK_HEIGHT: f32 = 90.0;
const BOTTOM_BAR_HEIGHT: f32 = 10.0;
const HEADER_GAP: f32 = 18.0;
const LOGO_WIDTH: f32 = 140.0;
const ADDRESS_RESERVED: f32 = 170.0;
const SECTION_BREAK_MARGIN: f32 = 160.0;
const APPENDIX_MAX_HEIGHT: f32 = 420.0;

const DEFAULT_TITLE: &str = "COMMERCIAL OFFER";
const DEFAULT_APPENDIX_TITLE: &str = "Appendix - Drawing / Photo";

const FRANCE: &[&str] = &[
    "AVOCarbon France - 9 rue des imprimeurs - Z.I. de la République n° 1 - 86000 POITIERS France",
    "au capital de 3 224 460 € - RCS Poitiers B339 348 450 – Code APE 2732 Z – N° identification TVA FR 01339348450",
    "Phone : +33 5 49 62 25 00",
];
const GERMANY: &[&str] = &[
    "AVOCarbon Germany",
    "AVOCarbon Germany GmbH",
    "Talstrasse 112",
    "D-60437 Frankfurt am Main",
];
const INDIA: &[&str] = &[
    "AVOCarbon India",
    "25/A2, Dairy Plant Road SIDCO Industrial Estate (NP)",
    "Pattaravakka Ambattur Chennai – 600098",
    "Tamilnadu",
];
const KOREA: &[&str] = &[
    "AVOCarbon Korea",
    "306, Nongong-ro, Nongong-eup",
    "Dalseong-Gun, Daegu",
];
const MONTERREY: &[&str] = &[
    "ASSYMEX MONTERREY",
    "San Sebastian 110",
    "Co. Los Lermas",
    "GUADALUPE, N.L",
    "Mexico 67190",
];
const TUNISIA: &[&str] = &[
    "AVOCarbon",
    "Tunisia",
    "SCEET & SAME",
    "Zone industrielle Elfahs",
    "1140 Zaghouane",
];
const TIANJIN: &[&str] = &["AVOCarbon Tianjin", "Junling Road 17 # Beizhakou", "Jinnan District"];
const KUNSHAN: &[&str] = &["AVOCarbon Kunshan", "N°9, Dongtinghu Road", "215335 Kunshan"];

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct OfferSection {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    /// Picks the letterhead address, e.g. "AVOCarbon Germany" or "tunisia".
    pub company: Option<String>,
    pub site: Option<String>,
    pub entity: Option<String>,
    pub title: Option<String>,
    pub date: Option<String>,
    pub customer_lines: Option<Vec<String>>,
    pub customer_name: Option<String>,
    pub customer_address: Option<String>,
    pub to_person: Option<String>,
    pub subject: Option<String>,
    pub intro: Option<String>,
    pub sections: Option<Vec<OfferSection>>,
    pub closing: Option<String>,
    pub signature_name: Option<String>,
    pub signature_title: Option<String>,
    pub appendix_image_base64: Option<String>,
    pub appendix_image_title: Option<String>,
    pub appendix_image_caption: Option<String>,
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn normalize_key(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

/// Letterhead address for the offer's company, site or entity (first one
/// given). Unknown keys fall back to France.
pub fn company_address_lines(offer: &Offer) -> &'static [&'static str] {
    let key = normalize_key(&offer.company)
        .or_else(|| normalize_key(&offer.site))
        .or_else(|| normalize_key(&offer.entity));

    match key.as_deref() {
        Some("avocarbon germany") | Some("germany") => GERMANY,
        Some("avocarbon india") | Some("india") => INDIA,
        Some("avocarbon korea") | Some("korea") => KOREA,
        Some("assymex monterrey") | Some("monterrey") => MONTERREY,
        Some("tunisia") | Some("tunis") => TUNISIA,
        Some("tianjin") => TIANJIN,
        Some("kunshan") => KUNSHAN,
        _ => FRANCE,
    }
}

struct Letterhead {
    address: String,
    logo: Option<DynamicImage>,
}

impl PageDecorator for Letterhead {
    fn decorate(&self, canvas: &mut PdfCanvas) {
        let width = canvas.page_width();

        canvas.fill_rect(0.0, 0.0, width, TOP_BAR_HEIGHT, BRAND_BLUE);

        canvas.font(FontFace::Regular, 8.0).color(INK).text_at(
            &self.address,
            MARGIN,
            TOP_BAR_HEIGHT + 12.0,
            width - 2.0 * MARGIN - ADDRESS_RESERVED,
            Align::Left,
            1.0,
        );

        if let Some(logo) = &self.logo {
            canvas.image_at(
                logo,
                width - MARGIN - LOGO_WIDTH,
                TOP_BAR_HEIGHT + 12.0,
                LOGO_WIDTH,
            );
        }

        canvas.fill_rect(
            0.0,
            TOP_BAR_HEIGHT + HEADER_BLOCK_HEIGHT,
            width,
            BOTTOM_BAR_HEIGHT,
            BRAND_BLUE,
        );

        canvas.y = TOP_BAR_HEIGHT + HEADER_BLOCK_HEIGHT + BOTTOM_BAR_HEIGHT + HEADER_GAP;
    }
}

/// Renders offers; holds the raw logo bytes, if a logo could be read.
pub struct OfferGenerator {
    pub logo: Option<Vec<u8>>,
}

impl OfferGenerator {
    fn decoded_logo(&self) -> Option<DynamicImage> {
        let bytes = self.logo.as_deref()?;
        let decoded =
            validate(bytes).and_then(|_| Ok(image::load_from_memory(bytes)?));
        match decoded {
            Ok(logo) => Some(logo),
            Err(e) => {
                log::warn!("Logo not loaded: {}", e);
                None
            }
        }
    }
}

impl Generator<Offer> for OfferGenerator {
    fn generate(&self, offer: Offer) -> Result<GeneratedDocument, DocumentError> {
        let bytes = render_offer(&offer, self.decoded_logo(), &format_french_date())?;
        Ok(GeneratedDocument {
            filename: format!("offre_{}.pdf", epoch_millis()),
            bytes,
        })
    }
}

fn appendix_image(data: &str) -> Result<DynamicImage, ImageError> {
    let raw = decode_base64(data)?;
    validate(&raw)?;
    let normalized = normalize(&raw)?;
    Ok(image::load_from_memory(&normalized)?)
}

fn customer_block(canvas: &mut PdfCanvas, offer: &Offer) {
    let lines: Vec<&str> = match offer.customer_lines.as_deref() {
        Some(lines) if !lines.is_empty() => lines.iter().map(String::as_str).collect(),
        _ => Vec::new(),
    };
    let has_customer = !lines.is_empty()
        || filled(&offer.customer_name).is_some()
        || filled(&offer.customer_address).is_some()
        || filled(&offer.to_person).is_some();
    if !has_customer {
        return;
    }

    canvas
        .font(FontFace::Bold, 11.0)
        .color(INK)
        .text("Customer", Align::Left, 0.0);
    canvas.font(FontFace::Regular, 10.0).color(BODY);

    if !lines.is_empty() {
        canvas.text(&lines.join("\n"), Align::Left, 0.0);
    } else {
        if let Some(name) = filled(&offer.customer_name) {
            canvas.text(name, Align::Left, 0.0);
        }
        if let Some(address) = filled(&offer.customer_address) {
            canvas.text(address, Align::Left, 0.0);
        }
        if let Some(person) = filled(&offer.to_person) {
            canvas.text(&format!("To: {}", person), Align::Left, 0.0);
        }
    }
    canvas.move_down(1.0);
}

fn appendix(canvas: &mut PdfCanvas, offer: &Offer, data: &str) {
    canvas.add_page();
    canvas.move_down(0.5);

    let title = filled(&offer.appendix_image_title).unwrap_or(DEFAULT_APPENDIX_TITLE);
    canvas
        .font(FontFace::Bold, 12.0)
        .color(INK)
        .text(title, Align::Left, 0.0);
    canvas.move_down(0.5);

    match appendix_image(data) {
        Ok(image) => {
            let max_width = canvas.content_width();
            canvas.image_fit(&image, max_width, APPENDIX_MAX_HEIGHT);
            canvas.move_down(0.5);
            if let Some(caption) = filled(&offer.appendix_image_caption) {
                canvas
                    .font(FontFace::Oblique, 9.0)
                    .color(MUTED)
                    .text(caption, Align::Center, 0.0);
            }
        }
        Err(e) => {
            log::error!("Appendix image not loaded: {}", e);
            canvas
                .font(FontFace::Regular, 10.0)
                .color(ERROR_RED)
                .text("Appendix image not loaded.", Align::Left, 0.0);
            canvas
                .font(FontFace::Regular, 8.0)
                .color(FAINT)
                .text(&format!("({})", e), Align::Left, 0.0);
        }
    }
}

pub fn render_offer(
    offer: &Offer,
    logo: Option<DynamicImage>,
    today: &str,
) -> Result<Vec<u8>, DocumentError> {
    let letterhead = Letterhead {
        address: company_address_lines(offer).join("\n"),
        logo,
    };
    let doc_title = filled(&offer.subject).unwrap_or("Commercial Offer");
    let mut canvas = PdfCanvas::new(doc_title, Some(Box::new(letterhead)))?;
    let section_limit = canvas.page_height() - SECTION_BREAK_MARGIN;

    canvas
        .font(FontFace::Bold, 18.0)
        .color(INK)
        .text(filled(&offer.title).unwrap_or(DEFAULT_TITLE), Align::Left, 0.0);
    canvas.move_down(0.4);

    let date = filled(&offer.date).unwrap_or(today);
    canvas
        .font(FontFace::Regular, 10.0)
        .color(BODY)
        .text(&format!("Date: {}", date), Align::Left, 0.0);
    canvas.move_down(1.0);

    customer_block(&mut canvas, offer);

    if let Some(subject) = filled(&offer.subject) {
        let top = canvas.y;
        let banner_width = canvas.content_width();
        canvas.fill_rect(MARGIN, top, banner_width, 22.0, BANNER);
        canvas.font(FontFace::Bold, 10.0).color(INK).text_at(
            subject,
            MARGIN + 8.0,
            top + 6.0,
            banner_width - 16.0,
            Align::Left,
            0.0,
        );
        canvas.move_down(2.0);
    }

    if let Some(intro) = filled(&offer.intro) {
        canvas
            .font(FontFace::Regular, 11.0)
            .color(INK)
            .text(intro, Align::Justify, 3.0);
        canvas.move_down(1.0);
    }

    for section in offer.sections.as_deref().unwrap_or_default() {
        canvas.break_if_below(section_limit);
        canvas
            .font(FontFace::Bold, 12.0)
            .color(SECTION_BLUE)
            .text(filled(&section.title).unwrap_or("Section"), Align::Left, 0.0);
        canvas.move_down(0.3);
        canvas
            .font(FontFace::Regular, 11.0)
            .color(INK)
            .text(section.content.as_deref().unwrap_or(""), Align::Justify, 3.0);
        canvas.move_down(0.8);
    }

    canvas.move_down(1.0);
    canvas.font(FontFace::Regular, 11.0).color(INK);
    for line in [&offer.closing, &offer.signature_name, &offer.signature_title] {
        if let Some(line) = filled(line) {
            canvas.text(line, Align::Left, 0.0);
        }
    }

    if let Some(data) = filled(&offer.appendix_image_base64) {
        appendix(&mut canvas, offer, data);
    }

    canvas.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use image::{ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([11, 95, 165])))
            .write_to(&mut out, ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_address_lookup_order_and_fallback() {
        let mut offer = Offer {
            company: Some("  AVOCarbon Germany ".into()),
            site: Some("tunis".into()),
            ..Default::default()
        };
        assert_eq!(company_address_lines(&offer)[0], "AVOCarbon Germany");

        offer.company = Some("".into());
        assert_eq!(company_address_lines(&offer)[1], "Tunisia");

        offer.site = None;
        offer.entity = Some("Kunshan".into());
        assert_eq!(company_address_lines(&offer)[0], "AVOCarbon Kunshan");

        offer.entity = Some("Atlantis".into());
        assert!(company_address_lines(&offer)[0].starts_with("AVOCarbon France"));

        assert!(company_address_lines(&Offer::default())[0].starts_with("AVOCarbon France"));
    }

    #[test]
    fn test_deserialize_camel_case() {
        let offer: Offer = serde_json::from_value(serde_json::json!({
            "customerLines": ["ACME", "1 rue X"],
            "signatureName": "J. Doe",
            "appendixImageBase64": "AAAA",
            "sections": [{"title": "Prix", "content": "100"}]
        }))
        .unwrap();
        assert_eq!(offer.customer_lines.unwrap().len(), 2);
        assert_eq!(offer.signature_name.as_deref(), Some("J. Doe"));
        assert_eq!(offer.sections.unwrap()[0].title.as_deref(), Some("Prix"));
    }

    #[test]
    fn test_render_full_offer_with_logo_and_appendix() {
        let offer = Offer {
            company: Some("india".into()),
            customer_name: Some("ACME".into()),
            to_person: Some("M. Martin".into()),
            subject: Some("Offre balais carbone".into()),
            intro: Some("Suite à votre demande…".into()),
            sections: Some(
                (0..12)
                    .map(|i| OfferSection {
                        title: Some(format!("Lot {}", i)),
                        content: Some("Détail du lot. ".repeat(30)),
                    })
                    .collect(),
            ),
            closing: Some("Cordialement,".into()),
            signature_name: Some("J. Doe".into()),
            appendix_image_base64: Some(format!(
                "data:image/png;base64,{}",
                base64::engine::general_purpose::STANDARD.encode(png(30, 20))
            )),
            appendix_image_caption: Some("Plan".into()),
            ..Default::default()
        };

        let logo = image::load_from_memory(&png(280, 80)).ok();
        let pdf = render_offer(&offer, logo, "1 janvier 2026").unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn test_broken_appendix_still_renders() {
        let offer = Offer {
            appendix_image_base64: Some("aGVsbG8=".into()),
            ..Default::default()
        };
        let doc = OfferGenerator { logo: Some(b"garbage".to_vec()) }
            .generate(offer)
            .unwrap();
        assert!(doc.filename.starts_with("offre_"));
        assert!(doc.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_appendix_image_rejects_tiny_payload() {
        assert!(matches!(
            appendix_image("aGVsbG8="),
            Err(ImageError::TooSmall(5))
        ));
    }
}
