//! Image acquisition, validation and normalization.
//!
//! Images reach the service as URLs, paths inside the assets directory or
//! base64 payloads. Bytes are sniffed by magic number, and anything the PDF
//! embedder cannot decode directly goes through [`normalize`] first.

pub mod loader;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::PathBuf;
use thiserror::Error;

pub use loader::{ImageLoader, ImageSource};

const MIN_IMAGE_BYTES: usize = 10;

/// Standard alphabet, padding optional, trailing bits tolerated.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("imageData après nettoyage est vide")]
    EmptyBase64,
    #[error("base64 invalide: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Fichier image introuvable: {path} (cwd={cwd})")]
    NotFound { path: PathBuf, cwd: PathBuf },
    #[error("Chemin d'image hors du dossier assets: {0}")]
    OutsideAssets(PathBuf),
    #[error("Lecture image impossible: {0}")]
    Io(#[from] std::io::Error),
    #[error("Téléchargement image impossible: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status} pour {url}")]
    Status { status: u16, url: String },
    #[error("Image trop volumineuse (> {limit} octets)")]
    TooLarge { limit: usize },
    #[error("Image trop petite ({0} octets)")]
    TooSmall(usize),
    #[error("Image illisible: {0}")]
    Decode(#[from] image::ImageError),
}

/// Format recognised from the leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Unknown,
}

impl ImageKind {
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            Self::Png
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Self::Jpeg
        } else if bytes.starts_with(b"GIF") {
            Self::Gif
        } else {
            Self::Unknown
        }
    }

    /// Label reported by the diagnostic endpoint.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::Gif => "GIF",
            Self::Unknown => "inconnu",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Unknown => "bin",
        }
    }
}

/// Strip a `data:image/...;base64,` prefix and every character outside the
/// base64 alphabet.
pub fn clean_base64(data: &str) -> Result<String, ImageError> {
    let payload = if data.starts_with("data:image") {
        data.split_once(',').map(|(_, rest)| rest).unwrap_or(data)
    } else {
        data
    };

    let cleaned: String = payload
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
        .collect();

    if cleaned.is_empty() {
        return Err(ImageError::EmptyBase64);
    }
    Ok(cleaned)
}

/// Decode a (possibly data-URL wrapped, possibly unpadded) base64 image.
pub fn decode_base64(data: &str) -> Result<Vec<u8>, ImageError> {
    let cleaned = clean_base64(data)?;
    // padding in the middle of the payload is not something the engine forgives
    let mut trimmed = cleaned.trim_end_matches('=');
    if trimmed.len() % 4 == 1 {
        // a lone trailing symbol carries fewer than eight bits
        trimmed = &trimmed[..trimmed.len() - 1];
    }
    Ok(LENIENT_BASE64.decode(trimmed)?)
}

/// First four bytes as lowercase hex, e.g. `"89 50 4e 47"`.
pub fn magic_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take(4)
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reject buffers too small to be an image and log what the magic bytes
/// say. Unknown formats are allowed through with a warning.
pub fn validate(bytes: &[u8]) -> Result<ImageKind, ImageError> {
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(ImageError::TooSmall(bytes.len()));
    }
    let kind = ImageKind::detect(bytes);
    log::debug!(
        "Image validation - {} | Magic: {} | {} bytes",
        kind.label(),
        magic_hex(bytes),
        bytes.len()
    );
    if kind == ImageKind::Unknown {
        log::warn!("Unrecognised image format, trying to decode anyway");
    }
    Ok(kind)
}

/// Drop any alpha channel by compositing onto white.
fn flatten(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut out = RgbImage::from_pixel(w, h, Rgb([255, 255, 255]));
    for (x, y, px) in rgba.enumerate_pixels() {
        let alpha = px[3] as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
    }
    out
}

/// Decode with format sniffing and no dimension limits, flatten alpha and
/// re-encode as PNG.
pub fn normalize(bytes: &[u8]) -> Result<Vec<u8>, ImageError> {
    let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    reader.no_limits();
    let decoded = reader.decode()?;

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(flatten(decoded)).write_to(&mut out, ImageOutputFormat::Png)?;
    Ok(out.into_inner())
}

/// Turn raw bytes into something the PDF embedder accepts: a plain decode
/// first, then a normalization pass when that fails.
pub fn decode_for_pdf(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    match image::load_from_memory(bytes) {
        Ok(decoded) => Ok(DynamicImage::ImageRgb8(flatten(decoded))),
        Err(first) => {
            log::warn!("Image decode failed ({}), normalizing", first);
            let normalized = normalize(bytes)?;
            validate(&normalized)?;
            Ok(image::load_from_memory(&normalized)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageOutputFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_detect_kinds() {
        assert_eq!(ImageKind::detect(&png_bytes(2, 2)), ImageKind::Png);
        assert_eq!(ImageKind::detect(&[0xFF, 0xD8, 0xFF, 0xE0]), ImageKind::Jpeg);
        assert_eq!(ImageKind::detect(b"GIF89a"), ImageKind::Gif);
        assert_eq!(ImageKind::detect(b"hello world").label(), "inconnu");
    }

    #[test]
    fn test_clean_base64_strips_data_url_and_noise() {
        let cleaned = clean_base64("data:image/png;base64, aGVs\nbG8=\t!").unwrap();
        assert_eq!(cleaned, "aGVsbG8=");
        assert!(matches!(clean_base64("!!! \n"), Err(ImageError::EmptyBase64)));
    }

    #[test]
    fn test_decode_base64_tolerates_missing_padding() {
        assert_eq!(decode_base64("aGVsbG8").unwrap(), b"hello");
        assert_eq!(decode_base64("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn test_decode_base64_drops_dangling_symbol() {
        assert_eq!(decode_base64("A").unwrap(), Vec::<u8>::new());
        assert_eq!(decode_base64("aGVsbG8=Q").unwrap(), b"hello");
    }

    #[test]
    fn test_validate_rejects_tiny_buffers() {
        assert!(matches!(validate(&[1, 2, 3]), Err(ImageError::TooSmall(3))));
        assert_eq!(validate(&png_bytes(3, 3)).unwrap(), ImageKind::Png);
        assert_eq!(validate(b"0123456789ab").unwrap(), ImageKind::Unknown);
    }

    #[test]
    fn test_magic_hex() {
        assert_eq!(magic_hex(&[0x89, 0x50, 0x4E, 0x47, 0x0D]), "89 50 4e 47");
    }

    #[test]
    fn test_normalize_produces_png() {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 128])))
            .write_to(&mut out, ImageOutputFormat::Bmp)
            .unwrap();
        let normalized = normalize(&out.into_inner()).unwrap();
        assert_eq!(ImageKind::detect(&normalized), ImageKind::Png);
    }

    #[test]
    fn test_flatten_blends_onto_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0])));
        assert_eq!(flatten(img).get_pixel(0, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_decode_for_pdf_rejects_garbage() {
        assert!(decode_for_pdf(b"definitely not an image").is_err());
        let decoded = decode_for_pdf(&png_bytes(8, 4)).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
    }
}
