//! Decoding, WebP canonicalization and fingerprinting of raw image bytes.
//!
//! Every stored image is WebP. Inputs that already are WebP are stored
//! byte-for-byte; anything else the `image` crate can decode is re-encoded
//! as lossy WebP at [`WEBP_QUALITY`].

pub mod perceptual;

use image::{DynamicImage, ImageFormat};
use thiserror::Error;
use webp::Encoder;

pub use perceptual::{ImageHasher, PerceptualAlgorithm, PerceptualHasher};

/// Lossy WebP quality (0-100) for re-encoded inputs.
pub const WEBP_QUALITY: f32 = 75.0;

/// Errors from the imaging collaborators.
#[derive(Debug, Error)]
pub enum ImagingError {
    /// Bytes are not an image in any supported format.
    #[error("not an image: {0}")]
    NotAnImage(#[source] image::ImageError),

    /// The perceptual hash could not be computed.
    #[error("hash failed: {0}")]
    Hash(String),

    /// Re-encoding to WebP failed.
    #[error("WebP encoding failed: {0}")]
    Encode(String),
}

/// A decoded input image.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Decoded pixels
    pub image: DynamicImage,
    /// Detected container format
    pub format: Option<ImageFormat>,
}

impl DecodedImage {
    /// Returns true if the input was already WebP.
    #[must_use]
    pub fn is_webp(&self) -> bool {
        self.format == Some(ImageFormat::WebP)
    }
}

/// Decode raw bytes in any supported format.
pub fn decode(bytes: &[u8]) -> Result<DecodedImage, ImagingError> {
    let format = image::guess_format(bytes).ok();
    let image = image::load_from_memory(bytes).map_err(ImagingError::NotAnImage)?;
    Ok(DecodedImage { image, format })
}

/// Encode pixels as lossy WebP.
pub fn encode_webp(image: &DynamicImage) -> Result<Vec<u8>, ImagingError> {
    if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        encode_lossy(Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height()))
    } else {
        let rgb = image.to_rgb8();
        encode_lossy(Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height()))
    }
}

fn encode_lossy(encoder: Encoder<'_>) -> Result<Vec<u8>, ImagingError> {
    encoder
        .encode_simple(false, WEBP_QUALITY)
        .map(|memory| memory.to_vec())
        .map_err(|e| ImagingError::Encode(format!("{:?}", e)))
}

/// Bytes to persist for `decoded`: the original when it is WebP, a re-encode otherwise.
pub fn canonical_bytes(decoded: &DecodedImage, raw: &[u8]) -> Result<Vec<u8>, ImagingError> {
    if decoded.is_webp() {
        log::trace!("[imaging] input already WebP, storing {} bytes as-is", raw.len());
        return Ok(raw.to_vec());
    }
    encode_webp(&decoded.image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 0]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let decoded = decode(&png_bytes()).unwrap();
        assert_eq!(decoded.format, Some(ImageFormat::Png));
        assert!(!decoded.is_webp());
        assert_eq!(decoded.image.width(), 16);
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode(b"definitely not an image"),
            Err(ImagingError::NotAnImage(_))
        ));
    }

    #[test]
    fn test_png_is_reencoded_to_webp() {
        let raw = png_bytes();
        let decoded = decode(&raw).unwrap();
        let stored = canonical_bytes(&decoded, &raw).unwrap();
        assert_eq!(image::guess_format(&stored).unwrap(), ImageFormat::WebP);
    }

    // Simple-format lossy files carry a "VP8 " chunk; lossless ones "VP8L"
    fn chunk_tag(webp: &[u8]) -> &[u8] {
        &webp[12..16]
    }

    #[test]
    fn test_reencode_is_lossy() {
        let raw = png_bytes();
        let decoded = decode(&raw).unwrap();
        let stored = canonical_bytes(&decoded, &raw).unwrap();
        assert_eq!(chunk_tag(&stored), b"VP8 ");

        let back = decode(&stored).unwrap();
        assert!(back.is_webp());
        assert_eq!((back.image.width(), back.image.height()), (16, 16));
    }

    #[test]
    fn test_webp_passthrough() {
        let raw = png_bytes();
        let webp = encode_webp(&decode(&raw).unwrap().image).unwrap();
        let decoded = decode(&webp).unwrap();
        assert!(decoded.is_webp());
        assert_eq!(canonical_bytes(&decoded, &webp).unwrap(), webp);
    }

    #[test]
    fn test_encode_with_alpha() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::new(4, 4));
        let webp = encode_webp(&img).unwrap();
        assert_eq!(image::guess_format(&webp).unwrap(), ImageFormat::WebP);
    }
}
