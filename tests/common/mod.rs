#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use phashstore::imaging::{ImageHasher, ImagingError};
use phashstore::Fingerprint;
use std::io::Cursor;

/// Reads the fingerprint back from the red channel of the first 8 pixels.
///
/// Lets tests pick exact Hamming distances between "images".
pub struct PixelHasher;

impl ImageHasher for PixelHasher {
    fn fingerprint(&self, image: &DynamicImage) -> Result<Fingerprint, ImagingError> {
        let rgb = image.to_rgb8();
        if rgb.width() < 8 {
            return Err(ImagingError::Hash("image narrower than 8 pixels".into()));
        }
        let mut bytes = [0u8; 8];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = rgb.get_pixel(i as u32, 0)[0];
        }
        Ok(Fingerprint::from_be_bytes(bytes))
    }
}

/// Image whose [`PixelHasher`] fingerprint is `value`.
pub fn image_for(value: u64) -> DynamicImage {
    let bytes = value.to_be_bytes();
    DynamicImage::ImageRgb8(RgbImage::from_fn(8, 2, |x, y| {
        Rgb([bytes[x as usize], y as u8, 0])
    }))
}

/// Encode `image` in `format`.
pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).unwrap();
    out.into_inner()
}

/// PNG bytes whose [`PixelHasher`] fingerprint is `value`.
pub fn png_for(value: u64) -> Vec<u8> {
    encode(&image_for(value), ImageFormat::Png)
}

/// Smooth gradient photo-like image for the real perceptual hasher.
pub fn gradient(width: u32, height: u32, shift: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        let r = ((x * 255) / width) as u8;
        let g = ((y * 255) / height) as u8;
        Rgb([r.wrapping_add(shift), g, 128])
    }))
}

/// Value with the low `bits` bits flipped relative to `base`.
pub fn flip_low_bits(base: u64, bits: u32) -> u64 {
    let mask = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
    base ^ mask
}
