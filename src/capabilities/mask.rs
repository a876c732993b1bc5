//! Alpha-mask helpers shared by the capabilities

use crate::error::{BatchError, Result};
use image::{DynamicImage, ImageBuffer, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Single-channel foreground mask, one byte per pixel in row-major order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphaMask {
    pub data: Vec<u8>,
    pub dimensions: (u32, u32),
}

impl AlphaMask {
    /// Create a mask, checking that `data` covers every pixel
    ///
    /// # Errors
    /// - Data length does not match `width * height`
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Result<Self> {
        let expected = dimensions.0 as usize * dimensions.1 as usize;
        if data.len() != expected {
            return Err(BatchError::capability(format!(
                "Mask has {} values, expected {} for {}x{}",
                data.len(),
                expected,
                dimensions.0,
                dimensions.1
            )));
        }
        Ok(Self { data, dimensions })
    }

    /// Fraction of pixels that keep some opacity
    #[must_use]
    pub fn foreground_ratio(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let kept = self.data.iter().filter(|&&v| v > 0).count();
        kept as f32 / self.data.len() as f32
    }
}

/// Decode input bytes in any supported format
///
/// # Errors
/// - Unrecognised or corrupt image data
pub fn decode_input(bytes: &[u8]) -> Result<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

/// Apply `mask` as the alpha channel of `image`
///
/// An existing alpha channel is combined with the mask by taking the lower
/// of the two values. Fully transparent pixels are zeroed.
#[must_use]
pub fn apply_alpha_mask(image: &DynamicImage, mask: &AlphaMask) -> RgbaImage {
    let rgba = image.to_rgba8();
    let (width, _) = rgba.dimensions();
    let mut result = ImageBuffer::new(rgba.width(), rgba.height());

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let index = (y * width + x) as usize;
        let alpha = mask.data.get(index).copied().unwrap_or(0).min(pixel[3]);

        if alpha > 0 {
            result.put_pixel(x, y, image::Rgba([pixel[0], pixel[1], pixel[2], alpha]));
        } else {
            result.put_pixel(x, y, image::Rgba([0, 0, 0, 0]));
        }
    }

    result
}

/// Encode an RGBA image as PNG bytes
///
/// # Errors
/// - PNG encoding failures
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, ImageFormat::Png)?;
    Ok(cursor.into_inner())
}
