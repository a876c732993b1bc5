//! Key-colour background removal
//!
//! Estimates the background colour from the image border and makes pixels
//! close to it transparent, with a linear ramp between `tolerance` and
//! `tolerance + feather` to soften edges. Needs no model and works well for
//! product shots and scans on a plain backdrop.

use super::mask::{apply_alpha_mask, decode_input, encode_png, AlphaMask};
use crate::{
    error::{BatchError, Result},
    invoker::RemovalCapability,
};
use image::RgbaImage;

/// Default colour distance treated as background
pub const DEFAULT_TOLERANCE: f32 = 30.0;

/// Default width of the soft edge ramp
pub const DEFAULT_FEATHER: f32 = 20.0;

/// Removes a uniform background by colour distance
#[derive(Debug, Clone)]
pub struct KeyColorRemover {
    tolerance: f32,
    feather: f32,
    key: Option<[u8; 3]>,
}

impl KeyColorRemover {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            feather: DEFAULT_FEATHER,
            key: None,
        }
    }

    /// Set the colour distance below which pixels become fully transparent
    ///
    /// # Errors
    /// - Negative or non-finite tolerance
    pub fn with_tolerance(mut self, tolerance: f32) -> Result<Self> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(BatchError::config_value_error(
                "tolerance",
                tolerance,
                "a finite value >= 0",
            ));
        }
        self.tolerance = tolerance;
        Ok(self)
    }

    /// Set the width of the partial-transparency ramp
    ///
    /// # Errors
    /// - Negative or non-finite feather
    pub fn with_feather(mut self, feather: f32) -> Result<Self> {
        if !feather.is_finite() || feather < 0.0 {
            return Err(BatchError::config_value_error(
                "feather",
                feather,
                "a finite value >= 0",
            ));
        }
        self.feather = feather;
        Ok(self)
    }

    /// Use a fixed key colour instead of estimating it from the border
    #[must_use]
    pub fn with_key_color(mut self, rgb: [u8; 3]) -> Self {
        self.key = Some(rgb);
        self
    }

    /// Build the alpha mask for `image`
    #[must_use]
    pub fn compute_mask(&self, image: &RgbaImage) -> AlphaMask {
        let key = self.key.unwrap_or_else(|| estimate_border_color(image));
        let data = image
            .pixels()
            .map(|p| self.alpha_for_distance(color_distance([p[0], p[1], p[2]], key)))
            .collect();
        AlphaMask {
            data,
            dimensions: image.dimensions(),
        }
    }

    fn alpha_for_distance(&self, distance: f32) -> u8 {
        if distance <= self.tolerance {
            0
        } else if self.feather <= 0.0 || distance >= self.tolerance + self.feather {
            255
        } else {
            ((distance - self.tolerance) / self.feather * 255.0).round() as u8
        }
    }
}

impl Default for KeyColorRemover {
    fn default() -> Self {
        Self::new()
    }
}

impl RemovalCapability for KeyColorRemover {
    fn name(&self) -> &str {
        "key-color"
    }

    fn remove_background(&self, input: &[u8]) -> Result<Vec<u8>> {
        let image = decode_input(input)?;
        let rgba = image.to_rgba8();
        if rgba.width() == 0 || rgba.height() == 0 {
            return Err(BatchError::capability("Image has zero width or height"));
        }

        let mask = self.compute_mask(&rgba);
        log::debug!(
            "Key-colour mask for {}x{}: {:.1}% foreground",
            rgba.width(),
            rgba.height(),
            mask.foreground_ratio() * 100.0
        );

        encode_png(&apply_alpha_mask(&image, &mask))
    }
}

/// Euclidean distance between two RGB colours
fn color_distance(a: [u8; 3], b: [u8; 3]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = f32::from(x) - f32::from(y);
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

/// Mean colour of the outermost row and column of pixels
fn estimate_border_color(image: &RgbaImage) -> [u8; 3] {
    let (width, height) = image.dimensions();
    let mut sums = [0u64; 3];
    let mut count = 0u64;

    for (x, y, pixel) in image.enumerate_pixels() {
        if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
            for (sum, &channel) in sums.iter_mut().zip(pixel.0.iter()) {
                *sum += u64::from(channel);
            }
            count += 1;
        }
    }

    if count == 0 {
        return [255, 255, 255];
    }
    sums.map(|s| (s / count) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba};

    /// White 8x8 canvas with a red 4x4 square in the middle
    fn square_on_white() -> Vec<u8> {
        let mut image = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
        for y in 2..6 {
            for x in 2..6 {
                image.put_pixel(x, y, Rgba([200, 0, 0, 255]));
            }
        }
        encode_png(&image).unwrap()
    }

    #[test]
    fn test_removes_uniform_border_background() {
        let output = KeyColorRemover::new()
            .remove_background(&square_on_white())
            .unwrap();
        let decoded = decode_input(&output).unwrap().to_rgba8();

        assert_eq!(decoded.dimensions(), (8, 8));
        assert_eq!(decoded.get_pixel(0, 0)[3], 0);
        assert_eq!(decoded.get_pixel(7, 7)[3], 0);
        assert_eq!(decoded.get_pixel(3, 3), &Rgba([200, 0, 0, 255]));
    }

    #[test]
    fn test_output_is_png() {
        let output = KeyColorRemover::new()
            .remove_background(&square_on_white())
            .unwrap();
        assert_eq!(
            image::guess_format(&output).unwrap(),
            image::ImageFormat::Png
        );
    }

    #[test]
    fn test_feather_ramp() {
        let remover = KeyColorRemover::new()
            .with_tolerance(10.0)
            .unwrap()
            .with_feather(20.0)
            .unwrap();
        assert_eq!(remover.alpha_for_distance(5.0), 0);
        assert_eq!(remover.alpha_for_distance(20.0), 128);
        assert_eq!(remover.alpha_for_distance(30.0), 255);
    }

    #[test]
    fn test_fixed_key_color() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 255]));
        let mask = KeyColorRemover::new()
            .with_key_color([0, 0, 0])
            .compute_mask(&image);
        assert!(mask.data.iter().all(|&a| a == 255));
    }

    #[test]
    fn test_border_estimate() {
        let mut image = RgbaImage::from_pixel(3, 3, Rgba([10, 20, 30, 255]));
        image.put_pixel(1, 1, Rgba([250, 250, 250, 255]));
        assert_eq!(estimate_border_color(&image), [10, 20, 30]);
    }

    #[test]
    fn test_rejects_invalid_settings() {
        assert!(KeyColorRemover::new().with_tolerance(-1.0).is_err());
        assert!(KeyColorRemover::new().with_feather(f32::NAN).is_err());
    }

    #[test]
    fn test_rejects_undecodable_input() {
        let err = KeyColorRemover::new()
            .remove_background(b"definitely not an image")
            .unwrap_err();
        assert!(matches!(err, BatchError::Image(_)));
    }

    #[test]
    fn test_accepts_jpeg_input() {
        let rgb = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255])))
            .to_rgb8();
        let mut jpeg = std::io::Cursor::new(Vec::new());
        rgb.write_to(&mut jpeg, image::ImageFormat::Jpeg).unwrap();

        let output = KeyColorRemover::new()
            .remove_background(&jpeg.into_inner())
            .unwrap();
        assert!(!output.is_empty());
    }
}
