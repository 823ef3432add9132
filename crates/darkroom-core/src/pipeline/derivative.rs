//! Derivative generation: width ladders, blur placeholder, JPEG encoding.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use std::borrow::Cow;

use crate::config::{DerivativeConfig, DEFAULT_JPEG_QUALITY};
use crate::keys::ObjectKeyParts;
use crate::types::{DerivativePurpose, DerivativeSpec};

/// Content type of every derivative written by the pipeline.
pub const DERIVATIVE_CONTENT_TYPE: &str = "image/jpeg";

/// Plans and renders the derivatives of one image.
#[derive(Debug, Clone)]
pub struct DerivativeGenerator {
    config: DerivativeConfig,
}

impl DerivativeGenerator {
    pub fn new(config: DerivativeConfig) -> Self {
        Self { config }
    }

    /// One spec per tile width, one per thumbnail width, then the blur.
    ///
    /// A width present in both ladders is planned once, as a tile, since
    /// both would be written to the same key.
    pub fn plan(&self, parts: &ObjectKeyParts, directory: &str) -> Vec<DerivativeSpec> {
        let mut specs: Vec<DerivativeSpec> = Vec::new();
        let ladders = [
            (DerivativePurpose::Tile, &self.config.tile_widths),
            (DerivativePurpose::Thumbnail, &self.config.thumbnail_widths),
        ];
        for (purpose, widths) in ladders {
            for &width in widths.iter() {
                if specs.iter().any(|s| s.width == width) {
                    continue;
                }
                specs.push(DerivativeSpec {
                    purpose,
                    width,
                    key: parts.tile_key(directory, width),
                });
            }
        }
        specs.push(DerivativeSpec {
            purpose: DerivativePurpose::Blur,
            width: self.config.blur_long_side,
            key: parts.blur_key(directory),
        });
        specs
    }

    /// Resize and encode one derivative.
    pub fn render(
        &self,
        image: &DynamicImage,
        spec: &DerivativeSpec,
    ) -> image::ImageResult<Vec<u8>> {
        let resized = match spec.purpose {
            DerivativePurpose::Tile | DerivativePurpose::Thumbnail => {
                resize_to_width(image, spec.width)
            }
            DerivativePurpose::Blur => resize_to_longest_side(image, spec.width),
        };
        encode_jpeg(&resized, self.config.jpeg_quality)
    }
}

/// Downscale to `target_width`, preserving aspect ratio.
///
/// The source is borrowed back unchanged when it is already at most
/// `target_width` wide; images are never upscaled.
pub fn resize_to_width(image: &DynamicImage, target_width: u32) -> Cow<'_, DynamicImage> {
    let (width, height) = image.dimensions();
    if width <= target_width || target_width == 0 {
        return Cow::Borrowed(image);
    }
    let target_height = scaled(height, target_width, width);
    Cow::Owned(image.resize_exact(target_width, target_height, FilterType::CatmullRom))
}

/// Downscale so the longer side is `max_long_side`; never upscales.
pub fn resize_to_longest_side(image: &DynamicImage, max_long_side: u32) -> Cow<'_, DynamicImage> {
    let (width, height) = image.dimensions();
    let long_side = width.max(height);
    if long_side <= max_long_side || max_long_side == 0 {
        return Cow::Borrowed(image);
    }
    let (target_width, target_height) = if width >= height {
        (max_long_side, scaled(height, max_long_side, width))
    } else {
        (scaled(width, max_long_side, height), max_long_side)
    };
    Cow::Owned(image.resize_exact(target_width, target_height, FilterType::CatmullRom))
}

/// `side * numerator / denominator`, rounded, at least 1.
fn scaled(side: u32, numerator: u32, denominator: u32) -> u32 {
    let value = (side as f64 * numerator as f64 / denominator as f64).round();
    (value as u32).max(1)
}

/// Encode as baseline JPEG.
///
/// Quality outside 1..=100 falls back to the default. Alpha is composited
/// onto opaque white first, since JPEG cannot carry it.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> image::ImageResult<Vec<u8>> {
    let quality = if (1..=100).contains(&quality) {
        quality
    } else {
        DEFAULT_JPEG_QUALITY
    };
    let rgb = if image.color().has_alpha() {
        flatten_onto_white(image)
    } else {
        image.to_rgb8()
    };

    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    rgb.write_with_encoder(encoder)?;
    Ok(buffer)
}

/// Alpha-composite every pixel over white.
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    const SLUG: &str = "6f1c8d2e-1b7a-4f5e-8c3d-2a9b0e4f7c61";

    fn generator() -> DerivativeGenerator {
        DerivativeGenerator::new(DerivativeConfig {
            tile_widths: vec![640, 1280],
            thumbnail_widths: vec![200, 640],
            jpeg_quality: 80,
            blur_long_side: 32,
        })
    }

    #[test]
    fn test_plan_covers_both_ladders_and_blur() {
        let parts = ObjectKeyParts::parse(&format!("staging/{SLUG}.jpg"), None).unwrap();
        let specs = generator().plan(&parts, "2022");
        let keys: Vec<&str> = specs.iter().map(|s| s.key.as_str()).collect();
        let tile_640 = format!("2022/{SLUG}_tile_w640.jpg");
        let tile_1280 = format!("2022/{SLUG}_tile_w1280.jpg");
        let tile_200 = format!("2022/{SLUG}_tile_w200.jpg");
        let blur = format!("2022/{SLUG}_blur.jpg");
        assert_eq!(keys, vec![&tile_640, &tile_1280, &tile_200, &blur]);
        assert_eq!(specs[2].purpose, DerivativePurpose::Thumbnail);
        assert_eq!(specs[3].purpose, DerivativePurpose::Blur);
    }

    #[test]
    fn test_resize_never_upscales() {
        let img = DynamicImage::new_rgb8(300, 200);
        assert!(matches!(resize_to_width(&img, 300), Cow::Borrowed(_)));
        assert!(matches!(resize_to_width(&img, 1000), Cow::Borrowed(_)));
        assert!(matches!(resize_to_longest_side(&img, 300), Cow::Borrowed(_)));
        assert_eq!(resize_to_width(&img, 1000).dimensions(), (300, 200));
    }

    #[test]
    fn test_resize_to_width_rounds_height() {
        let img = DynamicImage::new_rgb8(1000, 667);
        let resized = resize_to_width(&img, 300);
        // 667 * 0.3 = 200.1
        assert_eq!(resized.dimensions(), (300, 200));

        let img = DynamicImage::new_rgb8(999, 5);
        let resized = resize_to_width(&img, 100);
        assert_eq!(resized.dimensions(), (100, 1));
    }

    #[test]
    fn test_resized_width_never_exceeds_target() {
        let cases = [
            (4000, 3000, 640),
            (641, 480, 640),
            (5000, 10, 1),
            (1234, 5678, 200),
        ];
        for (w, h, target) in cases {
            let img = DynamicImage::new_rgb8(w, h);
            let resized = resize_to_width(&img, target);
            assert!(resized.width() <= target, "{w}x{h} -> {target}");
        }
    }

    #[test]
    fn test_resize_to_longest_side_portrait() {
        let img = DynamicImage::new_rgb8(300, 600);
        let resized = resize_to_longest_side(&img, 32);
        assert_eq!(resized.dimensions(), (16, 32));
    }

    #[test]
    fn test_encode_jpeg_produces_jpeg() {
        let img = DynamicImage::new_rgb8(16, 16);
        let bytes = encode_jpeg(&img, 90).unwrap();
        assert_eq!(&bytes[0..3], &[0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_encode_jpeg_clamps_quality() {
        let img = DynamicImage::new_rgb8(16, 16);
        assert!(encode_jpeg(&img, 0).is_ok());
        assert!(encode_jpeg(&img, 200).is_ok());
    }

    #[test]
    fn test_transparent_pixels_become_white() {
        let mut rgba = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 0]));
        for x in 8..16 {
            for y in 0..16 {
                rgba.put_pixel(x, y, Rgba([0, 0, 255, 255]));
            }
        }
        let bytes = encode_jpeg(&DynamicImage::ImageRgba8(rgba), 95).unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert!(!decoded.color().has_alpha());
        let rgb = decoded.to_rgb8();
        let corner = rgb.get_pixel(1, 1);
        assert!(corner.0.iter().all(|&c| c > 240), "got {corner:?}");
        let opaque = rgb.get_pixel(14, 8);
        assert!(opaque[2] > 200 && opaque[0] < 60, "got {opaque:?}");
    }

    #[test]
    fn test_render_blur_is_small() {
        let img = DynamicImage::new_rgb8(800, 400);
        let parts = ObjectKeyParts::parse(&format!("staging/{SLUG}.png"), None).unwrap();
        let generator = generator();
        let blur = generator
            .plan(&parts, "2022")
            .into_iter()
            .find(|s| s.purpose == DerivativePurpose::Blur)
            .unwrap();
        let bytes = generator.render(&img, &blur).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (32, 16));
    }
}
