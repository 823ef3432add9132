//! Geometric transforms: EXIF orientation mapping and exact rotations.
//!
//! Rotations are explicit per-pixel coordinate remaps into a freshly
//! allocated buffer, so bounds handling does not depend on any general
//! affine-transform routine.

use image::{DynamicImage, ImageBuffer, Pixel};

/// Clockwise rotation applied to correct a stored orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    /// Map an EXIF orientation code (1-8) to a rotation.
    ///
    /// Mirrored codes (2, 4, 5, 7) collapse onto the rotation they share
    /// with their unmirrored neighbour; the flip itself is not applied.
    /// Unknown codes mean no rotation.
    pub fn from_orientation(code: u32) -> Self {
        match code {
            3 | 4 => Rotation::Cw180,
            5 | 6 => Rotation::Cw90,
            7 | 8 => Rotation::Cw270,
            _ => Rotation::None,
        }
    }

    /// Normalize arbitrary degrees; anything but a multiple of 90 is `None`.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Cw90),
            180 => Some(Rotation::Cw180),
            270 => Some(Rotation::Cw270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }
}

/// Rotate an image clockwise by `degrees`.
///
/// Degrees are normalized modulo 360; values that are not a multiple of 90
/// return the source unchanged.
pub fn rotate(image: DynamicImage, degrees: i32) -> DynamicImage {
    match Rotation::from_degrees(degrees) {
        Some(Rotation::None) | None => image,
        Some(rotation) => rotate_dynamic(&image, rotation),
    }
}

fn rotate_dynamic(image: &DynamicImage, rotation: Rotation) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(remap(buf, rotation)),
        DynamicImage::ImageLumaA8(buf) => DynamicImage::ImageLumaA8(remap(buf, rotation)),
        DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(remap(buf, rotation)),
        DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(remap(buf, rotation)),
        DynamicImage::ImageLuma16(buf) => DynamicImage::ImageLuma16(remap(buf, rotation)),
        DynamicImage::ImageLumaA16(buf) => DynamicImage::ImageLumaA16(remap(buf, rotation)),
        DynamicImage::ImageRgb16(buf) => DynamicImage::ImageRgb16(remap(buf, rotation)),
        DynamicImage::ImageRgba16(buf) => DynamicImage::ImageRgba16(remap(buf, rotation)),
        DynamicImage::ImageRgb32F(buf) => DynamicImage::ImageRgb32F(remap(buf, rotation)),
        DynamicImage::ImageRgba32F(buf) => DynamicImage::ImageRgba32F(remap(buf, rotation)),
        other => DynamicImage::ImageRgba8(remap(&other.to_rgba8(), rotation)),
    }
}

/// Copy every pixel to its rotated coordinate.
///
/// For a `w x h` source, (x, y) lands on:
/// - 90:  (h - 1 - y, x)       in an `h x w` buffer
/// - 180: (w - 1 - x, h - 1 - y) in a `w x h` buffer
/// - 270: (y, w - 1 - x)       in an `h x w` buffer
fn remap<P: Pixel>(
    src: &ImageBuffer<P, Vec<P::Subpixel>>,
    rotation: Rotation,
) -> ImageBuffer<P, Vec<P::Subpixel>> {
    let (w, h) = src.dimensions();
    let (dst_w, dst_h) = match rotation {
        Rotation::Cw90 | Rotation::Cw270 => (h, w),
        Rotation::None | Rotation::Cw180 => (w, h),
    };
    let mut dst = ImageBuffer::new(dst_w, dst_h);

    for (x, y, pixel) in src.enumerate_pixels() {
        let (dx, dy) = match rotation {
            Rotation::None => (x, y),
            Rotation::Cw90 => (h - 1 - y, x),
            Rotation::Cw180 => (w - 1 - x, h - 1 - y),
            Rotation::Cw270 => (y, w - 1 - x),
        };
        dst.put_pixel(dx, dy, *pixel);
    }
    dst
}
