//! Synthesized image fixtures for tests.

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

/// EXIF fields to embed in a test JPEG.
#[derive(Debug, Default)]
pub struct ExifFixture {
    pub orientation: Option<u16>,
    pub date_time: Option<&'static str>,
    pub date_time_original: Option<&'static str>,
    /// PixelXDimension and PixelYDimension
    pub pixel_dimensions: Option<(u32, u32)>,
    pub gps: Option<GpsFixture>,
}

/// Whole degrees, minutes and seconds with their hemisphere references.
#[derive(Debug, Clone, Copy)]
pub struct GpsFixture {
    pub latitude: [u32; 3],
    pub latitude_ref: u8,
    pub longitude: [u32; 3],
    pub longitude_ref: u8,
}

/// A gradient JPEG of the given size.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    });
    let mut buffer = Vec::new();
    img.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, 90))
        .expect("encode test jpeg");
    buffer
}

/// A PNG, half transparent when `alpha` is set.
pub fn png_bytes(width: u32, height: u32, alpha: bool) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        let a = if alpha && x < width / 2 { 0 } else { 255 };
        Rgba([200, 30, 30, a])
    });
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageFormat::Png)
        .expect("encode test png");
    cursor.into_inner()
}

/// A JPEG carrying an APP1 EXIF segment right after SOI.
pub fn jpeg_with_exif(width: u32, height: u32, exif: &ExifFixture) -> Vec<u8> {
    let jpeg = jpeg_bytes(width, height);
    let tiff = exif_tiff(exif);

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&tiff);
    let segment_len = (payload.len() + 2) as u16;

    let mut out = Vec::with_capacity(jpeg.len() + payload.len() + 4);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// One IFD entry; values over four bytes go to the data area.
struct Entry {
    tag: u16,
    kind: u16,
    count: u32,
    inline: u32,
    data: Vec<u8>,
}

impl Entry {
    fn inline(tag: u16, kind: u16, count: u32, value: u32) -> Self {
        Self {
            tag,
            kind,
            count,
            inline: value,
            data: Vec::new(),
        }
    }

    fn datetime(tag: u16, value: &str) -> Self {
        let mut data = Vec::new();
        push_datetime(&mut data, value);
        Self {
            tag,
            kind: 2,
            count: 20,
            inline: 0,
            data,
        }
    }

    fn degrees(tag: u16, dms: [u32; 3]) -> Self {
        let data = dms
            .iter()
            .flat_map(|part| [part.to_be_bytes(), 1u32.to_be_bytes()])
            .flatten()
            .collect();
        Self {
            tag,
            kind: 5,
            count: 3,
            inline: 0,
            data,
        }
    }
}

fn ifd_len(entries: usize) -> usize {
    2 + 12 * entries + 4
}

/// Sub-IFDs without fields are left out entirely.
fn sub_ifd_len(ifd: &[Entry]) -> usize {
    if ifd.is_empty() {
        0
    } else {
        ifd_len(ifd.len())
    }
}

/// Big-endian TIFF structure: IFD0, then the Exif IFD and GPS IFD when
/// they have fields, then the out-of-line values.
fn exif_tiff(exif: &ExifFixture) -> Vec<u8> {
    let mut exif_ifd = Vec::new();
    if let Some(original) = exif.date_time_original {
        exif_ifd.push(Entry::datetime(0x9003, original));
    }
    if let Some((width, height)) = exif.pixel_dimensions {
        exif_ifd.push(Entry::inline(0xA002, 4, 1, width));
        exif_ifd.push(Entry::inline(0xA003, 4, 1, height));
    }

    let mut gps_ifd = Vec::new();
    if let Some(gps) = exif.gps {
        // One-letter ASCII refs fit inline, left-justified
        let latitude_ref = u32::from(gps.latitude_ref) << 24;
        let longitude_ref = u32::from(gps.longitude_ref) << 24;
        gps_ifd.push(Entry::inline(0x0001, 2, 2, latitude_ref));
        gps_ifd.push(Entry::degrees(0x0002, gps.latitude));
        gps_ifd.push(Entry::inline(0x0003, 2, 2, longitude_ref));
        gps_ifd.push(Entry::degrees(0x0004, gps.longitude));
    }

    let mut ifd0 = Vec::new();
    if let Some(orientation) = exif.orientation {
        ifd0.push(Entry::inline(0x0112, 3, 1, u32::from(orientation) << 16));
    }
    if let Some(date_time) = exif.date_time {
        ifd0.push(Entry::datetime(0x0132, date_time));
    }

    let pointers = usize::from(!exif_ifd.is_empty()) + usize::from(!gps_ifd.is_empty());
    let exif_offset = 8 + ifd_len(ifd0.len() + pointers);
    let gps_offset = exif_offset + sub_ifd_len(&exif_ifd);
    if !exif_ifd.is_empty() {
        ifd0.push(Entry::inline(0x8769, 4, 1, exif_offset as u32));
    }
    if !gps_ifd.is_empty() {
        ifd0.push(Entry::inline(0x8825, 4, 1, gps_offset as u32));
    }

    let mut data_offset = gps_offset + sub_ifd_len(&gps_ifd);
    let mut data = Vec::new();
    let mut tiff = b"MM\x00\x2A".to_vec();
    tiff.extend_from_slice(&8u32.to_be_bytes());
    for (index, ifd) in [ifd0, exif_ifd, gps_ifd].into_iter().enumerate() {
        if index > 0 && ifd.is_empty() {
            continue;
        }
        tiff.extend_from_slice(&(ifd.len() as u16).to_be_bytes());
        for entry in ifd {
            let value = if entry.data.is_empty() {
                entry.inline
            } else {
                let offset = data_offset as u32;
                data_offset += entry.data.len();
                data.extend_from_slice(&entry.data);
                offset
            };
            tiff.extend_from_slice(&entry.tag.to_be_bytes());
            tiff.extend_from_slice(&entry.kind.to_be_bytes());
            tiff.extend_from_slice(&entry.count.to_be_bytes());
            tiff.extend_from_slice(&value.to_be_bytes());
        }
        tiff.extend_from_slice(&0u32.to_be_bytes());
    }
    tiff.extend_from_slice(&data);
    tiff
}

fn push_datetime(data: &mut Vec<u8>, value: &str) {
    assert_eq!(value.len(), 19, "EXIF datetime must be YYYY:MM:DD HH:MM:SS");
    data.extend_from_slice(value.as_bytes());
    data.push(0);
}
