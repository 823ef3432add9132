//! EXIF metadata extraction from a seekable byte stream.

use chrono::{DateTime, NaiveDateTime, Utc};
use exif::{Exif, In, Reader, Tag, Value};
use std::io::{BufRead, Seek, SeekFrom};

use super::transform::Rotation;
use crate::types::{ExtractedMetadata, GpsCoordinates};

/// Extracts best-effort metadata from source images.
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Extract capture time, dimensions, rotation and GPS.
    ///
    /// Never fails: anything that cannot be read is left empty. The stream
    /// is rewound to its start on return so the caller can decode pixels
    /// from it without fetching the object again.
    pub fn extract<R: BufRead + Seek>(reader: &mut R) -> ExtractedMetadata {
        let mut metadata = ExtractedMetadata::default();

        if reader.seek(SeekFrom::Start(0)).is_ok() {
            match Reader::new().read_from_container(reader) {
                Ok(exif) => Self::fill_from_exif(&exif, &mut metadata),
                Err(e) => tracing::debug!("No usable EXIF: {e}"),
            }
        }

        if metadata.width.is_none() || metadata.height.is_none() {
            if let Some((width, height)) = Self::header_dimensions(reader) {
                metadata.width = Some(width);
                metadata.height = Some(height);
            }
        }

        if let Err(e) = reader.seek(SeekFrom::Start(0)) {
            tracing::warn!("Failed to rewind source stream: {e}");
        }
        metadata
    }

    fn fill_from_exif(exif: &Exif, metadata: &mut ExtractedMetadata) {
        metadata.captured_at = Self::get_datetime(exif);
        metadata.rotation = Self::get_u32(exif, Tag::Orientation)
            .map(|code| Rotation::from_orientation(code).degrees())
            .unwrap_or(0);
        metadata.width = Self::get_u32(exif, Tag::PixelXDimension).filter(|w| *w > 0);
        metadata.height = Self::get_u32(exif, Tag::PixelYDimension).filter(|h| *h > 0);

        let latitude = Self::get_gps_coord(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef);
        let longitude = Self::get_gps_coord(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef);
        if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
            metadata.gps = Some(GpsCoordinates {
                latitude,
                longitude,
            });
        }
    }

    /// Read pixel dimensions from the image header only.
    fn header_dimensions<R: BufRead + Seek>(reader: &mut R) -> Option<(u32, u32)> {
        reader.seek(SeekFrom::Start(0)).ok()?;
        image::ImageReader::new(reader)
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()
    }

    fn get_u32(exif: &Exif, tag: Tag) -> Option<u32> {
        exif.get_field(tag, In::PRIMARY)
            .and_then(|f| f.value.get_uint(0))
    }

    /// Capture time, preferring DateTimeOriginal, then DateTimeDigitized,
    /// then DateTime. EXIF carries no zone here; values are taken as UTC.
    fn get_datetime(exif: &Exif) -> Option<DateTime<Utc>> {
        [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime]
            .into_iter()
            .filter_map(|tag| exif.get_field(tag, In::PRIMARY))
            .find_map(|field| match &field.value {
                Value::Ascii(values) => values.first().and_then(|raw| parse_exif_datetime(raw)),
                _ => None,
            })
    }

    /// GPS coordinate in decimal degrees, negative for S/W.
    fn get_gps_coord(exif: &Exif, coord_tag: Tag, ref_tag: Tag) -> Option<f64> {
        let coord = exif.get_field(coord_tag, In::PRIMARY)?;
        let reference = exif.get_field(ref_tag, In::PRIMARY)?;

        let degrees = match &coord.value {
            Value::Rational(r) if r.len() >= 3 => {
                r[0].to_f64() + r[1].to_f64() / 60.0 + r[2].to_f64() / 3600.0
            }
            _ => return None,
        };
        let ref_str = reference.display_value().to_string();
        let sign = if ref_str.contains('S') || ref_str.contains('W') {
            -1.0
        } else {
            1.0
        };
        Some(sign * degrees)
    }
}

/// Parse an EXIF `YYYY:MM:DD HH:MM:SS` timestamp.
fn parse_exif_datetime(raw: &[u8]) -> Option<DateTime<Utc>> {
    let text = std::str::from_utf8(raw).ok()?.trim_end_matches('\0').trim();
    NaiveDateTime::parse_from_str(text, "%Y:%m:%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
