//! Capture metadata access: EXIF dates and GPS.
//!
//! Reading goes through [`ExifReader`]; [`KamadakExifReader`] reads from image
//! containers with `kamadak-exif`. Writing is the caller's concern: it
//! implements [`ExifWriter`] over the codec of its choice, and this module
//! only supplies the field encodings ([`DateFields`], [`GpsDms`]) and the glue
//! that turns an estimate or merge patch into writer calls.

pub mod format;

pub use format::{
    format_exif_datetime, parse_exif_datetime, DateFields, GpsDms, EXIF_DATETIME_FORMAT,
};

use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::Result;
use crate::inference::MetadataEstimate;
use crate::merge::MetadataPatch;
use crate::types::GpsCoordinate;

/// Read access to a photo's capture date and location.
pub trait ExifReader: Send + Sync {
    /// Capture date, or `None` when absent or unreadable.
    fn read_date(&self, path: &Path) -> Option<NaiveDateTime>;

    /// GPS position, or `None` when absent or unreadable.
    fn read_gps(&self, path: &Path) -> Option<GpsCoordinate>;
}

/// Write access to a photo's date and GPS tags.
pub trait ExifWriter {
    fn write_date_fields(&self, path: &Path, fields: &DateFields) -> Result<()>;

    fn write_gps(&self, path: &Path, gps: &GpsDms) -> Result<()>;
}

/// Write an inferred date (and GPS when present) to `path`.
pub fn apply_estimate(
    writer: &dyn ExifWriter,
    path: &Path,
    estimate: &MetadataEstimate,
) -> Result<()> {
    writer.write_date_fields(path, &DateFields::new(&estimate.timestamp))?;
    if let Some(gps) = &estimate.gps {
        writer.write_gps(path, &GpsDms::from_coordinate(gps))?;
    }
    Ok(())
}

/// Fill the fields a merge patch carries. Returns whether anything was written.
pub fn apply_patch(writer: &dyn ExifWriter, path: &Path, patch: &MetadataPatch) -> Result<bool> {
    if let Some(ts) = &patch.captured_at {
        writer.write_date_fields(path, &DateFields::new(ts))?;
    }
    if let Some(gps) = &patch.gps {
        writer.write_gps(path, &GpsDms::from_coordinate(gps))?;
    }
    Ok(!patch.is_empty())
}

/// Reads EXIF with `kamadak-exif`.
///
/// Lenient: any read or parse failure is reported as a missing value.
#[derive(Debug, Clone, Copy, Default)]
pub struct KamadakExifReader;

impl KamadakExifReader {
    pub fn new() -> Self {
        Self
    }

    fn load(path: &Path) -> Option<exif::Exif> {
        let file = File::open(path).ok()?;
        let mut reader = BufReader::new(file);
        match Reader::new().read_from_container(&mut reader) {
            Ok(exif) => Some(exif),
            Err(e) => {
                tracing::trace!("No EXIF in {:?}: {}", path, e);
                None
            }
        }
    }

    /// Get the capture datetime, preferring DateTimeOriginal over DateTime.
    fn get_datetime(exif: &exif::Exif) -> Option<NaiveDateTime> {
        [Tag::DateTimeOriginal, Tag::DateTime]
            .into_iter()
            .filter_map(|tag| exif.get_field(tag, In::PRIMARY))
            .find_map(|field| match &field.value {
                Value::Ascii(parts) => parts
                    .first()
                    .and_then(|raw| std::str::from_utf8(raw).ok())
                    .and_then(parse_exif_datetime),
                _ => None,
            })
    }

    /// Get GPS coordinate, converting from degrees/minutes/seconds to decimal.
    fn get_gps_coord(exif: &exif::Exif, coord_tag: Tag, ref_tag: Tag) -> Option<f64> {
        let coord = exif.get_field(coord_tag, In::PRIMARY)?;
        let reference = exif.get_field(ref_tag, In::PRIMARY)?;

        let degrees = Self::parse_gps_rationals(&coord.value)?;
        let ref_str = reference.display_value().to_string();

        // Apply sign based on reference (N/S for lat, E/W for lon)
        let sign = if ref_str.contains('S') || ref_str.contains('W') {
            -1.0
        } else {
            1.0
        };

        Some(sign * degrees)
    }

    /// Parse GPS rationals (degrees, minutes, seconds) to decimal degrees.
    fn parse_gps_rationals(value: &Value) -> Option<f64> {
        match value {
            Value::Rational(r) if r.len() >= 3 => format::from_dms(&[
                (r[0].num, r[0].denom),
                (r[1].num, r[1].denom),
                (r[2].num, r[2].denom),
            ]),
            _ => None,
        }
    }
}

impl ExifReader for KamadakExifReader {
    fn read_date(&self, path: &Path) -> Option<NaiveDateTime> {
        Self::load(path).and_then(|exif| Self::get_datetime(&exif))
    }

    fn read_gps(&self, path: &Path) -> Option<GpsCoordinate> {
        let exif = Self::load(path)?;
        let lat = Self::get_gps_coord(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef)?;
        let lon = Self::get_gps_coord(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef)?;
        GpsCoordinate::new(lat, lon)
    }
}
