//! EXIF textual and rational encodings for date and GPS fields.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::types::GpsCoordinate;

/// The date format every EXIF date tag uses.
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

pub fn format_exif_datetime(ts: &NaiveDateTime) -> String {
    ts.format(EXIF_DATETIME_FORMAT).to_string()
}

/// Parse an EXIF date string.
///
/// Trailing NULs and quotes from raw ASCII fields are ignored, and the
/// dash-separated form some tools emit is accepted too.
pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim_matches(|c: char| c == '\0' || c == '"' || c.is_whitespace());
    NaiveDateTime::parse_from_str(s, EXIF_DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// Values for the three equivalent EXIF date tags.
///
/// Photo-library importers disagree on which tag they read, so all three are
/// always written together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFields {
    /// IFD0 DateTime (modification time)
    pub date_time: String,
    /// Exif DateTimeOriginal (capture time)
    pub date_time_original: String,
    /// Exif DateTimeDigitized
    pub date_time_digitized: String,
}

impl DateFields {
    pub fn new(ts: &NaiveDateTime) -> Self {
        let value = format_exif_datetime(ts);
        Self {
            date_time: value.clone(),
            date_time_original: value.clone(),
            date_time_digitized: value,
        }
    }
}

/// An unsigned EXIF rational, numerator over denominator.
pub type Rational = (u32, u32);

/// A coordinate in the EXIF GPS encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpsDms {
    /// Degrees, minutes, seconds
    pub latitude: [Rational; 3],
    /// 'N' or 'S'
    pub latitude_ref: char,
    pub longitude: [Rational; 3],
    /// 'E' or 'W'
    pub longitude_ref: char,
}

/// Hundredths of an arc-second per degree.
const CENTI_SECONDS_PER_DEGREE: f64 = 360_000.0;

impl GpsDms {
    /// Convert decimal degrees, with seconds kept to 1/100.
    pub fn from_coordinate(coord: &GpsCoordinate) -> Self {
        Self {
            latitude: to_dms(coord.latitude),
            latitude_ref: if coord.latitude < 0.0 { 'S' } else { 'N' },
            longitude: to_dms(coord.longitude),
            longitude_ref: if coord.longitude < 0.0 { 'W' } else { 'E' },
        }
    }

    /// Back to decimal degrees.
    pub fn to_coordinate(&self) -> Option<GpsCoordinate> {
        let lat = from_dms(&self.latitude)? * if self.latitude_ref == 'S' { -1.0 } else { 1.0 };
        let lon = from_dms(&self.longitude)? * if self.longitude_ref == 'W' { -1.0 } else { 1.0 };
        GpsCoordinate::new(lat, lon)
    }
}

fn to_dms(decimal: f64) -> [Rational; 3] {
    // Round once on the smallest unit so seconds never carry to 60
    let total = (decimal.abs() * CENTI_SECONDS_PER_DEGREE).round() as u64;
    let degrees = total / 360_000;
    let minutes = (total % 360_000) / 6_000;
    let centi_seconds = total % 6_000;
    [
        (degrees as u32, 1),
        (minutes as u32, 1),
        (centi_seconds as u32, 100),
    ]
}

/// Decimal degrees from DMS rationals. `None` on a zero denominator.
pub fn from_dms(dms: &[Rational; 3]) -> Option<f64> {
    let part = |(num, den): Rational| (den != 0).then(|| f64::from(num) / f64::from(den));
    Some(part(dms[0])? + part(dms[1])? / 60.0 + part(dms[2])? / 3600.0)
}
