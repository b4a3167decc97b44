//! EXIF metadata normalization for album2jekyll.
//!
//! [`extract`] turns a [`RawTagMap`] into a [`NormalizedMetadata`] record:
//! camera and exposure fields, the capture timestamp, decimal GPS
//! coordinates, and the display strings used in captions and front matter.
//!
//! Extraction never fails as a whole. Every field is computed by its own
//! function returning `Result<T, FieldError>`; an error drops that field only,
//! and everything else is still extracted.

use chrono::NaiveDateTime;
use log::{debug, warn};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::tags::{self, GPS_INFO_NAME, RawTagMap, TagValue};

/// Format of EXIF timestamps such as `2024:11:06 14:30:22`
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Format used when writing timestamps back out
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Why a single metadata field could not be extracted
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("tag {0} is not present")]
    Missing(&'static str),
    #[error("tag {tag} is not numeric: {found}")]
    NotNumeric { tag: &'static str, found: String },
    #[error("tag {tag} is malformed: {reason}")]
    Malformed { tag: &'static str, reason: String },
    #[error("tag {tag} value {value} is out of range")]
    OutOfRange { tag: &'static str, value: f64 },
    #[error("could not parse {tag} timestamp {raw:?}")]
    InvalidDate { tag: &'static str, raw: String },
}

/// Decimal GPS coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Normalized metadata of one photo.
///
/// Built once per image by [`extract`]; the display strings are derived at
/// that point and never recomputed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedMetadata {
    /// Camera manufacturer (e.g., "Canon")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    /// Camera model (e.g., "EOS R5")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Software that last wrote the file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software: Option<String>,
    /// When the photo was taken, from DateTimeOriginal
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_timestamp"
    )]
    pub captured_at: Option<NaiveDateTime>,
    /// Exposure time in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f_number: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focal_length_mm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps: Option<GpsCoordinates>,
    /// Exposure as shown to readers (e.g., "1/200")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure_display: Option<String>,
    /// Aperture as shown to readers (e.g., "f/2.8")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aperture_display: Option<String>,
    /// Focal length as shown to readers (e.g., "50mm")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focal_length_display: Option<String>,
    /// Coordinates as shown to readers (e.g., "39.904200, 116.407396")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates_display: Option<String>,
    /// Every tag of the image, normalized and keyed by tag name
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, TagValue>,
}

impl NormalizedMetadata {
    /// True when the image carried no usable metadata at all
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn serialize_timestamp<S: Serializer>(
    value: &Option<NaiveDateTime>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(timestamp) => {
            serializer.serialize_str(&timestamp.format(TIMESTAMP_FORMAT).to_string())
        }
        None => serializer.serialize_none(),
    }
}

/// Extracts normalized metadata from a raw tag map
pub fn extract(raw: &RawTagMap) -> NormalizedMetadata {
    let mut tags = BTreeMap::new();
    let mut gps_tags = BTreeMap::new();

    for (key, value) in raw {
        let name = tags::resolve_name(key);
        if name == GPS_INFO_NAME {
            match value {
                TagValue::Mapping(entries) => {
                    for (gps_key, gps_value) in entries {
                        gps_tags.insert(
                            tags::resolve_gps_name(gps_key),
                            gps_value.to_serializable(),
                        );
                    }
                }
                other => warn!("Ignoring GPSInfo that is not a mapping: {other:?}"),
            }
        } else {
            tags.insert(name, value.to_serializable());
        }
    }

    let make = settle(text_field(&tags, "Make"));
    let model = settle(text_field(&tags, "Model"));
    let software = settle(text_field(&tags, "Software"));
    for (name, value) in [("Make", &make), ("Model", &model), ("Software", &software)] {
        if let Some(value) = value {
            tags.insert(name.to_string(), TagValue::Text(value.clone()));
        }
    }

    let captured_at = settle(captured_at(&tags));
    if let Some(timestamp) = captured_at {
        tags.insert(
            "DateTimeOriginal".to_string(),
            TagValue::Text(timestamp.format(TIMESTAMP_FORMAT).to_string()),
        );
    }

    let exposure_time = settle(number_field(&tags, "ExposureTime"));
    let f_number = settle(number_field(&tags, "FNumber"));
    let focal_length_mm = settle(number_field(&tags, "FocalLength"));
    let iso = settle(iso_field(&tags));
    let gps = if gps_tags.is_empty() {
        None
    } else {
        settle(gps_coordinates(&gps_tags))
    };

    NormalizedMetadata {
        make,
        model,
        software,
        captured_at,
        exposure_time,
        f_number,
        focal_length_mm,
        iso,
        gps,
        exposure_display: exposure_time.and_then(format_exposure),
        aperture_display: f_number.and_then(format_aperture),
        focal_length_display: focal_length_mm.and_then(format_focal_length),
        coordinates_display: gps.map(|gps| format_coordinates(&gps)),
        tags,
    }
}

/// Turns a field result into an optional value, logging real failures
fn settle<T>(result: Result<T, FieldError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err @ FieldError::Missing(_)) => {
            debug!("{err}");
            None
        }
        Err(err) => {
            warn!("Skipping metadata field: {err}");
            None
        }
    }
}

fn text_field(tags: &BTreeMap<String, TagValue>, tag: &'static str) -> Result<String, FieldError> {
    let value = tags.get(tag).ok_or(FieldError::Missing(tag))?;
    let text = match value {
        TagValue::Text(text) => text.trim_matches(|c: char| c.is_whitespace() || c == '\0'),
        other => {
            return Err(FieldError::Malformed {
                tag,
                reason: format!("expected text, found {other:?}"),
            });
        }
    };

    if text.is_empty() {
        return Err(FieldError::Missing(tag));
    }
    Ok(text.to_string())
}

fn number_field(tags: &BTreeMap<String, TagValue>, tag: &'static str) -> Result<f64, FieldError> {
    let value = tags.get(tag).ok_or(FieldError::Missing(tag))?;
    value.as_f64().ok_or_else(|| FieldError::NotNumeric {
        tag,
        found: format!("{value:?}"),
    })
}

fn iso_field(tags: &BTreeMap<String, TagValue>) -> Result<u32, FieldError> {
    const TAG: &str = "ISOSpeedRatings";

    let value = match tags.get(TAG).ok_or(FieldError::Missing(TAG))? {
        TagValue::Sequence(items) => items.first().ok_or(FieldError::Missing(TAG))?,
        other => other,
    };
    let iso = value.as_f64().ok_or_else(|| FieldError::NotNumeric {
        tag: TAG,
        found: format!("{value:?}"),
    })?;

    if iso < 0.0 || iso > f64::from(u32::MAX) {
        return Err(FieldError::OutOfRange { tag: TAG, value: iso });
    }
    Ok(iso.round() as u32)
}

fn captured_at(tags: &BTreeMap<String, TagValue>) -> Result<NaiveDateTime, FieldError> {
    const TAG: &str = "DateTimeOriginal";

    let raw = tags
        .get(TAG)
        .and_then(TagValue::as_text)
        .ok_or(FieldError::Missing(TAG))?;

    parse_exif_datetime(raw).ok_or_else(|| FieldError::InvalidDate {
        tag: TAG,
        raw: raw.to_string(),
    })
}

/// Parses an EXIF timestamp (`YYYY:MM:DD HH:MM:SS`)
pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    NaiveDateTime::parse_from_str(trimmed, EXIF_DATETIME_FORMAT).ok()
}

fn gps_coordinates(gps: &BTreeMap<String, TagValue>) -> Result<GpsCoordinates, FieldError> {
    let latitude = coordinate(gps, "GPSLatitude", "GPSLatitudeRef", 90.0)?;
    let longitude = coordinate(gps, "GPSLongitude", "GPSLongitudeRef", 180.0)?;
    Ok(GpsCoordinates {
        latitude,
        longitude,
    })
}

/// Converts one degrees/minutes/seconds coordinate and its hemisphere
fn coordinate(
    gps: &BTreeMap<String, TagValue>,
    value_tag: &'static str,
    ref_tag: &'static str,
    limit: f64,
) -> Result<f64, FieldError> {
    let parts = match gps.get(value_tag) {
        Some(TagValue::Sequence(parts)) if parts.is_empty() => {
            return Err(FieldError::Missing(value_tag));
        }
        Some(TagValue::Sequence(parts)) => parts,
        Some(other) => {
            return Err(FieldError::Malformed {
                tag: value_tag,
                reason: format!("expected degrees, minutes, seconds, found {other:?}"),
            });
        }
        None => return Err(FieldError::Missing(value_tag)),
    };

    let reference = gps
        .get(ref_tag)
        .and_then(TagValue::as_text)
        .map(|r| r.trim_matches(|c: char| c.is_whitespace() || c == '\0'))
        .filter(|r| !r.is_empty())
        .ok_or(FieldError::Missing(ref_tag))?;

    let degrees = dms_to_decimal(parts).ok_or_else(|| FieldError::Malformed {
        tag: value_tag,
        reason: format!("cannot read {parts:?} as degrees, minutes, seconds"),
    })?;
    let decimal = if reference == "S" || reference == "W" {
        -degrees
    } else {
        degrees
    };

    if !decimal.is_finite() || decimal.abs() > limit {
        return Err(FieldError::OutOfRange {
            tag: value_tag,
            value: decimal,
        });
    }
    Ok(decimal)
}

fn dms_to_decimal(parts: &[TagValue]) -> Option<f64> {
    let [degrees, minutes, seconds, ..] = parts else {
        return None;
    };
    Some(degrees.as_f64()? + minutes.as_f64()? / 60.0 + seconds.as_f64()? / 3600.0)
}

/// Formats an exposure time: `1/200` below one second, `2.0` otherwise
pub fn format_exposure(seconds: f64) -> Option<String> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    if seconds < 1.0 {
        Some(format!("1/{}", (1.0 / seconds).round() as u64))
    } else {
        Some(format!("{seconds:.1}"))
    }
}

pub fn format_aperture(f_number: f64) -> Option<String> {
    f_number.is_finite().then(|| format!("f/{f_number:.1}"))
}

pub fn format_focal_length(millimeters: f64) -> Option<String> {
    millimeters.is_finite().then(|| format!("{millimeters:.0}mm"))
}

pub fn format_coordinates(gps: &GpsCoordinates) -> String {
    format!("{:.6}, {:.6}", gps.latitude, gps.longitude)
}
