//! Raw EXIF tag dictionaries and their serialization normalizer.
//!
//! A decoded image yields a [`RawTagMap`]: tag identifiers mapped to untyped
//! [`TagValue`]s (integers, rationals, text, byte strings, sequences, and a
//! nested mapping for the GPS sub-IFD). Before anything is written to JSON or
//! YAML the values pass through [`TagValue::to_serializable`], which turns
//! rationals into floats and bytes into text so the result is always finite
//! and printable.
//!
//! Tag ids are resolved to the conventional EXIF names through two static
//! tables, one for the primary/Exif IFDs and one for GPS sub-tags.

use exif::{Context, Exif, In};
use serde::ser::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Tag id of the GPS sub-IFD container
pub const GPS_INFO_TAG: u16 = 0x8825;

/// Resolved name of the GPS sub-IFD container
pub const GPS_INFO_NAME: &str = "GPSInfo";

/// IFD pointer tags carry offsets, not metadata
const POINTER_TAGS: &[u16] = &[0x8769, GPS_INFO_TAG, 0xA005];

/// Mapping from tag identifier to its untyped value
pub type RawTagMap = BTreeMap<TagKey, TagValue>;

/// A tag identifier, either the numeric EXIF id or a symbolic name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagKey {
    Id(u16),
    Name(String),
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKey::Id(id) => write!(f, "{id}"),
            TagKey::Name(name) => f.write_str(name),
        }
    }
}

impl From<u16> for TagKey {
    fn from(id: u16) -> Self {
        TagKey::Id(id)
    }
}

impl From<&str> for TagKey {
    fn from(name: &str) -> Self {
        TagKey::Name(name.to_string())
    }
}

/// An untyped tag value as it comes out of the decoder
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Integer(i64),
    Float(f64),
    Rational { num: i64, den: i64 },
    Text(String),
    Bytes(Vec<u8>),
    Sequence(Vec<TagValue>),
    Mapping(RawTagMap),
}

impl TagValue {
    /// Converts the value into its serializable form.
    ///
    /// Rationals become floats (`0` when the denominator is zero), byte
    /// strings become UTF-8 text or an escaped `b'..'` rendering, non-finite
    /// floats become `0`, and sequences and mappings are normalized
    /// element-wise. Applying it twice gives the same result as applying it
    /// once.
    pub fn to_serializable(&self) -> TagValue {
        match self {
            TagValue::Rational { num, den } => match rational_to_f64(*num, *den) {
                Some(value) => TagValue::Float(value),
                None => TagValue::Integer(0),
            },
            TagValue::Float(value) if !value.is_finite() => TagValue::Integer(0),
            TagValue::Bytes(bytes) => TagValue::Text(bytes_to_text(bytes)),
            TagValue::Sequence(items) => {
                TagValue::Sequence(items.iter().map(TagValue::to_serializable).collect())
            }
            TagValue::Mapping(entries) => TagValue::Mapping(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_serializable()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Reads the value as a number, if it has a numeric interpretation.
    ///
    /// Text is parsed as a decimal number; a zero-denominator rational reads
    /// as `0.0`.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            TagValue::Integer(value) => *value as f64,
            TagValue::Float(value) => *value,
            TagValue::Rational { num, den } => rational_to_f64(*num, *den).unwrap_or(0.0),
            TagValue::Text(text) => text.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Returns the text content when the value is textual
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TagValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl Serialize for TagValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TagValue::Integer(value) => serializer.serialize_i64(*value),
            TagValue::Float(value) if value.is_finite() => serializer.serialize_f64(*value),
            TagValue::Float(_) => serializer.serialize_i64(0),
            TagValue::Rational { num, den } => match rational_to_f64(*num, *den) {
                Some(value) => serializer.serialize_f64(value),
                None => serializer.serialize_i64(0),
            },
            TagValue::Text(text) => serializer.serialize_str(text),
            TagValue::Bytes(bytes) => serializer.serialize_str(&bytes_to_text(bytes)),
            TagValue::Sequence(items) => serializer.collect_seq(items),
            TagValue::Mapping(entries) => {
                serializer.collect_map(entries.iter().map(|(key, value)| (key.to_string(), value)))
            }
        }
    }
}

fn rational_to_f64(num: i64, den: i64) -> Option<f64> {
    if den == 0 {
        return None;
    }
    let value = num as f64 / den as f64;
    value.is_finite().then_some(value)
}

/// Decodes bytes as UTF-8, falling back to an escaped `b'..'` rendering
pub fn bytes_to_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let escaped: String = bytes
                .iter()
                .flat_map(|byte| std::ascii::escape_default(*byte))
                .map(char::from)
                .collect();
            format!("b'{escaped}'")
        }
    }
}

/// Resolves a primary/Exif IFD tag key to its name
pub fn resolve_name(key: &TagKey) -> String {
    match key {
        TagKey::Id(id) => tag_name(*id).map_or_else(|| id.to_string(), str::to_string),
        TagKey::Name(name) => name.clone(),
    }
}

/// Resolves a GPS sub-IFD tag key to its name
pub fn resolve_gps_name(key: &TagKey) -> String {
    match key {
        TagKey::Id(id) => gps_tag_name(*id).map_or_else(|| id.to_string(), str::to_string),
        TagKey::Name(name) => name.clone(),
    }
}

/// Looks up the name of a primary/Exif IFD tag id
pub fn tag_name(id: u16) -> Option<&'static str> {
    EXIF_TAGS
        .iter()
        .find(|(tag, _)| *tag == id)
        .map(|(_, name)| *name)
}

/// Looks up the name of a GPS sub-IFD tag id
pub fn gps_tag_name(id: u16) -> Option<&'static str> {
    GPS_TAGS
        .iter()
        .find(|(tag, _)| *tag == id)
        .map(|(_, name)| *name)
}

/// Builds a raw tag map from the primary image of a parsed EXIF block.
///
/// GPS fields are gathered into a nested mapping under [`GPS_INFO_TAG`];
/// interoperability fields and IFD pointers are dropped.
pub fn from_exif(exif: &Exif) -> RawTagMap {
    let mut tags = RawTagMap::new();
    let mut gps = RawTagMap::new();

    for field in exif.fields() {
        if field.ifd_num != In::PRIMARY {
            continue;
        }
        let Some(value) = value_from_exif(&field.value) else {
            continue;
        };

        let number = field.tag.number();
        match field.tag.context() {
            Context::Gps => {
                gps.insert(TagKey::Id(number), value);
            }
            Context::Interop => {}
            _ if POINTER_TAGS.contains(&number) => {}
            _ => {
                tags.insert(TagKey::Id(number), value);
            }
        }
    }

    if !gps.is_empty() {
        tags.insert(TagKey::Id(GPS_INFO_TAG), TagValue::Mapping(gps));
    }

    tags
}

/// Single-component fields become scalars, like the decoder reports them
fn collapse(mut items: Vec<TagValue>) -> TagValue {
    if items.len() == 1 {
        items.remove(0)
    } else {
        TagValue::Sequence(items)
    }
}

fn value_from_exif(value: &exif::Value) -> Option<TagValue> {
    use exif::Value;

    let converted = match value {
        Value::Byte(bytes) | Value::Undefined(bytes, _) => TagValue::Bytes(bytes.clone()),
        Value::Ascii(strings) if strings.is_empty() => TagValue::Text(String::new()),
        Value::Ascii(strings) => collapse(
            strings
                .iter()
                .map(|s| TagValue::Text(String::from_utf8_lossy(s).into_owned()))
                .collect(),
        ),
        Value::Short(values) => collapse(
            values
                .iter()
                .map(|&v| TagValue::Integer(i64::from(v)))
                .collect(),
        ),
        Value::Long(values) => collapse(
            values
                .iter()
                .map(|&v| TagValue::Integer(i64::from(v)))
                .collect(),
        ),
        Value::SByte(values) => collapse(
            values
                .iter()
                .map(|&v| TagValue::Integer(i64::from(v)))
                .collect(),
        ),
        Value::SShort(values) => collapse(
            values
                .iter()
                .map(|&v| TagValue::Integer(i64::from(v)))
                .collect(),
        ),
        Value::SLong(values) => collapse(
            values
                .iter()
                .map(|&v| TagValue::Integer(i64::from(v)))
                .collect(),
        ),
        Value::Rational(values) => collapse(
            values
                .iter()
                .map(|r| TagValue::Rational {
                    num: i64::from(r.num),
                    den: i64::from(r.denom),
                })
                .collect(),
        ),
        Value::SRational(values) => collapse(
            values
                .iter()
                .map(|r| TagValue::Rational {
                    num: i64::from(r.num),
                    den: i64::from(r.denom),
                })
                .collect(),
        ),
        Value::Float(values) => collapse(
            values
                .iter()
                .map(|&v| TagValue::Float(f64::from(v)))
                .collect(),
        ),
        Value::Double(values) => collapse(values.iter().map(|&v| TagValue::Float(v)).collect()),
        _ => return None,
    };

    Some(converted)
}

const EXIF_TAGS: &[(u16, &str)] = &[
    (0x010E, "ImageDescription"),
    (0x010F, "Make"),
    (0x0110, "Model"),
    (0x0112, "Orientation"),
    (0x011A, "XResolution"),
    (0x011B, "YResolution"),
    (0x0128, "ResolutionUnit"),
    (0x0131, "Software"),
    (0x0132, "DateTime"),
    (0x013B, "Artist"),
    (0x013E, "WhitePoint"),
    (0x013F, "PrimaryChromaticities"),
    (0x0211, "YCbCrCoefficients"),
    (0x0213, "YCbCrPositioning"),
    (0x0214, "ReferenceBlackWhite"),
    (0x8298, "Copyright"),
    (0x829A, "ExposureTime"),
    (0x829D, "FNumber"),
    (0x8769, "ExifOffset"),
    (0x8822, "ExposureProgram"),
    (0x8824, "SpectralSensitivity"),
    (0x8825, "GPSInfo"),
    (0x8827, "ISOSpeedRatings"),
    (0x8830, "SensitivityType"),
    (0x8832, "RecommendedExposureIndex"),
    (0x9000, "ExifVersion"),
    (0x9003, "DateTimeOriginal"),
    (0x9004, "DateTimeDigitized"),
    (0x9010, "OffsetTime"),
    (0x9011, "OffsetTimeOriginal"),
    (0x9012, "OffsetTimeDigitized"),
    (0x9101, "ComponentsConfiguration"),
    (0x9102, "CompressedBitsPerPixel"),
    (0x9201, "ShutterSpeedValue"),
    (0x9202, "ApertureValue"),
    (0x9203, "BrightnessValue"),
    (0x9204, "ExposureBiasValue"),
    (0x9205, "MaxApertureValue"),
    (0x9206, "SubjectDistance"),
    (0x9207, "MeteringMode"),
    (0x9208, "LightSource"),
    (0x9209, "Flash"),
    (0x920A, "FocalLength"),
    (0x9214, "SubjectArea"),
    (0x927C, "MakerNote"),
    (0x9286, "UserComment"),
    (0x9290, "SubsecTime"),
    (0x9291, "SubsecTimeOriginal"),
    (0x9292, "SubsecTimeDigitized"),
    (0xA000, "FlashPixVersion"),
    (0xA001, "ColorSpace"),
    (0xA002, "ExifImageWidth"),
    (0xA003, "ExifImageHeight"),
    (0xA004, "RelatedSoundFile"),
    (0xA005, "ExifInteroperabilityOffset"),
    (0xA20B, "FlashEnergy"),
    (0xA20E, "FocalPlaneXResolution"),
    (0xA20F, "FocalPlaneYResolution"),
    (0xA210, "FocalPlaneResolutionUnit"),
    (0xA214, "SubjectLocation"),
    (0xA215, "ExposureIndex"),
    (0xA217, "SensingMethod"),
    (0xA300, "FileSource"),
    (0xA301, "SceneType"),
    (0xA302, "CFAPattern"),
    (0xA401, "CustomRendered"),
    (0xA402, "ExposureMode"),
    (0xA403, "WhiteBalance"),
    (0xA404, "DigitalZoomRatio"),
    (0xA405, "FocalLengthIn35mmFilm"),
    (0xA406, "SceneCaptureType"),
    (0xA407, "GainControl"),
    (0xA408, "Contrast"),
    (0xA409, "Saturation"),
    (0xA40A, "Sharpness"),
    (0xA40C, "SubjectDistanceRange"),
    (0xA420, "ImageUniqueID"),
    (0xA430, "CameraOwnerName"),
    (0xA431, "BodySerialNumber"),
    (0xA432, "LensSpecification"),
    (0xA433, "LensMake"),
    (0xA434, "LensModel"),
    (0xA435, "LensSerialNumber"),
];

const GPS_TAGS: &[(u16, &str)] = &[
    (0, "GPSVersionID"),
    (1, "GPSLatitudeRef"),
    (2, "GPSLatitude"),
    (3, "GPSLongitudeRef"),
    (4, "GPSLongitude"),
    (5, "GPSAltitudeRef"),
    (6, "GPSAltitude"),
    (7, "GPSTimeStamp"),
    (8, "GPSSatellites"),
    (9, "GPSStatus"),
    (10, "GPSMeasureMode"),
    (11, "GPSDOP"),
    (12, "GPSSpeedRef"),
    (13, "GPSSpeed"),
    (14, "GPSTrackRef"),
    (15, "GPSTrack"),
    (16, "GPSImgDirectionRef"),
    (17, "GPSImgDirection"),
    (18, "GPSMapDatum"),
    (19, "GPSDestLatitudeRef"),
    (20, "GPSDestLatitude"),
    (21, "GPSDestLongitudeRef"),
    (22, "GPSDestLongitude"),
    (23, "GPSDestBearingRef"),
    (24, "GPSDestBearing"),
    (25, "GPSDestDistanceRef"),
    (26, "GPSDestDistance"),
    (27, "GPSProcessingMethod"),
    (28, "GPSAreaInformation"),
    (29, "GPSDateStamp"),
    (30, "GPSDifferential"),
    (31, "GPSHPositioningError"),
];
