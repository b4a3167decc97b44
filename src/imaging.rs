//! Imaging backends for album2jekyll.
//!
//! The [`ImagingBackend`] trait covers everything that needs an image
//! library: reading the raw EXIF tags of a file, turning a source photo into
//! a site asset, and converting a file to WebP. It is chosen once at startup
//! and handed to the album assembler.
//!
//! - [`RustBackend`] reads tags with `kamadak-exif`, decodes and resizes with
//!   the `image` crate, and encodes lossy WebP with `libwebp`.
//! - [`DegradedBackend`] has no imaging capability: it reports
//!   [`BackendError::Unavailable`] for metadata and copies files unchanged.
//!
//! Transforming a photo never loses it. If decoding or encoding fails the
//! source is copied byte-for-byte instead.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::tags::{self, RawTagMap};

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("imaging library is not available")]
    Unavailable,
    #[error("failed to decode {}: {message}", .path.display())]
    Decode { path: PathBuf, message: String },
    #[error("failed to encode {}: {message}", .path.display())]
    Encode { path: PathBuf, message: String },
}

/// How source photos become site assets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransformMode {
    /// Copy the file unchanged
    #[default]
    Copy,
    /// Resize and re-encode as WebP
    Webp,
}

/// Which imaging backend to construct
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Rust,
    None,
}

/// What a transform actually produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformOutcome {
    Copied,
    Webp,
    Jpeg,
}

/// Parameters for turning one source photo into a site asset
#[derive(Debug, Clone)]
pub struct TransformParams<'a> {
    pub source: &'a Path,
    /// Output path without extension; the backend picks the extension
    pub target_stem: &'a Path,
    pub mode: TransformMode,
    /// Wider images are scaled down to this width (0 disables resizing)
    pub max_width: u32,
    /// Lossy WebP quality (0-100)
    pub webp_quality: f32,
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformed {
    pub path: PathBuf,
    pub outcome: TransformOutcome,
}

/// Interface for image libraries
pub trait ImagingBackend {
    /// Short name for log output
    fn name(&self) -> &'static str;

    /// Whether the backend can read metadata and re-encode images
    fn is_available(&self) -> bool;

    /// Reads the raw EXIF tags of the primary image.
    ///
    /// A readable file without EXIF data yields an empty map.
    fn read_tags(&self, path: &Path) -> Result<RawTagMap, BackendError>;

    /// Produces the site asset for one photo
    fn transform(&self, params: &TransformParams<'_>) -> Result<Transformed, BackendError>;

    /// Converts a file to lossy WebP at `target`, honoring EXIF orientation
    fn convert_to_webp(
        &self,
        source: &Path,
        target: &Path,
        quality: f32,
    ) -> Result<(), BackendError>;
}

/// Creates the backend for the configured kind
pub fn create_backend(kind: BackendKind) -> Box<dyn ImagingBackend> {
    match kind {
        BackendKind::Rust => Box::new(RustBackend::new()),
        BackendKind::None => Box::new(DegradedBackend),
    }
}

/// Copies the source unchanged, keeping its (lowercased) extension
pub fn copy_original(source: &Path, target_stem: &Path) -> Result<Transformed, BackendError> {
    let extension = source
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_else(|| "jpg".to_string());
    let target = target_stem.with_extension(extension);

    fs::copy(source, &target)?;
    Ok(Transformed {
        path: target,
        outcome: TransformOutcome::Copied,
    })
}

/// Backend built on `kamadak-exif` and the `image` crate
#[derive(Debug, Default)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ImagingBackend for RustBackend {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn read_tags(&self, path: &Path) -> Result<RawTagMap, BackendError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        match exif::Reader::new().read_from_container(&mut reader) {
            Ok(exif) => Ok(tags::from_exif(&exif)),
            Err(exif::Error::NotFound(_)) => {
                debug!("No EXIF data in {}", path.display());
                Ok(RawTagMap::new())
            }
            Err(e) => Err(BackendError::Decode {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    fn transform(&self, params: &TransformParams<'_>) -> Result<Transformed, BackendError> {
        if params.mode == TransformMode::Copy {
            return copy_original(params.source, params.target_stem);
        }

        let image = match load_oriented(params.source) {
            Ok(image) => fit_width(flatten_opaque(image), params.max_width),
            Err(e) => {
                warn!("{e}; copying the original instead");
                return copy_original(params.source, params.target_stem);
            }
        };

        let webp_path = params.target_stem.with_extension("webp");
        match write_webp(&image, &webp_path, params.webp_quality) {
            Ok(()) => {
                return Ok(Transformed {
                    path: webp_path,
                    outcome: TransformOutcome::Webp,
                });
            }
            Err(e) => warn!("{e}; falling back to JPEG"),
        }

        let jpeg_path = params.target_stem.with_extension("jpg");
        match write_jpeg(&image, &jpeg_path, params.jpeg_quality) {
            Ok(()) => Ok(Transformed {
                path: jpeg_path,
                outcome: TransformOutcome::Jpeg,
            }),
            Err(e) => {
                warn!("{e}; copying the original instead");
                copy_original(params.source, params.target_stem)
            }
        }
    }

    fn convert_to_webp(
        &self,
        source: &Path,
        target: &Path,
        quality: f32,
    ) -> Result<(), BackendError> {
        let image = flatten_opaque(load_oriented(source)?);
        write_webp(&image, target, quality)
    }
}

/// Backend used when no image library is available
#[derive(Debug, Default)]
pub struct DegradedBackend;

impl ImagingBackend for DegradedBackend {
    fn name(&self) -> &'static str {
        "none"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn read_tags(&self, _path: &Path) -> Result<RawTagMap, BackendError> {
        Err(BackendError::Unavailable)
    }

    fn transform(&self, params: &TransformParams<'_>) -> Result<Transformed, BackendError> {
        if params.mode != TransformMode::Copy {
            debug!(
                "No imaging library; copying {} unchanged",
                params.source.display()
            );
        }
        copy_original(params.source, params.target_stem)
    }

    fn convert_to_webp(
        &self,
        _source: &Path,
        _target: &Path,
        _quality: f32,
    ) -> Result<(), BackendError> {
        Err(BackendError::Unavailable)
    }
}

/// Decodes an image and applies its EXIF orientation
fn load_oriented(path: &Path) -> Result<DynamicImage, BackendError> {
    let decode_error = |message: String| BackendError::Decode {
        path: path.to_path_buf(),
        message,
    };

    let mut decoder = ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()
        .map_err(|e| decode_error(e.to_string()))?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);

    let mut image = DynamicImage::from_decoder(decoder).map_err(|e| decode_error(e.to_string()))?;
    if orientation != Orientation::NoTransforms {
        debug!("Applying orientation {:?} to {}", orientation, path.display());
        image.apply_orientation(orientation);
    }
    Ok(image)
}

/// True when the image has an alpha channel with at least one translucent pixel
pub fn has_transparency(image: &DynamicImage) -> bool {
    image.color().has_alpha() && image.to_rgba8().pixels().any(|pixel| pixel.0[3] < 255)
}

/// Reduces the image to 8-bit RGB, or RGBA when transparency is really used
fn flatten_opaque(image: DynamicImage) -> DynamicImage {
    if has_transparency(&image) {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    }
}

/// Scales the image down to `max_width`, keeping the aspect ratio
fn fit_width(image: DynamicImage, max_width: u32) -> DynamicImage {
    if max_width == 0 || image.width() <= max_width {
        return image;
    }
    let height = u64::from(image.height()) * u64::from(max_width) / u64::from(image.width());
    let height = u32::try_from(height.max(1)).unwrap_or(u32::MAX);
    image.resize_exact(max_width, height, FilterType::Lanczos3)
}

fn write_webp(image: &DynamicImage, path: &Path, quality: f32) -> Result<(), BackendError> {
    let quality = quality.clamp(0.0, 100.0);
    let encoded = match image {
        DynamicImage::ImageRgba8(rgba) => {
            webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
                .encode_simple(false, quality)
        }
        other => {
            let rgb = other.to_rgb8();
            webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height())
                .encode_simple(false, quality)
        }
    }
    .map_err(|e| BackendError::Encode {
        path: path.to_path_buf(),
        message: format!("{e:?}"),
    })?;

    write_encoded(path, |writer| {
        writer.write_all(&encoded).map_err(image::ImageError::IoError)
    })
}

fn write_jpeg(image: &DynamicImage, path: &Path, quality: u8) -> Result<(), BackendError> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    write_encoded(path, |writer| {
        rgb.write_with_encoder(JpegEncoder::new_with_quality(writer, quality))
    })
}

/// Runs an encoder into `path`, removing the partial file on failure
fn write_encoded<F>(path: &Path, encode: F) -> Result<(), BackendError>
where
    F: FnOnce(&mut BufWriter<File>) -> image::ImageResult<()>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    let result = encode(&mut writer)
        .map_err(|e| BackendError::Encode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
        .and_then(|()| writer.flush().map_err(BackendError::from));

    if result.is_err() {
        drop(writer);
        let _ = fs::remove_file(path);
    }
    result
}
