//! Album assembly for album2jekyll.
//!
//! The [`AlbumAssembler`] turns a directory of photos into an album:
//! it picks the eligible files in file-name order, copies or converts each
//! one into the site's asset directory, extracts its metadata, and collects
//! one [`PhotoRecord`] per photo. The finished [`Album`] is handed to
//! [`crate::document`] for rendering.
//!
//! Files are processed one at a time. A photo whose metadata cannot be read
//! still ends up in the album with an empty record, and a photo that cannot
//! be decoded is copied as-is; only a missing source directory or a
//! directory without eligible images fails the import.

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use log::{debug, error, info, warn};
use serde::Serialize;
use slugify::slugify;
use std::fs;
use std::path::{Path, PathBuf};

use crate::caption;
use crate::config::{Config, has_extension};
use crate::document;
use crate::exif::{self, NormalizedMetadata};
use crate::imaging::{BackendError, ImagingBackend, TransformParams};

/// Name of the sidecar file written next to the album assets
pub const SIDECAR_FILE: &str = "exif_data.json";

/// One photo as it appears in the album document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhotoRecord {
    /// Site path of the image (e.g., "/assets/images/albums/trip/01_dawn.jpg")
    pub image: String,
    pub caption: String,
    /// "(lat, lon)" or empty
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exif: Option<NormalizedMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exif_display: Option<String>,
}

impl PhotoRecord {
    /// Builds the record for the photo at `index` (zero-based)
    pub fn new(image: String, meta: NormalizedMetadata, index: usize) -> Self {
        let caption = caption::caption(&meta, index);
        let location = caption::location(&meta);
        let summary = caption::display_summary(&meta);

        Self {
            image,
            caption,
            location,
            exif: (!meta.is_empty()).then_some(meta),
            exif_display: (!summary.is_empty()).then_some(summary),
        }
    }

    /// File name part of the image path
    pub fn file_name(&self) -> &str {
        self.image.rsplit('/').next().unwrap_or(&self.image)
    }
}

/// An assembled album, ready to be rendered
#[derive(Debug, Clone)]
pub struct Album {
    pub title: String,
    pub description: String,
    pub slug: String,
    /// Album date as `YYYY-MM-DD`
    pub date: String,
    pub cover_image: String,
    pub photos: Vec<PhotoRecord>,
    /// Photo count per camera, in first-seen order
    pub cameras: Vec<(String, usize)>,
}

/// What the user asked to import
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub source_dir: PathBuf,
    pub title: String,
    pub description: String,
    /// Album date (`YYYY-MM-DD`); derived from the photos when absent
    pub date: Option<String>,
}

/// Where an import wrote its outputs
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub album: Album,
    pub asset_dir: PathBuf,
    pub document_path: PathBuf,
    pub sidecar_path: Option<PathBuf>,
    /// Public URL of the album page
    pub url: String,
}

/// Builds albums from photo directories
pub struct AlbumAssembler {
    config: Config,
    backend: Box<dyn ImagingBackend>,
}

impl AlbumAssembler {
    pub fn new(config: Config, backend: Box<dyn ImagingBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Imports a directory of photos as a new album
    pub fn import(&self, options: &ImportOptions) -> Result<ImportSummary> {
        let site_root = &self.config.site_root;
        if !site_root.join("_config.yml").exists() {
            warn!(
                "{} does not look like a Jekyll site root (no _config.yml)",
                site_root.display()
            );
        }

        if !options.source_dir.is_dir() {
            bail!(
                "Source directory not found: {}",
                options.source_dir.display()
            );
        }

        let images = find_images(&options.source_dir, &self.config.extensions)?;
        if images.is_empty() {
            bail!(
                "No images with extensions [{}] found in {}",
                self.config.extensions.join(", "),
                options.source_dir.display()
            );
        }
        println!("Found {} photos", images.len());

        let mut slug = album_slug(&options.title, self.config.ascii_slugs);
        if slug.is_empty() {
            slug = format!("album-{}", Local::now().format("%Y%m%d%H%M%S"));
        }

        let asset_dir = site_root.join(&self.config.assets_dir).join(&slug);
        let albums_dir = site_root.join(&self.config.albums_dir);
        fs::create_dir_all(&asset_dir)
            .with_context(|| format!("Failed to create {}", asset_dir.display()))?;
        fs::create_dir_all(&albums_dir)
            .with_context(|| format!("Failed to create {}", albums_dir.display()))?;

        let extract = self.config.extract_exif;
        if extract && !self.backend.is_available() {
            warn!(
                "Imaging backend '{}' is unavailable; continuing without EXIF data",
                self.backend.name()
            );
        }

        let mut photos = Vec::with_capacity(images.len());
        for (index, source) in images.iter().enumerate() {
            println!(
                "Processing ({}/{}): {}",
                index + 1,
                images.len(),
                source.display()
            );
            match self.import_photo(source, index, &asset_dir, &slug) {
                Ok(record) => photos.push(record),
                Err(e) => error!("Skipping {}: {:#}", source.display(), e),
            }
        }

        if photos.is_empty() {
            bail!("None of the photos in {} could be imported", options.source_dir.display());
        }

        let date = album_date(options.date.as_deref(), &photos);
        let album = Album {
            title: options.title.clone(),
            description: options.description.clone(),
            slug: slug.clone(),
            date,
            cover_image: photos[0].image.clone(),
            cameras: camera_summary(&photos),
            photos,
        };

        let document_path = albums_dir.join(format!("{slug}.md"));
        document::write_document(&album, &document_path)?;

        let sidecar_path = if extract && self.config.write_sidecar {
            let path = asset_dir.join(SIDECAR_FILE);
            match document::write_sidecar(&album.photos, &path) {
                Ok(true) => Some(path),
                Ok(false) => None,
                Err(e) => {
                    warn!("Could not write {}: {:#}", path.display(), e);
                    None
                }
            }
        } else {
            None
        };

        let url = format!("{}/{}/", self.config.url_prefix.trim_end_matches('/'), slug);
        info!("Album '{}' written to {}", album.title, document_path.display());

        Ok(ImportSummary {
            album,
            asset_dir,
            document_path,
            sidecar_path,
            url,
        })
    }

    /// Describes a photo without writing anything
    pub fn describe(&self, source: &Path, index: usize) -> PhotoRecord {
        let meta = self.read_metadata(source);
        PhotoRecord::new(source.display().to_string(), meta, index)
    }

    /// Reads and normalizes the metadata of one file, empty on any failure
    pub fn read_metadata(&self, source: &Path) -> NormalizedMetadata {
        if !self.config.extract_exif {
            return NormalizedMetadata::default();
        }

        match self.backend.read_tags(source) {
            Ok(raw) => exif::extract(&raw),
            Err(BackendError::Unavailable) => {
                debug!("No imaging backend; no metadata for {}", source.display());
                NormalizedMetadata::default()
            }
            Err(e) => {
                warn!("Could not extract EXIF data from {}: {}", source.display(), e);
                NormalizedMetadata::default()
            }
        }
    }

    fn import_photo(
        &self,
        source: &Path,
        index: usize,
        asset_dir: &Path,
        slug: &str,
    ) -> Result<PhotoRecord> {
        let meta = self.read_metadata(source);

        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let target_stem =
            asset_dir.join(format!("{:02}_{}", index + 1, sanitize_filename(&file_name)));

        let transformed = self
            .backend
            .transform(&TransformParams {
                source,
                target_stem: &target_stem,
                mode: self.config.mode,
                max_width: self.config.max_width,
                webp_quality: self.config.webp_quality,
                jpeg_quality: self.config.jpeg_quality,
            })
            .with_context(|| format!("Failed to write asset for {}", source.display()))?;
        debug!(
            "{} -> {} ({:?})",
            source.display(),
            transformed.path.display(),
            transformed.outcome
        );

        let asset_name = transformed
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let image = format!(
            "/{}/{}/{}",
            self.config.assets_dir.trim_matches('/'),
            slug,
            asset_name
        );

        Ok(PhotoRecord::new(image, meta, index))
    }
}

/// Lists the files in `dir` with one of `extensions`, sorted by file name
pub fn find_images<S: AsRef<str>>(dir: &Path, extensions: &[S]) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut images = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, extensions) {
            images.push(path);
        }
    }

    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(images)
}

/// Cleans a file name for use in asset paths.
///
/// The extension is dropped; anything other than letters, digits, `_` and
/// `-` becomes `_`, and runs of `_` are collapsed.
pub fn sanitize_filename(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut cleaned = String::with_capacity(stem.len());
    for c in stem.chars() {
        let c = if c.is_alphanumeric() || c == '_' || c == '-' {
            c
        } else {
            '_'
        };
        if c == '_' && cleaned.ends_with('_') {
            continue;
        }
        cleaned.push(c);
    }

    cleaned.trim_matches('_').to_string()
}

/// URL-friendly identifier for an album title.
///
/// Letters of any script are kept; with `ascii` the title is transliterated
/// first. Returns an empty string when nothing usable is left.
pub fn album_slug(title: &str, ascii: bool) -> String {
    if ascii {
        return slugify!(title);
    }

    let mut slug = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        if c.is_whitespace() || c == '_' || c == '-' {
            if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        } else if c.is_alphanumeric() {
            slug.push(c);
        }
    }

    slug.trim_end_matches('-').to_string()
}

/// Explicit date, else the first photo's capture date, else today
fn album_date(explicit: Option<&str>, photos: &[PhotoRecord]) -> String {
    if let Some(date) = explicit {
        return date.to_string();
    }

    photos
        .first()
        .and_then(|photo| photo.exif.as_ref())
        .and_then(|meta| meta.captured_at)
        .map(|captured_at| captured_at.date())
        .unwrap_or_else(|| Local::now().date_naive())
        .format("%Y-%m-%d")
        .to_string()
}

/// Validates an album date given on the command line
pub fn parse_album_date(date: &str) -> Result<String> {
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("Invalid album date '{date}', expected YYYY-MM-DD"))?;
    Ok(parsed.format("%Y-%m-%d").to_string())
}

/// Counts photos per camera, keeping the order cameras first appear in
pub fn camera_summary(photos: &[PhotoRecord]) -> Vec<(String, usize)> {
    let mut cameras: Vec<(String, usize)> = Vec::new();

    for camera in photos
        .iter()
        .filter_map(|photo| photo.exif.as_ref())
        .filter_map(caption::camera_label)
    {
        match cameras.iter_mut().find(|(name, _)| *name == camera) {
            Some((_, count)) => *count += 1,
            None => cameras.push((camera, 1)),
        }
    }

    cameras
}
