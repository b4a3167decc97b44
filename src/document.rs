//! Album document and sidecar output.
//!
//! The album document is a Markdown file for Jekyll: a YAML front matter
//! block with the title, cover, date and the list of photos, followed by a
//! Liquid body that renders every photo with its caption and shooting
//! parameters. The sidecar is a pretty-printed JSON array of the full
//! metadata of every photo that had any.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::album::{Album, PhotoRecord};
use crate::caption;
use crate::exif::{NormalizedMetadata, TIMESTAMP_FORMAT};

#[derive(Debug, Serialize)]
struct FrontMatter<'a> {
    title: &'a str,
    description: &'a str,
    cover_image: &'a str,
    date: &'a str,
    photos: Vec<FrontMatterPhoto<'a>>,
}

#[derive(Debug, Serialize)]
struct FrontMatterPhoto<'a> {
    image: &'a str,
    caption: &'a str,
    location: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    exif: Option<FrontMatterExif>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exif_display: Option<&'a str>,
}

/// The subset of metadata templates use
#[derive(Debug, Serialize)]
struct FrontMatterExif {
    #[serde(skip_serializing_if = "Option::is_none")]
    camera: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    datetime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aperture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shutter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    iso: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    focal_length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gps: Option<FrontMatterGps>,
}

#[derive(Debug, Serialize)]
struct FrontMatterGps {
    latitude: f64,
    longitude: f64,
    coordinates: String,
}

impl FrontMatterExif {
    /// Template fields of the metadata; `None` when there are none, since an
    /// empty mapping is truthy in Liquid
    fn from_metadata(meta: &NormalizedMetadata) -> Option<Self> {
        let exif = Self {
            camera: caption::camera_label(meta),
            datetime: meta
                .captured_at
                .map(|captured_at| captured_at.format(TIMESTAMP_FORMAT).to_string()),
            aperture: meta.aperture_display.clone(),
            shutter: meta.exposure_display.as_ref().map(|exposure| format!("{exposure}s")),
            iso: meta.iso,
            focal_length: meta.focal_length_display.clone(),
            gps: meta.gps.zip(meta.coordinates_display.clone()).map(|(gps, coordinates)| {
                FrontMatterGps {
                    latitude: gps.latitude,
                    longitude: gps.longitude,
                    coordinates,
                }
            }),
        };
        (!exif.is_empty()).then_some(exif)
    }

    fn is_empty(&self) -> bool {
        self.camera.is_none()
            && self.datetime.is_none()
            && self.aperture.is_none()
            && self.shutter.is_none()
            && self.iso.is_none()
            && self.focal_length.is_none()
            && self.gps.is_none()
    }
}

/// One entry of the sidecar JSON file
#[derive(Debug, Serialize)]
pub struct SidecarEntry<'a> {
    pub filename: &'a str,
    pub exif: &'a NormalizedMetadata,
}

const PHOTO_LOOP: &str = r#"## Photos

{% for photo in page.photos %}
### {{ photo.caption }}

{% if photo.location and photo.location != "" %}
**Location**: {{ photo.location }}
{% endif %}

{% if photo.exif %}
**Shooting details**:
{% if photo.exif.camera %}- Camera: {{ photo.exif.camera }}{% endif %}
{% if photo.exif.datetime %}- Taken: {{ photo.exif.datetime }}{% endif %}
{% if photo.exif.aperture %}- Aperture: {{ photo.exif.aperture }}{% endif %}
{% if photo.exif.shutter %}- Shutter: {{ photo.exif.shutter }}{% endif %}
{% if photo.exif.iso %}- ISO: {{ photo.exif.iso }}{% endif %}
{% if photo.exif.focal_length %}- Focal length: {{ photo.exif.focal_length }}{% endif %}
{% if photo.exif.gps %}- GPS: {{ photo.exif.gps.coordinates }}{% endif %}
{% endif %}

---
{% endfor %}
"#;

/// Renders the complete album document
pub fn render_document(album: &Album) -> Result<String> {
    let front_matter = FrontMatter {
        title: &album.title,
        description: &album.description,
        cover_image: &album.cover_image,
        date: &album.date,
        photos: album
            .photos
            .iter()
            .map(|photo| FrontMatterPhoto {
                image: &photo.image,
                caption: &photo.caption,
                location: &photo.location,
                exif: photo.exif.as_ref().and_then(FrontMatterExif::from_metadata),
                exif_display: photo.exif_display.as_deref(),
            })
            .collect(),
    };

    let yaml = serde_yaml::to_string(&front_matter)
        .context("Failed to serialize album front matter")?;

    let mut content = String::from("---\n");
    content.push_str(&yaml);
    content.push_str("---\n\n");

    content.push_str("<!-- Describe this album here -->\n\n");
    content.push_str("This album contains {{ page.photos.size }} photos.\n\n");

    content.push_str("## Details\n\n");
    content.push_str("- **Date**: {{ page.date | date: \"%Y-%m-%d\" }}\n");
    content.push_str("- **Photos**: {{ page.photos.size }}\n");
    content.push_str(&format!("- **Subject**: {}\n\n", album.title));

    if !album.cameras.is_empty() {
        content.push_str("## Equipment\n\n");
        for (camera, count) in &album.cameras {
            let noun = if *count == 1 { "photo" } else { "photos" };
            content.push_str(&format!("- **{camera}**: {count} {noun}\n"));
        }
        content.push('\n');
    }

    content.push_str(PHOTO_LOOP);
    Ok(content)
}

/// Renders and writes the album document
pub fn write_document(album: &Album, path: &Path) -> Result<()> {
    let content = render_document(album)?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write album document to {}", path.display()))
}

/// Writes the sidecar JSON; returns false when no photo had metadata
pub fn write_sidecar(photos: &[PhotoRecord], path: &Path) -> Result<bool> {
    let entries: Vec<SidecarEntry<'_>> = photos
        .iter()
        .filter_map(|photo| {
            photo.exif.as_ref().map(|exif| SidecarEntry {
                filename: photo.file_name(),
                exif,
            })
        })
        .collect();

    if entries.is_empty() {
        return Ok(false);
    }

    let json = serde_json::to_string_pretty(&entries).context("Failed to serialize EXIF data")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}
