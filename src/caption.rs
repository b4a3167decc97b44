//! Captions and display strings derived from normalized metadata.
//!
//! All functions here are pure: the same record and index always give the
//! same text.

use crate::exif::{NormalizedMetadata, TIMESTAMP_FORMAT};

/// Short date/time used for captions (e.g., "11-06 14:30")
pub const CAPTION_FORMAT: &str = "%m-%d %H:%M";

/// Caption for the photo at `index` (zero-based) in the album.
///
/// Uses the capture time when known, otherwise "Photo N" with a 1-based N.
pub fn caption(meta: &NormalizedMetadata, index: usize) -> String {
    match meta.captured_at {
        Some(captured_at) => captured_at.format(CAPTION_FORMAT).to_string(),
        None => format!("Photo {}", index + 1),
    }
}

/// Location string: "(lat, lon)" when GPS is known, empty otherwise
pub fn location(meta: &NormalizedMetadata) -> String {
    meta.coordinates_display
        .as_ref()
        .map(|coordinates| format!("({coordinates})"))
        .unwrap_or_default()
}

/// Camera make and model joined by a space, whichever are known
pub fn camera_label(meta: &NormalizedMetadata) -> Option<String> {
    let parts: Vec<&str> = [meta.make.as_deref(), meta.model.as_deref()]
        .into_iter()
        .flatten()
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Shooting parameters, e.g. "f/2.8 | 1/200s | ISO100 | 50mm"
pub fn shooting_parameters(meta: &NormalizedMetadata) -> Option<String> {
    let mut params = Vec::new();
    if let Some(ref aperture) = meta.aperture_display {
        params.push(aperture.clone());
    }
    if let Some(ref exposure) = meta.exposure_display {
        params.push(format!("{exposure}s"));
    }
    if let Some(iso) = meta.iso {
        params.push(format!("ISO{iso}"));
    }
    if let Some(ref focal_length) = meta.focal_length_display {
        params.push(focal_length.clone());
    }

    if params.is_empty() {
        None
    } else {
        Some(params.join(" | "))
    }
}

/// Multi-line summary of the metadata for display next to a photo.
///
/// Sections appear in a fixed order (camera, parameters, timestamp,
/// location), one per line; sections without data are left out.
pub fn display_summary(meta: &NormalizedMetadata) -> String {
    let mut sections = Vec::new();

    if let Some(camera) = camera_label(meta) {
        sections.push(format!("📷 {camera}"));
    }
    if let Some(params) = shooting_parameters(meta) {
        sections.push(format!("⚙️ {params}"));
    }
    if let Some(captured_at) = meta.captured_at {
        sections.push(format!("📅 {}", captured_at.format(TIMESTAMP_FORMAT)));
    }
    if let Some(ref coordinates) = meta.coordinates_display {
        sections.push(format!("📍 {coordinates}"));
    }

    sections.join("\n")
}

/// Lexicographically sortable capture timestamp
pub fn sort_key(meta: &NormalizedMetadata) -> Option<String> {
    meta.captured_at
        .map(|captured_at| captured_at.format("%Y-%m-%dT%H:%M:%S").to_string())
}
