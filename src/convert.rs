//! Batch conversion of a directory of images to WebP.
//!
//! Each eligible file `name.ext` becomes `name.webp` in the same directory.
//! A failed conversion is recorded and the batch moves on; the original is
//! only removed after its WebP file has been written. An existing WebP file is
//! never overwritten, so `a.jpg` and `a.png` cannot both claim `a.webp`.

use anyhow::{Result, bail};
use log::{error, info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::album::find_images;
use crate::imaging::ImagingBackend;

/// Extensions picked up by a batch conversion (case-insensitive)
pub const CONVERTIBLE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "gif", "tiff"];

/// Default lossy WebP quality for batch conversion
pub const DEFAULT_QUALITY: f32 = 80.0;

/// Outcome of a batch conversion
#[derive(Debug, Default)]
pub struct ConvertReport {
    pub found: usize,
    pub converted: usize,
    pub deleted: usize,
    /// Files that could not be converted, with the reason
    pub failures: Vec<(PathBuf, String)>,
}

/// Lists the files a batch conversion of `dir` would touch
pub fn convertible_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Directory not found: {}", dir.display());
    }
    find_images(dir, &CONVERTIBLE_EXTENSIONS)
}

/// Converts every eligible image in `dir` to WebP at `quality` (0-100)
pub fn batch_convert(
    dir: &Path,
    backend: &dyn ImagingBackend,
    delete_original: bool,
    quality: f32,
) -> Result<ConvertReport> {
    let images = convertible_images(dir)?;
    let mut report = ConvertReport {
        found: images.len(),
        ..Default::default()
    };
    let mut written: HashSet<PathBuf> = HashSet::new();

    for source in &images {
        let target = source.with_extension("webp");
        if written.contains(&target) || target.exists() {
            let reason = format!("{} already exists", target.display());
            warn!("Skipping {}: {}", source.display(), reason);
            report.failures.push((source.clone(), reason));
            continue;
        }

        match backend.convert_to_webp(source, &target, quality) {
            Ok(()) => {
                println!("Converted {} -> {}", source.display(), target.display());
                report.converted += 1;
                written.insert(target);
            }
            Err(e) => {
                error!("Failed to convert {}: {}", source.display(), e);
                report.failures.push((source.clone(), e.to_string()));
                continue;
            }
        }

        if delete_original {
            match fs::remove_file(source) {
                Ok(()) => report.deleted += 1,
                Err(e) => warn!("Could not delete {}: {}", source.display(), e),
            }
        }
    }

    info!(
        "Converted {}/{} images in {}",
        report.converted,
        report.found,
        dir.display()
    );
    Ok(report)
}
