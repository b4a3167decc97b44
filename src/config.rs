use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::imaging::{BackendKind, TransformMode};

/// Default config file name, looked up in the current directory
pub const DEFAULT_CONFIG_FILE: &str = "album2jekyll.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the Jekyll site (the directory holding `_config.yml`)
    pub site_root: PathBuf,
    /// Where photo assets go, relative to the site root
    pub assets_dir: String,
    /// Where album documents go, relative to the site root
    pub albums_dir: String,
    /// URL prefix under which albums are published
    pub url_prefix: String,
    /// Image file extensions to import (case-insensitive)
    pub extensions: Vec<String>,
    pub mode: TransformMode,
    /// Maximum width of converted images in pixels
    pub max_width: u32,
    /// Lossy WebP quality (0-100)
    pub webp_quality: f32,
    /// Quality used when falling back to JPEG (1-100)
    pub jpeg_quality: u8,
    pub extract_exif: bool,
    /// Write `exif_data.json` next to the album assets
    pub write_sidecar: bool,
    /// Transliterate album slugs to ASCII
    pub ascii_slugs: bool,
    pub backend: BackendKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_root: PathBuf::from("."),
            assets_dir: "assets/images/albums".to_string(),
            albums_dir: "_photo_albums".to_string(),
            url_prefix: "/photography".to_string(),
            extensions: ["jpg", "jpeg", "png", "webp"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            mode: TransformMode::Copy,
            max_width: 1920,
            webp_quality: 80.0,
            jpeg_quality: 85,
            extract_exif: true,
            write_sidecar: true,
            ascii_slugs: false,
            backend: BackendKind::Rust,
        }
    }
}

impl Config {
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;

        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config = serde_yaml::from_str(&yaml)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        Ok(config)
    }

    /// Loads the config file, or the defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    pub fn get_config_path(config_arg: &Option<PathBuf>) -> PathBuf {
        config_arg
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

/// Case-insensitive extension check
pub fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|candidate| candidate.as_ref().eq_ignore_ascii_case(ext))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.assets_dir, "assets/images/albums");
        assert_eq!(config.albums_dir, "_photo_albums");
        assert_eq!(config.url_prefix, "/photography");
        assert_eq!(config.mode, TransformMode::Copy);
        assert_eq!(config.max_width, 1920);
        assert_eq!(config.webp_quality, 80.0);
        assert!(config.extract_exif);
    }

    #[test]
    fn test_save_and_load_config() -> Result<()> {
        let temp_dir = tempdir()?;
        let config_path = temp_dir.path().join("nested").join("album2jekyll.yaml");

        let config = Config {
            mode: TransformMode::Webp,
            ascii_slugs: true,
            ..Config::default()
        };
        config.save_to_file(&config_path)?;

        let loaded_config = Config::load_from_file(&config_path)?;
        assert_eq!(config, loaded_config);

        let yaml = fs::read_to_string(&config_path)?;
        assert!(yaml.contains("mode: webp"));

        Ok(())
    }

    #[test]
    fn test_partial_config_fills_defaults() -> Result<()> {
        let temp_dir = tempdir()?;
        let config_path = temp_dir.path().join("album2jekyll.yaml");
        fs::write(&config_path, "max_width: 1280\nbackend: none\n")?;

        let config = Config::load_from_file(&config_path)?;
        assert_eq!(config.max_width, 1280);
        assert_eq!(config.backend, BackendKind::None);
        assert_eq!(config.albums_dir, "_photo_albums");

        Ok(())
    }

    #[test]
    fn test_load_or_default_without_file() -> Result<()> {
        let temp_dir = tempdir()?;
        let config = Config::load_or_default(&temp_dir.path().join("missing.yaml"))?;
        assert_eq!(config, Config::default());
        Ok(())
    }

    #[test]
    fn test_has_extension_is_case_insensitive() {
        let extensions = Config::default().extensions;
        assert!(has_extension(Path::new("a/IMG_1.JPG"), &extensions));
        assert!(has_extension(Path::new("b.webp"), &extensions));
        assert!(!has_extension(Path::new("notes.txt"), &extensions));
        assert!(!has_extension(Path::new("README"), &extensions));
    }
}
