//! # album2jekyll
//!
//! A command-line tool that imports a directory of photos into a Jekyll site
//! as a photo album.
//!
//! Every photo is copied (or converted to WebP) into the site's asset
//! directory, its EXIF metadata is normalized into captions and display
//! strings, and an album document with YAML front matter is written for the
//! site's album collection.
//!
//! ## Features
//!
//! - Reads EXIF tags (camera, exposure, capture time, GPS) of every photo
//! - Builds captions and shooting-parameter summaries from the metadata
//! - Copies photos unchanged or resizes them to WebP, honoring orientation
//! - Writes a Markdown album document and an `exif_data.json` sidecar
//! - Batch-converts directories of images to WebP

pub mod album;
pub mod caption;
pub mod config;
pub mod convert;
pub mod document;
pub mod exif;
pub mod imaging;
pub mod tags;
