//! Tests for the command-line interface

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use std::error::Error;
use std::fs;
use tempfile::TempDir;

fn cargo_bin() -> Command {
    Command::cargo_bin("album2jekyll").expect("Failed to find album2jekyll binary")
}

#[test]
fn test_config_generation() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("album2jekyll.yaml");

    cargo_bin()
        .arg("init")
        .current_dir(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config file"));

    assert!(config_path.exists(), "Config file should be created");

    let content = fs::read_to_string(&config_path)?;
    assert!(content.contains("assets_dir"), "Config should contain assets_dir");
    assert!(content.contains("albums_dir"), "Config should contain albums_dir");
    assert!(content.contains("mode: copy"), "Config should default to copy mode");

    Ok(())
}

#[test]
fn test_init_command_with_force() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("album2jekyll.yaml");

    let initial_content = "max_width: 800\n";
    fs::write(&config_path, initial_content)?;

    cargo_bin()
        .arg("init")
        .current_dir(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Config file already exists"));

    assert_eq!(
        fs::read_to_string(&config_path)?,
        initial_content,
        "Content should not be changed without --force"
    );

    cargo_bin()
        .arg("init")
        .arg("--force")
        .current_dir(temp_dir.path())
        .assert()
        .success();

    let new_content = fs::read_to_string(&config_path)?;
    assert_ne!(new_content, initial_content, "Content should be changed with --force");
    assert!(new_content.contains("max_width: 1920"));

    Ok(())
}

#[test]
fn test_init_with_custom_config_path() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let custom_path = temp_dir.path().join("conf").join("custom_config.yaml");

    cargo_bin()
        .arg("init")
        .arg("--config")
        .arg(&custom_path)
        .assert()
        .success();

    assert!(custom_path.exists(), "Custom config file should be created");

    Ok(())
}

#[test]
fn test_import_command() -> Result<(), Box<dyn Error>> {
    let site = TempDir::new()?;
    fs::write(site.path().join("_config.yml"), "title: Test\n")?;
    let source = TempDir::new()?;
    common::write_jpeg_with_exif(&source.path().join("IMG_0001.jpg"))?;
    common::write_plain_png(&source.path().join("IMG_0002.png"), 20, 10)?;

    cargo_bin()
        .current_dir(site.path())
        .arg("import")
        .arg(source.path())
        .arg("Beijing Walk")
        .args(["-d", "Autumn in the city", "--site-root"])
        .arg(site.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 photos"))
        .stdout(predicate::str::contains("Album created successfully"))
        .stdout(predicate::str::contains("URL: /photography/beijing-walk/"))
        .stdout(predicate::str::contains("Canon EOS R5: 1"));

    let document = fs::read_to_string(site.path().join("_photo_albums/beijing-walk.md"))?;
    assert!(document.contains("description: Autumn in the city"));
    assert!(
        site.path()
            .join("assets/images/albums/beijing-walk/01_IMG_0001.jpg")
            .exists()
    );
    assert!(
        site.path()
            .join("assets/images/albums/beijing-walk/exif_data.json")
            .exists()
    );

    Ok(())
}

#[test]
fn test_import_with_no_exif_and_date() -> Result<(), Box<dyn Error>> {
    let site = TempDir::new()?;
    let source = TempDir::new()?;
    common::write_jpeg_with_exif(&source.path().join("shot.jpg"))?;

    cargo_bin()
        .current_dir(site.path())
        .arg("import")
        .arg(source.path())
        .arg("Quick")
        .args(["--no-exif", "--date", "2022-03-04", "--site-root"])
        .arg(site.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Date: 2022-03-04"));

    let document = fs::read_to_string(site.path().join("_photo_albums/quick.md"))?;
    assert!(document.contains("caption: Photo 1"));
    assert!(!site.path().join("assets/images/albums/quick/exif_data.json").exists());

    Ok(())
}

#[test]
fn test_import_rejects_bad_date() -> Result<(), Box<dyn Error>> {
    let site = TempDir::new()?;
    let source = TempDir::new()?;
    common::write_plain_png(&source.path().join("a.png"), 4, 4)?;

    cargo_bin()
        .current_dir(site.path())
        .arg("import")
        .arg(source.path())
        .arg("Dated")
        .args(["--date", "04/03/2022"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid album date"));

    Ok(())
}

#[test]
fn test_import_missing_source_fails() -> Result<(), Box<dyn Error>> {
    let site = TempDir::new()?;

    cargo_bin()
        .current_dir(site.path())
        .arg("import")
        .arg(site.path().join("does-not-exist"))
        .arg("Ghost")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Source directory not found"));

    assert!(!site.path().join("_photo_albums").exists());

    Ok(())
}

#[test]
fn test_import_empty_source_fails() -> Result<(), Box<dyn Error>> {
    let site = TempDir::new()?;
    let source = TempDir::new()?;

    cargo_bin()
        .current_dir(site.path())
        .arg("import")
        .arg(source.path())
        .arg("Empty")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No images"));

    Ok(())
}

#[test]
fn test_inspect_command() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    let photo = temp_dir.path().join("shot.jpg");
    common::write_jpeg_with_exif(&photo)?;

    cargo_bin()
        .current_dir(temp_dir.path())
        .arg("inspect")
        .arg(&photo)
        .assert()
        .success()
        .stdout(predicate::str::contains("Caption: 11-06 14:30"))
        .stdout(predicate::str::contains("📷 Canon EOS R5"))
        .stdout(predicate::str::contains("📍 39.904200"));

    let plain = temp_dir.path().join("plain.png");
    common::write_plain_png(&plain, 4, 4)?;

    cargo_bin()
        .current_dir(temp_dir.path())
        .arg("inspect")
        .arg(&plain)
        .assert()
        .success()
        .stdout(predicate::str::contains("Caption: Photo 1"))
        .stdout(predicate::str::contains("No EXIF data"));

    Ok(())
}

#[test]
fn test_inspect_directory() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    common::write_jpeg_with_exif(&temp_dir.path().join("a.jpg"))?;
    common::write_plain_png(&temp_dir.path().join("b.png"), 4, 4)?;

    cargo_bin()
        .current_dir(temp_dir.path())
        .arg("inspect")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Caption: 11-06 14:30"))
        .stdout(predicate::str::contains("Caption: Photo 2"));

    Ok(())
}

#[test]
fn test_inspect_missing_file_fails() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;

    cargo_bin()
        .current_dir(temp_dir.path())
        .arg("inspect")
        .arg(temp_dir.path().join("nope.jpg"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));

    Ok(())
}

#[test]
fn test_convert_command_keeps_originals() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    common::write_plain_png(&temp_dir.path().join("a.png"), 8, 8)?;
    common::write_plain_png(&temp_dir.path().join("b.png"), 8, 8)?;

    cargo_bin()
        .arg("convert")
        .arg(temp_dir.path())
        .arg("--keep-original")
        .assert()
        .success()
        .stdout(predicate::str::contains("Converted: 2/2"));

    assert!(temp_dir.path().join("a.webp").exists());
    assert!(temp_dir.path().join("a.png").exists());

    Ok(())
}

#[test]
fn test_convert_command_cancelled() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    common::write_plain_png(&temp_dir.path().join("a.png"), 8, 8)?;

    cargo_bin()
        .arg("convert")
        .arg(temp_dir.path())
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled"));

    assert!(temp_dir.path().join("a.png").exists());
    assert!(!temp_dir.path().join("a.webp").exists());

    Ok(())
}

#[test]
fn test_convert_command_deletes_originals() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    common::write_plain_png(&temp_dir.path().join("a.png"), 8, 8)?;

    cargo_bin()
        .arg("convert")
        .arg(temp_dir.path())
        .write_stdin("y\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted originals: 1"));

    assert!(!temp_dir.path().join("a.png").exists());
    assert!(temp_dir.path().join("a.webp").exists());

    Ok(())
}

#[test]
fn test_explicit_missing_config_fails() -> Result<(), Box<dyn Error>> {
    let site = TempDir::new()?;
    let source = TempDir::new()?;
    common::write_plain_png(&source.path().join("a.png"), 4, 4)?;

    cargo_bin()
        .current_dir(site.path())
        .arg("import")
        .arg(source.path())
        .arg("Configured")
        .arg("--config")
        .arg(site.path().join("missing.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));

    cargo_bin()
        .current_dir(site.path())
        .arg("inspect")
        .arg(source.path())
        .args(["--config", "nope.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));

    assert!(!site.path().join("_photo_albums").exists());

    Ok(())
}

#[test]
fn test_import_webp_mode_from_explicit_config() -> Result<(), Box<dyn Error>> {
    let site = TempDir::new()?;
    let source = TempDir::new()?;
    common::write_jpeg_with_exif(&source.path().join("shot.jpg"))?;
    let config_path = site.path().join("site.yaml");
    fs::write(&config_path, "mode: webp\nwebp_quality: 60\n")?;

    cargo_bin()
        .current_dir(site.path())
        .arg("import")
        .arg(source.path())
        .arg("Compressed")
        .arg("--config")
        .arg(&config_path)
        .arg("--site-root")
        .arg(site.path())
        .assert()
        .success();

    let asset = site.path().join("assets/images/albums/compressed/01_shot.webp");
    let bytes = fs::read(&asset)?;
    assert_eq!(&bytes[12..16], b"VP8 ", "assets should be lossy WebP");

    Ok(())
}

#[test]
fn test_convert_command_rejects_bad_quality() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    common::write_plain_png(&temp_dir.path().join("a.png"), 8, 8)?;

    cargo_bin()
        .arg("convert")
        .arg(temp_dir.path())
        .args(["--keep-original", "--quality", "150"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 0 and 100"));

    assert!(!temp_dir.path().join("a.webp").exists());

    Ok(())
}

#[test]
fn test_convert_command_same_stem_keeps_original() -> Result<(), Box<dyn Error>> {
    let temp_dir = TempDir::new()?;
    common::write_plain_png(&temp_dir.path().join("a.png"), 8, 8)?;
    common::write_jpeg_with_exif(&temp_dir.path().join("a.jpg"))?;

    cargo_bin()
        .arg("convert")
        .arg(temp_dir.path())
        .args(["--yes", "--quality", "70"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Converted: 1/2"))
        .stdout(predicate::str::contains("already exists"));

    assert!(temp_dir.path().join("a.webp").exists());
    assert!(temp_dir.path().join("a.png").exists());

    Ok(())
}
