use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use album2jekyll::album::{
    AlbumAssembler, ImportOptions, ImportSummary, PhotoRecord, find_images, parse_album_date,
};
use album2jekyll::config::Config;
use album2jekyll::convert;
use album2jekyll::imaging::{BackendKind, TransformMode, create_backend};

#[derive(Parser)]
#[command(author, version, about = "A tool to import photo albums into a Jekyll site")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize with a default config file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,

        /// Path to config file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Import a directory of photos as a new album
    Import {
        /// Directory holding the photos
        source_dir: PathBuf,

        /// Album title
        title: String,

        /// Album description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Album date (YYYY-MM-DD); defaults to the first photo's date
        #[arg(long)]
        date: Option<String>,

        /// Skip EXIF extraction
        #[arg(long)]
        no_exif: bool,

        /// How photos become site assets
        #[arg(long, value_enum)]
        mode: Option<TransformMode>,

        /// Root of the Jekyll site
        #[arg(long, value_name = "DIR")]
        site_root: Option<PathBuf>,

        /// Path to config file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Show the caption and metadata of photos without importing them
    Inspect {
        /// Photo, or directory of photos, to inspect
        path: PathBuf,

        /// Path to config file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Convert every image in a directory to WebP
    Convert {
        /// Directory holding the images
        input_dir: PathBuf,

        /// Keep the original files
        #[arg(long)]
        keep_original: bool,

        /// WebP quality (0-100)
        #[arg(short, long, default_value_t = convert::DEFAULT_QUALITY)]
        quality: f32,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force, config } => init_config(&config, force),
        Commands::Import {
            source_dir,
            title,
            description,
            date,
            no_exif,
            mode,
            site_root,
            config,
        } => {
            let mut config_data = load_config(&config)?;
            if no_exif {
                config_data.extract_exif = false;
            }
            if let Some(mode) = mode {
                config_data.mode = mode;
            }
            if let Some(site_root) = site_root {
                config_data.site_root = site_root;
            }
            let date = date.as_deref().map(parse_album_date).transpose()?;

            println!("Importing {} as '{}'...", source_dir.display(), title);
            let backend = create_backend(config_data.backend);
            let assembler = AlbumAssembler::new(config_data, backend);
            let summary = assembler.import(&ImportOptions {
                source_dir,
                title,
                description,
                date,
            })?;

            print_summary(&summary);
            Ok(())
        }
        Commands::Inspect { path, config } => {
            let config_data = load_config(&config)?;
            let files = if path.is_dir() {
                find_images(&path, &config_data.extensions)?
            } else if path.is_file() {
                vec![path.clone()]
            } else {
                bail!("File not found: {}", path.display());
            };
            if files.is_empty() {
                println!("No images found in {}", path.display());
                return Ok(());
            }

            let backend = create_backend(config_data.backend);
            let assembler = AlbumAssembler::new(config_data, backend);
            for (index, file) in files.iter().enumerate() {
                if index > 0 {
                    println!();
                }
                print_record(file, &assembler.describe(file, index));
            }
            Ok(())
        }
        Commands::Convert {
            input_dir,
            keep_original,
            quality,
            yes,
        } => {
            if !(0.0..=100.0).contains(&quality) {
                bail!("WebP quality must be between 0 and 100, got {quality}");
            }

            let images = convert::convertible_images(&input_dir)?;
            if images.is_empty() {
                println!("No convertible images found in {}", input_dir.display());
                return Ok(());
            }

            println!("Found {} images to convert", images.len());
            if !keep_original {
                println!("Originals will be deleted after conversion");
                if !yes && !confirm("Continue?")? {
                    println!("Cancelled");
                    return Ok(());
                }
            }

            let backend = create_backend(BackendKind::Rust);
            let report = convert::batch_convert(
                &input_dir,
                backend.as_ref(),
                !keep_original,
                quality,
            )?;

            println!("\nConversion summary:");
            println!("  Converted: {}/{}", report.converted, report.found);
            if !keep_original {
                println!("  Deleted originals: {}", report.deleted);
            }
            for (path, reason) in &report.failures {
                println!("  Failed: {} ({})", path.display(), reason);
            }
            Ok(())
        }
    }
}

fn init_config(config_path_opt: &Option<PathBuf>, force: bool) -> Result<()> {
    let config_path = Config::get_config_path(config_path_opt);

    if config_path.exists() && !force {
        println!("Config file already exists at {}", config_path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    let config = Config::default();
    config
        .save_to_file(&config_path)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!("Created config file at {}", config_path.display());
    Ok(())
}

/// Loads the config; an explicit `--config` path must exist
fn load_config(config_path_opt: &Option<PathBuf>) -> Result<Config> {
    let config_path = Config::get_config_path(config_path_opt);

    if config_path_opt.is_some() && !config_path.exists() {
        bail!(
            "Config file not found at {}. Run 'album2jekyll init --config {}' to create one.",
            config_path.display(),
            config_path.display()
        );
    }

    Config::load_or_default(&config_path)
}

fn print_summary(summary: &ImportSummary) {
    let album = &summary.album;

    println!("\nAlbum created successfully");
    println!("  Title: {}", album.title);
    println!("  Photos: {}", album.photos.len());
    println!("  Date: {}", album.date);
    println!("  Assets: {}", summary.asset_dir.display());
    println!("  Document: {}", summary.document_path.display());
    if let Some(ref sidecar) = summary.sidecar_path {
        println!("  EXIF data: {}", sidecar.display());
    }
    println!("  URL: {}", summary.url);

    if !album.cameras.is_empty() {
        println!("\nCameras:");
        for (camera, count) in &album.cameras {
            println!("  {camera}: {count}");
        }
    }
}

fn print_record(file: &Path, record: &PhotoRecord) {
    println!("File: {}", file.display());
    println!("Caption: {}", record.caption);
    if !record.location.is_empty() {
        println!("Location: {}", record.location);
    }
    match record.exif_display {
        Some(ref display) => println!("{display}"),
        None => println!("No EXIF data"),
    }
}

/// Asks a yes/no question on stdin; only "y" or "yes" confirms
fn confirm(question: &str) -> Result<bool> {
    print!("{question} (y/N): ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
