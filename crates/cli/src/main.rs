//! # BrandXR Asset CLI
//!
//! Headless front end for the asset pipeline: resolve assets through the
//! storage tiers, download and inspect bundles, and manage the caches.
//!
//! ## Usage
//!
//! ```bash
//! # Resolve an asset through every tier and print a summary
//! brandxr fetch audio/intro --kind audio
//!
//! # Only try the web tier, cache the result, write the decoded text out
//! brandxr fetch https://cdn.example.com/copy.txt --kind text --tier web --cache --output copy.txt
//!
//! # Download a versioned bundle
//! brandxr bundle download showroom https://cdn.example.com/showroom.bundle --version 3
//!
//! # Pack a directory into a bundle
//! brandxr bundle build ./showroom --name showroom --out showroom.bundle
//! ```

use anyhow::{bail, Context, Result};
use brandxr_assets::{
    bundle_checksum, cache_file_name, Asset, AssetConfig, AssetKind, AssetPipeline, AssetRequest,
    BundleBuilder, BundleCompression, BundleDescriptor, CancelToken, Platform, StorageTier,
    VersionKind, EXAMPLE_CONFIG,
};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "brandxr")]
#[command(about = "BrandXR asset pipeline tools")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, env = "BRANDXR_CONFIG")]
    config: Option<PathBuf>,

    /// Override the bundled (read-only) asset root
    #[arg(long, global = true, env = "BRANDXR_BUNDLED_ROOT")]
    bundled_root: Option<PathBuf>,

    /// Override the app-private storage root
    #[arg(long, global = true, env = "BRANDXR_APP_PRIVATE_ROOT")]
    app_private_root: Option<PathBuf>,

    /// Target platform (desktop, android, ios, webgl)
    #[arg(long, global = true, env = "BRANDXR_PLATFORM")]
    platform: Option<Platform>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve and decode one asset
    Fetch(FetchArgs),

    /// Bundle download, packing and cache management
    #[command(subcommand)]
    Bundle(BundleCommand),

    /// Print the cache file name derived from a source location
    CacheName {
        source: String,
    },

    /// Configuration helpers
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Logical asset path or URL
    path: String,

    /// text, csv, texture or audio
    #[arg(short, long, default_value = "text")]
    kind: AssetKind,

    /// Tier to try; repeat for several (default: try-all)
    #[arg(short, long = "tier")]
    tiers: Vec<StorageTier>,

    /// Write web results into app-private storage
    #[arg(long)]
    cache: bool,

    /// Explicit app-private file name for reading and caching
    #[arg(long)]
    file_name: Option<String>,

    /// Write the decoded asset here
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum BundleCommand {
    /// Download a bundle, cache it when versioned, and list its entries
    Download {
        name: String,
        path: String,

        /// Content hash of this bundle version (hex)
        #[arg(long, conflicts_with = "version")]
        version_hash: Option<String>,

        /// Integer bundle version
        #[arg(long)]
        version: Option<u32>,

        /// Expected checksum (0 skips the check)
        #[arg(long, default_value_t = 0)]
        checksum: u32,

        /// Decode every entry into memory after downloading
        #[arg(long)]
        load: bool,
    },

    /// Pack a directory into a bundle archive
    Build {
        dir: PathBuf,

        #[arg(long)]
        name: String,

        #[arg(long)]
        out: PathBuf,

        /// none, gzip, zstd or lz4
        #[arg(long, default_value = "zstd")]
        compression: BundleCompression,
    },

    /// Clear cached bundles; no names clears everything
    Clear {
        names: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write an example configuration file
    Init {
        file: PathBuf,
    },
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &cli.command {
        Command::Fetch(args) => fetch(&cli, args).await,
        Command::Bundle(BundleCommand::Download {
            name,
            path,
            version_hash,
            version,
            checksum,
            load,
        }) => {
            let version = match (version_hash, version) {
                (Some(hex), _) => VersionKind::parse_hash(hex).context("invalid --version-hash")?,
                (None, Some(n)) => VersionKind::Integer(*n),
                (None, None) => VersionKind::None,
            };
            download(&cli, name, path, version, *checksum, *load).await
        }
        Command::Bundle(BundleCommand::Build { dir, name, out, compression }) => {
            build_bundle(dir, name, out, *compression)
        }
        Command::Bundle(BundleCommand::Clear { names }) => {
            let pipeline = pipeline(&cli)?;
            if pipeline.clear_cache(names).await {
                println!("{} bundle cache cleared", "✓".green());
            } else {
                println!("{} nothing to clear", "•".yellow());
            }
            Ok(())
        }
        Command::CacheName { source } => {
            println!("{}", cache_file_name(source));
            Ok(())
        }
        Command::Config(ConfigCommand::Init { file }) => {
            if file.exists() {
                bail!("{} already exists", file.display());
            }
            std::fs::write(file, EXAMPLE_CONFIG)
                .with_context(|| format!("writing {}", file.display()))?;
            println!("{} wrote {}", "✓".green(), file.display());
            Ok(())
        }
    }
}

/// Build the pipeline from the config file plus command-line overrides
fn pipeline(cli: &Cli) -> Result<AssetPipeline> {
    let mut config = match &cli.config {
        Some(path) => {
            AssetConfig::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => AssetConfig::default(),
    };
    if let Some(root) = &cli.bundled_root {
        config = config.with_bundled_root(root);
    }
    if let Some(root) = &cli.app_private_root {
        config = config.with_app_private_root(root);
    }
    if let Some(platform) = cli.platform {
        config = config.with_platform(platform);
    }
    debug!(?config, "asset configuration");

    AssetPipeline::builder(config).build().context("building asset pipeline")
}

/// Cancel on Ctrl-C
fn cancel_on_ctrl_c() -> CancelToken {
    let cancel = CancelToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
    cancel
}

// ============================================================================
// Fetch
// ============================================================================

async fn fetch(cli: &Cli, args: &FetchArgs) -> Result<()> {
    let pipeline = pipeline(cli)?;
    let cancel = cancel_on_ctrl_c();

    let mut request = AssetRequest::new(&args.path, args.kind).cache_on_success(args.cache);
    if !args.tiers.is_empty() {
        request = request.tiers(args.tiers.iter().copied());
    }
    if let Some(name) = &args.file_name {
        request = request.file_name(name);
    }

    let outcome = pipeline.fetch(&request, &cancel).await.context("fetch failed")?;

    for attempt in &outcome.attempts {
        println!(
            "  {} {:<20} {}",
            "✗".red(),
            attempt.tier.to_string(),
            attempt.error.to_string().dimmed()
        );
    }
    println!("  {} {:<20} {}", "✓".green(), outcome.tier.to_string(), outcome.location);
    if let Some(path) = &outcome.cached_to {
        println!("  {} cached to {}", "→".cyan(), path.display());
    }

    println!("{}", describe(&outcome.asset));

    if let Some(out) = &args.output {
        write_asset(&outcome.asset, out)?;
        info!(path = %out.display(), "asset written");
    }
    Ok(())
}

fn describe(asset: &Asset) -> String {
    match asset {
        Asset::Text(text) => format!("text, {} bytes", text.len()),
        Asset::Csv(table) => format!("csv, {} columns, {} rows", table.headers.len(), table.len()),
        Asset::Texture(texture) => {
            format!("texture {}x{} ({:?})", texture.width, texture.height, texture.format)
        }
        Asset::AudioClip(clip) => format!(
            "audio, {} ch @ {} Hz, {:.2}s",
            clip.channels,
            clip.sample_rate,
            clip.duration_secs()
        ),
        Asset::Bundle(bundle) => {
            format!("bundle {:?}, {} entries", bundle.name(), bundle.entries().len())
        }
    }
}

/// Text is written as-is; CSV is re-joined; textures as raw RGBA8; audio as
/// interleaved little-endian f32 samples.
fn write_asset(asset: &Asset, out: &Path) -> Result<()> {
    let bytes = match asset {
        Asset::Text(text) => text.as_bytes().to_vec(),
        Asset::Csv(table) => {
            let mut text = table.headers.join(",");
            for row in &table.rows {
                text.push('\n');
                text.push_str(&row.join(","));
            }
            text.push('\n');
            text.into_bytes()
        }
        Asset::Texture(texture) => texture.rgba.clone(),
        Asset::AudioClip(clip) => clip.samples.iter().flat_map(|s| s.to_le_bytes()).collect(),
        Asset::Bundle(_) => bail!("bundles cannot be written with --output"),
    };
    std::fs::write(out, bytes).with_context(|| format!("writing {}", out.display()))
}

// ============================================================================
// Bundles
// ============================================================================

async fn download(
    cli: &Cli,
    name: &str,
    path: &str,
    version: VersionKind,
    checksum: u32,
    load: bool,
) -> Result<()> {
    let pipeline = pipeline(cli)?;
    let cancel = cancel_on_ctrl_c();

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .context("progress template")?
            .progress_chars("#>-"),
    );
    bar.set_message(name.to_string());

    let mut descriptor =
        BundleDescriptor::new(name, path).with_version(version).with_checksum(checksum);
    let progress = |percent: f32| bar.set_position(percent.clamp(0.0, 100.0) as u64);
    let result = pipeline.download_bundle(&mut descriptor, Some(&progress), &cancel).await;
    bar.finish_and_clear();
    result.with_context(|| format!("downloading bundle {}", name))?;

    println!("{} {} ({:?})", "✓".green(), name.bold(), descriptor.state());
    if let Some(dir) = descriptor.cache_dir() {
        println!("  cached in {}", dir.display());
    }
    if let Some(bundle) = descriptor.handle() {
        for entry in bundle.entries() {
            println!(
                "  {:<40} {:>10} bytes  {}",
                entry.name,
                entry.original_size,
                entry.mime_type.dimmed()
            );
        }
    }

    if load {
        let loaded = pipeline
            .load_all_assets_into_memory(&mut descriptor)
            .await
            .context("loading bundle assets")?;
        println!("{} {} assets decoded", "✓".green(), loaded);
        for asset in descriptor.loaded_assets() {
            let format = pipeline.formatter().platform().preferred_texture_format();
            let summary = match asset.decode(format) {
                Ok(decoded) => describe(&decoded),
                Err(e) => e.to_string().red().to_string(),
            };
            println!("  {:<40} {}", asset.name, summary);
        }
        pipeline.unload_from_memory(&mut descriptor)?;
    }
    Ok(())
}

fn build_bundle(dir: &Path, name: &str, out: &Path, compression: BundleCompression) -> Result<()> {
    let builder = BundleBuilder::new(name)
        .compression(compression)
        .add_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?;
    let ratio = builder.manifest().compression_ratio();
    let entries = builder.manifest().entries.len();
    let bytes = builder.build().context("packing bundle")?;
    std::fs::write(out, &bytes).with_context(|| format!("writing {}", out.display()))?;

    println!(
        "{} {} entries → {} ({} bytes, ratio {:.2})",
        "✓".green(),
        entries,
        out.display(),
        bytes.len(),
        ratio
    );
    println!("  checksum {}", bundle_checksum(&bytes));
    Ok(())
}
