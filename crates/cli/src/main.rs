//! Scenestack CLI - yearly composite spectral indices from Landsat scenes

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use scenestack_core::io::read_geotiff;
use scenestack_pipeline::band::{discover_scenes, Scene};
use scenestack_pipeline::batch::{
    average_products, run_batch, run_batch_from_stacks, run_batches, BatchConfig,
};
use scenestack_pipeline::index::IndexKind;
use scenestack_pipeline::stack::write_scene_stack;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "scenestack")]
#[command(author, version, about = "Yearly composite spectral indices from Landsat scenes", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: per-scene indices, composites and reports
    /// for every (year, index) pair
    Run {
        /// Root of the raw data tree (<raw>/<year>/<scene>/..B1.TIF)
        #[arg(long)]
        raw: PathBuf,
        /// Root of the processed output tree
        #[arg(long)]
        out: PathBuf,
        /// Years to process (directory names under the raw root)
        #[arg(long, required = true, num_args = 1..)]
        years: Vec<String>,
        /// Indices to compute: NDVI, NDMI, NBR (or selectors 0, 1, 2)
        #[arg(long, default_values = ["NDVI", "NDMI", "NBR"], num_args = 1..)]
        indices: Vec<String>,
    },
    /// Build 7-band stacks for every scene of a year
    Stack {
        /// Root of the raw data tree
        #[arg(long)]
        raw: PathBuf,
        /// Root of the processed output tree
        #[arg(long)]
        out: PathBuf,
        /// Year to process
        #[arg(long)]
        year: String,
    },
    /// Compute per-scene index rasters for one year and index
    Index {
        /// Root of the raw data tree
        #[arg(long)]
        raw: PathBuf,
        /// Root of the processed output tree
        #[arg(long)]
        out: PathBuf,
        /// Year to process
        #[arg(long)]
        year: String,
        /// Index to compute: NDVI, NDMI or NBR (or 0, 1, 2)
        #[arg(long)]
        index: String,
    },
    /// Compute per-scene index rasters for one year from pre-built
    /// stacks instead of raw bands
    IndexFromStack {
        /// Root of the processed output tree (holds the stacks)
        #[arg(long)]
        out: PathBuf,
        /// Year to process
        #[arg(long)]
        year: String,
        /// Index to compute: NDVI, NDMI or NBR (or 0, 1, 2)
        #[arg(long)]
        index: String,
    },
    /// Average previously computed index products for one year and index
    Average {
        /// Root of the processed output tree
        #[arg(long)]
        out: PathBuf,
        /// Year to process
        #[arg(long)]
        year: String,
        /// Index to average: NDVI, NDMI or NBR (or 0, 1, 2)
        #[arg(long)]
        index: String,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Parse index names/selectors, rejecting anything outside NDVI/NDMI/NBR
fn parse_indices(specs: &[String]) -> Result<Vec<IndexKind>> {
    specs
        .iter()
        .map(|s| {
            s.parse::<IndexKind>()
                .with_context(|| format!("invalid index '{}'", s))
        })
        .collect()
}

fn print_summaries(summaries: &[scenestack_pipeline::batch::BatchSummary]) {
    for summary in summaries {
        println!(
            "{} {}: {} scene(s) processed, {} skipped",
            summary.year,
            summary.index.name(),
            summary.processed,
            summary.skipped.len()
        );
        for skip in &summary.skipped {
            println!("  skipped {}: {}", skip.scene, skip.reason);
        }
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            raw,
            out,
            years,
            indices,
        } => {
            let indices = parse_indices(&indices)?;
            let config = BatchConfig {
                raw_root: raw,
                out_root: out,
                years,
                indices,
            };

            let start = Instant::now();
            let summaries = run_batches(&config).context("pipeline run failed")?;
            print_summaries(&summaries);
            println!("  Processing time: {:.2?}", start.elapsed());
        }

        Commands::Stack { raw, out, year } => {
            let year_dir = raw.join(&year);
            let scene_dirs = discover_scenes(&year_dir)
                .with_context(|| format!("cannot list scenes under {}", year_dir.display()))?;
            info!(year = %year, scenes = scene_dirs.len(), "stacking scenes");

            let start = Instant::now();
            let pb = spinner("Stacking scenes...");
            let mut written = 0usize;
            for dir in &scene_dirs {
                let scene = match Scene::locate(dir) {
                    Ok(scene) => scene,
                    Err(e) => {
                        tracing::warn!(scene = %dir.display(), error = %e, "scene skipped");
                        continue;
                    }
                };
                write_scene_stack(&scene, &out, &year)
                    .with_context(|| format!("failed to stack scene {}", scene.id()))?;
                written += 1;
            }
            pb.finish_and_clear();
            println!("{} stack(s) written to {}", written, out.join(&year).display());
            println!("  Processing time: {:.2?}", start.elapsed());
        }

        Commands::Index {
            raw,
            out,
            year,
            index,
        } => {
            let kind: IndexKind = index
                .parse()
                .with_context(|| format!("invalid index '{}'", index))?;
            let config = BatchConfig {
                raw_root: raw,
                out_root: out,
                years: vec![year.clone()],
                indices: vec![kind],
            };

            let start = Instant::now();
            let summary = run_batch(&config, &year, kind)
                .with_context(|| format!("{} batch for {} failed", kind.name(), year))?;
            print_summaries(std::slice::from_ref(&summary));
            println!("  Processing time: {:.2?}", start.elapsed());
        }

        Commands::IndexFromStack { out, year, index } => {
            let kind: IndexKind = index
                .parse()
                .with_context(|| format!("invalid index '{}'", index))?;

            let start = Instant::now();
            let summary = run_batch_from_stacks(&out, &year, kind).with_context(|| {
                format!("{} batch from stacks for {} failed", kind.name(), year)
            })?;
            print_summaries(std::slice::from_ref(&summary));
            println!("  Processing time: {:.2?}", start.elapsed());
        }

        Commands::Average { out, year, index } => {
            let kind: IndexKind = index
                .parse()
                .with_context(|| format!("invalid index '{}'", index))?;

            let start = Instant::now();
            let summary = average_products(&out, &year, kind)
                .with_context(|| format!("averaging {} for {} failed", kind.name(), year))?;
            print_summaries(std::slice::from_ref(&summary));
            println!("  Processing time: {:.2?}", start.elapsed());
        }

        Commands::Info { input } => {
            let pb = spinner("Reading raster...");
            let raster: scenestack_core::Raster<f64> =
                read_geotiff(&input, None).context("Failed to read raster")?;
            pb.finish_and_clear();

            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
        }
    }

    Ok(())
}
