//! Batch orchestration
//!
//! The unit of work is one (year, index) pair: locate every scene of
//! the year, compute the index per scene, reconcile shapes, average,
//! and write the statistics table plus the averaged composite.
//!
//! Scenes are independent, so per-scene work runs on the rayon pool;
//! results are collected and sorted by scene identifier before
//! aggregation so the report order is deterministic.
//!
//! Error policy (structural vs. fatal):
//! - missing band, unreadable band, grid mismatch: the scene is
//!   recorded as skipped and the batch continues
//! - output-write failures: the batch aborts, later batches still run
//! - unknown index selectors never reach this module; they fail at
//!   configuration parsing

use crate::aggregate::{average, stats_record, StatsRecord};
use crate::band::{discover_scenes, Scene};
use crate::index::{compute_index, compute_index_from_stack, IndexKind};
use crate::layout;
use crate::reconcile::{reconcile, ReshapePath};
use crate::report::{write_averaged_raster, write_stats_csv};
use ndarray::Array2;
use rayon::prelude::*;
use scenestack_core::io::{read_geotiff, read_stack, write_geotiff};
use scenestack_core::{Crs, Error, GeoTransform, Raster, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration for a pipeline run
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Root of the raw data tree (`<raw>/<year>/<scene>/...B1.TIF`)
    pub raw_root: PathBuf,
    /// Root of the processed output tree
    pub out_root: PathBuf,
    /// Years to process, as directory names
    pub years: Vec<String>,
    /// Indices to compute per year
    pub indices: Vec<IndexKind>,
}

impl BatchConfig {
    /// Validate the configuration before any work starts
    pub fn validate(&self) -> Result<()> {
        if self.years.is_empty() {
            return Err(Error::Other("no years configured".to_string()));
        }
        if self.indices.is_empty() {
            return Err(Error::Other("no indices configured".to_string()));
        }
        if !self.raw_root.is_dir() {
            return Err(Error::Other(format!(
                "raw data root {} is not a directory",
                self.raw_root.display()
            )));
        }
        Ok(())
    }
}

/// A scene excluded from a batch, with the reason
#[derive(Debug, Clone)]
pub struct SkippedScene {
    pub scene: String,
    pub reason: String,
}

/// Outcome of one (year, index) batch
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub year: String,
    pub index: IndexKind,
    pub processed: usize,
    pub skipped: Vec<SkippedScene>,
}

/// One scene's computed index, carried to reconciliation and averaging
#[derive(Debug, Clone)]
pub struct IndexResult {
    pub scene_id: String,
    pub transform: GeoTransform,
    pub crs: Option<Crs>,
    pub data: Array2<f64>,
}

/// Run every configured (year, index) batch.
///
/// A failed batch is logged and does not stop the remaining batches.
pub fn run_batches(config: &BatchConfig) -> Result<Vec<BatchSummary>> {
    config.validate()?;

    let mut summaries = Vec::new();
    for year in &config.years {
        for &kind in &config.indices {
            match run_batch(config, year, kind) {
                Ok(summary) => {
                    log_summary(&summary);
                    summaries.push(summary);
                }
                Err(e) => {
                    warn!(year = %year, index = kind.name(), error = %e, "batch failed");
                }
            }
        }
    }
    Ok(summaries)
}

/// Run a single (year, index) batch
pub fn run_batch(config: &BatchConfig, year: &str, kind: IndexKind) -> Result<BatchSummary> {
    let year_dir = config.raw_root.join(year);
    let scene_dirs = discover_scenes(&year_dir)?;
    info!(
        year,
        index = kind.name(),
        scenes = scene_dirs.len(),
        "starting batch"
    );

    let outcomes: Vec<(String, Result<IndexResult>)> = scene_dirs
        .par_iter()
        .map(|dir| {
            let label = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| dir.display().to_string());
            (label, compute_scene_index(dir, kind, &config.out_root, year))
        })
        .collect();

    let (results, skipped) = partition_outcomes(outcomes, kind)?;

    let processed = results.len();
    if processed == 0 {
        warn!(year, index = kind.name(), "no scenes produced an index; nothing to average");
        return Ok(BatchSummary {
            year: year.to_string(),
            index: kind,
            processed,
            skipped,
        });
    }

    compose_and_report(results, &config.out_root, year, kind)?;

    Ok(BatchSummary {
        year: year.to_string(),
        index: kind,
        processed,
        skipped,
    })
}

/// Split per-scene outcomes into results and recoverable skips.
///
/// A non-recoverable error aborts the batch; results come back sorted
/// by scene identifier so report order is deterministic.
fn partition_outcomes(
    outcomes: Vec<(String, Result<IndexResult>)>,
    kind: IndexKind,
) -> Result<(Vec<IndexResult>, Vec<SkippedScene>)> {
    let mut results = Vec::new();
    let mut skipped = Vec::new();
    for (scene, outcome) in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) if e.is_scene_recoverable() => {
                warn!(scene = %scene, index = kind.name(), error = %e, "scene skipped");
                skipped.push(SkippedScene {
                    scene,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }
    results.sort_by(|a, b| a.scene_id.cmp(&b.scene_id));
    Ok((results, skipped))
}

/// Run a single (year, index) batch over pre-built scene stacks
/// instead of raw bands, reading `<out>/<year>/*_stack.tif`.
pub fn run_batch_from_stacks(out_root: &Path, year: &str, kind: IndexKind) -> Result<BatchSummary> {
    let year_dir = layout::year_dir(out_root, year);
    let mut stack_paths: Vec<PathBuf> = std::fs::read_dir(&year_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with("_stack.tif"))
        })
        .collect();
    stack_paths.sort();

    info!(
        year,
        index = kind.name(),
        stacks = stack_paths.len(),
        "starting batch from stacks"
    );

    let outcomes: Vec<(String, Result<IndexResult>)> = stack_paths
        .par_iter()
        .map(|path| {
            (
                stack_scene_id(path),
                compute_stack_index(path, kind, out_root, year),
            )
        })
        .collect();

    let (results, skipped) = partition_outcomes(outcomes, kind)?;

    let processed = results.len();
    if processed == 0 {
        warn!(year, index = kind.name(), "no stacks produced an index; nothing to average");
        return Ok(BatchSummary {
            year: year.to_string(),
            index: kind,
            processed,
            skipped,
        });
    }

    compose_and_report(results, out_root, year, kind)?;

    Ok(BatchSummary {
        year: year.to_string(),
        index: kind,
        processed,
        skipped,
    })
}

/// Compute one scene's index from its pre-built stack and persist the
/// per-scene product to `<out>/<year>/<INDEX>/<scene_id>_<INDEX>.tif`.
pub fn compute_stack_index(
    stack_path: &Path,
    kind: IndexKind,
    out_root: &Path,
    year: &str,
) -> Result<IndexResult> {
    let stack = read_stack::<f64, _>(stack_path)?;

    // A malformed stack (too few bands) skips this scene like an
    // unreadable band file would.
    let index = compute_index_from_stack(kind, &stack).map_err(|e| match e {
        e @ Error::GridMismatch { .. } => e,
        other => Error::BandRead {
            path: stack_path.to_path_buf(),
            reason: other.to_string(),
        },
    })?;

    let scene_id = stack_scene_id(stack_path);
    layout::ensure_dir(&layout::index_dir(out_root, year, kind))?;
    let product_path = layout::index_path(out_root, year, kind, &scene_id);
    write_geotiff(&index, &product_path)?;

    let transform = *index.transform();
    let crs = index.crs().cloned();
    Ok(IndexResult {
        scene_id,
        transform,
        crs,
        data: index.into_array(),
    })
}

/// Scene identifier from a `<scene_id>_stack.tif` path
fn stack_scene_id(path: &Path) -> String {
    let name = path
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    name.strip_suffix("_stack").unwrap_or(&name).to_string()
}

/// Compute one scene's index and persist the per-scene product to
/// `<out>/<year>/<INDEX>/<scene_id>_<INDEX>.tif`.
pub fn compute_scene_index(
    scene_dir: &Path,
    kind: IndexKind,
    out_root: &Path,
    year: &str,
) -> Result<IndexResult> {
    let scene = Scene::locate(scene_dir)?;
    let (role_a, role_b) = kind.band_pair();

    let band_a: Raster<f64> = read_geotiff(scene.band_path(role_a), None)?;
    let band_b: Raster<f64> = read_geotiff(scene.band_path(role_b), None)?;

    let index = compute_index(kind, &band_a, &band_b)?;

    layout::ensure_dir(&layout::index_dir(out_root, year, kind))?;
    let product_path = layout::index_path(out_root, year, kind, scene.id());
    write_geotiff(&index, &product_path)?;

    let transform = *index.transform();
    let crs = index.crs().cloned();
    Ok(IndexResult {
        scene_id: scene.id().to_string(),
        transform,
        crs,
        data: index.into_array(),
    })
}

/// Reconcile, average, tabulate and write the batch outputs.
///
/// `results` must be non-empty and ordered; the row order of the CSV
/// follows it, with the synthetic `AVERAGE_<INDEX>` row last.
pub fn compose_and_report(
    results: Vec<IndexResult>,
    out_root: &Path,
    year: &str,
    kind: IndexKind,
) -> Result<()> {
    let template = results
        .first()
        .map(|r| (r.transform, r.crs.clone()))
        .ok_or_else(|| Error::ShapeReconcile("no index results to compose".to_string()))?;

    let mut records: Vec<StatsRecord> = results
        .iter()
        .map(|r| stats_record(format!("{}_{}", r.scene_id, kind.name()), &r.data))
        .collect();

    let arrays: Vec<Array2<f64>> = results.into_iter().map(|r| r.data).collect();
    let (reconciled, paths) = reconcile(arrays)?;
    let resized = paths.iter().filter(|p| **p == ReshapePath::Resized).count();
    if resized > 0 {
        warn!(resized, index = kind.name(), "lossy resize applied during reconciliation");
    }

    let averaged = average(&reconciled)?;
    records.push(stats_record(format!("AVERAGE_{}", kind.name()), &averaged));

    let mut raster = Raster::from_array(averaged);
    raster.set_transform(template.0);
    raster.set_crs(template.1);
    raster.set_nodata(Some(f64::NAN));

    write_stats_csv(out_root, year, kind, &records)?;
    write_averaged_raster(out_root, year, kind, &raster)?;
    Ok(())
}

/// Average previously written per-scene index products for one
/// (year, index), re-reading them from
/// `<out>/<year>/<INDEX>/*_<INDEX>.tif`.
///
/// This composes with a separate `index` run the way the batch path
/// composes compute and average in memory.
pub fn average_products(out_root: &Path, year: &str, kind: IndexKind) -> Result<BatchSummary> {
    let dir = layout::index_dir(out_root, year, kind);
    if !dir.is_dir() {
        return Err(Error::Other(format!(
            "{} does not exist; compute {} products first",
            dir.display(),
            kind.name()
        )));
    }

    let suffix = format!("_{}.tif", kind.name());
    let mut paths: Vec<PathBuf> = std::fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(&suffix))
        })
        .collect();
    paths.sort();

    let mut results = Vec::new();
    let mut skipped = Vec::new();
    for path in paths {
        let name = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        // Strip the trailing _<INDEX> so compose re-appends it uniformly
        let scene_id = name
            .strip_suffix(&format!("_{}", kind.name()))
            .unwrap_or(&name)
            .to_string();

        match read_geotiff::<f64, _>(&path, None) {
            Ok(raster) => {
                let transform = *raster.transform();
                let crs = raster.crs().cloned();
                results.push(IndexResult {
                    scene_id,
                    transform,
                    crs,
                    data: raster.into_array(),
                });
            }
            Err(e) => {
                warn!(product = %path.display(), error = %e, "product skipped");
                skipped.push(SkippedScene {
                    scene: scene_id,
                    reason: e.to_string(),
                });
            }
        }
    }

    let processed = results.len();
    if processed == 0 {
        return Err(Error::ShapeReconcile(format!(
            "no {} products found under {}",
            kind.name(),
            dir.display()
        )));
    }

    compose_and_report(results, out_root, year, kind)?;

    Ok(BatchSummary {
        year: year.to_string(),
        index: kind,
        processed,
        skipped,
    })
}

fn log_summary(summary: &BatchSummary) {
    info!(
        year = %summary.year,
        index = summary.index.name(),
        processed = summary.processed,
        skipped = summary.skipped.len(),
        "batch finished"
    );
    for skip in &summary.skipped {
        info!(scene = %skip.scene, reason = %skip.reason, "skipped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_empty_config() {
        let tmp = tempfile::tempdir().unwrap();

        let config = BatchConfig {
            raw_root: tmp.path().to_path_buf(),
            out_root: tmp.path().join("out"),
            years: vec![],
            indices: vec![IndexKind::Ndvi],
        };
        assert!(config.validate().is_err());

        let config = BatchConfig {
            raw_root: tmp.path().to_path_buf(),
            out_root: tmp.path().join("out"),
            years: vec!["2021".to_string()],
            indices: vec![],
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_missing_raw_root() {
        let config = BatchConfig {
            raw_root: PathBuf::from("/definitely/not/a/real/path"),
            out_root: PathBuf::from("/tmp"),
            years: vec!["2021".to_string()],
            indices: vec![IndexKind::Ndvi],
        };
        assert!(config.validate().is_err());
    }
}
