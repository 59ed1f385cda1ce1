//! Output directory layout
//!
//! The on-disk layout is fixed for compatibility with downstream
//! consumers of the processed tree:
//!
//! ```text
//! <out>/<year>/<scene_id>_stack.tif
//! <out>/<year>/<INDEX>/<scene_id>_<INDEX>.tif
//! <out>/<year>/AVERAGES/averages_<INDEX>_<year>.csv
//! <out>/<year>/AVERAGES/averaged_<INDEX>_<year>.tif
//! ```

use crate::index::IndexKind;
use scenestack_core::Result;
use std::path::{Path, PathBuf};

/// `<out>/<year>`
pub fn year_dir(out_root: &Path, year: &str) -> PathBuf {
    out_root.join(year)
}

/// `<out>/<year>/<scene_id>_stack.tif`
pub fn stack_path(out_root: &Path, year: &str, scene_id: &str) -> PathBuf {
    year_dir(out_root, year).join(format!("{}_stack.tif", scene_id))
}

/// `<out>/<year>/<INDEX>`
pub fn index_dir(out_root: &Path, year: &str, kind: IndexKind) -> PathBuf {
    year_dir(out_root, year).join(kind.name())
}

/// `<out>/<year>/<INDEX>/<scene_id>_<INDEX>.tif`
pub fn index_path(out_root: &Path, year: &str, kind: IndexKind, scene_id: &str) -> PathBuf {
    index_dir(out_root, year, kind).join(format!("{}_{}.tif", scene_id, kind.name()))
}

/// `<out>/<year>/AVERAGES`
pub fn averages_dir(out_root: &Path, year: &str) -> PathBuf {
    year_dir(out_root, year).join("AVERAGES")
}

/// `<out>/<year>/AVERAGES/averages_<INDEX>_<year>.csv`
pub fn averages_csv_path(out_root: &Path, year: &str, kind: IndexKind) -> PathBuf {
    averages_dir(out_root, year).join(format!("averages_{}_{}.csv", kind.name(), year))
}

/// `<out>/<year>/AVERAGES/averaged_<INDEX>_<year>.tif`
pub fn averaged_raster_path(out_root: &Path, year: &str, kind: IndexKind) -> PathBuf {
    averages_dir(out_root, year).join(format!("averaged_{}_{}.tif", kind.name(), year))
}

/// Create a directory if absent. An existing directory is not an error.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    Ok(())
}
