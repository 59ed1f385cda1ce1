//! Report writing
//!
//! Emits the per-batch statistics table as CSV and the averaged
//! composite as a GeoTIFF. Failures here are `OutputWrite`: fatal for
//! the batch, but other batches proceed.

use crate::aggregate::StatsRecord;
use crate::index::IndexKind;
use crate::layout;
use scenestack_core::io::write_geotiff;
use scenestack_core::{Error, Raster, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Write the statistics table to
/// `<out>/<year>/AVERAGES/averages_<INDEX>_<year>.csv`.
///
/// Row order is the caller's: one row per scene, then the AVERAGE row.
pub fn write_stats_csv(
    out_root: &Path,
    year: &str,
    kind: IndexKind,
    records: &[StatsRecord],
) -> Result<PathBuf> {
    layout::ensure_dir(&layout::averages_dir(out_root, year))?;
    let path = layout::averages_csv_path(out_root, year, kind);

    let mut writer = csv::Writer::from_path(&path).map_err(|e| Error::OutputWrite {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    for record in records {
        writer.serialize(record).map_err(|e| Error::OutputWrite {
            path: path.clone(),
            reason: e.to_string(),
        })?;
    }
    writer.flush().map_err(|e| Error::OutputWrite {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    info!(rows = records.len(), path = %path.display(), "statistics table written");
    Ok(path)
}

/// Write the averaged composite to
/// `<out>/<year>/AVERAGES/averaged_<INDEX>_<year>.tif`.
pub fn write_averaged_raster(
    out_root: &Path,
    year: &str,
    kind: IndexKind,
    raster: &Raster<f64>,
) -> Result<PathBuf> {
    layout::ensure_dir(&layout::averages_dir(out_root, year))?;
    let path = layout::averaged_raster_path(out_root, year, kind);
    write_geotiff(raster, &path)?;

    info!(path = %path.display(), "averaged composite written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::stats_record;
    use ndarray::array;

    #[test]
    fn test_csv_has_header_and_ordered_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let records = vec![
            stats_record("scene_a_NDVI", &array![[0.2, 0.4]]),
            stats_record("AVERAGE_NDVI", &array![[0.3, 0.3]]),
        ];

        let path = write_stats_csv(tmp.path(), "2020", IndexKind::Ndvi, &records).unwrap();
        assert!(path.ends_with("2020/AVERAGES/averages_NDVI_2020.csv"));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Filename,Min,Max,Mean,Median");
        assert!(lines[1].starts_with("scene_a_NDVI,"));
        assert!(lines[2].starts_with("AVERAGE_NDVI,"));
    }

    #[test]
    fn test_averaged_raster_path() {
        let tmp = tempfile::tempdir().unwrap();
        let raster = Raster::from_array(array![[0.5, -0.5]]);

        let path =
            write_averaged_raster(tmp.path(), "2022", IndexKind::Nbr, &raster).unwrap();
        assert!(path.ends_with("2022/AVERAGES/averaged_NBR_2022.tif"));
        assert!(path.is_file());
    }
}
