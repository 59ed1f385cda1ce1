//! Per-scene band stacking
//!
//! Reads the seven single-band rasters of a scene and assembles them
//! into one multiband raster in canonical role order. The first band
//! provides the spatial template; every further band must match its
//! grid exactly, since silently stacking mismatched grids corrupts the
//! output.

use crate::band::Scene;
use crate::layout;
use scenestack_core::io::{read_geotiff, write_stack};
use scenestack_core::{BandStack, Error, Raster, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Read all seven bands of a scene into a [`BandStack`], role order
/// preserved.
///
/// Fails with `BandRead` if a band cannot be read and `GridMismatch`
/// if a band's grid disagrees with the first band's.
pub fn build_stack(scene: &Scene) -> Result<BandStack<f64>> {
    let mut paths = scene.band_paths();

    // Scene construction guarantees seven roles.
    let (_, first_path) = paths
        .next()
        .ok_or_else(|| Error::Other(format!("scene '{}' has no band files", scene.id())))?;
    let first: Raster<f64> = read_geotiff(first_path, None)?;
    let mut stack = BandStack::from_first_band(first);

    for (_, path) in paths {
        let band: Raster<f64> = read_geotiff(path, None)?;
        stack.push_band(band)?;
    }

    Ok(stack)
}

/// Build a scene's stack and write it to
/// `<out>/<year>/<scene_id>_stack.tif`.
///
/// Returns the output path.
pub fn write_scene_stack(scene: &Scene, out_root: &Path, year: &str) -> Result<PathBuf> {
    let stack = build_stack(scene)?;

    layout::ensure_dir(&layout::year_dir(out_root, year))?;
    let path = layout::stack_path(out_root, year, scene.id());
    write_stack(&stack, &path)?;

    info!(
        scene = scene.id(),
        bands = stack.band_count(),
        path = %path.display(),
        "stack written"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::band::BandRole;
    use scenestack_core::io::{read_stack, write_geotiff};
    use scenestack_core::GeoTransform;
    use std::fs;

    fn write_band(dir: &Path, scene: &str, role: BandRole, rows: usize, cols: usize, value: f64) {
        let mut raster = Raster::filled(rows, cols, value);
        raster.set_transform(GeoTransform::new(0.0, 100.0, 30.0, -30.0));
        let path = dir.join(format!("{}_{}", scene, role.suffix()));
        write_geotiff(&raster, path).unwrap();
    }

    fn write_scene(root: &Path, id: &str, rows: usize, cols: usize) -> PathBuf {
        let dir = root.join(id);
        fs::create_dir_all(&dir).unwrap();
        for (i, role) in BandRole::ALL.into_iter().enumerate() {
            write_band(&dir, id, role, rows, cols, (i + 1) as f64);
        }
        dir
    }

    #[test]
    fn test_build_stack_seven_bands_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = write_scene(tmp.path(), "scene_a", 3, 4);

        let scene = Scene::locate(&dir).unwrap();
        let stack = build_stack(&scene).unwrap();

        assert_eq!(stack.band_count(), 7);
        assert_eq!(stack.shape(), (3, 4));
        // Band values encode their role position
        assert_eq!(stack.band(0).unwrap()[(0, 0)], 1.0);
        assert_eq!(stack.band(6).unwrap()[(0, 0)], 7.0);
    }

    #[test]
    fn test_build_stack_rejects_grid_mismatch() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = write_scene(tmp.path(), "scene_b", 3, 4);
        // Overwrite SWIR2 with a differently sized grid
        write_band(&dir, "scene_b", BandRole::Swir2, 4, 4, 7.0);

        let scene = Scene::locate(&dir).unwrap();
        let err = build_stack(&scene).unwrap_err();
        assert!(matches!(
            err,
            scenestack_core::Error::GridMismatch { .. }
        ));
    }

    #[test]
    fn test_write_scene_stack_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = write_scene(tmp.path(), "scene_c", 2, 2);
        let out = tmp.path().join("processed");

        let scene = Scene::locate(&dir).unwrap();
        let path = write_scene_stack(&scene, &out, "2021").unwrap();

        assert!(path.ends_with("2021/scene_c_stack.tif"));
        let stack: BandStack<f64> = read_stack(&path).unwrap();
        assert_eq!(stack.band_count(), 7);
        assert_eq!(stack.band(3).unwrap()[(1, 1)], 4.0);
    }
}
