//! Full-pipeline tests over synthetic scene trees

use approx::assert_relative_eq;
use scenestack_core::io::{read_geotiff, write_geotiff};
use scenestack_core::{GeoTransform, Raster};
use scenestack_pipeline::band::{discover_scenes, BandRole, Scene};
use scenestack_pipeline::batch::{
    average_products, run_batch, run_batch_from_stacks, run_batches, BatchConfig,
};
use scenestack_pipeline::index::IndexKind;
use scenestack_pipeline::stack::write_scene_stack;
use std::fs;
use std::path::Path;

/// Write one scene directory with all seven bands. The NIR and Red
/// bands get the given grids; every other band is a constant 1.0 so
/// the scene is structurally complete.
fn write_scene(raw_root: &Path, year: &str, id: &str, nir: &[Vec<f64>], red: &[Vec<f64>]) {
    let dir = raw_root.join(year).join(id);
    fs::create_dir_all(&dir).unwrap();

    let rows = nir.len();
    let cols = nir[0].len();

    for role in BandRole::ALL {
        let values: Vec<f64> = match role {
            BandRole::Nir => nir.iter().flatten().copied().collect(),
            BandRole::Red => red.iter().flatten().copied().collect(),
            _ => vec![1.0; rows * cols],
        };
        let mut raster = Raster::from_vec(values, rows, cols).unwrap();
        raster.set_transform(GeoTransform::new(500_000.0, 4_200_000.0, 30.0, -30.0));
        write_geotiff(&raster, dir.join(format!("{}_{}", id, role.suffix()))).unwrap();
    }
}

#[test]
fn averaged_ndvi_ignores_all_nan_scene() {
    let tmp = tempfile::tempdir().unwrap();
    let raw = tmp.path().join("raw");
    let out = tmp.path().join("processed");

    // Scene A: NDVI = (4-2)/(4+2) = 1/3 everywhere.
    write_scene(&raw, "2021", "scene_a", &[vec![4.0, 4.0]], &[vec![2.0, 2.0]]);
    // Scene B: 0/0 everywhere -> NaN.
    write_scene(&raw, "2021", "scene_b", &[vec![0.0, 0.0]], &[vec![0.0, 0.0]]);

    let config = BatchConfig {
        raw_root: raw,
        out_root: out.clone(),
        years: vec!["2021".to_string()],
        indices: vec![IndexKind::Ndvi],
    };

    let summaries = run_batches(&config).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].processed, 2);
    assert!(summaries[0].skipped.is_empty());

    // Per-scene products exist at the conventional paths.
    assert!(out.join("2021/NDVI/scene_a_NDVI.tif").is_file());
    assert!(out.join("2021/NDVI/scene_b_NDVI.tif").is_file());

    // The composite ignores scene B's NaN cells, so it equals scene A's NDVI.
    let averaged: Raster<f64> =
        read_geotiff(out.join("2021/AVERAGES/averaged_NDVI_2021.tif"), None).unwrap();
    assert_eq!(averaged.shape(), (1, 2));
    assert_relative_eq!(averaged.get(0, 0).unwrap(), 1.0 / 3.0, epsilon = 1e-6);
    assert_relative_eq!(averaged.get(0, 1).unwrap(), 1.0 / 3.0, epsilon = 1e-6);

    // Statistics table: two scene rows plus the AVERAGE row.
    let csv = fs::read_to_string(out.join("2021/AVERAGES/averages_NDVI_2021.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "Filename,Min,Max,Mean,Median");
    assert!(lines[1].starts_with("scene_a_NDVI,"));
    assert!(lines[2].starts_with("scene_b_NDVI,"));
    assert!(lines[3].starts_with("AVERAGE_NDVI,"));

    // AVERAGE row min/max/mean/median all equal scene A's constant NDVI.
    let fields: Vec<&str> = lines[3].split(',').collect();
    for field in &fields[1..] {
        let value: f64 = field.parse().unwrap();
        assert_relative_eq!(value, 1.0 / 3.0, epsilon = 1e-6);
    }
}

#[test]
fn missing_band_skips_scene_without_aborting_batch() {
    let tmp = tempfile::tempdir().unwrap();
    let raw = tmp.path().join("raw");
    let out = tmp.path().join("processed");

    write_scene(&raw, "2020", "scene_ok", &[vec![6.0]], &[vec![2.0]]);
    write_scene(&raw, "2020", "scene_no_swir2", &[vec![6.0]], &[vec![2.0]]);
    // Remove SWIR2 from the second scene.
    let dir = raw.join("2020").join("scene_no_swir2");
    fs::remove_file(dir.join("scene_no_swir2_B7.TIF")).unwrap();

    let config = BatchConfig {
        raw_root: raw,
        out_root: out.clone(),
        years: vec!["2020".to_string()],
        indices: vec![IndexKind::Nbr],
    };

    let summary = run_batch(&config, "2020", IndexKind::Nbr).unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].scene, "scene_no_swir2");
    assert!(summary.skipped[0].reason.contains("SWIR2"));

    // The surviving scene still produced the batch outputs.
    assert!(out.join("2020/NBR/scene_ok_NBR.tif").is_file());
    assert!(out.join("2020/AVERAGES/averages_NBR_2020.csv").is_file());
    assert!(out.join("2020/AVERAGES/averaged_NBR_2020.tif").is_file());

    let csv = fs::read_to_string(out.join("2020/AVERAGES/averages_NBR_2020.csv")).unwrap();
    assert_eq!(csv.lines().count(), 3); // header + scene_ok + AVERAGE
}

#[test]
fn average_products_recomposes_from_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let raw = tmp.path().join("raw");
    let out = tmp.path().join("processed");

    write_scene(&raw, "2022", "scene_a", &[vec![9.0, 3.0]], &[vec![3.0, 1.0]]);
    write_scene(&raw, "2022", "scene_b", &[vec![9.0, 3.0]], &[vec![3.0, 1.0]]);

    let config = BatchConfig {
        raw_root: raw,
        out_root: out.clone(),
        years: vec!["2022".to_string()],
        indices: vec![IndexKind::Ndvi],
    };
    run_batches(&config).unwrap();

    // Re-average from the per-scene products written by the batch.
    let summary = average_products(&out, "2022", IndexKind::Ndvi).unwrap();
    assert_eq!(summary.processed, 2);

    // Identical scenes: the composite equals each scene's NDVI.
    let averaged: Raster<f64> =
        read_geotiff(out.join("2022/AVERAGES/averaged_NDVI_2022.tif"), None).unwrap();
    assert_relative_eq!(averaged.get(0, 0).unwrap(), 0.5, epsilon = 1e-6);
    assert_relative_eq!(averaged.get(0, 1).unwrap(), 0.5, epsilon = 1e-6);
}

#[test]
fn index_from_stacks_matches_band_path() {
    let tmp = tempfile::tempdir().unwrap();
    let raw = tmp.path().join("raw");
    let out = tmp.path().join("processed");

    write_scene(&raw, "2023", "scene_a", &[vec![4.0, 4.0]], &[vec![2.0, 2.0]]);
    write_scene(&raw, "2023", "scene_b", &[vec![8.0, 8.0]], &[vec![2.0, 2.0]]);

    // Build the per-scene stacks first, like a `stack` run would.
    for dir in discover_scenes(&raw.join("2023")).unwrap() {
        let scene = Scene::locate(&dir).unwrap();
        write_scene_stack(&scene, &out, "2023").unwrap();
    }

    let summary = run_batch_from_stacks(&out, "2023", IndexKind::Ndvi).unwrap();
    assert_eq!(summary.processed, 2);
    assert!(summary.skipped.is_empty());

    assert!(out.join("2023/NDVI/scene_a_NDVI.tif").is_file());
    assert!(out.join("2023/NDVI/scene_b_NDVI.tif").is_file());

    // NDVI: scene A = 2/6, scene B = 6/10; composite is their mean.
    let averaged: Raster<f64> =
        read_geotiff(out.join("2023/AVERAGES/averaged_NDVI_2023.tif"), None).unwrap();
    assert_eq!(averaged.shape(), (1, 2));
    let expected = (1.0 / 3.0 + 0.6) / 2.0;
    assert_relative_eq!(averaged.get(0, 0).unwrap(), expected, epsilon = 1e-6);
}

#[test]
fn heterogeneous_scene_extents_are_reconciled() {
    let tmp = tempfile::tempdir().unwrap();
    let raw = tmp.path().join("raw");
    let out = tmp.path().join("processed");

    // Scene A is 1x2, scene B is 1x3 (off-by-one-pixel extent).
    write_scene(&raw, "2019", "scene_a", &[vec![4.0, 4.0]], &[vec![2.0, 2.0]]);
    write_scene(
        &raw,
        "2019",
        "scene_b",
        &[vec![4.0, 4.0, 4.0]],
        &[vec![2.0, 2.0, 2.0]],
    );

    let config = BatchConfig {
        raw_root: raw,
        out_root: out.clone(),
        years: vec!["2019".to_string()],
        indices: vec![IndexKind::Ndvi],
    };

    let summary = run_batch(&config, "2019", IndexKind::Ndvi).unwrap();
    assert_eq!(summary.processed, 2);

    // Target shape is the smaller extent; scene B was truncated into it.
    let averaged: Raster<f64> =
        read_geotiff(out.join("2019/AVERAGES/averaged_NDVI_2019.tif"), None).unwrap();
    assert_eq!(averaged.shape(), (1, 2));
    assert_relative_eq!(averaged.get(0, 0).unwrap(), 1.0 / 3.0, epsilon = 1e-6);
}
