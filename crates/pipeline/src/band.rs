//! Band roles and scene discovery
//!
//! A scene is one directory of co-registered single-band rasters for a
//! single acquisition. Landsat Collection files name their bands with
//! the suffixes `B1.TIF` .. `B7.TIF`; the suffix fixes the spectral
//! role and the role order fixes the stacking order.

use scenestack_core::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The seven expected spectral band roles, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BandRole {
    CoastalAerosol,
    Blue,
    Green,
    Red,
    Nir,
    Swir1,
    Swir2,
}

impl BandRole {
    /// All roles in canonical (stacking) order
    pub const ALL: [BandRole; 7] = [
        BandRole::CoastalAerosol,
        BandRole::Blue,
        BandRole::Green,
        BandRole::Red,
        BandRole::Nir,
        BandRole::Swir1,
        BandRole::Swir2,
    ];

    /// Filename suffix that marks a file as carrying this role
    pub fn suffix(self) -> &'static str {
        match self {
            BandRole::CoastalAerosol => "B1.TIF",
            BandRole::Blue => "B2.TIF",
            BandRole::Green => "B3.TIF",
            BandRole::Red => "B4.TIF",
            BandRole::Nir => "B5.TIF",
            BandRole::Swir1 => "B6.TIF",
            BandRole::Swir2 => "B7.TIF",
        }
    }

    /// Position of this role in canonical stacking order (band index
    /// within a scene stack)
    pub fn position(self) -> usize {
        match self {
            BandRole::CoastalAerosol => 0,
            BandRole::Blue => 1,
            BandRole::Green => 2,
            BandRole::Red => 3,
            BandRole::Nir => 4,
            BandRole::Swir1 => 5,
            BandRole::Swir2 => 6,
        }
    }

    /// Human-readable role name
    pub fn name(self) -> &'static str {
        match self {
            BandRole::CoastalAerosol => "coastal aerosol",
            BandRole::Blue => "blue",
            BandRole::Green => "green",
            BandRole::Red => "red",
            BandRole::Nir => "NIR",
            BandRole::Swir1 => "SWIR1",
            BandRole::Swir2 => "SWIR2",
        }
    }

    /// Classify a filename by its suffix (case-insensitive)
    fn from_filename(name: &str) -> Option<BandRole> {
        let upper = name.to_ascii_uppercase();
        Self::ALL.into_iter().find(|role| upper.ends_with(role.suffix()))
    }
}

/// One scene: an identifier plus the path of every band file, keyed by
/// role.
///
/// Construction guarantees that all seven roles are present; a missing
/// role is a data error, never a silent gap.
#[derive(Debug, Clone)]
pub struct Scene {
    id: String,
    bands: BTreeMap<BandRole, PathBuf>,
}

impl Scene {
    /// Scan a scene directory and resolve every band role by filename
    /// suffix.
    ///
    /// Fails with [`Error::MissingBand`] if any of the seven roles has
    /// no matching file.
    pub fn locate(scene_dir: &Path) -> Result<Scene> {
        let id = scene_id(scene_dir);
        let mut bands = BTreeMap::new();

        for entry in std::fs::read_dir(scene_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(role) = BandRole::from_filename(name) {
                bands.insert(role, path);
            }
        }

        for role in BandRole::ALL {
            if !bands.contains_key(&role) {
                return Err(Error::MissingBand {
                    scene: id,
                    role: role.name(),
                    suffix: role.suffix(),
                });
            }
        }

        Ok(Scene { id, bands })
    }

    /// Scene identifier (the scene directory name)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Path of the band file for a role
    pub fn band_path(&self, role: BandRole) -> &Path {
        // All seven roles are present by construction.
        &self.bands[&role]
    }

    /// Band paths in canonical role order
    pub fn band_paths(&self) -> impl Iterator<Item = (BandRole, &Path)> + '_ {
        BandRole::ALL
            .into_iter()
            .map(move |role| (role, self.band_path(role)))
    }
}

/// Derive the scene identifier from its directory path
fn scene_id(scene_dir: &Path) -> String {
    scene_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| scene_dir.display().to_string())
}

/// List the scene directories under a year directory, sorted by name.
///
/// Every subdirectory is treated as a scene; locating its bands happens
/// later so one malformed scene does not hide the others.
pub fn discover_scenes(year_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(year_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}
