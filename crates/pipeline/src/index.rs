//! Spectral index computation
//!
//! Three normalized-difference indices over fixed band roles:
//!
//! - NDVI = (NIR - Red)   / (NIR + Red)
//! - NDMI = (NIR - SWIR1) / (NIR + SWIR1)
//! - NBR  = (NIR - SWIR2) / (NIR + SWIR2)
//!
//! The ratio is evaluated in f64 with plain IEEE semantics: a zero
//! denominator yields Inf, 0/0 yields NaN, and nothing raises. Cells
//! that cannot be measured therefore stay visible as non-finite values
//! all the way through averaging.

use crate::band::BandRole;
use ndarray::Array2;
use scenestack_core::{BandStack, Error, Raster, Result};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// The supported spectral indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// Normalized Difference Vegetation Index
    Ndvi,
    /// Normalized Difference Moisture Index
    Ndmi,
    /// Normalized Burn Ratio
    Nbr,
}

impl IndexKind {
    /// All indices, in selector order
    pub const ALL: [IndexKind; 3] = [IndexKind::Ndvi, IndexKind::Ndmi, IndexKind::Nbr];

    /// Uppercase name used in output paths and report rows
    pub fn name(self) -> &'static str {
        match self {
            IndexKind::Ndvi => "NDVI",
            IndexKind::Ndmi => "NDMI",
            IndexKind::Nbr => "NBR",
        }
    }

    /// The (numerator-positive, numerator-negative) operand band roles
    pub fn band_pair(self) -> (BandRole, BandRole) {
        match self {
            IndexKind::Ndvi => (BandRole::Nir, BandRole::Red),
            IndexKind::Ndmi => (BandRole::Nir, BandRole::Swir1),
            IndexKind::Nbr => (BandRole::Nir, BandRole::Swir2),
        }
    }

    /// Resolve a numeric selector (0 = NDVI, 1 = NDMI, 2 = NBR).
    ///
    /// Any other value is [`Error::UnknownIndex`].
    pub fn from_selector(selector: u8) -> Result<IndexKind> {
        match selector {
            0 => Ok(IndexKind::Ndvi),
            1 => Ok(IndexKind::Ndmi),
            2 => Ok(IndexKind::Nbr),
            other => Err(Error::UnknownIndex(other.to_string())),
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IndexKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<IndexKind> {
        match s.to_ascii_uppercase().as_str() {
            "NDVI" | "0" => Ok(IndexKind::Ndvi),
            "NDMI" | "1" => Ok(IndexKind::Ndmi),
            "NBR" | "2" => Ok(IndexKind::Nbr),
            other => Err(Error::UnknownIndex(other.to_string())),
        }
    }
}

/// Compute a normalized-difference index from its two operand bands.
///
/// `band_a` and `band_b` are the roles given by
/// [`IndexKind::band_pair`]. The bands must share one grid. The
/// NaN-ignoring min/max of the result is logged for sanity checking.
pub fn compute_index(
    kind: IndexKind,
    band_a: &Raster<f64>,
    band_b: &Raster<f64>,
) -> Result<Raster<f64>> {
    if band_a.shape() != band_b.shape() {
        let (ar, ac) = band_a.shape();
        let (br, bc) = band_b.shape();
        return Err(Error::GridMismatch {
            expected_rows: ar,
            expected_cols: ac,
            actual_rows: br,
            actual_cols: bc,
        });
    }

    let data = normalized_difference(band_a.data(), band_b.data());

    let (min, max) = nan_min_max(&data);
    debug!(index = kind.name(), min, max, "computed index");

    let mut output = band_a.with_same_meta(data);
    output.set_nodata(Some(f64::NAN));
    Ok(output)
}

/// Compute a normalized-difference index from a pre-built scene
/// stack, extracting both operand bands by role position.
///
/// The extracted bands carry the stack's spatial metadata, so the
/// result is georeferenced like the stack.
pub fn compute_index_from_stack(kind: IndexKind, stack: &BandStack<f64>) -> Result<Raster<f64>> {
    let (role_a, role_b) = kind.band_pair();
    let band_a = stack_band(stack, role_a)?;
    let band_b = stack_band(stack, role_b)?;
    compute_index(kind, &band_a, &band_b)
}

fn stack_band(stack: &BandStack<f64>, role: BandRole) -> Result<Raster<f64>> {
    stack.band_raster(role.position()).ok_or_else(|| {
        Error::Other(format!(
            "stack has {} band(s); the {} band (position {}) is not present",
            stack.band_count(),
            role.name(),
            role.position()
        ))
    })
}

/// `(a - b) / (a + b)` elementwise, IEEE NaN/Inf propagation
pub fn normalized_difference(a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    let mut out = a - b;
    let denom = a + b;
    out.zip_mut_with(&denom, |v, &d| *v /= d);
    out
}

/// Minimum and maximum ignoring non-finite cells; NaN if none are finite
pub fn nan_min_max(data: &Array2<f64>) -> (f64, f64) {
    let mut min = f64::NAN;
    let mut max = f64::NAN;
    for &v in data.iter() {
        if !v.is_finite() {
            continue;
        }
        if min.is_nan() || v < min {
            min = v;
        }
        if max.is_nan() || v > max {
            max = v;
        }
    }
    (min, max)
}
