//! # Scenestack Core
//!
//! Core types and I/O for the scenestack imagery pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: Generic single-band raster grid
//! - `BandStack<T>`: Ordered multiband raster sharing one grid
//! - `GeoTransform`: Affine transformation for georeferencing
//! - The error taxonomy used across the pipeline
//! - Native TIFF I/O for single-band and multiband GeoTIFFs

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;

pub use crs::Crs;
pub use error::{Error, Result};
pub use raster::{BandStack, GeoTransform, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::Crs;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{BandStack, GeoTransform, Raster, RasterElement};
}
