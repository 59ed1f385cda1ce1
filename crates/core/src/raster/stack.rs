//! Multiband raster stack

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use ndarray::Array2;

/// An ordered multiband raster.
///
/// All bands share one pixel grid and one set of spatial metadata.
/// Band order is significant: the pipeline stacks the seven Landsat
/// bands in spectral order, so positional access retrieves a band by
/// its role.
#[derive(Debug, Clone)]
pub struct BandStack<T: RasterElement> {
    bands: Vec<Array2<T>>,
    shape: (usize, usize),
    transform: GeoTransform,
    crs: Option<Crs>,
    nodata: Option<T>,
}

impl<T: RasterElement> BandStack<T> {
    /// Create an empty stack from the spatial template of `first`,
    /// with the template's data as band 0.
    pub fn from_first_band(first: Raster<T>) -> Self {
        let shape = first.shape();
        let transform = *first.transform();
        let crs = first.crs().cloned();
        let nodata = first.nodata();
        Self {
            bands: vec![first.into_array()],
            shape,
            transform,
            crs,
            nodata,
        }
    }

    /// Append a band. The band grid must match the stack grid.
    pub fn push_band(&mut self, band: Raster<T>) -> Result<()> {
        let (rows, cols) = band.shape();
        if (rows, cols) != self.shape {
            return Err(Error::GridMismatch {
                expected_rows: self.shape.0,
                expected_cols: self.shape.1,
                actual_rows: rows,
                actual_cols: cols,
            });
        }
        self.bands.push(band.into_array());
        Ok(())
    }

    /// Number of bands
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Band data by position
    pub fn band(&self, index: usize) -> Option<&Array2<T>> {
        self.bands.get(index)
    }

    /// Iterate over bands in order
    pub fn bands(&self) -> impl Iterator<Item = &Array2<T>> {
        self.bands.iter()
    }

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Get the CRS
    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Extract one band as a standalone raster carrying the stack's
    /// spatial metadata
    pub fn band_raster(&self, index: usize) -> Option<Raster<T>> {
        let data = self.bands.get(index)?.clone();
        let mut raster = Raster::from_array(data);
        raster.set_transform(self.transform);
        raster.set_crs(self.crs.clone());
        raster.set_nodata(self.nodata);
        Some(raster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        Raster::filled(rows, cols, value)
    }

    #[test]
    fn test_stack_grows_in_order() {
        let mut stack = BandStack::from_first_band(band(4, 4, 1.0));
        stack.push_band(band(4, 4, 2.0)).unwrap();
        stack.push_band(band(4, 4, 3.0)).unwrap();

        assert_eq!(stack.band_count(), 3);
        assert_eq!(stack.band(1).unwrap()[(0, 0)], 2.0);
    }

    #[test]
    fn test_push_rejects_grid_mismatch() {
        let mut stack = BandStack::from_first_band(band(4, 4, 1.0));
        let err = stack.push_band(band(4, 5, 2.0)).unwrap_err();
        assert!(matches!(err, Error::GridMismatch { .. }));
    }

    #[test]
    fn test_band_raster_carries_metadata() {
        let mut first = band(2, 2, 9.0);
        first.set_transform(GeoTransform::new(10.0, 20.0, 30.0, -30.0));
        let stack = BandStack::from_first_band(first);

        let extracted = stack.band_raster(0).unwrap();
        assert_eq!(extracted.transform().origin_x, 10.0);
        assert_eq!(extracted.get(0, 0).unwrap(), 9.0);
    }
}
