//! Coordinate Reference System handling
//!
//! The pipeline treats the CRS as opaque metadata: it is read alongside a
//! raster and written back unchanged. No reprojection is performed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crs {
    /// WKT representation, if known
    wkt: Option<String>,
    /// EPSG code, if known
    epsg: Option<u32>,
}

impl Crs {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
        }
    }

    /// EPSG code, if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// WKT string, if known
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.epsg, &self.wkt) {
            (Some(code), _) => write!(f, "EPSG:{}", code),
            (None, Some(wkt)) => write!(f, "{}", wkt),
            (None, None) => write!(f, "unknown CRS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsg_display() {
        let crs = Crs::from_epsg(32617);
        assert_eq!(crs.to_string(), "EPSG:32617");
        assert_eq!(crs.epsg(), Some(32617));
    }
}
