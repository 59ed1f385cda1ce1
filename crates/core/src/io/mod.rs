//! I/O for single-band and multiband GeoTIFFs
//!
//! Everything the batch loop knows about raster files goes through
//! these functions.

mod native;

pub use native::{
    read_geotiff, read_geotiff_from_buffer, read_stack, write_geotiff, write_geotiff_to_buffer,
    write_stack,
};
