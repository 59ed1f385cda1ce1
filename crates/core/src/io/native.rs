//! Native GeoTIFF reading/writing via the `tiff` crate
//!
//! Multiband files are stored as one TIFF directory per band, read and
//! written sequentially. Pixel data is written as 32-bit float; the
//! georeferencing tags (ModelPixelScale, ModelTiepoint, a minimal
//! GeoKey directory) are carried on the first directory.

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::raster::{BandStack, GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;

const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;

/// Read one band of a GeoTIFF file into a Raster.
///
/// `band` selects the TIFF directory (0-based); `None` reads the first.
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::BandRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    decode_band(file, band.unwrap_or(0)).map_err(|e| band_read_error(path, e))
}

/// Read one band of a GeoTIFF from an in-memory buffer.
///
/// Same as `read_geotiff` but operates on a byte slice. Used by tests
/// to round-trip rasters without touching the filesystem.
pub fn read_geotiff_from_buffer<T>(data: &[u8], band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_band(Cursor::new(data), band.unwrap_or(0))
}

/// Read every band of a multiband GeoTIFF into a BandStack
pub fn read_stack<T, P>(path: P) -> Result<BandStack<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::BandRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut decoder =
        Decoder::new(file).map_err(|e| band_read_error(path, tiff_error("decode", e)))?;

    let first = decode_current_image(&mut decoder).map_err(|e| band_read_error(path, e))?;
    let mut stack = BandStack::from_first_band(first);

    while decoder.more_images() {
        decoder
            .next_image()
            .map_err(|e| band_read_error(path, tiff_error("next directory", e)))?;
        let band = decode_current_image(&mut decoder).map_err(|e| band_read_error(path, e))?;
        stack.push_band(band)?;
    }

    Ok(stack)
}

/// Write a single-band Raster to a GeoTIFF file
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| Error::OutputWrite {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    encode_bands(
        file,
        std::iter::once(raster.view()),
        raster.shape(),
        raster.transform(),
        raster.crs(),
    )
    .map_err(|e| output_write_error(path, e))
}

/// Write a single-band Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_bands(
        Cursor::new(&mut buf),
        std::iter::once(raster.view()),
        raster.shape(),
        raster.transform(),
        raster.crs(),
    )?;
    Ok(buf)
}

/// Write a BandStack to a multiband GeoTIFF file, one TIFF directory
/// per band, in stack order
pub fn write_stack<T, P>(stack: &BandStack<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| Error::OutputWrite {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    encode_bands(
        file,
        stack.bands().map(|b| b.view()),
        stack.shape(),
        stack.transform(),
        stack.crs(),
    )
    .map_err(|e| output_write_error(path, e))
}

// ── decoding ────────────────────────────────────────────────────────────

fn decode_band<T, R>(reader: R, band: usize) -> Result<Raster<T>>
where
    T: RasterElement,
    R: std::io::Read + std::io::Seek,
{
    let mut decoder = Decoder::new(reader).map_err(|e| tiff_error("decode", e))?;

    for _ in 0..band {
        if !decoder.more_images() {
            return Err(Error::Other(format!("band {} not present in file", band)));
        }
        decoder
            .next_image()
            .map_err(|e| tiff_error("next directory", e))?;
    }

    decode_current_image(&mut decoder)
}

fn decode_current_image<T, R>(decoder: &mut Decoder<R>) -> Result<Raster<T>>
where
    T: RasterElement,
    R: std::io::Read + std::io::Seek,
{
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| tiff_error("read dimensions", e))?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| tiff_error("read image data", e))?;

    let data: Vec<T> = match result {
        DecodingResult::F32(buf) => cast_buffer(&buf),
        DecodingResult::F64(buf) => cast_buffer(&buf),
        DecodingResult::U8(buf) => cast_buffer(&buf),
        DecodingResult::U16(buf) => cast_buffer(&buf),
        DecodingResult::U32(buf) => cast_buffer(&buf),
        DecodingResult::I16(buf) => cast_buffer(&buf),
        DecodingResult::I32(buf) => cast_buffer(&buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    // Georeferencing tags are optional; a plain TIFF still decodes.
    if let Ok(transform) = read_geotransform(decoder) {
        raster.set_transform(transform);
    }
    if let Some(crs) = read_crs(decoder) {
        raster.set_crs(Some(crs));
    }

    Ok(raster)
}

fn cast_buffer<T: RasterElement, S: Copy + num_traits::NumCast>(buf: &[S]) -> Vec<T> {
    buf.iter()
        .map(|&v| num_traits::cast(v).unwrap_or(T::default_nodata()))
        .collect()
}

/// Read GeoTransform from the ModelPixelScale + ModelTiepoint tags
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| Error::Other("no pixel scale tag".into()))?;

    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| Error::Other("no tiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z]; scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        return Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    Err(Error::Other("cannot determine geotransform".into()))
}

/// EPSG code from the GeoKey directory, if one is recorded.
///
/// The directory is a flat u16 array: a four-entry header
/// [version, revision, minor, key count] followed by
/// [key id, tag location, count, value] per key. A zero tag location
/// means the value is stored inline.
fn read_crs<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<Crs> {
    let directory = decoder
        .get_tag_u16_vec(Tag::GeoKeyDirectoryTag)
        .ok()?;

    for entry in directory.get(4..)?.chunks_exact(4) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        if location == 0 && (key == KEY_PROJECTED_CS_TYPE || key == KEY_GEOGRAPHIC_TYPE) {
            return Some(Crs::from_epsg(u32::from(value)));
        }
    }
    None
}

// ── encoding ────────────────────────────────────────────────────────────

fn encode_bands<'a, T, W, I>(
    writer: W,
    bands: I,
    shape: (usize, usize),
    transform: &GeoTransform,
    crs: Option<&Crs>,
) -> Result<()>
where
    T: RasterElement + 'a,
    W: std::io::Write + std::io::Seek,
    I: Iterator<Item = ndarray::ArrayView2<'a, T>>,
{
    let mut encoder = TiffEncoder::new(writer).map_err(|e| tiff_error("create encoder", e))?;
    let (rows, cols) = shape;

    for (band_index, band) in bands.enumerate() {
        let data: Vec<f32> = band
            .iter()
            .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
            .collect();

        let mut image = encoder
            .new_image::<Gray32Float>(cols as u32, rows as u32)
            .map_err(|e| tiff_error("create image", e))?;

        if band_index == 0 {
            let scale = vec![transform.pixel_width, transform.pixel_height.abs(), 0.0];
            image
                .encoder()
                .write_tag(Tag::Unknown(TAG_MODEL_PIXEL_SCALE), scale.as_slice())
                .map_err(|e| tiff_error("write scale tag", e))?;

            let tiepoint = vec![0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
            image
                .encoder()
                .write_tag(Tag::Unknown(TAG_MODEL_TIEPOINT), tiepoint.as_slice())
                .map_err(|e| tiff_error("write tiepoint tag", e))?;

            // GeoKey directory: GTModelTypeGeoKey=1 (Projected),
            // GTRasterTypeGeoKey=1 (PixelIsArea), plus the EPSG code as
            // ProjectedCSTypeGeoKey when the CRS carries one.
            let mut keys: Vec<u16> = vec![
                1024, 0, 1, 1, //
                1025, 0, 1, 1, //
            ];
            if let Some(code) = crs.and_then(|c| c.epsg()) {
                keys.extend_from_slice(&[KEY_PROJECTED_CS_TYPE, 0, 1, code as u16]);
            }
            let mut directory: Vec<u16> = vec![1, 1, 0, (keys.len() / 4) as u16];
            directory.extend_from_slice(&keys);
            image
                .encoder()
                .write_tag(Tag::Unknown(TAG_GEO_KEY_DIRECTORY), directory.as_slice())
                .map_err(|e| tiff_error("write geokey tag", e))?;
        }

        image
            .write_data(&data)
            .map_err(|e| tiff_error("write image data", e))?;
    }

    Ok(())
}

// ── error helpers ───────────────────────────────────────────────────────

fn tiff_error(what: &str, e: tiff::TiffError) -> Error {
    Error::Other(format!("TIFF {}: {}", what, e))
}

fn band_read_error(path: &Path, e: Error) -> Error {
    match e {
        e @ Error::BandRead { .. } | e @ Error::GridMismatch { .. } => e,
        other => Error::BandRead {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

fn output_write_error(path: &Path, e: Error) -> Error {
    match e {
        e @ Error::OutputWrite { .. } => e,
        other => Error::OutputWrite {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}
