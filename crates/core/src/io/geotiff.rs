//! GeoTIFF band I/O via the `tiff` crate
//!
//! Scene archives deliver one GeoTIFF per spectral band. Only the pixel grid
//! and the tiepoint/pixel-scale georeferencing are read; projections are
//! assumed to agree across the bands of one scene.

use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{Gray32Float, RGBA8};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};

/// Read a single-band GeoTIFF as `f64` digital numbers.
///
/// `nodata` marks the raw value that should be treated as missing (Sentinel-2
/// L2A uses 0).
pub fn read_band<P: AsRef<Path>>(path: P, nodata: Option<f64>) -> Result<Raster<f64>> {
    let file = File::open(path.as_ref())?;
    decode_band(file, nodata)
}

/// Same as [`read_band`] but from an in-memory buffer
pub fn read_band_from_buffer(data: &[u8], nodata: Option<f64>) -> Result<Raster<f64>> {
    decode_band(Cursor::new(data), nodata)
}

fn widen<T: Copy + Into<f64>>(buf: Vec<T>) -> Vec<f64> {
    buf.into_iter().map(Into::into).collect()
}

fn decode_band<R: Read + Seek>(reader: R, nodata: Option<f64>) -> Result<Raster<f64>> {
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let (rows, cols) = (height as usize, width as usize);
    let transform = read_georeference(&mut decoder)?;

    let data = match decoder.read_image()? {
        DecodingResult::U8(buf) => widen(buf),
        DecodingResult::U16(buf) => widen(buf),
        DecodingResult::U32(buf) => widen(buf),
        DecodingResult::I16(buf) => widen(buf),
        DecodingResult::I32(buf) => widen(buf),
        DecodingResult::F32(buf) => widen(buf),
        DecodingResult::F64(buf) => buf,
        _ => return Err(Error::UnsupportedDataType("unsupported TIFF sample format".into())),
    };

    if data.len() != rows * cols {
        return Err(Error::UnsupportedDataType(format!(
            "expected one sample per pixel, got {} for {}x{}",
            data.len(),
            cols,
            rows
        )));
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;
    raster.set_nodata(nodata);
    if let Some(transform) = transform {
        raster.set_transform(transform);
    }

    Ok(raster)
}

fn find_f64_tag<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Result<Option<Vec<f64>>> {
    Ok(decoder.find_tag(tag)?.map(|v| v.into_f64_vec()).transpose()?)
}

/// `None` for a plain TIFF; both georeferencing tags or neither must be present
fn read_georeference<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<GeoTransform>> {
    let scale = find_f64_tag(decoder, Tag::ModelPixelScaleTag)?;
    let tiepoint = find_f64_tag(decoder, Tag::ModelTiepointTag)?;
    match (scale, tiepoint) {
        (None, None) => Ok(None),
        (Some(scale), Some(tiepoint)) => GeoTransform::from_tiepoint(&tiepoint, &scale)
            .map(Some)
            .ok_or_else(|| Error::Tiff(format!("malformed georeferencing: tiepoint {tiepoint:?}, scale {scale:?}"))),
        (scale, _) => Err(Error::Tiff(format!(
            "incomplete georeferencing: {} present without {}",
            if scale.is_some() { "ModelPixelScale" } else { "ModelTiepoint" },
            if scale.is_some() { "ModelTiepoint" } else { "ModelPixelScale" },
        ))),
    }
}

/// Write an index raster as a 32-bit float GeoTIFF (NaN marks no-data)
pub fn write_index_geotiff<P: AsRef<Path>>(raster: &Raster<f64>, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    encode_index(raster, file)
}

/// Same as [`write_index_geotiff`] but into a byte buffer
pub fn write_index_geotiff_to_buffer(raster: &Raster<f64>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_index(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_index<W: Write + Seek>(raster: &Raster<f64>, writer: W) -> Result<()> {
    let mut encoder = TiffEncoder::new(writer)?;
    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| if raster.is_nodata(v) { f32::NAN } else { v as f32 })
        .collect();

    let mut image = encoder.new_image::<Gray32Float>(cols as u32, rows as u32)?;
    write_georeference(image.encoder(), raster.transform())?;
    image.write_data(&data)?;
    Ok(())
}

/// Write a rendered RGBA layer (row-major, 4 bytes per pixel) as a georeferenced TIFF
pub fn write_rgba_tiff<P: AsRef<Path>>(
    rgba: &[u8],
    cols: usize,
    rows: usize,
    transform: &GeoTransform,
    path: P,
) -> Result<()> {
    if rgba.len() != rows * cols * 4 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }
    let file = File::create(path.as_ref())?;
    let mut encoder = TiffEncoder::new(file)?;
    let mut image = encoder.new_image::<RGBA8>(cols as u32, rows as u32)?;
    write_georeference(image.encoder(), transform)?;
    image.write_data(rgba)?;
    Ok(())
}

fn write_georeference<W: Write + Seek, K: tiff::encoder::TiffKind>(
    dir: &mut tiff::encoder::DirectoryEncoder<'_, W, K>,
    gt: &GeoTransform,
) -> Result<()> {
    dir.write_tag(Tag::ModelPixelScaleTag, &gt.pixel_scale()[..])?;
    dir.write_tag(Tag::ModelTiepointTag, &gt.tiepoint()[..])?;

    // Version 1.1.0 with two keys: GTModelType=Geographic, GTRasterType=PixelIsArea
    let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 2, 1025, 0, 1, 1];
    dir.write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])?;
    Ok(())
}
