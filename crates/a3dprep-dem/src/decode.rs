//! GeoTIFF decoding and sub-pixel sampling of source elevation tiles.

use crate::Result;
use a3dprep_grid::LatLonBounds;
use std::io::Cursor;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;

/// Fallback nodata value used when the tile carries no GDAL_NODATA tag.
const DEFAULT_NODATA: f32 = -32768.0;

/// A decoded elevation tile with its geographic bounds.
#[derive(Debug)]
pub struct SourceTile {
    data: Vec<f32>,
    width: u32,
    height: u32,
    bounds: LatLonBounds,
    nodata: f32,
}

impl SourceTile {
    /// Decode a GeoTIFF tile from raw bytes.
    ///
    /// Slippy-map tiles carry no geotransform tags, so the bounds derived
    /// from the tile coordinate are passed in by the caller.
    pub fn decode(bytes: &[u8], bounds: LatLonBounds) -> Result<Self> {
        let mut decoder = Decoder::new(Cursor::new(bytes))?;

        // Allow generously sized tiles without the decoder refusing them.
        let mut limits = Limits::default();
        limits.decoding_buffer_size = 256 * 1024 * 1024;
        limits.intermediate_buffer_size = 256 * 1024 * 1024;
        limits.ifd_value_size = 256 * 1024 * 1024;
        decoder = decoder.with_limits(limits);

        let (width, height) = decoder.dimensions()?;
        let nodata = read_nodata(&mut decoder).unwrap_or(DEFAULT_NODATA);
        let data = decode_values(&mut decoder)?;

        Ok(Self {
            data,
            width,
            height,
            bounds,
            nodata,
        })
    }

    /// Tile dimensions in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Sample the tile at a WGS84 coordinate with bilinear interpolation.
    ///
    /// Returns `None` outside the tile bounds or when any contributing pixel
    /// is nodata; partial values are never interpolated across gaps.
    pub fn sample_bilinear(&self, lon: f64, lat: f64) -> Option<f32> {
        if !self.bounds.contains(lon, lat) {
            return None;
        }

        let lon_range = self.bounds.max_lon - self.bounds.min_lon;
        let lat_range = self.bounds.max_lat - self.bounds.min_lat;

        // Row 0 is the north edge.
        let x = ((lon - self.bounds.min_lon) / lon_range) * (self.width - 1) as f64;
        let y = ((self.bounds.max_lat - lat) / lat_range) * (self.height - 1) as f64;

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let fx = x - x0 as f64;
        let fy = y - y0 as f64;

        let v00 = self.pixel(x0, y0)?;
        let v10 = self.pixel(x1, y0)?;
        let v01 = self.pixel(x0, y1)?;
        let v11 = self.pixel(x1, y1)?;

        let value = v00 as f64 * (1.0 - fx) * (1.0 - fy)
            + v10 as f64 * fx * (1.0 - fy)
            + v01 as f64 * (1.0 - fx) * fy
            + v11 as f64 * fx * fy;

        Some(value as f32)
    }

    fn pixel(&self, x: u32, y: u32) -> Option<f32> {
        let value = self.data[(y * self.width + x) as usize];
        if (value - self.nodata).abs() < 0.001 {
            None
        } else {
            Some(value)
        }
    }
}

/// Decode the raster payload, widening whatever sample type is present to f32.
fn decode_values<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Result<Vec<f32>> {
    let result = decoder.read_image()?;
    Ok(match result {
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f32).collect(),
    })
}

/// Read the GDAL_NODATA tag (42113, ASCII) if present.
fn read_nodata<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
    decoder
        .get_tag_ascii_string(Tag::Unknown(42113))
        .ok()
        .and_then(|s| s.trim().trim_end_matches('\0').parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tiff::encoder::{colortype, TiffEncoder};

    fn encode_tile(width: u32, height: u32, values: &[f32]) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        let mut encoder = TiffEncoder::new(&mut bytes).unwrap();
        encoder
            .write_image::<colortype::Gray32Float>(width, height, values)
            .unwrap();
        bytes.into_inner()
    }

    fn unit_bounds() -> LatLonBounds {
        LatLonBounds {
            min_lon: 0.0,
            min_lat: 0.0,
            max_lon: 1.0,
            max_lat: 1.0,
        }
    }

    #[test]
    fn decode_reads_dimensions_and_values() {
        let bytes = encode_tile(2, 2, &[10.0, 20.0, 30.0, 40.0]);
        let tile = SourceTile::decode(&bytes, unit_bounds()).unwrap();
        assert_eq!(tile.dimensions(), (2, 2));
        // Corners sample the corner pixels exactly.
        assert_relative_eq!(tile.sample_bilinear(0.0, 1.0).unwrap(), 10.0);
        assert_relative_eq!(tile.sample_bilinear(1.0, 0.0).unwrap(), 40.0);
    }

    #[test]
    fn bilinear_interpolates_between_pixels() {
        let bytes = encode_tile(2, 2, &[0.0, 100.0, 0.0, 100.0]);
        let tile = SourceTile::decode(&bytes, unit_bounds()).unwrap();
        let mid = tile.sample_bilinear(0.5, 0.5).unwrap();
        assert_relative_eq!(mid, 50.0, epsilon = 1e-3);
    }

    #[test]
    fn nodata_pixels_poison_the_sample() {
        let bytes = encode_tile(2, 2, &[DEFAULT_NODATA, 100.0, 100.0, 100.0]);
        let tile = SourceTile::decode(&bytes, unit_bounds()).unwrap();
        // Any sample touching the nodata pixel yields None.
        assert_eq!(tile.sample_bilinear(0.2, 0.8), None);
        // A sample clamped onto valid pixels still works.
        assert!(tile.sample_bilinear(1.0, 0.0).is_some());
    }

    #[test]
    fn out_of_bounds_is_none() {
        let bytes = encode_tile(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let tile = SourceTile::decode(&bytes, unit_bounds()).unwrap();
        assert_eq!(tile.sample_bilinear(1.5, 0.5), None);
        assert_eq!(tile.sample_bilinear(0.5, -0.5), None);
    }
}
