//! Land-cover sources: where categorical raster data comes from.

use crate::legend::ClassMap;
use crate::{LandCoverError, Result};
use a3dprep_cache::{content_key, FetchCache, RetryPolicy};
use std::io::Cursor;
use std::time::Duration;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::debug;

/// A categorical raster covering a requested region.
///
/// The raster is georeferenced by its extent in the request CRS: sources
/// answer a bounding-box request with a grid covering exactly that box, so
/// the geotransform is fully determined by the extent and the dimensions.
/// Pixel rows run north to south.
#[derive(Debug, Clone)]
pub struct SourceRaster {
    /// Class codes, row-major from the north edge.
    pub data: Vec<i32>,
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// West edge of the covered region.
    pub min_x: f64,
    /// South edge of the covered region.
    pub min_y: f64,
    /// East edge of the covered region.
    pub max_x: f64,
    /// North edge of the covered region.
    pub max_y: f64,
    /// Code marking pixels without a classification.
    pub nodata: Option<i32>,
}

impl SourceRaster {
    /// Pixel width in CRS units.
    pub fn pixel_width(&self) -> f64 {
        (self.max_x - self.min_x) / self.width as f64
    }

    /// Pixel height in CRS units.
    pub fn pixel_height(&self) -> f64 {
        (self.max_y - self.min_y) / self.height as f64
    }

    /// Code at pixel `(px, py)`, `None` for nodata.
    pub fn get(&self, px: usize, py: usize) -> Option<i32> {
        let value = self.data[py * self.width + px];
        match self.nodata {
            Some(nodata) if value == nodata => None,
            _ => Some(value),
        }
    }

    /// Nearest-neighbor sample at a coordinate, `None` outside the raster or
    /// on nodata. Category codes are never interpolated.
    pub fn sample_nearest(&self, x: f64, y: f64) -> Option<i32> {
        if x < self.min_x || x > self.max_x || y < self.min_y || y > self.max_y {
            return None;
        }
        let px = (((x - self.min_x) / self.pixel_width()) as usize).min(self.width - 1);
        let py = (((self.max_y - y) / self.pixel_height()) as usize).min(self.height - 1);
        self.get(px, py)
    }
}

/// A source of categorical land-cover data.
pub trait LandCoverSource: Send + Sync {
    /// Fetch a raster covering the given extent in the given CRS.
    fn fetch_region(
        &self,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
        epsg: u32,
    ) -> Result<SourceRaster>;

    /// The classification mapping for this source's codes.
    fn class_map(&self) -> ClassMap;
}

/// HTTP source answering bounding-box requests with a categorical GeoTIFF.
///
/// Responses are cached through the shared fetch cache keyed by a digest of
/// the query, so repeating a request for the same region hits the cache.
pub struct HttpLandCoverSource<'a> {
    base_url: String,
    client: reqwest::blocking::Client,
    retry: RetryPolicy,
    cache: &'a FetchCache,
}

impl<'a> std::fmt::Debug for HttpLandCoverSource<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLandCoverSource")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl<'a> HttpLandCoverSource<'a> {
    /// Create a source with the given per-request timeout and retry policy.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        retry: RetryPolicy,
        cache: &'a FetchCache,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| LandCoverError::SourceUnavailable {
                what: "building HTTP client".to_string(),
                reason: err.to_string(),
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retry,
            cache,
        })
    }

    fn region_url(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64, epsg: u32) -> String {
        format!(
            "{}?bbox={:.3},{:.3},{:.3},{:.3}&epsg={}&format=image/tiff",
            self.base_url, min_x, min_y, max_x, max_y, epsg
        )
    }
}

impl<'a> LandCoverSource for HttpLandCoverSource<'a> {
    fn fetch_region(
        &self,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
        epsg: u32,
    ) -> Result<SourceRaster> {
        let url = self.region_url(min_x, min_y, max_x, max_y, epsg);
        let key = format!("landcover/{}", &content_key(url.as_bytes())[..16]);

        let bytes = self
            .cache
            .get_or_fetch(&key, Some(&url), || {
                let fetched = self.retry.run("fetch land cover", |_attempt| {
                    let response = self.client.get(&url).send().map_err(|e| e.to_string())?;
                    if !response.status().is_success() {
                        return Err(format!("HTTP {}", response.status()));
                    }
                    response
                        .bytes()
                        .map(|b| b.to_vec())
                        .map_err(|e| e.to_string())
                });
                fetched.map_err(|e| e.to_string())
            })
            .map_err(|err| match err {
                a3dprep_cache::CacheError::FetchFailed { key: _, reason } => {
                    LandCoverError::SourceUnavailable {
                        what: "fetch land cover".to_string(),
                        reason,
                    }
                }
                other => LandCoverError::Cache(other),
            })?;

        debug!(bytes = bytes.len(), %url, "decoding land-cover raster");
        let (data, width, height, nodata) = decode_categorical(&bytes)?;
        if width == 0 || height == 0 {
            return Err(LandCoverError::EmptySource);
        }
        Ok(SourceRaster {
            data,
            width,
            height,
            min_x,
            min_y,
            max_x,
            max_y,
            nodata,
        })
    }

    fn class_map(&self) -> ClassMap {
        ClassMap::lc27()
    }
}

/// Source yielding a single constant class over any requested region.
///
/// Used when no classified dataset is available for the region; the code is
/// a PREVAH class applied to the whole simulation surface.
#[derive(Debug, Clone, Copy)]
pub struct ConstantLandCoverSource {
    /// PREVAH class code to fill the region with.
    pub code: i32,
}

impl LandCoverSource for ConstantLandCoverSource {
    fn fetch_region(
        &self,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
        _epsg: u32,
    ) -> Result<SourceRaster> {
        Ok(SourceRaster {
            data: vec![self.code],
            width: 1,
            height: 1,
            min_x,
            min_y,
            max_x,
            max_y,
            nodata: None,
        })
    }

    fn class_map(&self) -> ClassMap {
        ClassMap::prevah_identity()
    }
}

/// Decode a categorical GeoTIFF into integer codes.
fn decode_categorical(bytes: &[u8]) -> Result<(Vec<i32>, usize, usize, Option<i32>)> {
    let mut decoder = Decoder::new(Cursor::new(bytes))?;
    let (width, height) = decoder.dimensions()?;

    let nodata = decoder
        .get_tag_ascii_string(Tag::Unknown(42113))
        .ok()
        .and_then(|s| s.trim().trim_end_matches('\0').parse::<i32>().ok());

    let result = decoder.read_image()?;
    let data: Vec<i32> = match result {
        DecodingResult::U8(values) => values.into_iter().map(i32::from).collect(),
        DecodingResult::I8(values) => values.into_iter().map(i32::from).collect(),
        DecodingResult::U16(values) => values.into_iter().map(i32::from).collect(),
        DecodingResult::I16(values) => values.into_iter().map(i32::from).collect(),
        DecodingResult::I32(values) => values,
        DecodingResult::U32(values) => values.into_iter().map(|v| v as i32).collect(),
        other => return Err(LandCoverError::NonCategoricalSamples(sample_kind(&other))),
    };

    Ok((data, width as usize, height as usize, nodata))
}

fn sample_kind(result: &DecodingResult) -> &'static str {
    match result {
        DecodingResult::F32(_) => "f32",
        DecodingResult::F64(_) => "f64",
        DecodingResult::U64(_) => "u64",
        DecodingResult::I64(_) => "i64",
        _ => "integer",
    }
}
