//! Land-cover provider: categorical source raster in, frame-aligned grid out.

use crate::source::{LandCoverSource, SourceRaster};
use crate::Result;
use a3dprep_grid::{CoordinateFrame, LandCoverGrid, NODATA_CLASS};
use std::collections::BTreeMap;
use tracing::info;

/// Resamples a categorical source onto a coordinate frame.
///
/// Categorical data must never be averaged: a cell is assigned the majority
/// class of the source pixels it covers, falling back to a nearest-neighbor
/// sample when the source is coarser than the frame. Source codes are
/// resolved through the source's class mapping, and any code without a
/// mapping fails the whole fetch.
pub struct LandCoverProvider<'a> {
    source: &'a dyn LandCoverSource,
}

impl<'a> LandCoverProvider<'a> {
    /// Create a provider over a land-cover source.
    pub fn new(source: &'a dyn LandCoverSource) -> Self {
        Self { source }
    }

    /// Produce the land-cover grid for a frame.
    ///
    /// The output grid matches `frame` exactly; its legend is the class set
    /// of the source's mapping.
    pub fn fetch_land_cover(&self, frame: &CoordinateFrame) -> Result<LandCoverGrid> {
        let (min_x, min_y, max_x, max_y) = frame.extent();
        let raster = self
            .source
            .fetch_region(min_x, min_y, max_x, max_y, frame.epsg)?;
        let classes = self.source.class_map();
        info!(
            source_pixels = raster.width * raster.height,
            %frame,
            "rasterizing land cover onto frame"
        );

        let mut data = vec![NODATA_CLASS; frame.cell_count()];
        for row in 0..frame.nrows {
            for col in 0..frame.ncols {
                let code = match majority_class(&raster, frame, col, row)? {
                    Some(source_code) => Some(source_code),
                    None => {
                        // Source coarser than the frame: no pixel center falls
                        // inside the cell, so sample at the cell center.
                        let (cx, cy) = frame.cell_center(col, row);
                        raster.sample_nearest(cx, cy)
                    }
                };
                if let Some(source_code) = code {
                    data[frame.index(col, row)] = classes.resolve(source_code)?;
                }
            }
        }

        Ok(LandCoverGrid::new(*frame, data, classes.legend())?)
    }
}

/// Majority source class among the pixels whose centers fall inside a cell.
///
/// Ties are broken toward the smallest code so the result is deterministic.
/// Returns `Ok(None)` when no pixel center lies inside the cell.
fn majority_class(
    raster: &SourceRaster,
    frame: &CoordinateFrame,
    col: usize,
    row: usize,
) -> Result<Option<i32>> {
    let cell_min_x = frame.origin_x + col as f64 * frame.cell_size;
    let cell_max_x = cell_min_x + frame.cell_size;
    let cell_max_y = frame.origin_y + (frame.nrows - row) as f64 * frame.cell_size;
    let cell_min_y = cell_max_y - frame.cell_size;

    let pw = raster.pixel_width();
    let ph = raster.pixel_height();

    // Pixel centers: x = min_x + (px + 0.5) * pw, y = max_y - (py + 0.5) * ph.
    let px_lo = ((cell_min_x - raster.min_x) / pw - 0.5).ceil().max(0.0) as usize;
    let px_hi = ((cell_max_x - raster.min_x) / pw - 0.5).floor();
    let py_lo = ((raster.max_y - cell_max_y) / ph - 0.5).ceil().max(0.0) as usize;
    let py_hi = ((raster.max_y - cell_min_y) / ph - 0.5).floor();

    if px_hi < 0.0 || py_hi < 0.0 {
        return Ok(None);
    }
    let px_hi = (px_hi as usize).min(raster.width.saturating_sub(1));
    let py_hi = (py_hi as usize).min(raster.height.saturating_sub(1));
    if px_lo > px_hi || py_lo > py_hi {
        return Ok(None);
    }

    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for py in py_lo..=py_hi {
        for px in px_lo..=px_hi {
            if let Some(code) = raster.get(px, py) {
                *counts.entry(code).or_insert(0) += 1;
            }
        }
    }
    // BTreeMap iterates in ascending code order, so the first maximum wins
    // and ties resolve toward the smallest code.
    let mut best: Option<(i32, usize)> = None;
    for (code, count) in counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((code, count)),
        }
    }
    Ok(best.map(|(code, _)| code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legend::ClassMap;
    use crate::source::ConstantLandCoverSource;
    use crate::{LandCoverError, Result};
    use a3dprep_grid::Roi;

    /// In-memory source handing out a prepared raster.
    struct FixedSource {
        raster: SourceRaster,
        classes: ClassMap,
    }

    impl LandCoverSource for FixedSource {
        fn fetch_region(
            &self,
            _min_x: f64,
            _min_y: f64,
            _max_x: f64,
            _max_y: f64,
            _epsg: u32,
        ) -> Result<SourceRaster> {
            Ok(self.raster.clone())
        }

        fn class_map(&self) -> ClassMap {
            self.classes.clone()
        }
    }

    fn frame_2x2() -> CoordinateFrame {
        let roi = Roi::new(0.0, 0.0, 100.0, 100.0, 2056).unwrap();
        CoordinateFrame::from_roi(&roi, 50.0).unwrap()
    }

    #[test]
    fn majority_wins_within_each_cell() {
        // 4x4 source over a 2x2 frame: each cell sees a 2x2 pixel block.
        // North-west block is three forest (41) and one rock (51).
        #[rustfmt::skip]
        let data = vec![
            41, 41, 51, 51,
            41, 51, 51, 51,
            21, 21, 61, 21,
            21, 21, 21, 21,
        ];
        let source = FixedSource {
            raster: SourceRaster {
                data,
                width: 4,
                height: 4,
                min_x: 0.0,
                min_y: 0.0,
                max_x: 100.0,
                max_y: 100.0,
                nodata: None,
            },
            classes: ClassMap::lc27(),
        };
        let grid = LandCoverProvider::new(&source)
            .fetch_land_cover(&frame_2x2())
            .unwrap();

        assert_eq!(grid.get(0, 0), Some(5)); // forest majority -> mixed forest
        assert_eq!(grid.get(1, 0), Some(15)); // rock majority
        assert_eq!(grid.get(0, 1), Some(7)); // grassland -> pasture
        assert_eq!(grid.get(1, 1), Some(7)); // grassland outvotes water
    }

    #[test]
    fn ties_resolve_to_smallest_code() {
        // Every cell sees two water pixels (61) and two glacier pixels (62).
        #[rustfmt::skip]
        let data = vec![
            61, 62, 61, 62,
            62, 61, 62, 61,
            61, 62, 61, 62,
            62, 61, 62, 61,
        ];
        let source = FixedSource {
            raster: SourceRaster {
                data,
                width: 4,
                height: 4,
                min_x: 0.0,
                min_y: 0.0,
                max_x: 100.0,
                max_y: 100.0,
                nodata: None,
            },
            classes: ClassMap::lc27(),
        };
        let grid = LandCoverProvider::new(&source)
            .fetch_land_cover(&frame_2x2())
            .unwrap();
        // 61 resolves to water (1); the tie never flips to firn (13).
        assert_eq!(grid.values(), &[1, 1, 1, 1]);
    }

    #[test]
    fn coarse_source_falls_back_to_nearest() {
        // One source pixel under a 3x3 frame: only the middle cell contains
        // the pixel center, the rest resolve through nearest sampling.
        let roi = Roi::new(0.0, 0.0, 150.0, 150.0, 2056).unwrap();
        let frame = CoordinateFrame::from_roi(&roi, 50.0).unwrap();
        let source = FixedSource {
            raster: SourceRaster {
                data: vec![21],
                width: 1,
                height: 1,
                min_x: 0.0,
                min_y: 0.0,
                max_x: 150.0,
                max_y: 150.0,
                nodata: None,
            },
            classes: ClassMap::lc27(),
        };
        let grid = LandCoverProvider::new(&source).fetch_land_cover(&frame).unwrap();
        assert_eq!(grid.values(), &[7; 9]);
    }

    #[test]
    fn unknown_source_code_is_fatal() {
        let source = FixedSource {
            raster: SourceRaster {
                data: vec![41, 41, 41, 99],
                width: 2,
                height: 2,
                min_x: 0.0,
                min_y: 0.0,
                max_x: 100.0,
                max_y: 100.0,
                nodata: None,
            },
            classes: ClassMap::lc27(),
        };
        let err = LandCoverProvider::new(&source)
            .fetch_land_cover(&frame_2x2())
            .unwrap_err();
        assert!(matches!(err, LandCoverError::UnknownCode(99)));
    }

    #[test]
    fn output_codes_all_come_from_the_legend() {
        #[rustfmt::skip]
        let data = vec![
            11, 12, 21, 31,
            41, 51, 61, 62,
            63, 64, 33, 34,
            35, 44, 45, 52,
        ];
        let source = FixedSource {
            raster: SourceRaster {
                data,
                width: 4,
                height: 4,
                min_x: 0.0,
                min_y: 0.0,
                max_x: 100.0,
                max_y: 100.0,
                nodata: None,
            },
            classes: ClassMap::lc27(),
        };
        let grid = LandCoverProvider::new(&source)
            .fetch_land_cover(&frame_2x2())
            .unwrap();
        for code in grid.present_codes() {
            assert!(grid.legend().contains(code), "invented class {code}");
        }
    }

    #[test]
    fn nodata_pixels_leave_nodata_cells() {
        let source = FixedSource {
            raster: SourceRaster {
                data: vec![-1, -1, 21, 21],
                width: 2,
                height: 2,
                min_x: 0.0,
                min_y: 0.0,
                max_x: 100.0,
                max_y: 100.0,
                nodata: Some(-1),
            },
            classes: ClassMap::lc27(),
        };
        let grid = LandCoverProvider::new(&source)
            .fetch_land_cover(&frame_2x2())
            .unwrap();
        // North row is unclassified, south row is pasture.
        assert_eq!(grid.get(0, 0), None);
        assert_eq!(grid.get(1, 0), None);
        assert_eq!(grid.get(0, 1), Some(7));
        assert_eq!(grid.get(1, 1), Some(7));
    }

    #[test]
    fn constant_source_fills_the_frame() {
        let source = ConstantLandCoverSource { code: 15 };
        let grid = LandCoverProvider::new(&source)
            .fetch_land_cover(&frame_2x2())
            .unwrap();
        assert_eq!(grid.values(), &[15, 15, 15, 15]);
        assert_eq!(grid.legend().class_name(15), Some("rock"));
    }

    #[test]
    fn grid_always_matches_the_frame() {
        let frame = frame_2x2();
        let source = ConstantLandCoverSource { code: 21 };
        let grid = LandCoverProvider::new(&source).fetch_land_cover(&frame).unwrap();
        assert!(grid.frame().same_geometry(&frame));
    }
}
