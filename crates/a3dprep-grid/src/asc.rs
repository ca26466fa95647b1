//! ARC ASCII grid output.
//!
//! The solver ingests surface grids as `GRID2D = ARC`, so both rasters are
//! written in the ESRI ASCII grid format: a six-line header followed by one
//! line of values per row, north to south. Formatting is fixed so repeated
//! runs over identical inputs produce byte-identical files.

use crate::grids::{ElevationGrid, LandCoverGrid, NODATA_CLASS, NODATA_ELEVATION};
use crate::{CoordinateFrame, Result};
use std::io::Write;
use std::path::Path;

fn write_header<W: Write>(w: &mut W, frame: &CoordinateFrame) -> std::io::Result<()> {
    writeln!(w, "ncols         {}", frame.ncols)?;
    writeln!(w, "nrows         {}", frame.nrows)?;
    writeln!(w, "xllcorner     {:.3}", frame.origin_x)?;
    writeln!(w, "yllcorner     {:.3}", frame.origin_y)?;
    writeln!(w, "cellsize      {:.3}", frame.cell_size)?;
    writeln!(w, "NODATA_value  -9999")?;
    Ok(())
}

/// Write an elevation grid in ARC ASCII format.
pub fn write_elevation<W: Write>(w: &mut W, grid: &ElevationGrid) -> Result<()> {
    let frame = grid.frame();
    write_header(w, frame)?;
    let values = grid.values();
    for row in 0..frame.nrows {
        let mut line = String::with_capacity(frame.ncols * 8);
        for col in 0..frame.ncols {
            if col > 0 {
                line.push(' ');
            }
            let v = values[frame.index(col, row)];
            if v == NODATA_ELEVATION {
                line.push_str("-9999");
            } else {
                line.push_str(&format!("{:.2}", v));
            }
        }
        writeln!(w, "{}", line)?;
    }
    Ok(())
}

/// Write a land-cover grid in ARC ASCII format.
pub fn write_land_cover<W: Write>(w: &mut W, grid: &LandCoverGrid) -> Result<()> {
    let frame = grid.frame();
    write_header(w, frame)?;
    let values = grid.values();
    for row in 0..frame.nrows {
        let mut line = String::with_capacity(frame.ncols * 6);
        for col in 0..frame.ncols {
            if col > 0 {
                line.push(' ');
            }
            let v = values[frame.index(col, row)];
            if v == NODATA_CLASS {
                line.push_str("-9999");
            } else {
                line.push_str(&v.to_string());
            }
        }
        writeln!(w, "{}", line)?;
    }
    Ok(())
}

/// Write an elevation grid to a file path.
pub fn write_elevation_file<P: AsRef<Path>>(path: P, grid: &ElevationGrid) -> Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_elevation(&mut file, grid)?;
    file.flush()?;
    Ok(())
}

/// Write a land-cover grid to a file path.
pub fn write_land_cover_file<P: AsRef<Path>>(path: P, grid: &LandCoverGrid) -> Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_land_cover(&mut file, grid)?;
    file.flush()?;
    Ok(())
}
