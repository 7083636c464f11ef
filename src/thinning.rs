//! Point thinning ahead of the concave-hull fit.
//!
//! Dense swaths carry far more samples than a footprint outline needs.
//! Each method here reduces a [`SampleGrid`] to the valid coordinates the
//! triangulation should see.

use std::collections::BTreeMap;

use geo::Coord;
use log::debug;

use crate::config::Thinning;
use crate::error::{FootprintError, Result};
use crate::geo_utils::{GridShape, SampleGrid};

/// Apply a thinning method, or keep every valid sample when `method` is `None`.
pub fn thin(grid: &SampleGrid, method: Option<&Thinning>) -> Result<Vec<Coord>> {
    let thinned = match method {
        None => grid.valid_coords(),
        Some(Thinning::Standard(factor)) => standard(&grid.valid_coords(), *factor),
        Some(Thinning::BinAvg([rx, ry])) => bin_avg(&grid.valid_coords(), *rx, *ry),
        Some(Thinning::OuterEdges(factor)) => outer_edges(grid, *factor)?,
    };

    debug!(
        "[Thinning] {:?}: {} valid samples -> {}",
        method,
        grid.valid_count(),
        thinned.len()
    );
    Ok(thinned)
}

/// Keep every `factor`-th coordinate, starting with the first.
///
/// A factor below 1 is treated as 1.
pub fn standard(coords: &[Coord], factor: usize) -> Vec<Coord> {
    coords.iter().step_by(factor.max(1)).copied().collect()
}

// ============================================================================
// Bin Averaging
// ============================================================================

/// Grid cell index along each axis.
type CellKey = (i64, i64);

#[derive(Debug, Default)]
struct CellSum {
    x: f64,
    y: f64,
    count: usize,
}

/// Average the coordinates falling in each `rx` × `ry` cell.
///
/// Coordinates snap to the nearest multiple of the spacing (ties to even).
/// One mean point is emitted per occupied cell, ordered by longitude cell and
/// then latitude cell.
pub fn bin_avg(coords: &[Coord], rx: f64, ry: f64) -> Vec<Coord> {
    let mut cells: BTreeMap<CellKey, CellSum> = BTreeMap::new();

    for c in coords {
        let key = (
            (c.x / rx).round_ties_even() as i64,
            (c.y / ry).round_ties_even() as i64,
        );
        let cell = cells.entry(key).or_default();
        cell.x += c.x;
        cell.y += c.y;
        cell.count += 1;
    }

    cells
        .into_values()
        .map(|cell| {
            let n = cell.count as f64;
            Coord {
                x: cell.x / n,
                y: cell.y / n,
            }
        })
        .collect()
}

// ============================================================================
// Outer Edges
// ============================================================================

/// Inclusive row/column window of a grid.
#[derive(Debug, Clone, Copy)]
struct Window {
    top: usize,
    bottom: usize,
    left: usize,
    right: usize,
}

/// Perimeter of a 2-D scan grid plus a strided interior sample.
///
/// Rows and columns that are missing end to end are stripped from the
/// outside first. The perimeter runs clockwise in grid terms: top row left to
/// right, right column down, bottom row right to left, left column up.
/// The interior stride counts valid samples only, so gaps shift its phase.
pub fn outer_edges(grid: &SampleGrid, factor: usize) -> Result<Vec<Coord>> {
    let shape = grid.shape().ok_or_else(|| {
        FootprintError::InvalidInput("outer_edges thinning needs 2-D gridded input".to_string())
    })?;

    let Some(window) = occupied_window(grid, shape) else {
        return Ok(Vec::new());
    };

    let mut cells: Vec<(usize, usize)> = Vec::new();
    for col in window.left..=window.right {
        cells.push((window.top, col));
    }
    for row in window.top + 1..window.bottom {
        cells.push((row, window.right));
    }
    if window.bottom > window.top {
        for col in (window.left..=window.right).rev() {
            cells.push((window.bottom, col));
        }
    }
    if window.right > window.left {
        for row in (window.top + 1..window.bottom).rev() {
            cells.push((row, window.left));
        }
    }

    let mut coords: Vec<Coord> = cells
        .into_iter()
        .filter_map(|(row, col)| grid.get(row, col))
        .collect();

    let interior: Vec<Coord> = (window.top..=window.bottom)
        .flat_map(|row| (window.left..=window.right).map(move |col| (row, col)))
        .filter_map(|(row, col)| grid.get(row, col))
        .collect();
    coords.extend(standard(&interior, factor));

    Ok(coords)
}

/// Smallest window holding every valid sample, or `None` if there are none.
fn occupied_window(grid: &SampleGrid, shape: GridShape) -> Option<Window> {
    let mut window: Option<Window> = None;

    for row in 0..shape.rows {
        for col in 0..shape.cols {
            if grid.get(row, col).is_none() {
                continue;
            }
            window = Some(match window {
                None => Window {
                    top: row,
                    bottom: row,
                    left: col,
                    right: col,
                },
                Some(w) => Window {
                    top: w.top.min(row),
                    bottom: w.bottom.max(row),
                    left: w.left.min(col),
                    right: w.right.max(col),
                },
            });
        }
    }
    window
}

// ============================================================================
// Tests
// ============================================================================
