//! Single-track footprints.
//!
//! Some products cover a single curve rather than a swath. The footprint is
//! the sample track simplified with Douglas-Peucker and cut wherever it
//! jumps across the antimeridian.

use geo::{Coord, LineString, MultiLineString, Simplify};
use log::debug;

use crate::config::LinestringParams;
use crate::error::{FootprintError, Result};
use crate::geo_utils::SampleGrid;
use crate::Footprint;

/// Longitude jump between consecutive vertices treated as a dateline crossing.
const CROSSING_DLON: f64 = 180.0;

/// Fit the linestring footprint of a sample track.
///
/// Samples are taken in input order. Longitudes are expected in [−180, 180).
pub fn fit(grid: &SampleGrid, params: &LinestringParams) -> Result<Footprint> {
    let coords = grid.valid_coords();
    if coords.len() < 2 {
        return Err(FootprintError::InsufficientData {
            found: coords.len(),
            required: 2,
        });
    }

    let simplified = LineString::new(coords).simplify(params.tolerance);
    let segments = split_at_antimeridian(&simplified.0);
    if segments.0.is_empty() {
        return Err(FootprintError::InsufficientData {
            found: 1,
            required: 2,
        });
    }

    debug!(
        "[Linestring] {} samples -> {} vertices in {} segment(s)",
        grid.valid_count(),
        simplified.0.len(),
        segments.0.len()
    );
    Ok(Footprint::MultiLineString(segments))
}

/// Cut a track between consecutive vertices whose longitudes differ by more
/// than 180°.
///
/// A track with no crossing comes back as a single segment. Pieces left
/// with a single vertex between back-to-back crossings are dropped.
pub fn split_at_antimeridian(coords: &[Coord]) -> MultiLineString {
    let mut bounds: Vec<usize> = vec![0];
    bounds.extend(
        coords
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| (pair[1].x - pair[0].x).abs() > CROSSING_DLON)
            .map(|(i, _)| i + 1),
    );
    bounds.push(coords.len());

    MultiLineString::new(
        bounds
            .windows(2)
            .filter(|range| range[1] - range[0] >= 2)
            .map(|range| LineString::new(coords[range[0]..range[1]].to_vec()))
            .collect(),
    )
}
