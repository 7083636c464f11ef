//! Polygon clean-up shared by the strategies and the dispatcher.
//!
//! Simplification, validity repair, small-part filtering, precision rounding
//! and winding normalization. All functions take geometry by reference and
//! return new geometry.

use geo::algorithm::orient::{Direction, Orient};
use geo::{Area, BooleanOps, Coord, LineString, MapCoords, MultiPolygon, Polygon, Simplify, Validation};
use log::{debug, warn};

use crate::error::{FootprintError, Result};

// ============================================================================
// Simplification
// ============================================================================

/// Douglas-Peucker simplification that never breaks the polygon.
///
/// Rings that would collapse below a triangle keep their original vertices.
/// If the simplified polygon is invalid the input is returned unchanged.
pub fn simplify_polygon(polygon: &Polygon, tolerance: f64) -> Polygon {
    if tolerance <= 0.0 {
        return polygon.clone();
    }

    let exterior = simplify_ring(polygon.exterior(), tolerance);
    let interiors = polygon
        .interiors()
        .iter()
        .map(|ring| simplify_ring(ring, tolerance))
        .collect();
    let simplified = Polygon::new(exterior, interiors);

    if simplified.is_valid() {
        simplified
    } else {
        debug!("[Repair] Simplification at {} broke topology, keeping ring", tolerance);
        polygon.clone()
    }
}

/// [`simplify_polygon`] applied per member.
///
/// Falls back to the input when simplified members end up overlapping.
pub fn simplify_multi_polygon(multi: &MultiPolygon, tolerance: f64) -> MultiPolygon {
    if tolerance <= 0.0 {
        return multi.clone();
    }

    let simplified = MultiPolygon::new(
        multi
            .iter()
            .map(|polygon| simplify_polygon(polygon, tolerance))
            .collect(),
    );

    if simplified.is_valid() || !multi.is_valid() {
        simplified
    } else {
        debug!("[Repair] Simplified members overlap, keeping input");
        multi.clone()
    }
}

fn simplify_ring(ring: &LineString, tolerance: f64) -> LineString {
    let simplified = ring.simplify(tolerance);
    // A closed ring needs 3 distinct vertices plus the closing one
    if simplified.0.len() < 4 || Polygon::new(simplified.clone(), vec![]).unsigned_area() == 0.0 {
        ring.clone()
    } else {
        simplified
    }
}

// ============================================================================
// Validity Repair
// ============================================================================

/// Repair an invalid polygon set the way a zero-width buffer does.
///
/// Members are unioned one at a time. Each union rebuilds its rings from the
/// overlay, which resolves self-intersections, and overlapping members merge
/// into one. Valid input is returned as-is.
pub fn repair(multi: &MultiPolygon) -> Result<MultiPolygon> {
    if multi.is_valid() {
        return Ok(multi.clone());
    }

    warn!(
        "[Repair] Invalid geometry with {} member(s), attempting repair",
        multi.0.len()
    );
    let repaired = multi.iter().fold(MultiPolygon::new(vec![]), |acc, polygon| {
        acc.union(&MultiPolygon::new(vec![polygon.clone()]))
    });

    if repaired.0.is_empty() {
        return Err(FootprintError::GeometryRepairFailed(
            "repair produced an empty geometry".to_string(),
        ));
    }
    if !repaired.is_valid() {
        return Err(FootprintError::GeometryRepairFailed(format!(
            "geometry with {} member(s) is still invalid after repair",
            repaired.0.len()
        )));
    }

    debug!("[Repair] Repaired into {} member(s)", repaired.0.len());
    Ok(repaired)
}

// ============================================================================
// Area Filter
// ============================================================================

/// Drop members smaller than `min_area` (square degrees).
///
/// Never returns an empty result: if every member is too small the input
/// comes back unchanged.
pub fn drop_small_parts(multi: &MultiPolygon, min_area: f64) -> MultiPolygon {
    let kept: Vec<Polygon> = multi
        .iter()
        .filter(|polygon| polygon.unsigned_area() >= min_area)
        .cloned()
        .collect();

    if kept.is_empty() {
        debug!(
            "[Repair] All {} member(s) below min_area {}, keeping unfiltered",
            multi.0.len(),
            min_area
        );
        return multi.clone();
    }

    if kept.len() < multi.0.len() {
        debug!(
            "[Repair] Dropped {} member(s) below min_area {}",
            multi.0.len() - kept.len(),
            min_area
        );
    }
    MultiPolygon::new(kept)
}

// ============================================================================
// Precision & Winding
// ============================================================================

/// Round every coordinate to `decimals` places, ties to even.
pub fn round_coords(multi: &MultiPolygon, decimals: u32) -> MultiPolygon {
    let scale = 10f64.powi(decimals as i32);
    multi.map_coords(|Coord { x, y }| Coord {
        x: (x * scale).round_ties_even() / scale,
        y: (y * scale).round_ties_even() / scale,
    })
}

/// Exterior rings counter-clockwise, interior rings clockwise.
pub fn orient(multi: &MultiPolygon) -> MultiPolygon {
    multi.orient(Direction::Default)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Winding};

    fn square(x0: f64, y0: f64, size: f64) -> Polygon {
        polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]
    }

    #[test]
    fn test_simplify_drops_collinear_vertices() {
        let polygon = polygon![
            (x: 0.0, y: 0.0),
            (x: 5.0, y: 0.01),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
            (x: 0.0, y: 0.0),
        ];
        let simplified = simplify_polygon(&polygon, 0.1);
        assert_eq!(simplified.exterior().0.len(), 5);
    }

    #[test]
    fn test_simplify_never_collapses_ring() {
        let tiny = square(0.0, 0.0, 0.01);
        let simplified = simplify_polygon(&tiny, 1.0);
        assert_eq!(simplified, tiny);
    }

    #[test]
    fn test_repair_keeps_valid_input() {
        let multi = MultiPolygon::new(vec![square(0.0, 0.0, 1.0)]);
        assert_eq!(repair(&multi).unwrap(), multi);
    }

    #[test]
    fn test_repair_bowtie() {
        let bowtie = polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 2.0, y: 0.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ];
        let multi = MultiPolygon::new(vec![bowtie]);
        assert!(!multi.is_valid());

        let repaired = repair(&multi).unwrap();
        assert!(repaired.is_valid());
        assert!((repaired.unsigned_area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_repair_merges_overlapping_members() {
        let multi = MultiPolygon::new(vec![square(0.0, 0.0, 2.0), square(1.0, 1.0, 2.0)]);
        assert!(!multi.is_valid());

        let repaired = repair(&multi).unwrap();
        assert!(repaired.is_valid());
        assert_eq!(repaired.0.len(), 1);
        assert!((repaired.unsigned_area() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_drop_small_parts() {
        let multi = MultiPolygon::new(vec![square(0.0, 0.0, 5.0), square(10.0, 10.0, 0.5)]);
        let filtered = drop_small_parts(&multi, 1.0);
        assert_eq!(filtered.0.len(), 1);
        assert_eq!(filtered.0[0], square(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_drop_small_parts_never_empties() {
        let multi = MultiPolygon::new(vec![square(0.0, 0.0, 0.5), square(10.0, 10.0, 0.5)]);
        assert_eq!(drop_small_parts(&multi, 100.0), multi);
    }

    #[test]
    fn test_round_coords() {
        let multi = MultiPolygon::new(vec![polygon![
            (x: 0.123456, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.987654),
            (x: 0.123456, y: 0.0),
        ]]);
        let rounded = round_coords(&multi, 4);
        let ring = rounded.0[0].exterior();
        assert_eq!(ring.0[0].x, 0.1235);
        assert_eq!(ring.0[2].y, 1.9877);

        let ties = MultiPolygon::new(vec![polygon![
            (x: 0.5, y: 1.5),
            (x: 2.5, y: 1.5),
            (x: 2.5, y: -0.5),
            (x: 0.5, y: 1.5),
        ]]);
        let rounded = round_coords(&ties, 0);
        let ring = rounded.0[0].exterior();
        assert_eq!((ring.0[0].x, ring.0[0].y), (0.0, 2.0));
        assert_eq!((ring.0[1].x, ring.0[2].y), (2.0, -0.0));
    }

    #[test]
    fn test_orient_ccw_shell_cw_hole() {
        let shell = LineString::from(vec![(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0), (0.0, 0.0)]);
        let hole = LineString::from(vec![(2.0, 2.0), (8.0, 2.0), (8.0, 8.0), (2.0, 8.0), (2.0, 2.0)]);
        let multi = MultiPolygon::new(vec![Polygon::new(shell, vec![hole])]);

        let oriented = orient(&multi);
        assert!(oriented.0[0].exterior().is_ccw());
        assert!(oriented.0[0].interiors()[0].is_cw());
    }
}
