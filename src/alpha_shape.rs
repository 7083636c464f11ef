//! # Concave Hull (Alpha Shape)
//!
//! The default footprint strategy. Valid samples are thinned, optionally cut
//! off at high latitudes, and wrapped in an alpha shape:
//!
//! 1. Delaunay-triangulate the points.
//! 2. Keep triangles whose circumradius is below `1 / alpha`.
//! 3. Trace the edges owned by exactly one kept triangle into closed rings.
//! 4. Counter-clockwise rings are shells, clockwise rings are holes. Each
//!    hole goes to the smallest shell that encloses it.
//!
//! `alpha == 0` is the convex hull. Larger alphas hug the data more tightly
//! and eventually split it into several polygons.

use std::collections::{HashMap, HashSet};
use std::f64::consts::TAU;

use geo::{Area, Contains, ConvexHull, Coord, InteriorPoint, LineString, MultiPoint, Point, Polygon};
use log::{debug, info};
use rstar::{RTree, RTreeObject, AABB};
use spade::{DelaunayTriangulation, Point2, Triangulation};

use crate::config::AlphaShapeParams;
use crate::error::{FootprintError, Result};
use crate::geo_utils::SampleGrid;
use crate::thinning;
use crate::Footprint;

/// Minimum number of points an outline can be fitted to.
const MIN_POINTS: usize = 3;

/// Fit the concave-hull footprint of a sample grid.
pub fn fit(grid: &SampleGrid, params: &AlphaShapeParams) -> Result<Footprint> {
    let mut coords = thinning::thin(grid, params.thinning.as_ref())?;

    if let Some(cutoff) = params.cutoff_lat {
        let before = coords.len();
        coords.retain(|c| c.y.abs() < cutoff);
        debug!(
            "[AlphaShape] cutoff_lat {} dropped {} of {} points",
            cutoff,
            before - coords.len(),
            before
        );
    }

    if coords.len() < MIN_POINTS {
        return Err(FootprintError::InsufficientData {
            found: coords.len(),
            required: MIN_POINTS,
        });
    }

    let mut polygons = if params.alpha == 0.0 {
        vec![convex_hull(&coords)?]
    } else {
        alpha_shape(&coords, params.alpha)?
    };

    if let Some((threshold, target)) = params.smooth_poles {
        polygons = polygons
            .iter()
            .map(|polygon| smooth_poles(polygon, threshold, target))
            .collect();
    }

    info!(
        "[AlphaShape] Fitted {} polygon(s) to {} points (alpha={})",
        polygons.len(),
        coords.len(),
        params.alpha
    );
    Ok(Footprint::from_polygons(polygons))
}

/// Convex hull of the points, rejecting a degenerate (zero-area) hull.
pub fn convex_hull(coords: &[Coord]) -> Result<Polygon> {
    let points: MultiPoint = coords.iter().map(|&c| Point::from(c)).collect();
    let hull = points.convex_hull();
    if hull.unsigned_area() == 0.0 {
        return Err(FootprintError::InsufficientData {
            found: coords.len(),
            required: MIN_POINTS,
        });
    }
    Ok(hull)
}

// ============================================================================
// Alpha Shape
// ============================================================================

/// Alpha shape of a point set as a list of polygons with holes.
pub fn alpha_shape(coords: &[Coord], alpha: f64) -> Result<Vec<Polygon>> {
    let mut seen: HashSet<(u64, u64)> = HashSet::new();
    let vertices: Vec<Point2<f64>> = coords
        .iter()
        .filter(|c| seen.insert((c.x.to_bits(), c.y.to_bits())))
        .map(|c| Point2::new(c.x, c.y))
        .collect();
    let triangulation: DelaunayTriangulation<Point2<f64>> =
        DelaunayTriangulation::bulk_load(vertices)
            .map_err(|e| FootprintError::Triangulation(format!("{:?}", e)))?;

    let max_radius = 1.0 / alpha;
    let mut positions: HashMap<usize, Coord> = HashMap::new();
    let mut kept_edges: HashSet<(usize, usize)> = HashSet::new();
    let mut total = 0usize;
    let mut kept = 0usize;

    for face in triangulation.inner_faces() {
        total += 1;
        let vertices = face.vertices();
        let corners = vertices.map(|v| {
            let p = v.position();
            Coord { x: p.x, y: p.y }
        });
        if circumradius(corners[0], corners[1], corners[2]) >= max_radius {
            continue;
        }
        kept += 1;

        let ids = vertices.map(|v| v.fix().index());
        for (id, corner) in ids.iter().zip(corners) {
            positions.insert(*id, corner);
        }
        // Faces come counter-clockwise, so the interior is left of each edge
        for i in 0..3 {
            kept_edges.insert((ids[i], ids[(i + 1) % 3]));
        }
    }

    debug!("[AlphaShape] Kept {} of {} triangles (R < {})", kept, total, max_radius);
    if kept == 0 {
        return Err(FootprintError::InsufficientData {
            found: coords.len(),
            required: MIN_POINTS,
        });
    }

    let mut boundary: Vec<(usize, usize)> = kept_edges
        .iter()
        .filter(|&&(a, b)| !kept_edges.contains(&(b, a)))
        .copied()
        .collect();
    boundary.sort_unstable();

    let rings = trace_rings(&boundary, &positions);
    let polygons = assemble(rings);
    if polygons.is_empty() {
        return Err(FootprintError::InsufficientData {
            found: coords.len(),
            required: MIN_POINTS,
        });
    }
    Ok(polygons)
}

/// Radius of the circle through three points. Infinite for collinear points.
fn circumradius(a: Coord, b: Coord, c: Coord) -> f64 {
    let ab = (b - a).x.hypot((b - a).y);
    let bc = (c - b).x.hypot((c - b).y);
    let ca = (a - c).x.hypot((a - c).y);
    let cross = (b - a).x * (c - a).y - (b - a).y * (c - a).x;
    let area = cross.abs() / 2.0;
    if area == 0.0 {
        return f64::INFINITY;
    }
    ab * bc * ca / (4.0 * area)
}

/// Chain directed boundary edges into closed rings.
///
/// Where several boundary edges leave the same vertex, the walk takes the
/// one with the smallest clockwise turn from the edge it arrived on, so rings
/// touching at a vertex come out as separate rings instead of crossing.
fn trace_rings(boundary: &[(usize, usize)], positions: &HashMap<usize, Coord>) -> Vec<LineString> {
    let mut outgoing: HashMap<usize, Vec<usize>> = HashMap::new();
    for &(a, b) in boundary {
        outgoing.entry(a).or_default().push(b);
    }
    let mut remaining: HashSet<(usize, usize)> = boundary.iter().copied().collect();
    let mut rings = Vec::new();

    for &(start, first) in boundary {
        if !remaining.remove(&(start, first)) {
            continue;
        }

        let mut ring = vec![start];
        let mut prev = start;
        let mut current = first;
        let mut closed = false;

        loop {
            if current == start {
                closed = true;
                break;
            }
            ring.push(current);

            let next = outgoing.get(&current).and_then(|candidates| {
                candidates
                    .iter()
                    .copied()
                    .filter(|&n| remaining.contains(&(current, n)))
                    .min_by(|&x, &y| {
                        let tx = clockwise_turn(positions, prev, current, x);
                        let ty = clockwise_turn(positions, prev, current, y);
                        tx.total_cmp(&ty)
                    })
            });
            let Some(next) = next else { break };

            remaining.remove(&(current, next));
            prev = current;
            current = next;
        }

        if closed && ring.len() >= 3 {
            let coords: Vec<Coord> = ring.iter().filter_map(|id| positions.get(id).copied()).collect();
            // Polygon::new closes the ring
            rings.push(LineString::new(coords));
        } else {
            debug!("[AlphaShape] Discarding open boundary chain of {} vertices", ring.len());
        }
    }
    rings
}

/// Clockwise angle from the reversed incoming edge to the outgoing edge.
fn clockwise_turn(positions: &HashMap<usize, Coord>, prev: usize, current: usize, next: usize) -> f64 {
    let (Some(p), Some(c), Some(n)) = (positions.get(&prev), positions.get(&current), positions.get(&next))
    else {
        return TAU;
    };
    let back = (p.y - c.y).atan2(p.x - c.x);
    let out = (n.y - c.y).atan2(n.x - c.x);
    let turn = (back - out).rem_euclid(TAU);
    if turn == 0.0 {
        TAU
    } else {
        turn
    }
}

// ============================================================================
// Shell / Hole Assembly
// ============================================================================

/// Shell envelope indexed for hole lookup.
struct ShellBounds {
    index: usize,
    min: [f64; 2],
    max: [f64; 2],
}

impl RTreeObject for ShellBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

fn ring_bounds(ring: &LineString) -> ([f64; 2], [f64; 2]) {
    let mut min = [f64::INFINITY, f64::INFINITY];
    let mut max = [f64::NEG_INFINITY, f64::NEG_INFINITY];
    for c in ring.coords() {
        min = [min[0].min(c.x), min[1].min(c.y)];
        max = [max[0].max(c.x), max[1].max(c.y)];
    }
    (min, max)
}

/// Split rings into shells and holes and attach each hole to its shell.
fn assemble(rings: Vec<LineString>) -> Vec<Polygon> {
    let mut shells: Vec<(Polygon, f64)> = Vec::new();
    let mut holes: Vec<LineString> = Vec::new();

    for ring in rings {
        let signed = Polygon::new(ring.clone(), vec![]).signed_area();
        if signed > 0.0 {
            shells.push((Polygon::new(ring, vec![]), signed));
        } else if signed < 0.0 {
            holes.push(ring);
        }
    }

    let tree = RTree::bulk_load(
        shells
            .iter()
            .enumerate()
            .map(|(index, (shell, _))| {
                let (min, max) = ring_bounds(shell.exterior());
                ShellBounds { index, min, max }
            })
            .collect(),
    );

    let mut interiors: Vec<Vec<LineString>> = vec![Vec::new(); shells.len()];
    for hole in holes {
        let Some(inside) = Polygon::new(hole.clone(), vec![]).interior_point() else {
            continue;
        };
        let (min, max) = ring_bounds(&hole);
        let owner = tree
            .locate_in_envelope_intersecting(&AABB::from_corners(min, max))
            .filter(|bounds| shells[bounds.index].0.contains(&inside))
            .min_by(|a, b| shells[a.index].1.total_cmp(&shells[b.index].1))
            .map(|bounds| bounds.index);

        match owner {
            Some(index) => interiors[index].push(hole),
            None => debug!("[AlphaShape] Hole without an enclosing shell dropped"),
        }
    }

    shells
        .into_iter()
        .zip(interiors)
        .map(|((shell, _), holes)| Polygon::new(shell.exterior().clone(), holes))
        .collect()
}

// ============================================================================
// Pole Smoothing
// ============================================================================

/// Flatten jagged polar edges.
///
/// Every ring vertex above `threshold` moves to `target`, and every vertex
/// below `-threshold` moves to `-target`. Longitudes are untouched.
pub fn smooth_poles(polygon: &Polygon, threshold: f64, target: f64) -> Polygon {
    let smooth = |ring: &LineString| -> LineString {
        ring.coords()
            .map(|c| {
                let y = if c.y > threshold {
                    target
                } else if c.y < -threshold {
                    -target
                } else {
                    c.y
                };
                Coord { x: c.x, y }
            })
            .collect()
    };

    Polygon::new(
        smooth(polygon.exterior()),
        polygon.interiors().iter().map(smooth).collect(),
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thinning;
    use geo::polygon;

    fn lattice(size: i32, skip: impl Fn(i32, i32) -> bool) -> Vec<Coord> {
        let mut coords = Vec::new();
        for x in 0..=size {
            for y in 0..=size {
                if !skip(x, y) {
                    coords.push(Coord { x: x as f64, y: y as f64 });
                }
            }
        }
        coords
    }

    fn grid_of(coords: &[Coord]) -> SampleGrid {
        SampleGrid::from_samples(coords.iter().map(|&c| Some(c)).collect(), None)
    }

    #[test]
    fn test_circumradius() {
        let r = circumradius(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }, Coord { x: 0.0, y: 1.0 });
        assert!((r - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);

        let collinear = circumradius(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }, Coord { x: 2.0, y: 0.0 });
        assert!(collinear.is_infinite());
    }

    #[test]
    fn test_lattice_square() {
        let polygons = alpha_shape(&lattice(10, |_, _| false), 1.0).unwrap();
        assert_eq!(polygons.len(), 1);
        assert!((polygons[0].unsigned_area() - 100.0).abs() < 1e-9);
        assert!(polygons[0].interiors().is_empty());
    }

    #[test]
    fn test_annulus_has_hole() {
        let coords = lattice(10, |x, y| (4..=6).contains(&x) && (4..=6).contains(&y));
        let polygons = alpha_shape(&coords, 1.0).unwrap();

        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].interiors().len(), 1);
        // The gap's corner triangles (R = 0.707) stay in the shape
        let hole = Polygon::new(polygons[0].interiors()[0].clone(), vec![]);
        assert!((hole.unsigned_area() - 14.0).abs() < 1e-9);
        assert!((polygons[0].unsigned_area() - 86.0).abs() < 1e-9);
    }

    #[test]
    fn test_separate_clusters() {
        let mut coords = lattice(3, |_, _| false);
        coords.extend(lattice(3, |_, _| false).iter().map(|c| Coord { x: c.x + 20.0, y: c.y }));

        let polygons = alpha_shape(&coords, 1.0).unwrap();
        assert_eq!(polygons.len(), 2);
        for polygon in &polygons {
            assert!((polygon.unsigned_area() - 9.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_alpha_too_tight() {
        let err = alpha_shape(&lattice(4, |_, _| false), 10.0).unwrap_err();
        assert!(matches!(err, FootprintError::InsufficientData { .. }));
    }

    #[test]
    fn test_alpha_zero_is_convex_hull() {
        let coords = lattice(4, |x, y| x == 2 && y == 2);
        let footprint = fit(&grid_of(&coords), &AlphaShapeParams { alpha: 0.0, ..AlphaShapeParams::default() }).unwrap();
        let Footprint::Polygon(hull) = footprint else {
            panic!("expected a polygon");
        };
        assert!((hull.unsigned_area() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_too_few_points() {
        let coords = [Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }];
        let err = fit(&grid_of(&coords), &AlphaShapeParams::default()).unwrap_err();
        assert!(matches!(err, FootprintError::InsufficientData { found: 2, required: 3 }));
    }

    #[test]
    fn test_collinear_points_rejected() {
        let coords: Vec<Coord> = (0..10).map(|i| Coord { x: i as f64, y: 0.0 }).collect();
        assert!(fit(&grid_of(&coords), &AlphaShapeParams::default()).is_err());
    }

    #[test]
    fn test_cutoff_lat_filters_points() {
        let coords: Vec<Coord> = lattice(4, |_, _| false)
            .into_iter()
            .map(|c| Coord { x: c.x, y: c.y * 30.0 - 60.0 })
            .collect();
        let params = AlphaShapeParams {
            alpha: 0.0,
            cutoff_lat: Some(45.0),
            ..AlphaShapeParams::default()
        };
        let Footprint::Polygon(hull) = fit(&grid_of(&coords), &params).unwrap() else {
            panic!("expected a polygon");
        };
        // Only the rows at -30, 0 and 30 survive
        assert!(hull.exterior().coords().all(|c| c.y.abs() <= 30.0));
    }

    #[test]
    fn test_thinning_is_applied() {
        let coords = lattice(10, |_, _| false);
        let params = AlphaShapeParams {
            alpha: 0.0,
            thinning: Some(Thinning::Standard(1000)),
            ..AlphaShapeParams::default()
        };
        let err = fit(&grid_of(&coords), &params).unwrap_err();
        assert!(matches!(err, FootprintError::InsufficientData { found: 1, .. }));
    }

    #[test]
    fn test_smooth_poles() {
        let polygon = polygon![
            (x: 0.0, y: -85.0),
            (x: 10.0, y: -79.0),
            (x: 10.0, y: 83.0),
            (x: 0.0, y: 70.0),
        ];
        let smoothed = smooth_poles(&polygon, 80.0, 82.0);
        let lats: Vec<f64> = smoothed.exterior().coords().map(|c| c.y).collect();
        assert_eq!(lats, vec![-82.0, -79.0, 82.0, 70.0, -82.0]);
        let lons: Vec<f64> = smoothed.exterior().coords().map(|c| c.x).collect();
        assert_eq!(lons, vec![0.0, 10.0, 10.0, 0.0, 0.0]);
    }

    #[test]
    fn test_smooth_poles_every_member() {
        let mut coords: Vec<Coord> = lattice(3, |_, _| false)
            .into_iter()
            .map(|c| Coord { x: c.x, y: c.y + 78.0 })
            .collect();
        coords.extend(
            lattice(3, |_, _| false)
                .into_iter()
                .map(|c| Coord { x: c.x + 20.0, y: c.y - 81.0 }),
        );
        let params = AlphaShapeParams {
            alpha: 1.0,
            smooth_poles: Some((80.0, 82.0)),
            ..AlphaShapeParams::default()
        };

        let Footprint::MultiPolygon(multi) = fit(&grid_of(&coords), &params).unwrap() else {
            panic!("expected a multipolygon");
        };
        assert_eq!(multi.0.len(), 2);
        let lats: Vec<f64> = multi.iter().flat_map(|p| p.exterior().coords().map(|c| c.y)).collect();
        assert!(lats.iter().all(|y| y.abs() <= 80.0 || y.abs() == 82.0));
        assert!(lats.contains(&82.0));
        assert!(lats.contains(&-82.0));
    }
}
