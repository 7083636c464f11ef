//! Raster contour footprint strategy.
//!
//! Samples are burned into a global equirectangular mask, cleaned up with
//! morphology and traced back into polygons:
//!
//! ```text
//! samples -> W×H mask -> close -> PNG round trip -> threshold
//!         -> close/open -> contours -> polygons with holes
//!         -> simplify -> round -> orient
//! ```
//!
//! The mask is written to the caller's scratch directory under a random
//! name so concurrent invocations never collide.

use std::path::{Path, PathBuf};

use geo::{Coord, LineString, MultiPolygon, Polygon};
use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, open};
use log::{debug, info};
use uuid::Uuid;

use crate::config::RasterParams;
use crate::error::{FootprintError, Result};
use crate::geo_utils::{normalize_longitude, SampleGrid};
use crate::repair;
use crate::Footprint;

/// Fit the raster contour footprint of a sample grid.
pub fn fit(grid: &SampleGrid, params: &RasterParams) -> Result<Footprint> {
    let scratch_dir = params.scratch_dir.as_deref().ok_or_else(|| {
        FootprintError::InvalidConfig("raster strategy needs a scratch directory (path)".to_string())
    })?;

    let coords: Vec<Coord> = grid
        .valid_coords()
        .into_iter()
        .map(|c| Coord {
            x: normalize_longitude(c.x),
            y: c.y,
        })
        .collect();
    if coords.is_empty() {
        return Err(FootprintError::NoFootprintFound);
    }

    let mask = rasterize(&coords, params);
    let mask = close(&mask, Norm::LInf, kernel_radius(params.mask_kernel));

    let image_path = scratch_path(scratch_dir);
    mask.save(&image_path)?;
    debug!("[Raster] Wrote {}x{} mask to {}", params.width, params.height, image_path.display());

    let reloaded = image::open(&image_path)?.into_luma8();
    let binary = threshold(&reloaded, params.threshold_value, ThresholdType::Binary);

    let radius = kernel_radius(params.cleanup_kernel);
    let cleaned = open(&close(&binary, Norm::LInf, radius), Norm::LInf, radius);

    let polygons = contours_to_polygons(&find_contours::<i32>(&cleaned), params.width, params.height);
    if polygons.is_empty() {
        return Err(FootprintError::NoFootprintFound);
    }

    let multi = MultiPolygon::new(polygons);
    let multi = repair::simplify_multi_polygon(&multi, params.simplify_tolerance);
    let multi = repair::round_coords(&multi, params.precision);
    let multi = repair::orient(&multi);

    info!(
        "[Raster] Traced {} polygon(s) from {} samples",
        multi.0.len(),
        coords.len()
    );
    Ok(Footprint::from_polygons(multi.0))
}

/// `<dir>/image_<uuid-v4>.png`
pub fn scratch_path(dir: &Path) -> PathBuf {
    dir.join(format!("image_{}.png", Uuid::new_v4()))
}

/// Structuring-element radius for a square kernel size.
///
/// A size `s` becomes a square of side `2 * (s / 2) + 1`.
fn kernel_radius(size: u32) -> u8 {
    (size / 2).min(u8::MAX as u32) as u8
}

// ============================================================================
// Pixel Mapping
// ============================================================================

/// Pixel column/row of a coordinate, clamped to the image.
pub fn lonlat_to_pixel(lon: f64, lat: f64, width: u32, height: u32) -> (u32, u32) {
    let x = ((lon + 180.0) * (width as f64 / 360.0)).floor();
    let y = ((90.0 - lat) * (height as f64 / 180.0)).floor();
    (
        x.clamp(0.0, (width - 1) as f64) as u32,
        y.clamp(0.0, (height - 1) as f64) as u32,
    )
}

/// Coordinate of a pixel's top-left corner.
pub fn pixel_to_lonlat(x: f64, y: f64, width: u32, height: u32) -> Coord {
    Coord {
        x: x * (360.0 / width as f64) - 180.0,
        y: 90.0 - y * (180.0 / height as f64),
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

/// Burn every sample into a black canvas as a white pixel.
fn rasterize(coords: &[Coord], params: &RasterParams) -> GrayImage {
    let mut canvas = GrayImage::new(params.width, params.height);
    for c in coords {
        let (x, y) = lonlat_to_pixel(round_to(c.x, 2), round_to(c.y, 2), params.width, params.height);
        canvas.put_pixel(x, y, Luma([255]));
    }
    canvas
}

// ============================================================================
// Contours
// ============================================================================

/// Build polygons from a two-level contour hierarchy.
///
/// Every outer border is a shell. Hole borders whose parent is that shell
/// become its interiors. Rings with fewer than 3 vertices are dropped.
fn contours_to_polygons(contours: &[Contour<i32>], width: u32, height: u32) -> Vec<Polygon> {
    let to_ring = |contour: &Contour<i32>| -> Option<LineString> {
        let corners = compress_chain(contour);
        if corners.len() < 3 {
            return None;
        }
        Some(
            corners
                .into_iter()
                .map(|(x, y)| pixel_to_lonlat(x as f64, y as f64, width, height))
                .collect(),
        )
    };

    let mut polygons = Vec::new();
    for (i, contour) in contours.iter().enumerate() {
        if contour.border_type != BorderType::Outer {
            continue;
        }
        let Some(exterior) = to_ring(contour) else {
            continue;
        };
        let holes: Vec<LineString> = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Hole && c.parent == Some(i))
            .filter_map(to_ring)
            .collect();
        polygons.push(Polygon::new(exterior, holes));
    }

    debug!(
        "[Raster] {} contour(s) -> {} polygon(s)",
        contours.len(),
        polygons.len()
    );
    polygons
}

/// Keep only the points where a traced border changes direction.
fn compress_chain(contour: &Contour<i32>) -> Vec<(i32, i32)> {
    let points: Vec<(i32, i32)> = contour.points.iter().map(|p| (p.x, p.y)).collect();
    let n = points.len();
    if n < 3 {
        return points;
    }

    let step = |a: (i32, i32), b: (i32, i32)| ((b.0 - a.0).signum(), (b.1 - a.1).signum());
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
