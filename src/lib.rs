//! # Footprinter
//!
//! Coverage footprints for satellite observations.
//!
//! Given the longitude/latitude samples of a granule, this library derives a
//! single outline that bounds the observed area and serializes it as WKT:
//! - Concave hull (alpha shape) of the samples, the default
//! - Raster contour tracing for large, gappy swaths
//! - Simplified, dateline-split linestring for single-track products
//!
//! ## Features
//!
//! - **`parallel`** - Enable [`generate_many`] for batches, using rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use footprinter::{generate, FootprintConfig, Strategy, AlphaShapeParams};
//!
//! // Samples around the edge of a 10° × 10° box
//! let mut lon = Vec::new();
//! let mut lat = Vec::new();
//! for i in 0..=10 {
//!     let t = i as f64;
//!     lon.extend([t, 10.0, 10.0 - t, 0.0]);
//!     lat.extend([0.0, t, 10.0, 10.0 - t]);
//! }
//!
//! let config = FootprintConfig::new(Strategy::AlphaShape(AlphaShapeParams::default()))
//!     .with_simplify(0.1);
//! let wkt = generate(&lon, &lat, &config).unwrap();
//! assert!(wkt.starts_with("POLYGON (("));
//! ```

use geo::{MultiLineString, MultiPolygon, Polygon, Simplify};
use log::{debug, info};
use serde::{Deserialize, Serialize};

pub mod alpha_shape;
pub mod config;
pub mod error;
pub mod geo_utils;
pub mod linestring;
pub mod raster;
pub mod repair;
pub mod thinning;
pub mod wkt;

pub use config::{AlphaShapeParams, FootprintConfig, LinestringParams, RasterParams, Strategy, Thinning};
pub use error::{FootprintError, Result};
pub use geo_utils::{normalize_longitude, normalize_longitudes, GridShape, SampleGrid};
pub use wkt::ToWkt;

// ============================================================================
// Core Types
// ============================================================================

/// A fitted footprint geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Footprint {
    Polygon(Polygon),
    MultiPolygon(MultiPolygon),
    MultiLineString(MultiLineString),
}

impl Footprint {
    /// A single polygon stays a `Polygon`, anything else a `MultiPolygon`.
    pub fn from_polygons(mut polygons: Vec<Polygon>) -> Self {
        if polygons.len() == 1 {
            if let Some(polygon) = polygons.pop() {
                return Footprint::Polygon(polygon);
            }
        }
        Footprint::MultiPolygon(MultiPolygon::new(polygons))
    }

    /// WKT type name of the geometry.
    pub fn kind(&self) -> &'static str {
        match self {
            Footprint::Polygon(_) => "POLYGON",
            Footprint::MultiPolygon(_) => "MULTIPOLYGON",
            Footprint::MultiLineString(_) => "MULTILINESTRING",
        }
    }

    pub fn is_polygonal(&self) -> bool {
        !matches!(self, Footprint::MultiLineString(_))
    }

    /// Polygonal footprints as a `MultiPolygon`, `None` for lines.
    pub fn to_multi_polygon(&self) -> Option<MultiPolygon> {
        match self {
            Footprint::Polygon(polygon) => Some(MultiPolygon::new(vec![polygon.clone()])),
            Footprint::MultiPolygon(multi) => Some(multi.clone()),
            Footprint::MultiLineString(_) => None,
        }
    }

    /// Simplify without breaking polygon validity.
    pub fn simplify(&self, tolerance: f64) -> Self {
        match self {
            Footprint::Polygon(polygon) => Footprint::Polygon(repair::simplify_polygon(polygon, tolerance)),
            Footprint::MultiPolygon(multi) => {
                Footprint::MultiPolygon(repair::simplify_multi_polygon(multi, tolerance))
            }
            Footprint::MultiLineString(lines) => Footprint::MultiLineString(lines.simplify(tolerance)),
        }
    }
}

impl ToWkt for Footprint {
    fn write_wkt(&self, out: &mut String) {
        match self {
            Footprint::Polygon(polygon) => polygon.write_wkt(out),
            Footprint::MultiPolygon(multi) => multi.write_wkt(out),
            Footprint::MultiLineString(lines) => lines.write_wkt(out),
        }
    }
}

/// The record persisted next to a granule.
///
/// Serializes as `{"FOOTPRINT": "<wkt>", "EXTENT": ""}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootprintEnvelope {
    #[serde(rename = "FOOTPRINT")]
    pub footprint: String,
    #[serde(rename = "EXTENT")]
    pub extent: String,
}

impl FootprintEnvelope {
    pub fn new(footprint: String) -> Self {
        Self {
            footprint,
            extent: String::new(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One granule's coordinate arrays, for batch generation.
#[derive(Debug, Clone, PartialEq)]
pub struct FootprintInput {
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    pub shape: Option<GridShape>,
}

impl FootprintInput {
    pub fn new(lon: Vec<f64>, lat: Vec<f64>) -> Self {
        Self { lon, lat, shape: None }
    }

    pub fn with_shape(mut self, shape: GridShape) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Generate this input's WKT footprint.
    pub fn generate(&self, config: &FootprintConfig) -> Result<String> {
        let footprint = fit(&self.lon, &self.lat, self.shape, config)?;
        Ok(footprint.to_wkt())
    }
}

// ============================================================================
// Core Functions
// ============================================================================

/// Generate the WKT footprint of flat coordinate arrays.
pub fn generate(lon: &[f64], lat: &[f64], config: &FootprintConfig) -> Result<String> {
    Ok(generate_footprint(lon, lat, config)?.to_wkt())
}

/// Generate the WKT footprint of a 2-D scan grid stored row-major.
pub fn generate_grid(lon: &[f64], lat: &[f64], shape: GridShape, config: &FootprintConfig) -> Result<String> {
    Ok(fit(lon, lat, Some(shape), config)?.to_wkt())
}

/// Generate the footprint geometry of flat coordinate arrays.
pub fn generate_footprint(lon: &[f64], lat: &[f64], config: &FootprintConfig) -> Result<Footprint> {
    fit(lon, lat, None, config)
}

/// Generate the footprint geometry of a 2-D scan grid.
pub fn generate_footprint_grid(
    lon: &[f64],
    lat: &[f64],
    shape: GridShape,
    config: &FootprintConfig,
) -> Result<Footprint> {
    fit(lon, lat, Some(shape), config)
}

/// Generate footprints for many granules in parallel.
///
/// Each result is independent; one failing granule does not affect the rest.
#[cfg(feature = "parallel")]
pub fn generate_many(inputs: &[FootprintInput], config: &FootprintConfig) -> Vec<Result<String>> {
    use rayon::prelude::*;

    inputs.par_iter().map(|input| input.generate(config)).collect()
}

fn fit(lon: &[f64], lat: &[f64], shape: Option<GridShape>, config: &FootprintConfig) -> Result<Footprint> {
    // Configs assembled from public fields never went through parsing
    config.validate()?;

    if lon.len() != lat.len() {
        return Err(FootprintError::InvalidInput(format!(
            "longitude has {} samples but latitude has {}",
            lon.len(),
            lat.len()
        )));
    }

    let remapped;
    let lon = if config.is360 {
        remapped = normalize_longitudes(lon);
        remapped.as_slice()
    } else {
        lon
    };
    let grid = SampleGrid::from_arrays(lon, lat, shape, config.fill_value)?;

    info!(
        "[Footprint] {} strategy on {} samples ({} valid)",
        config.strategy.name(),
        grid.len(),
        grid.valid_count()
    );

    let footprint = match &config.strategy {
        Strategy::AlphaShape(params) => alpha_shape::fit(&grid, params)?,
        Strategy::OpenCv(params) => raster::fit(&grid, params)?,
        Strategy::Linestring(params) => linestring::fit(&grid, params)?,
    };

    post_process(footprint, config)
}

/// Simplify, repair and area-filter a fitted footprint.
fn post_process(footprint: Footprint, config: &FootprintConfig) -> Result<Footprint> {
    let footprint = match config.simplify {
        Some(tolerance) => footprint.simplify(tolerance),
        None => footprint,
    };

    let footprint = match footprint {
        Footprint::MultiLineString(_) => footprint,
        Footprint::Polygon(ref polygon) => {
            let repaired = repair::repair(&MultiPolygon::new(vec![polygon.clone()]))?;
            Footprint::from_polygons(repaired.0)
        }
        Footprint::MultiPolygon(ref multi) => Footprint::MultiPolygon(repair::repair(multi)?),
    };

    let footprint = match (config.min_area, footprint) {
        (Some(min_area), Footprint::MultiPolygon(multi)) => {
            Footprint::MultiPolygon(repair::drop_small_parts(&multi, min_area))
        }
        (_, footprint) => footprint,
    };

    debug!("[Footprint] Result is a {}", footprint.kind());
    Ok(footprint)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area, Validation};

    /// Twenty distinct samples around the (0,0)-(10,10) box.
    fn square_outline() -> (Vec<f64>, Vec<f64>) {
        let mut lon = Vec::new();
        let mut lat = Vec::new();
        for i in 0..5 {
            let t = i as f64 * 2.0;
            lon.extend([t, 10.0, 10.0 - t, 0.0]);
            lat.extend([0.0, t, 10.0, 10.0 - t]);
        }
        (lon, lat)
    }

    fn lattice(x0: f64, y0: f64, size: usize) -> (Vec<f64>, Vec<f64>) {
        let mut lon = Vec::new();
        let mut lat = Vec::new();
        for i in 0..=size {
            for j in 0..=size {
                lon.push(x0 + i as f64);
                lat.push(y0 + j as f64);
            }
        }
        (lon, lat)
    }

    fn tight_alpha() -> FootprintConfig {
        FootprintConfig::new(Strategy::AlphaShape(AlphaShapeParams {
            alpha: 1.0,
            ..AlphaShapeParams::default()
        }))
    }

    #[test]
    fn test_square_end_to_end() {
        let (lon, lat) = square_outline();
        assert_eq!(lon.len(), 20);

        let config = FootprintConfig::new(Strategy::AlphaShape(AlphaShapeParams {
            thinning: Some(Thinning::Standard(1)),
            ..AlphaShapeParams::default()
        }))
        .with_simplify(0.1);

        let footprint = generate_footprint(&lon, &lat, &config).unwrap();
        let Footprint::Polygon(polygon) = &footprint else {
            panic!("expected a polygon, got {}", footprint.kind());
        };
        assert!(polygon.is_valid());
        assert!((polygon.unsigned_area() - 100.0).abs() <= 5.0);

        let vertices = polygon.exterior().0.len() - 1;
        assert!((4..=8).contains(&vertices), "got {} vertices", vertices);

        let wkt = generate(&lon, &lat, &config).unwrap();
        assert!(wkt.starts_with("POLYGON (("));
    }

    #[test]
    fn test_mismatched_lengths() {
        let err = generate(&[1.0, 2.0, 3.0], &[1.0, 2.0], &FootprintConfig::default()).unwrap_err();
        assert!(matches!(err, FootprintError::InvalidInput(_)));
    }

    #[test]
    fn test_too_few_valid_points() {
        let lon = [0.0, 1.0, f64::NAN, 3.0];
        let lat = [0.0, 1.0, 2.0, -9999.0];
        let config = FootprintConfig::default().with_fill_value(-9999.0);
        let err = generate(&lon, &lat, &config).unwrap_err();
        assert!(matches!(err, FootprintError::InsufficientData { found: 2, .. }));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = FootprintConfig::new(Strategy::OpenCv(RasterParams {
            scratch_dir: Some(dir.path().to_path_buf()),
            width: 0,
            ..RasterParams::default()
        }));
        let (lon, lat) = square_outline();
        let err = generate(&lon, &lat, &config).unwrap_err();
        assert!(matches!(err, FootprintError::InvalidConfig(_)));

        let config = FootprintConfig::new(Strategy::AlphaShape(AlphaShapeParams {
            alpha: f64::NAN,
            ..AlphaShapeParams::default()
        }));
        let err = generate(&lon, &lat, &config).unwrap_err();
        assert!(matches!(err, FootprintError::InvalidConfig(_)));
    }

    #[test]
    fn test_unknown_strategy_uses_alpha_shape() {
        let config = FootprintConfig::from_json_str(r#"{"footprint": {"strategy": "made_up"}}"#).unwrap();
        let (lon, lat) = square_outline();
        let footprint = generate_footprint(&lon, &lat, &config).unwrap();
        assert!(matches!(footprint, Footprint::Polygon(_)));
    }

    #[test]
    fn test_is360_remaps_longitudes() {
        let (lon, lat) = lattice(200.0, 0.0, 4);
        let config = tight_alpha().with_is360(true);
        let Footprint::Polygon(polygon) = generate_footprint(&lon, &lat, &config).unwrap() else {
            panic!("expected a polygon");
        };
        assert!(polygon.exterior().coords().all(|c| (-160.0..=-156.0).contains(&c.x)));
    }

    #[test]
    fn test_min_area_drops_small_members() {
        let (mut lon, mut lat) = lattice(0.0, 0.0, 10);
        let (small_lon, small_lat) = lattice(50.0, 50.0, 2);
        lon.extend(small_lon);
        lat.extend(small_lat);

        let config = tight_alpha().with_min_area(10.0);
        let Footprint::MultiPolygon(multi) = generate_footprint(&lon, &lat, &config).unwrap() else {
            panic!("expected a multipolygon");
        };
        assert_eq!(multi.0.len(), 1);
        assert!((multi.unsigned_area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_min_area_never_empties() {
        let (mut lon, mut lat) = lattice(0.0, 0.0, 2);
        let (other_lon, other_lat) = lattice(50.0, 50.0, 2);
        lon.extend(other_lon);
        lat.extend(other_lat);

        let config = tight_alpha().with_min_area(1000.0);
        let Footprint::MultiPolygon(multi) = generate_footprint(&lon, &lat, &config).unwrap() else {
            panic!("expected a multipolygon");
        };
        assert_eq!(multi.0.len(), 2);
    }

    #[test]
    fn test_post_process_repairs_bowtie() {
        let bowtie = polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 2.0, y: 0.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ];
        let repaired = post_process(Footprint::Polygon(bowtie), &FootprintConfig::default()).unwrap();
        let multi = repaired.to_multi_polygon().unwrap();
        assert!(multi.is_valid());
        assert!((multi.unsigned_area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_linestring_wkt() {
        let config = FootprintConfig::from_json_str(r#"{"strategy": "linestring"}"#).unwrap();
        let lon = [170.0, 175.0, -179.0, -170.0];
        let lat = [0.0, 5.0, 0.0, 5.0];
        assert_eq!(
            generate(&lon, &lat, &config).unwrap(),
            "MULTILINESTRING ((170 0, 175 5), (-179 0, -170 5))"
        );
    }

    #[test]
    fn test_linestring_is_not_area_filtered() {
        let config = FootprintConfig::new(Strategy::Linestring(LinestringParams::default())).with_min_area(5.0);
        let footprint = generate_footprint(&[0.0, 10.0], &[0.0, 10.0], &config).unwrap();
        assert!(!footprint.is_polygonal());
    }

    #[test]
    fn test_raster_through_dispatcher() {
        let dir = tempfile::tempdir().unwrap();
        let document = serde_json::json!({
            "footprint": {
                "strategy": "open_cv",
                "open_cv": {"path": dir.path(), "width": 360, "height": 180}
            }
        });
        let config = FootprintConfig::from_value(document).unwrap();

        let mut lon = Vec::new();
        let mut lat = Vec::new();
        for i in 0..=20 {
            for j in 0..=20 {
                lon.push(-40.0 + i as f64 * 0.5);
                lat.push(10.0 + j as f64 * 0.5);
            }
        }
        let wkt = generate(&lon, &lat, &config).unwrap();
        assert_eq!(wkt, "POLYGON ((-40 20, -40 10, -30 10, -30 20, -40 20))");
    }

    #[test]
    fn test_grid_input_with_outer_edges() {
        let rows = 6;
        let cols = 8;
        let mut lon = Vec::new();
        let mut lat = Vec::new();
        for row in 0..rows {
            for col in 0..cols {
                lon.push(col as f64);
                lat.push(row as f64);
            }
        }
        let config = FootprintConfig::new(Strategy::AlphaShape(AlphaShapeParams {
            alpha: 1.0,
            thinning: Some(Thinning::OuterEdges(1)),
            ..AlphaShapeParams::default()
        }));

        let footprint = generate_footprint_grid(&lon, &lat, GridShape::new(rows, cols), &config).unwrap();
        let multi = footprint.to_multi_polygon().unwrap();
        assert!((multi.unsigned_area() - 35.0).abs() < 1e-9);

        let err = generate_footprint(&lon, &lat, &config).unwrap_err();
        assert!(matches!(err, FootprintError::InvalidInput(_)));
    }

    #[test]
    fn test_envelope_json() {
        let envelope = FootprintEnvelope::new("POLYGON ((0 0, 1 0, 1 1, 0 0))".to_string());
        assert_eq!(
            envelope.to_json().unwrap(),
            r#"{"FOOTPRINT":"POLYGON ((0 0, 1 0, 1 1, 0 0))","EXTENT":""}"#
        );
    }

    #[test]
    fn test_footprint_input_generate() {
        let (lon, lat) = square_outline();
        let wkt = FootprintInput::new(lon, lat).generate(&FootprintConfig::default()).unwrap();
        assert!(wkt.starts_with("POLYGON"));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_generate_many() {
        let (lon, lat) = square_outline();
        let inputs = vec![
            FootprintInput::new(lon.clone(), lat.clone()),
            FootprintInput::new(vec![0.0], vec![0.0]),
            FootprintInput::new(lon, lat),
        ];
        let results = generate_many(&inputs, &FootprintConfig::default());
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert_eq!(results[0].as_ref().ok(), results[2].as_ref().ok());
    }
}
