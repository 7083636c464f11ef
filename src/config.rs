//! Footprint configuration.
//!
//! The dataset configuration document is plain JSON. This module turns it
//! into a typed [`FootprintConfig`] with one parameter struct per strategy,
//! validated up front so the fitting code never looks values up by key.

use std::path::PathBuf;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FootprintError, Result};

// ============================================================================
// Thinning
// ============================================================================

/// Point thinning applied before the concave-hull fit.
///
/// Mirrors the `{"method": ..., "value": ...}` shape of the config document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "value", rename_all = "snake_case")]
pub enum Thinning {
    /// Keep every n-th sample.
    Standard(usize),
    /// Average samples sharing a `[lon_spacing, lat_spacing]` grid cell.
    #[serde(alias = "bin_average")]
    BinAvg([f64; 2]),
    /// Perimeter of a 2-D scan grid plus every n-th sample.
    OuterEdges(usize),
}

// ============================================================================
// Strategy Parameters
// ============================================================================

/// Parameters of the concave-hull (alpha shape) strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaShapeParams {
    /// Tightness of the fit. Triangles with a circumradius of `1/alpha` or
    /// more are dropped; `0` yields the convex hull.
    /// Default: 0.05
    pub alpha: f64,
    /// Optional thinning before the fit.
    pub thinning: Option<Thinning>,
    /// Drop samples with `|lat| >= cutoff_lat` after thinning.
    pub cutoff_lat: Option<f64>,
    /// `(threshold, target)`: ring latitudes beyond ±threshold become ±target.
    pub smooth_poles: Option<(f64, f64)>,
}

impl Default for AlphaShapeParams {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            thinning: None,
            cutoff_lat: None,
            smooth_poles: None,
        }
    }
}

/// Parameters of the raster contour strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterParams {
    /// Directory for the intermediate mask image. Supplied by the caller.
    #[serde(rename = "path")]
    pub scratch_dir: Option<PathBuf>,
    /// Raster width in pixels. Default: 3600 (0.1° cells)
    pub width: u32,
    /// Raster height in pixels. Default: 1800
    pub height: u32,
    /// Binarization threshold for the reloaded mask. Default: 185
    #[serde(alias = "threshold")]
    pub threshold_value: u8,
    /// Square kernel size of the gap-bridging closing. Default: 20
    pub mask_kernel: u32,
    /// Square kernel size of the final close/open cleanup. Default: 5
    pub cleanup_kernel: u32,
    /// Ring simplification tolerance in degrees. Default: 0.2
    #[serde(alias = "tolerance")]
    pub simplify_tolerance: f64,
    /// Decimal places kept in the output. Default: 4
    pub precision: u32,
}

impl Default for RasterParams {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            width: 3600,
            height: 1800,
            threshold_value: 185,
            mask_kernel: 20,
            cleanup_kernel: 5,
            simplify_tolerance: 0.2,
            precision: 4,
        }
    }
}

/// Parameters of the single-track linestring strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinestringParams {
    /// Douglas-Peucker tolerance in degrees. Default: 0.9
    pub tolerance: f64,
}

impl Default for LinestringParams {
    fn default() -> Self {
        Self { tolerance: 0.9 }
    }
}

/// The fitting strategy and its parameters. Exactly one per invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    AlphaShape(AlphaShapeParams),
    OpenCv(RasterParams),
    Linestring(LinestringParams),
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::AlphaShape(AlphaShapeParams::default())
    }
}

impl Strategy {
    /// Canonical config-document name of the strategy.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::AlphaShape(_) => "alpha_shape",
            Strategy::OpenCv(_) => "open_cv",
            Strategy::Linestring(_) => "linestring",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StrategyKind {
    AlphaShape,
    OpenCv,
    Linestring,
}

impl StrategyKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "alpha_shape" | "concave_hull" => Some(StrategyKind::AlphaShape),
            "open_cv" | "raster" | "raster_contour" => Some(StrategyKind::OpenCv),
            "linestring" | "shapely_linestring" => Some(StrategyKind::Linestring),
            _ => None,
        }
    }

    fn canonical(self) -> &'static str {
        match self {
            StrategyKind::AlphaShape => "alpha_shape",
            StrategyKind::OpenCv => "open_cv",
            StrategyKind::Linestring => "linestring",
        }
    }
}

/// Options every strategy block may carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct SharedParams {
    simplify: Option<f64>,
    min_area: Option<f64>,
    fill_value: Option<f64>,
}

// ============================================================================
// Footprint Configuration
// ============================================================================

/// Complete configuration of one footprint invocation.
///
/// # Example
/// ```
/// use footprinter::{FootprintConfig, Strategy};
///
/// let config = FootprintConfig::from_json_str(r#"{
///     "is360": true,
///     "lonVar": "lon",
///     "latVar": "lat",
///     "footprint": {
///         "strategy": "alpha_shape",
///         "alpha_shape": {"alpha": 0.03, "thinning": {"method": "standard", "value": 10}}
///     }
/// }"#).unwrap();
///
/// assert!(config.is360);
/// assert!(matches!(config.strategy, Strategy::AlphaShape(ref p) if p.alpha == 0.03));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FootprintConfig {
    pub strategy: Strategy,
    /// Longitudes are 0–360° and must be remapped.
    pub is360: bool,
    /// Final simplification tolerance applied by the dispatcher.
    pub simplify: Option<f64>,
    /// MultiPolygon members smaller than this are dropped.
    pub min_area: Option<f64>,
    /// Sentinel marking missing samples, in addition to NaN.
    pub fill_value: Option<f64>,
    /// Dataset variable names, carried through for the dataset reader.
    pub longitude_var: Option<String>,
    pub latitude_var: Option<String>,
    /// Sub-group the variables live under.
    pub group: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDocument {
    #[serde(alias = "is_360")]
    is360: bool,
    #[serde(rename = "lonVar", alias = "longitude_var")]
    lon_var: Option<String>,
    #[serde(rename = "latVar", alias = "latitude_var")]
    lat_var: Option<String>,
    group: Option<String>,
    footprint: Option<Map<String, Value>>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl FootprintConfig {
    /// Configuration running `strategy` with no post-processing.
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    pub fn with_is360(mut self, is360: bool) -> Self {
        self.is360 = is360;
        self
    }

    pub fn with_simplify(mut self, tolerance: f64) -> Self {
        self.simplify = Some(tolerance);
        self
    }

    pub fn with_min_area(mut self, min_area: f64) -> Self {
        self.min_area = Some(min_area);
        self
    }

    pub fn with_fill_value(mut self, fill_value: f64) -> Self {
        self.fill_value = Some(fill_value);
        self
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Build from an already parsed configuration document.
    ///
    /// The strategy selector and its parameter block are read from the
    /// `footprint` section when present, otherwise from the top level.
    /// Unknown keys are ignored.
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawDocument = serde_json::from_value(value)?;
        let section = raw.footprint.unwrap_or(raw.rest);

        let requested = match section.get("strategy") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name.as_str()),
            Some(other) => {
                return Err(FootprintError::InvalidConfig(format!(
                    "strategy must be a string, got {}",
                    other
                )))
            }
        };

        let kind = match requested {
            None => StrategyKind::AlphaShape,
            Some(name) => StrategyKind::from_name(name).unwrap_or_else(|| {
                warn!("[Footprint] Unknown strategy '{}', using alpha_shape", name);
                StrategyKind::AlphaShape
            }),
        };

        // Parameters live under the name the document used, or the canonical one
        let block = requested
            .and_then(|name| section.get(name))
            .or_else(|| section.get(kind.canonical()))
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        let strategy = match kind {
            StrategyKind::AlphaShape => Strategy::AlphaShape(serde_json::from_value(block.clone())?),
            StrategyKind::OpenCv => Strategy::OpenCv(serde_json::from_value(block.clone())?),
            StrategyKind::Linestring => Strategy::Linestring(serde_json::from_value(block.clone())?),
        };
        let shared: SharedParams = serde_json::from_value(block)?;

        let config = Self {
            strategy,
            is360: raw.is360,
            simplify: shared.simplify,
            min_area: shared.min_area,
            fill_value: shared.fill_value,
            longitude_var: raw.lon_var,
            latitude_var: raw.lat_var,
            group: raw.group,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check every numeric parameter is usable.
    pub fn validate(&self) -> Result<()> {
        if let Some(tolerance) = self.simplify {
            non_negative("simplify", tolerance)?;
        }
        if let Some(min_area) = self.min_area {
            non_negative("min_area", min_area)?;
        }
        if let Some(fill) = self.fill_value {
            finite("fill_value", fill)?;
        }

        match &self.strategy {
            Strategy::AlphaShape(params) => {
                non_negative("alpha", params.alpha)?;
                if let Some(Thinning::BinAvg([rx, ry])) = params.thinning {
                    positive("bin_avg spacing", rx)?;
                    positive("bin_avg spacing", ry)?;
                }
                if let Some(cutoff) = params.cutoff_lat {
                    finite("cutoff_lat", cutoff)?;
                }
                if let Some((threshold, target)) = params.smooth_poles {
                    finite("smooth_poles threshold", threshold)?;
                    finite("smooth_poles target", target)?;
                }
            }
            Strategy::OpenCv(params) => {
                if params.width == 0 || params.height == 0 {
                    return Err(FootprintError::InvalidConfig(format!(
                        "raster size must be non-zero, got {}x{}",
                        params.width, params.height
                    )));
                }
                for (name, size) in [
                    ("mask_kernel", params.mask_kernel),
                    ("cleanup_kernel", params.cleanup_kernel),
                ] {
                    if size > 511 {
                        return Err(FootprintError::InvalidConfig(format!(
                            "{} must be at most 511 pixels, got {}",
                            name, size
                        )));
                    }
                }
                non_negative("simplify_tolerance", params.simplify_tolerance)?;
                if params.precision > 15 {
                    return Err(FootprintError::InvalidConfig(format!(
                        "precision must be at most 15 decimals, got {}",
                        params.precision
                    )));
                }
            }
            Strategy::Linestring(params) => {
                non_negative("tolerance", params.tolerance)?;
            }
        }
        Ok(())
    }
}

fn finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(FootprintError::InvalidConfig(format!("{} must be finite, got {}", name, value)))
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    finite(name, value)?;
    if value < 0.0 {
        return Err(FootprintError::InvalidConfig(format!("{} must be >= 0, got {}", name, value)));
    }
    Ok(())
}

fn positive(name: &str, value: f64) -> Result<()> {
    finite(name, value)?;
    if value <= 0.0 {
        return Err(FootprintError::InvalidConfig(format!("{} must be > 0, got {}", name, value)));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
