//! # Coordinate Normalization
//!
//! Turns raw longitude/latitude arrays into a clean sample set every
//! footprint strategy can consume.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`normalize_longitude`] | Remap a 0–360° longitude onto [−180, 180) |
//! | [`normalize_longitudes`] | Same, for a whole array |
//! | [`is_missing`] | Fill-value / non-finite test for one value |
//! | [`mask_samples`] | Validity-masked flat samples |
//! | [`SampleGrid::from_arrays`] | Validity-masked samples, optionally 2-D |
//!
//! ## Example
//!
//! ```rust
//! use footprinter::geo_utils::{normalize_longitudes, SampleGrid};
//!
//! let lon = normalize_longitudes(&[0.0, 90.0, 359.0]);
//! assert_eq!(lon, vec![0.0, 90.0, -1.0]);
//!
//! let lat = [10.0, f64::NAN, 12.0];
//! let grid = SampleGrid::from_arrays(&lon, &lat, None, None).unwrap();
//! assert_eq!(grid.valid_count(), 2);
//! ```
//!
//! ## Missing samples
//!
//! Missing samples never travel past this module as NaN. Each sample becomes
//! `Option<Coord>`; `None` marks a fill value or a non-finite coordinate.

use geo::Coord;

use crate::error::{FootprintError, Result};

// =============================================================================
// Longitude Remapping
// =============================================================================

/// Remap a longitude from the 0–360° convention onto [−180, 180).
///
/// Uses a floored modulus, so `359 → −1`, `0 → 0` and `180 → −180`.
/// Values already inside [−180, 180) come back unchanged.
///
/// ```rust
/// use footprinter::geo_utils::normalize_longitude;
///
/// assert_eq!(normalize_longitude(359.0), -1.0);
/// assert_eq!(normalize_longitude(-45.5), -45.5);
/// ```
#[inline]
pub fn normalize_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Remap every longitude of an array, see [`normalize_longitude`].
pub fn normalize_longitudes(lons: &[f64]) -> Vec<f64> {
    lons.iter().map(|&lon| normalize_longitude(lon)).collect()
}

/// Whether a single coordinate value counts as missing.
///
/// Non-finite values are always missing. With a fill value configured,
/// an exact match is missing too.
#[inline]
pub fn is_missing(value: f64, fill_value: Option<f64>) -> bool {
    !value.is_finite() || fill_value.is_some_and(|fill| value == fill)
}

/// Validity-mask flat longitude/latitude arrays, see [`SampleGrid::from_arrays`].
pub fn mask_samples(lon: &[f64], lat: &[f64], fill_value: Option<f64>) -> Result<SampleGrid> {
    SampleGrid::from_arrays(lon, lat, None, fill_value)
}

// =============================================================================
// Sample Grid
// =============================================================================

/// Row-major shape of a 2-D scan-line layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub rows: usize,
    pub cols: usize,
}

impl GridShape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Validity-masked coordinate samples.
///
/// Keeps the input order (and the 2-D shape when there is one) so thinning
/// methods that depend on the scan layout can still see it.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGrid {
    samples: Vec<Option<Coord>>,
    shape: Option<GridShape>,
}

impl SampleGrid {
    /// Build a masked sample set from raw longitude/latitude arrays.
    ///
    /// Fails with [`FootprintError::InvalidInput`] if the arrays differ in
    /// length or if `shape` does not cover exactly the number of samples.
    pub fn from_arrays(
        lon: &[f64],
        lat: &[f64],
        shape: Option<GridShape>,
        fill_value: Option<f64>,
    ) -> Result<Self> {
        if lon.len() != lat.len() {
            return Err(FootprintError::InvalidInput(format!(
                "longitude has {} samples but latitude has {}",
                lon.len(),
                lat.len()
            )));
        }
        if let Some(shape) = shape {
            if shape.len() != lon.len() {
                return Err(FootprintError::InvalidInput(format!(
                    "grid shape {}x{} does not match {} samples",
                    shape.rows,
                    shape.cols,
                    lon.len()
                )));
            }
        }

        let samples = lon
            .iter()
            .zip(lat)
            .map(|(&x, &y)| {
                if is_missing(x, fill_value) || is_missing(y, fill_value) {
                    None
                } else {
                    Some(Coord { x, y })
                }
            })
            .collect();

        Ok(Self { samples, shape })
    }

    /// Wrap already-masked samples.
    pub fn from_samples(samples: Vec<Option<Coord>>, shape: Option<GridShape>) -> Self {
        Self { samples, shape }
    }

    pub fn shape(&self) -> Option<GridShape> {
        self.shape
    }

    pub fn samples(&self) -> &[Option<Coord>] {
        &self.samples
    }

    /// Total number of samples, missing ones included.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        self.samples.iter().filter(|s| s.is_some()).count()
    }

    /// Valid samples in input order.
    pub fn valid_coords(&self) -> Vec<Coord> {
        self.samples.iter().flatten().copied().collect()
    }

    /// Sample at `(row, col)` of a gridded layout.
    pub fn get(&self, row: usize, col: usize) -> Option<Coord> {
        let shape = self.shape?;
        if row >= shape.rows || col >= shape.cols {
            return None;
        }
        self.samples[row * shape.cols + col]
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
