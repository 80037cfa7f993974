//! Nearest-cell time series extraction at reporting points.

use std::collections::BTreeMap;

use aa_common::ReportingPoint;
use ndarray::{ArrayD, Axis, IxDyn};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GridError, Result};
use crate::types::{Coord, Dim, RawGrid};

/// Values at one reporting point over the grid's non-spatial dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSeries {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Coordinates of the grid cell the values were taken from.
    pub cell_lat: f64,
    pub cell_lon: f64,
    pub shape: Vec<usize>,
    /// Row-major values; `None` marks a missing cell value.
    pub values: Vec<Option<f32>>,
}

impl PointSeries {
    /// Values as an array, with missing entries as NaN.
    pub fn to_array(&self) -> Result<ArrayD<f32>> {
        let flat: Vec<f32> = self.values.iter().map(|v| v.unwrap_or(f32::NAN)).collect();
        Ok(ArrayD::from_shape_vec(IxDyn(&self.shape), flat)?)
    }
}

/// One series per reporting point sharing the same remaining dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSeriesTable {
    pub variable: String,
    pub dims: Vec<Dim>,
    pub coords: Vec<Coord>,
    pub series: Vec<PointSeries>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

impl PointSeriesTable {
    pub fn get(&self, name: &str) -> Option<&PointSeries> {
        self.series.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.name.as_str())
    }
}

/// Extraction result that tolerates out-of-bounds points.
#[derive(Debug, Clone)]
pub struct PartialExtraction {
    pub table: PointSeriesTable,
    pub rejected: Vec<GridError>,
}

/// Index of the coordinate closest to `value`; ties go to the lower index.
pub fn nearest_index(coords: &[f64], value: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, c) in coords.iter().enumerate() {
        let distance = (c - value).abs();
        match best {
            Some((_, d)) if distance >= d => {}
            _ => best = Some((i, distance)),
        }
    }
    best.map(|(i, _)| i)
}

fn check_axis(grid: &RawGrid, point: &ReportingPoint, axis: Dim, value: f64) -> Result<usize> {
    let (min, max) = grid.extent(axis)?;
    if !(min < value && value < max) {
        return Err(GridError::OutOfBounds {
            point: point.name.clone(),
            axis,
            value,
            min,
            max,
        });
    }
    nearest_index(grid.degrees(axis)?, value).ok_or(GridError::MissingDimension(axis))
}

/// Check that a point lies strictly inside the grid, returning its
/// (latitude, longitude) cell indices.
pub fn locate_point(grid: &RawGrid, point: &ReportingPoint) -> Result<(usize, usize)> {
    let lon = check_axis(grid, point, Dim::Longitude, point.lon)?;
    let lat = check_axis(grid, point, Dim::Latitude, point.lat)?;
    Ok((lat, lon))
}

/// Fail on the first point that lies on or outside the grid extent.
pub fn validate_points(grid: &RawGrid, points: &[ReportingPoint]) -> Result<()> {
    for point in points {
        locate_point(grid, point)?;
    }
    Ok(())
}

/// Extract one series per point, in the order given.
///
/// Every point is validated before anything is extracted.
pub fn extract_points(grid: &RawGrid, points: &[ReportingPoint]) -> Result<PointSeriesTable> {
    let located = points
        .iter()
        .map(|p| locate_point(grid, p).map(|cell| (p, cell)))
        .collect::<Result<Vec<_>>>()?;
    build_table(grid, located)
}

/// Extract the points that fall inside the grid and report the rest.
pub fn extract_available_points(grid: &RawGrid, points: &[ReportingPoint]) -> Result<PartialExtraction> {
    let mut located = Vec::with_capacity(points.len());
    let mut rejected = Vec::new();
    for point in points {
        match locate_point(grid, point) {
            Ok(cell) => located.push((point, cell)),
            Err(err @ GridError::OutOfBounds { .. }) => {
                warn!(point = %point.name, error = %err, "Skipping reporting point");
                rejected.push(err);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(PartialExtraction {
        table: build_table(grid, located)?,
        rejected,
    })
}

fn build_table(grid: &RawGrid, located: Vec<(&ReportingPoint, (usize, usize))>) -> Result<PointSeriesTable> {
    let lat_axis = grid.axis(Dim::Latitude)?;
    let lon_axis = grid.axis(Dim::Longitude)?;
    let lats = grid.degrees(Dim::Latitude)?;
    let lons = grid.degrees(Dim::Longitude)?;

    let mut series = Vec::with_capacity(located.len());
    for (point, (lat_idx, lon_idx)) in located {
        // Remove the higher axis first so the lower index stays valid.
        let (first, second) = if lat_axis > lon_axis {
            ((lat_axis, lat_idx), (lon_axis, lon_idx))
        } else {
            ((lon_axis, lon_idx), (lat_axis, lat_idx))
        };
        let view = grid.data().index_axis(Axis(first.0), first.1);
        let view = view.index_axis(Axis(second.0), second.1);
        series.push(PointSeries {
            name: point.name.clone(),
            lat: point.lat,
            lon: point.lon,
            cell_lat: lats[lat_idx],
            cell_lon: lons[lon_idx],
            shape: view.shape().to_vec(),
            values: view.iter().map(|v| if v.is_nan() { None } else { Some(*v) }).collect(),
        });
    }
    debug!(points = series.len(), "Extracted reporting point series");

    let (dims, coords): (Vec<Dim>, Vec<Coord>) = grid
        .dims()
        .iter()
        .zip(grid.coords())
        .filter(|(d, _)| !matches!(d, Dim::Latitude | Dim::Longitude))
        .map(|(d, c)| (*d, c.clone()))
        .unzip();

    Ok(PointSeriesTable {
        variable: grid.variable().to_string(),
        dims,
        coords,
        series,
        attrs: grid.attrs.clone(),
    })
}
