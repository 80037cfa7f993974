//! Synthetic discharge grids with predictable values.
//!
//! Every generated cell holds
//! `member * 1_000_000 + time * 100_000 + step * 10_000 + lat * 100 + lon`
//! (indices, not coordinates), so a test can tell exactly which cell a value
//! came from. Single-member and control grids use member 0.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use grid_processor::{Coord, Dim, RawGrid};
use ndarray::{ArrayD, IxDyn};

/// Shape and coordinates of a synthetic grid.
#[derive(Debug, Clone)]
pub struct GridSpec {
    pub lats: Vec<f64>,
    pub lons: Vec<f64>,
    pub times: usize,
    pub steps: usize,
}

impl GridSpec {
    /// GloFAS-style cell centres covering (north, south, east, west) with a
    /// margin of one degree beyond the north and east edges.
    pub fn covering(area: (f64, f64, f64, f64), times: usize, steps: usize) -> Self {
        let (north, south, east, west) = area;
        Self {
            lats: cell_centres(south - 0.05, north + 1.0),
            lons: cell_centres(west - 0.05, east + 1.0),
            times,
            steps,
        }
    }
}

/// 0.1 degree cell centres from `start` up to (excluding) `stop`, rounded
/// to two decimals.
///
/// # Example
///
/// ```
/// use test_utils::cell_centres;
///
/// assert_eq!(cell_centres(-0.05, 0.2), vec![-0.05, 0.05, 0.15]);
/// ```
pub fn cell_centres(start: f64, stop: f64) -> Vec<f64> {
    let first = (start * 100.0).round() as i64;
    let last = (stop * 100.0).round() as i64;
    (first..last)
        .step_by(10)
        .map(|hundredths| hundredths as f64 / 100.0)
        .collect()
}

/// Value stored at the given indices.
pub fn discharge_value(member: usize, time: usize, step: usize, lat: usize, lon: usize) -> f32 {
    (member * 1_000_000 + time * 100_000 + step * 10_000 + lat * 100 + lon) as f32
}

/// Daily forecast initialisation times starting 2014-09-06.
pub fn forecast_times(count: usize) -> Vec<NaiveDateTime> {
    let first = NaiveDate::from_ymd_opt(2014, 9, 6)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid start time");
    (0..count).map(|i| first + Duration::days(i as i64)).collect()
}

/// Lead times in hours: 24, 48, ...
pub fn lead_steps(count: usize) -> Vec<u32> {
    (1..=count as u32).map(|d| d * 24).collect()
}

fn spatial_axes(spec: &GridSpec, with_step: bool) -> Vec<(Dim, Coord)> {
    let mut axes = vec![(Dim::Time, Coord::Times(forecast_times(spec.times)))];
    if with_step {
        axes.push((Dim::Step, Coord::Steps(lead_steps(spec.steps))));
    }
    axes.push((Dim::Latitude, Coord::Degrees(spec.lats.clone())));
    axes.push((Dim::Longitude, Coord::Degrees(spec.lons.clone())));
    axes
}

/// Reanalysis-style grid: (time, latitude, longitude).
pub fn reanalysis_grid(spec: &GridSpec) -> RawGrid {
    let shape = [spec.times, spec.lats.len(), spec.lons.len()];
    let data = ArrayD::from_shape_fn(IxDyn(&shape), |i| discharge_value(0, i[0], 0, i[1], i[2]));
    RawGrid::new("dis24", spatial_axes(spec, false), data)
        .expect("generated reanalysis grid is consistent")
        .with_attr("history", "reanalysis download")
        .with_attr("institution", "ECMWF")
}

/// Control forecast: (time, step, latitude, longitude).
pub fn control_grid(spec: &GridSpec) -> RawGrid {
    let shape = [spec.times, spec.steps, spec.lats.len(), spec.lons.len()];
    let data = ArrayD::from_shape_fn(IxDyn(&shape), |i| discharge_value(0, i[0], i[1], i[2], i[3]));
    RawGrid::new("dis24", spatial_axes(spec, true), data)
        .expect("generated control grid is consistent")
        .with_attr("history", "control download")
        .with_attr("institution", "ECMWF")
}

/// Perturbed forecast with members 1..=`members`:
/// (member, time, step, latitude, longitude).
pub fn perturbed_grid(spec: &GridSpec, members: usize) -> RawGrid {
    let shape = [members, spec.times, spec.steps, spec.lats.len(), spec.lons.len()];
    let data = ArrayD::from_shape_fn(IxDyn(&shape), |i| {
        discharge_value(i[0] + 1, i[1], i[2], i[3], i[4])
    });
    let mut axes = vec![(Dim::Member, Coord::Members((1..=members as u32).collect()))];
    axes.extend(spatial_axes(spec, true));
    RawGrid::new("dis24", axes, data)
        .expect("generated perturbed grid is consistent")
        .with_attr("history", "perturbed download")
        .with_attr("institution", "ECMWF")
}
