//! Reporting points.
//!
//! A reporting point is a named river station configured per country.
//! Discharge time series are extracted at the grid cell nearest to it.

use serde::{Deserialize, Serialize};

/// A named station with its coordinates in degrees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportingPoint {
    /// Station name, used as the series name in extracted outputs.
    pub name: String,

    pub lat: f64,

    pub lon: f64,
}

impl ReportingPoint {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
        }
    }
}
