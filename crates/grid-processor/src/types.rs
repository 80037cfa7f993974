//! Core types for grid processing.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use ndarray::{ArrayD, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// Named dimensions a discharge grid can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dim {
    /// Ensemble member, 0 being the control run.
    Member,
    /// Forecast initialisation time.
    Time,
    /// Lead time in hours.
    Step,
    Latitude,
    Longitude,
}

impl Dim {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dim::Member => "member",
            Dim::Time => "time",
            Dim::Step => "step",
            Dim::Latitude => "latitude",
            Dim::Longitude => "longitude",
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coordinate vector for one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum Coord {
    Members(Vec<u32>),
    Times(Vec<NaiveDateTime>),
    /// Lead times in hours.
    Steps(Vec<u32>),
    Degrees(Vec<f64>),
}

impl Coord {
    pub fn len(&self) -> usize {
        match self {
            Coord::Members(v) => v.len(),
            Coord::Times(v) => v.len(),
            Coord::Steps(v) => v.len(),
            Coord::Degrees(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single raw grid part as read from a downloaded archive.
///
/// Dimensions and coordinates are kept in data axis order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawGrid {
    variable: String,
    dims: Vec<Dim>,
    coords: Vec<Coord>,
    data: ArrayD<f32>,
    /// Provenance attributes carried over from the source file.
    pub attrs: BTreeMap<String, String>,
}

impl RawGrid {
    /// Build a grid, checking that every axis has a matching coordinate vector.
    pub fn new(
        variable: impl Into<String>,
        axes: Vec<(Dim, Coord)>,
        data: ArrayD<f32>,
    ) -> Result<Self> {
        if axes.len() != data.ndim() {
            return Err(GridError::shape_mismatch(format!(
                "{} coordinate vectors for {}-dimensional data",
                axes.len(),
                data.ndim()
            )));
        }
        let (dims, coords): (Vec<Dim>, Vec<Coord>) = axes.into_iter().unzip();
        for (i, dim) in dims.iter().enumerate() {
            if dims[..i].contains(dim) {
                return Err(GridError::shape_mismatch(format!("duplicate {} dimension", dim)));
            }
            if coords[i].len() != data.shape()[i] {
                return Err(GridError::shape_mismatch(format!(
                    "{} has {} coordinates but axis {} has length {}",
                    dim,
                    coords[i].len(),
                    i,
                    data.shape()[i]
                )));
            }
        }
        Ok(Self {
            variable: variable.into(),
            dims,
            coords,
            data,
            attrs: BTreeMap::new(),
        })
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn dims(&self) -> &[Dim] {
        &self.dims
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    pub fn has_dim(&self, dim: Dim) -> bool {
        self.dims.contains(&dim)
    }

    /// Axis index of `dim`.
    pub fn axis(&self, dim: Dim) -> Result<usize> {
        self.dims
            .iter()
            .position(|d| *d == dim)
            .ok_or(GridError::MissingDimension(dim))
    }

    pub fn coord(&self, dim: Dim) -> Result<&Coord> {
        Ok(&self.coords[self.axis(dim)?])
    }

    /// Degree coordinates of a spatial dimension.
    pub fn degrees(&self, dim: Dim) -> Result<&[f64]> {
        match self.coord(dim)? {
            Coord::Degrees(values) => Ok(values),
            _ => Err(GridError::MissingDimension(dim)),
        }
    }

    /// Minimum and maximum coordinate along a spatial dimension.
    pub fn extent(&self, dim: Dim) -> Result<(f64, f64)> {
        let values = self.degrees(dim)?;
        if values.is_empty() {
            return Err(GridError::MissingDimension(dim));
        }
        Ok(values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            }))
    }

    /// Remove the named attributes.
    pub fn strip_attrs(&mut self, names: &[&str]) {
        for name in names {
            self.attrs.remove(*name);
        }
    }

    /// Insert a length-one dimension at `position`.
    pub fn expand_dims(mut self, dim: Dim, coord: Coord, position: usize) -> Result<Self> {
        if self.has_dim(dim) {
            return Err(GridError::shape_mismatch(format!("{} dimension already present", dim)));
        }
        if coord.len() != 1 {
            return Err(GridError::shape_mismatch(format!(
                "expanding {} needs exactly one coordinate, got {}",
                dim,
                coord.len()
            )));
        }
        if position > self.dims.len() {
            return Err(GridError::shape_mismatch(format!(
                "cannot insert {} at axis {} of {}-dimensional data",
                dim,
                position,
                self.dims.len()
            )));
        }
        self.data = self.data.insert_axis(Axis(position));
        self.dims.insert(position, dim);
        self.coords.insert(position, coord);
        Ok(self)
    }

    pub(crate) fn into_parts(self) -> (String, Vec<Dim>, Vec<Coord>, ArrayD<f32>, BTreeMap<String, String>) {
        (self.variable, self.dims, self.coords, self.data, self.attrs)
    }

    pub(crate) fn coords(&self) -> &[Coord] {
        &self.coords
    }
}

/// Which raw part of a product a grid came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridPart {
    /// Single-member products such as the reanalysis.
    Single,
    /// Deterministic control forecast, no member dimension.
    Control,
    /// Perturbed ensemble members.
    Perturbed,
}

/// A grid with a unified member dimension at axis 0.
///
/// Member 0 holds the control realization.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledGrid(pub(crate) RawGrid);

impl AssembledGrid {
    pub fn grid(&self) -> &RawGrid {
        &self.0
    }

    pub fn into_inner(self) -> RawGrid {
        self.0
    }

    pub fn member_count(&self) -> usize {
        self.0.shape()[0]
    }
}

impl AsRef<RawGrid> for AssembledGrid {
    fn as_ref(&self) -> &RawGrid {
        &self.0
    }
}
