//! Geographic bounding boxes aligned to the GloFAS grid.

use serde::{Deserialize, Serialize};

use crate::error::{AaError, AaResult};

/// Offset of GloFAS cell centres from whole multiples of the cell size.
pub const GLOFAS_OFFSET: f64 = 0.05;

/// GloFAS cell size in degrees.
pub const GLOFAS_MULTIPLE: f64 = 0.1;

/// Digits after the decimal point in [`GeoBoundingBox::compact_encoding`].
pub const DEFAULT_ENCODING_PRECISION: usize = 2;

/// A lat/lon rectangle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl GeoBoundingBox {
    /// Create a bounding box, requiring north > south and east > west.
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> AaResult<Self> {
        if [north, south, east, west].iter().any(|v| !v.is_finite()) {
            return Err(AaError::invalid_bbox("coordinates must be finite"));
        }
        if north <= south {
            return Err(AaError::invalid_bbox(format!(
                "north ({}) must be greater than south ({})",
                north, south
            )));
        }
        if east <= west {
            return Err(AaError::invalid_bbox(format!(
                "east ({}) must be greater than west ({})",
                east, west
            )));
        }
        Ok(Self {
            north,
            south,
            east,
            west,
        })
    }

    /// Snap every edge to the nearest `k * multiple + offset`, rounding
    /// halves away from zero.
    pub fn round_coords(&self, offset: f64, multiple: f64) -> Self {
        Self {
            north: snap(self.north, offset, multiple),
            south: snap(self.south, offset, multiple),
            east: snap(self.east, offset, multiple),
            west: snap(self.west, offset, multiple),
        }
    }

    /// Snap to the GloFAS cell centres.
    pub fn normalized(&self) -> Self {
        self.round_coords(GLOFAS_OFFSET, GLOFAS_MULTIPLE)
    }

    /// Filename-safe encoding, e.g. `Np1d05Sm2d25Ep3d35Wm4d45`.
    ///
    /// Two decimals keep boxes that differ only by the 0.05 cell offset
    /// apart. Raw caches named with one decimal (`Np1d1...`) are not
    /// matched; use [`GeoBoundingBox::compact_encoding_with_precision`] with
    /// `1` to locate them.
    pub fn compact_encoding(&self) -> String {
        self.compact_encoding_with_precision(DEFAULT_ENCODING_PRECISION)
    }

    pub fn compact_encoding_with_precision(&self, precision: usize) -> String {
        [
            ('N', self.north),
            ('S', self.south),
            ('E', self.east),
            ('W', self.west),
        ]
        .iter()
        .map(|(letter, value)| encode_edge(*letter, *value, precision))
        .collect()
    }

    /// Edge order expected by the CDS `area` request key.
    pub fn cds_area(&self) -> [f64; 4] {
        [self.north, self.west, self.south, self.east]
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat > self.south && lat < self.north && lon > self.west && lon < self.east
    }
}

fn snap(value: f64, offset: f64, multiple: f64) -> f64 {
    // 0.95 / 0.1 lands on 9.4999..., so clean the quotient before rounding.
    let quotient = ((value - offset) / multiple * 1e6).round() / 1e6;
    let snapped = quotient.round() * multiple + offset;
    (snapped * 1e9).round() / 1e9
}

fn encode_edge(letter: char, value: f64, precision: usize) -> String {
    let magnitude = format!("{:.*}", precision, value.abs());
    let nonzero = magnitude.chars().any(|c| c.is_ascii_digit() && c != '0');
    let sign = if value < 0.0 && nonzero { 'm' } else { 'p' };
    format!("{}{}{}", letter, sign, magnitude.replace('.', "d"))
}
