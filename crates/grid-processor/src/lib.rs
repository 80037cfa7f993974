//! In-memory discharge grid processing.
//!
//! Raw GloFAS archives arrive in parts: single-member products (reanalysis)
//! come as one grid, ensemble products as a deterministic control run plus
//! a set of perturbed members. This crate merges the parts into one grid and
//! pulls per-station time series out of it.
//!
//! # Architecture
//!
//! ```text
//! control (time, step, lat, lon)     perturbed (member, time, step, lat, lon)
//!      │                                   │
//!      ├─► strip `history`                 ├─► strip `history`
//!      ├─► expand_dims(member = [0])       │
//!      └──────────────┬────────────────────┘
//!                     ▼
//!          assemble_ensemble (concatenate along member,
//!                     │       coordinates must match exactly)
//!                     ▼
//!          extract_points(reporting points)
//!                     │
//!                     ├─► strict bounds check per axis
//!                     └─► nearest cell per axis
//!                     ▼
//!             PointSeriesTable
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{assemble_ensemble, extract_points};
//!
//! let ensemble = assemble_ensemble(control, perturbed)?;
//! let table = extract_points(ensemble.grid(), &country.reporting_points)?;
//! ```

pub mod ensemble;
pub mod error;
pub mod extract;
pub mod types;

pub use ensemble::{assemble_ensemble, NON_MERGEABLE_ATTRS};
pub use error::{GridError, Result};
pub use extract::{
    extract_available_points, extract_points, locate_point, nearest_index, validate_points,
    PartialExtraction, PointSeries, PointSeriesTable,
};
pub use types::{AssembledGrid, Coord, Dim, GridPart, RawGrid};
