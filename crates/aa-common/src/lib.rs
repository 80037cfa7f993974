//! Common types shared by the anticipatory-action data toolbox.
//!
//! - [`Dekad`]: the 36-per-year 10-day calendar used to address rasters
//! - [`DekadRange`]: inclusive dekad ranges expanded lazily into periods
//! - [`GeoBoundingBox`]: lat/lon boxes snapped to the GloFAS grid
//! - [`ReportingPoint`]: named stations where discharge series are extracted

pub mod bbox;
pub mod dekad;
pub mod error;
pub mod location;
pub mod range;

pub use bbox::GeoBoundingBox;
pub use dekad::{Dekad, DekadInput};
pub use error::{AaError, AaResult};
pub use location::ReportingPoint;
pub use range::{DekadIter, DekadRange, RangePosition};
