//! Dataset pipelines for anticipatory-action analysis.
//!
//! Two families are supported:
//!
//! - [`glofas`]: GloFAS river discharge reanalysis, forecasts and
//!   reforecasts from the CDS, reduced to series at reporting points
//! - [`usgs_ndvi`]: dekadal FEWS NET eMODIS NDVI rasters, reduced to zonal
//!   statistics per feature and kept in an incrementally updated table
//!
//! Both implement [`Pipeline`] for raw acquisition. Network access, raster
//! decoding and zonal statistics sit behind traits so callers choose the
//! implementation.
//!
//! # Example
//!
//! ```ignore
//! use datasources::{CountryConfig, JsonTableStore, NdviVariable, PathConfig, StatsConfig, UsgsNdvi};
//!
//! let country = CountryConfig::from_path(Path::new("config/bfa.yaml"))?;
//! let ndvi = UsgsNdvi::new(
//!     NdviVariable::Smoothed,
//!     &country,
//!     PathConfig::from_env()?,
//!     Some("2020,1".parse()?),
//!     Some("2020,3".parse()?),
//!     fetcher,
//!     reader,
//!     JsonTableStore,
//! )?;
//! ndvi.download(false);
//! let outcome = ndvi.process(&zonal, "ADM2_FR", &StatsConfig::default(), false)?;
//! ```

pub mod config;
pub mod error;
pub mod glofas;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod schema;
pub mod table;
pub mod usgs_ndvi;

pub use config::{CountryConfig, GlofasConfig, PathConfig, Stage, UsgsNdviConfig};
pub use error::{DataSourceError, Result};
pub use glofas::{CdsClient, Glofas, GlofasOptions, GlofasProduct, GlofasRequest, GridReader};
pub use pipeline::Pipeline;
pub use reconcile::{plan, PlanAction, ReconcileOutcome, ReconcilePlan, Reconciler};
pub use report::{BatchReport, PeriodOutcome};
pub use schema::{Column, ColumnKind, ColumnSchema, Statistic, StatsConfig};
pub use table::{Cell, DerivedTable, JsonTableStore, Row, TableStore};
pub use usgs_ndvi::{FeatureStats, NdviVariable, RasterFetcher, RasterReader, UsgsNdvi, ZonalStats};
