//! Data directory layout and per-country configuration.

use std::path::{Path, PathBuf};

use aa_common::ReportingPoint;
use serde::{Deserialize, Serialize};

use crate::error::{DataSourceError, Result};

/// Environment variable naming the data root.
pub const DATA_DIR_ENV: &str = "AA_DATA_DIR";

/// Directory used in place of an ISO3 code for global datasets.
pub const GLOBAL_DIR: &str = "glb";

/// Root of the on-disk data tree.
///
/// Files live under `<base>/<public|private>/<raw|processed>/<iso3|glb>/<module>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConfig {
    pub base: PathBuf,
}

/// Processing stage of a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Raw,
    Processed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Raw => "raw",
            Stage::Processed => "processed",
        }
    }
}

impl PathConfig {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Read the data root from `AA_DATA_DIR`.
    pub fn from_env() -> Result<Self> {
        match std::env::var(DATA_DIR_ENV) {
            Ok(val) if !val.trim().is_empty() => Ok(Self::new(val)),
            _ => Err(DataSourceError::configuration(format!(
                "{} is not set; point it at the data directory",
                DATA_DIR_ENV
            ))),
        }
    }

    /// Directory for one module of one country (or `glb` when `iso3` is `None`).
    pub fn module_dir(&self, public: bool, stage: Stage, iso3: Option<&str>, module: &str) -> PathBuf {
        self.base
            .join(if public { "public" } else { "private" })
            .join(stage.as_str())
            .join(iso3.unwrap_or(GLOBAL_DIR))
            .join(module)
    }
}

/// Country-specific settings, loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryConfig {
    pub iso3: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glofas: Option<GlofasConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usgs_ndvi: Option<UsgsNdviConfig>,
}

/// GloFAS stations for a country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlofasConfig {
    #[serde(default)]
    pub reporting_points: Vec<ReportingPoint>,
}

/// FEWS NET area used when building NDVI download URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsgsNdviConfig {
    /// Region segment of the download URL, e.g. `africa/west`.
    pub area_url: String,
    /// Filename prefix of the region's rasters, e.g. `wa`.
    pub area_prefix: String,
}

impl CountryConfig {
    /// Parse and validate a YAML configuration.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: CountryConfig = serde_yaml::from_str(yaml)?;
        config.validated()
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => {
                DataSourceError::not_found(path, "No country configuration at this path.")
            }
            _ => err.into(),
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Lowercase the ISO3 code and reject anything that is not three letters.
    pub fn validated(mut self) -> Result<Self> {
        let iso3 = self.iso3.trim().to_ascii_lowercase();
        if iso3.len() != 3 || !iso3.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DataSourceError::configuration(format!(
                "iso3 must be a three-letter code, got '{}'",
                self.iso3
            )));
        }
        self.iso3 = iso3;
        Ok(self)
    }

    /// Configured GloFAS stations; an absent section or empty list is an error.
    pub fn reporting_points(&self) -> Result<&[ReportingPoint]> {
        self.glofas
            .as_ref()
            .map(|g| g.reporting_points.as_slice())
            .filter(|points| !points.is_empty())
            .ok_or_else(|| {
                DataSourceError::configuration(
                    "The country configuration does not contain any GloFAS reporting points",
                )
            })
    }

    pub fn ndvi_area(&self) -> Result<&UsgsNdviConfig> {
        self.usgs_ndvi.as_ref().ok_or_else(|| {
            DataSourceError::configuration(
                "The country configuration does not contain a USGS NDVI area name",
            )
        })
    }
}
