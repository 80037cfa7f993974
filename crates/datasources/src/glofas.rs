//! GloFAS river discharge from the Copernicus Climate Data Store.
//!
//! Raw archives are requested per year (optionally per month), cached under
//! `public/raw/<iso3>/glofas/<dataset>/`, and reduced to one discharge series
//! per reporting point in `public/processed/<iso3>/glofas/`.

use std::fmt;
use std::path::{Path, PathBuf};

use aa_common::GeoBoundingBox;
use grid_processor::{assemble_ensemble, extract_points, GridPart, PointSeriesTable, RawGrid};
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::config::{CountryConfig, PathConfig, Stage};
use crate::error::{DataSourceError, Result};
use crate::pipeline::Pipeline;
use crate::report::BatchReport;
use crate::table::write_json_atomic;

pub const MODULE_NAME: &str = "glofas";
const HYDROLOGICAL_MODEL: &str = "lisflood";
const RIVER_DISCHARGE_VARIABLE: &str = "river_discharge_in_the_last_24_hours";

/// Retrieves a dataset from the CDS into a local file.
pub trait CdsClient {
    fn retrieve(&self, dataset: &str, request: &Value, target: &Path) -> Result<()>;
}

/// Decodes downloaded archives into grids.
///
/// All files of one product are read together and concatenated along time.
pub trait GridReader {
    fn read_grid(&self, paths: &[PathBuf], part: GridPart) -> Result<RawGrid>;
}

/// GloFAS products available from the CDS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlofasProduct {
    Reanalysis,
    Forecast,
    Reforecast,
}

impl GlofasProduct {
    pub fn cds_name(&self) -> &'static str {
        match self {
            GlofasProduct::Reanalysis => "cems-glofas-historical",
            GlofasProduct::Forecast => "cems-glofas-forecast",
            GlofasProduct::Reforecast => "cems-glofas-reforecast",
        }
    }

    pub fn system_version(&self) -> &'static str {
        match self {
            GlofasProduct::Forecast => "operational",
            _ => "version_3_1",
        }
    }

    fn dataset_key(&self) -> &'static str {
        match self {
            GlofasProduct::Reanalysis => "dataset",
            _ => "product_type",
        }
    }

    fn dataset_values(&self) -> &'static [&'static str] {
        match self {
            GlofasProduct::Reanalysis => &["consolidated_reanalysis"],
            GlofasProduct::Forecast => &["control_forecast", "ensemble_perturbed_forecasts"],
            GlofasProduct::Reforecast => &["control_reforecast", "ensemble_perturbed_reforecasts"],
        }
    }

    /// Historical products prefix their date keys with `h`.
    fn date_prefix(&self) -> &'static str {
        match self {
            GlofasProduct::Forecast => "",
            _ => "h",
        }
    }

    /// First and last year the product is published for.
    pub fn year_window(&self) -> (i32, i32) {
        match self {
            GlofasProduct::Reanalysis => (1979, 2022),
            GlofasProduct::Forecast => (2021, 2022),
            GlofasProduct::Reforecast => (1999, 2018),
        }
    }

    /// Ensemble products carry a control run plus perturbed members.
    pub fn is_ensemble(&self) -> bool {
        !matches!(self, GlofasProduct::Reanalysis)
    }
}

/// Which slice of a product to fetch and process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlofasOptions {
    pub year_min: i32,
    pub year_max: i32,
    /// Maximum lead time in days; forecast products only.
    pub leadtime_max: Option<u32>,
    /// Request one archive per month instead of per year.
    pub split_by_month: bool,
}

impl GlofasOptions {
    /// The product's full year window, without lead time.
    pub fn for_product(product: GlofasProduct) -> Self {
        let (year_min, year_max) = product.year_window();
        Self {
            year_min,
            year_max,
            leadtime_max: None,
            split_by_month: false,
        }
    }

    pub fn years(mut self, year_min: i32, year_max: i32) -> Self {
        self.year_min = year_min;
        self.year_max = year_max;
        self
    }

    pub fn leadtime_max(mut self, days: u32) -> Self {
        self.leadtime_max = Some(days);
        self
    }

    pub fn split_by_month(mut self) -> Self {
        self.split_by_month = true;
        self
    }
}

/// One raw archive: a year, or a month of a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlofasRequest {
    pub year: i32,
    pub month: Option<u32>,
}

impl fmt::Display for GlofasRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month {
            Some(month) => write!(f, "{}-{:02}", self.year, month),
            None => write!(f, "{}", self.year),
        }
    }
}

/// A GloFAS product for one country and bounding box.
pub struct Glofas<C, R> {
    product: GlofasProduct,
    country: CountryConfig,
    bbox: GeoBoundingBox,
    paths: PathConfig,
    options: GlofasOptions,
    client: C,
    reader: R,
}

impl<C: CdsClient, R: GridReader> Glofas<C, R> {
    /// Set up a product. The bounding box is snapped to GloFAS cell centres
    /// and years partly outside the product's window are clamped. A request
    /// with no year inside the window is a configuration error.
    pub fn new(
        product: GlofasProduct,
        country: CountryConfig,
        bbox: GeoBoundingBox,
        paths: PathConfig,
        mut options: GlofasOptions,
        client: C,
        reader: R,
    ) -> Result<Self> {
        if options.year_min > options.year_max {
            return Err(DataSourceError::configuration(format!(
                "year_min {} is after year_max {}",
                options.year_min, options.year_max
            )));
        }
        match options.leadtime_max {
            Some(_) if !product.is_ensemble() => {
                return Err(DataSourceError::configuration(format!(
                    "{} has no lead times",
                    product.cds_name()
                )))
            }
            Some(0) => return Err(DataSourceError::configuration("leadtime_max must be at least 1 day")),
            _ => {}
        }

        let (first, last) = product.year_window();
        if options.year_max < first || options.year_min > last {
            return Err(DataSourceError::configuration(format!(
                "{} covers {}-{}, requested {}-{}",
                product.cds_name(),
                first,
                last,
                options.year_min,
                options.year_max
            )));
        }
        if options.year_min < first || options.year_max > last {
            warn!(
                dataset = product.cds_name(),
                year_min = options.year_min,
                year_max = options.year_max,
                available_from = first,
                available_to = last,
                "Requested years are outside the available range and will be clamped"
            );
            options.year_min = options.year_min.clamp(first, last);
            options.year_max = options.year_max.clamp(first, last);
        }

        Ok(Self {
            product,
            country,
            bbox: bbox.normalized(),
            paths,
            options,
            client,
            reader,
        })
    }

    pub fn product(&self) -> GlofasProduct {
        self.product
    }

    pub fn bbox(&self) -> &GeoBoundingBox {
        &self.bbox
    }

    pub fn options(&self) -> &GlofasOptions {
        &self.options
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.paths
            .module_dir(true, Stage::Raw, Some(&self.country.iso3), MODULE_NAME)
            .join(self.product.cds_name())
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.paths
            .module_dir(true, Stage::Processed, Some(&self.country.iso3), MODULE_NAME)
    }

    fn leadtime_suffix(&self) -> String {
        self.options
            .leadtime_max
            .map(|days| format!("_ltmax{:02}d", days))
            .unwrap_or_default()
    }

    /// `<iso3>_<dataset>_<year>[-MM][_ltmaxNNd]_<bbox>.grib`
    pub fn raw_path(&self, request: &GlofasRequest) -> PathBuf {
        let month = request
            .month
            .map(|m| format!("-{:02}", m))
            .unwrap_or_default();
        self.raw_dir().join(format!(
            "{}_{}_{}{}{}_{}.grib",
            self.country.iso3,
            self.product.cds_name(),
            request.year,
            month,
            self.leadtime_suffix(),
            self.bbox.compact_encoding()
        ))
    }

    /// `<iso3>_<dataset>[_ltmaxNNd]_<bbox>.json`
    pub fn processed_path(&self) -> PathBuf {
        self.processed_dir().join(format!(
            "{}_{}{}_{}.json",
            self.country.iso3,
            self.product.cds_name(),
            self.leadtime_suffix(),
            self.bbox.compact_encoding()
        ))
    }

    /// CDS request body for one archive.
    pub fn query(&self, request: &GlofasRequest) -> Value {
        let prefix = self.product.date_prefix();
        let two_digits = |range: std::ops::RangeInclusive<u32>| -> Vec<String> {
            range.map(|n| format!("{:02}", n)).collect()
        };

        let mut query = Map::new();
        query.insert("variable".into(), json!(RIVER_DISCHARGE_VARIABLE));
        query.insert("format".into(), json!("grib"));
        query.insert(self.product.dataset_key().into(), json!(self.product.dataset_values()));
        query.insert(format!("{}year", prefix), json!(request.year.to_string()));
        query.insert(
            format!("{}month", prefix),
            match request.month {
                Some(month) => json!(format!("{:02}", month)),
                None => json!(two_digits(1..=12)),
            },
        );
        query.insert(format!("{}day", prefix), json!(two_digits(1..=31)));
        query.insert("geo_bounding_box".into(), json!(self.bbox.cds_area()));
        query.insert("system_version".into(), json!(self.product.system_version()));
        query.insert("hydrological_model".into(), json!(HYDROLOGICAL_MODEL));
        if let Some(days) = self.options.leadtime_max {
            let hours: Vec<String> = (1..=days).map(|d| (d * 24).to_string()).collect();
            query.insert("leadtime_hour".into(), json!(hours));
        }
        Value::Object(query)
    }

    /// Fetch every archive in the selected years.
    ///
    /// With `use_cache`, archives already on disk are not requested again.
    pub fn download(&self, use_cache: bool) -> BatchReport<GlofasRequest> {
        self.acquire(!use_cache)
    }

    /// Merge the raw archives and extract the reporting point series.
    ///
    /// Any existing processed file is replaced.
    #[instrument(skip(self), fields(dataset = self.product.cds_name()))]
    pub fn process(&self) -> Result<PathBuf> {
        let points = self.country.reporting_points()?;

        let mut raw_paths = Vec::new();
        for request in self.units() {
            let path = self.raw_path(&request);
            if !path.is_file() {
                return Err(DataSourceError::not_found(
                    path,
                    "Make sure that you have called the `download()` method first.",
                ));
            }
            raw_paths.push(path);
        }

        let grid = if self.product.is_ensemble() {
            let control = self.reader.read_grid(&raw_paths, GridPart::Control)?;
            let perturbed = self.reader.read_grid(&raw_paths, GridPart::Perturbed)?;
            assemble_ensemble(control, perturbed)?.into_inner()
        } else {
            self.reader.read_grid(&raw_paths, GridPart::Single)?
        };

        let table = extract_points(&grid, points)?;
        let path = self.processed_path();
        write_json_atomic(&path, &table)?;
        info!(path = %path.display(), points = table.series.len(), "Wrote processed GloFAS file");
        Ok(path)
    }

    /// Read the processed reporting point series.
    pub fn load(&self) -> Result<PointSeriesTable> {
        let path = self.processed_path();
        let bytes = std::fs::read(&path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => DataSourceError::not_found(
                &path,
                "Make sure that you have already called the `process()` method.",
            ),
            _ => err.into(),
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl<C: CdsClient, R: GridReader> Pipeline for Glofas<C, R> {
    type Unit = GlofasRequest;

    fn name(&self) -> &str {
        self.product.cds_name()
    }

    fn units(&self) -> Vec<GlofasRequest> {
        let mut units = Vec::new();
        for year in self.options.year_min..=self.options.year_max {
            if self.options.split_by_month {
                units.extend((1..=12).map(|m| GlofasRequest {
                    year,
                    month: Some(m),
                }));
            } else {
                units.push(GlofasRequest { year, month: None });
            }
        }
        units
    }

    fn acquire_unit(&self, request: &GlofasRequest, overwrite: bool) -> Result<PathBuf> {
        let path = self.raw_path(request);
        if !overwrite && path.exists() {
            debug!(path = %path.display(), "Raw file already cached, skipping");
            return Ok(path);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let query = self.query(request);
        debug!(path = %path.display(), query = %query, "Querying CDS");
        self.client.retrieve(self.product.cds_name(), &query, &path)?;
        info!(path = %path.display(), "Downloaded raw GloFAS file");
        Ok(path)
    }
}
