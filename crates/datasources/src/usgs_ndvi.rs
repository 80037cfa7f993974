//! USGS FEWS NET eMODIS NDVI (collection 6), published per dekad.
//!
//! Rasters for a whole FEWS NET region are cached globally under
//! `public/raw/glb/usgs_ndvi/`. Zonal statistics per feature are kept in one
//! derived table per variable and feature column under
//! `public/processed/<iso3>/usgs_ndvi/`, extended incrementally.

use std::path::{Path, PathBuf};

use aa_common::{Dekad, DekadInput, DekadRange, RangePosition};
use bytes::Bytes;
use tracing::{debug, info, instrument, warn};

use crate::config::{CountryConfig, PathConfig, Stage, UsgsNdviConfig};
use crate::error::{DataSourceError, Result};
use crate::pipeline::Pipeline;
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::report::BatchReport;
use crate::schema::{ColumnSchema, StatsConfig};
use crate::table::{write_atomic, Cell, DerivedTable, Row, TableStore};

pub const MODULE_NAME: &str = "usgs_ndvi";

const BASE_URL: &str = "https://edcintl.cr.usgs.gov/downloads/sciweb1/shared/fews/web";

/// First dekad with published data.
pub const EARLIEST_DEKAD: (i32, u8) = (2002, 19);

/// NDVI products published by FEWS NET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NdviVariable {
    /// Temporally smoothed NDVI.
    Smoothed,
    /// Percent of the 2003-2017 median.
    PercentMedian,
    /// Difference from the 2003-2017 median.
    MedianAnomaly,
    /// Difference from the same dekad of the previous year.
    Difference,
}

impl NdviVariable {
    /// Name used in processed file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            NdviVariable::Smoothed => "smoothed",
            NdviVariable::PercentMedian => "percent_median",
            NdviVariable::MedianAnomaly => "median_anomaly",
            NdviVariable::Difference => "difference",
        }
    }

    fn url_segment(&self) -> &'static str {
        match self {
            NdviVariable::Smoothed => "temporallysmoothedndvi",
            NdviVariable::PercentMedian => "percentofmedian",
            NdviVariable::MedianAnomaly => "mediananomaly",
            NdviVariable::Difference => "differencepreviousyear",
        }
    }

    fn file_suffix(&self) -> &'static str {
        match self {
            NdviVariable::Smoothed => "",
            NdviVariable::PercentMedian => "pct",
            NdviVariable::MedianAnomaly => "stmdn",
            NdviVariable::Difference => "dif",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        [
            NdviVariable::Smoothed,
            NdviVariable::PercentMedian,
            NdviVariable::MedianAnomaly,
            NdviVariable::Difference,
        ]
        .into_iter()
        .find(|v| v.as_str() == s)
    }
}

/// Downloads a raster. Implementations unpack the published archive and
/// return the GeoTIFF bytes; a missing upstream file is `RemoteFetchGap`.
pub trait RasterFetcher {
    fn fetch(&self, url: &str) -> Result<Bytes>;
}

/// Opens cached rasters.
pub trait RasterReader {
    type Raster;

    fn open(&self, path: &Path) -> Result<Self::Raster>;
}

/// Statistics for one feature of one raster.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStats {
    /// Value of the feature column.
    pub feature: String,
    /// One entry per statistic then per percentile, in configured order.
    pub values: Vec<Option<f64>>,
}

/// Polygon zonal statistics over a raster.
pub trait ZonalStats<T> {
    fn compute(&self, raster: &T, feature_col: &str, stats: &StatsConfig) -> Result<Vec<FeatureStats>>;
}

/// One NDVI variable for one country over a dekad range.
pub struct UsgsNdvi<F, R, S> {
    variable: NdviVariable,
    iso3: String,
    area: UsgsNdviConfig,
    paths: PathConfig,
    range: DekadRange,
    fetcher: F,
    reader: R,
    reconciler: Reconciler<S>,
}

impl<F, R, S> UsgsNdvi<F, R, S>
where
    F: RasterFetcher,
    R: RasterReader,
    S: TableStore,
{
    /// `start` defaults to the earliest published dekad, `end` to today's.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        variable: NdviVariable,
        country: &CountryConfig,
        paths: PathConfig,
        start: Option<DekadInput>,
        end: Option<DekadInput>,
        fetcher: F,
        reader: R,
        store: S,
    ) -> Result<Self> {
        let area = country.ndvi_area()?.clone();
        let earliest = Dekad::new(EARLIEST_DEKAD.0, EARLIEST_DEKAD.1)?;
        let start = Dekad::from_input(start, earliest.into())?;
        let end = Dekad::from_input(end, Dekad::today().into())?;
        if start < earliest {
            warn!(
                start = %start,
                earliest = %earliest,
                "Start date is before the earliest date data is available"
            );
        }
        Ok(Self {
            variable,
            iso3: country.iso3.clone(),
            area,
            paths,
            range: DekadRange::new(start, end),
            fetcher,
            reader,
            reconciler: Reconciler::new(store),
        })
    }

    pub fn range(&self) -> &DekadRange {
        &self.range
    }

    pub fn variable(&self) -> NdviVariable {
        self.variable
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.paths.module_dir(true, Stage::Raw, None, MODULE_NAME)
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.paths
            .module_dir(true, Stage::Processed, Some(&self.iso3), MODULE_NAME)
    }

    /// Local files keep the full year: `<prefix><YYYY>_<DD><suffix>`.
    /// Upstream files use a two-digit year: `<prefix><YY><DD><suffix>`.
    pub fn raw_filename(&self, dekad: &Dekad, local: bool) -> String {
        let year = if local {
            format!("{:04}_", dekad.year())
        } else {
            format!("{:02}", dekad.year() - 2000)
        };
        format!(
            "{}{}{:02}{}",
            self.area.area_prefix,
            year,
            dekad.dekad(),
            self.variable.file_suffix()
        )
    }

    pub fn raw_path(&self, dekad: &Dekad) -> PathBuf {
        self.raw_dir()
            .join(format!("{}.tif", self.raw_filename(dekad, true)))
    }

    pub fn url(&self, dekad: &Dekad) -> String {
        format!(
            "{}/{}/dekadal/emodis/ndvi_c6/{}/downloads/dekadal/{}.zip",
            BASE_URL,
            self.area.area_url,
            self.variable.url_segment(),
            self.raw_filename(dekad, false)
        )
    }

    pub fn processed_path(&self, feature_col: &str) -> PathBuf {
        processed_table_path(&self.paths, &self.iso3, self.variable, feature_col)
    }

    /// Fetch every dekad in the range. Dekads without upstream data are skipped.
    pub fn download(&self, clobber: bool) -> BatchReport<Dekad> {
        self.acquire(clobber)
    }

    /// Open the cached raster for one dekad.
    pub fn load_raster(&self, dekad: &Dekad) -> Result<R::Raster> {
        let path = self.raw_path(dekad);
        if !path.is_file() {
            let hint = match self.range.position_of(dekad) {
                RangePosition::After => format!(
                    "The requested dekad {} is greater than the instance end dekad {}. \
                     Calling `download()` will not fetch this file; create a new instance \
                     covering it.",
                    dekad, self.range.end
                ),
                RangePosition::Before => format!(
                    "The requested dekad {} is less than the instance start dekad {}. \
                     Calling `download()` will not fetch this file; create a new instance \
                     covering it.",
                    dekad, self.range.start
                ),
                RangePosition::Inside => format!(
                    "Make sure that you have called `download()` and that {} exists in {}.",
                    path.file_name().and_then(|n| n.to_str()).unwrap_or_default(),
                    self.raw_dir().display()
                ),
            };
            return Err(DataSourceError::not_found(path, hint));
        }
        self.reader.open(&path)
    }

    /// Compute zonal statistics for every dekad not yet in the table.
    ///
    /// With `overwrite`, dekads in range are recomputed, and a table with
    /// different columns is replaced instead of rejected.
    #[instrument(skip(self, zonal, stats), fields(variable = self.variable.as_str()))]
    pub fn process<Z>(
        &self,
        zonal: &Z,
        feature_col: &str,
        stats: &StatsConfig,
        overwrite: bool,
    ) -> Result<ReconcileOutcome>
    where
        Z: ZonalStats<R::Raster>,
    {
        stats.validate().map_err(DataSourceError::configuration)?;
        let schema = ColumnSchema::expected(stats, feature_col);
        let path = self.processed_path(feature_col);

        self.reconciler
            .process(&path, &self.range, overwrite, &schema, |dekad| {
                let raster = match self.load_raster(&dekad) {
                    Err(DataSourceError::ArtifactNotFound { path, .. }) => {
                        return Err(DataSourceError::RemoteFetchGap(format!(
                            "dekad {} (no raster at {})",
                            dekad,
                            path.display()
                        )))
                    }
                    other => other?,
                };
                let features = zonal.compute(&raster, feature_col, stats)?;
                Ok(features
                    .into_iter()
                    .map(|f| {
                        let mut values: Vec<Cell> = f.values.into_iter().map(Cell::from).collect();
                        values.push(Cell::Text(f.feature));
                        Row::new(dekad, values)
                    })
                    .collect())
            })
    }

    /// Read the processed table, keeping only dekads in this instance's range.
    pub fn load(&self, feature_col: &str) -> Result<DerivedTable> {
        let path = self.processed_path(feature_col);
        let mut table = self.reconciler.store().read(&path)?.ok_or_else(|| {
            DataSourceError::not_found(
                &path,
                "Make sure that you have already called `process()` for this feature column.",
            )
        })?;
        table.retain_range(&self.range);
        Ok(table)
    }
}

impl<F, R, S> Pipeline for UsgsNdvi<F, R, S>
where
    F: RasterFetcher,
    R: RasterReader,
    S: TableStore,
{
    type Unit = Dekad;

    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn units(&self) -> Vec<Dekad> {
        self.range.iter().collect()
    }

    fn acquire_unit(&self, dekad: &Dekad, overwrite: bool) -> Result<PathBuf> {
        let path = self.raw_path(dekad);
        if !overwrite && path.exists() {
            debug!(path = %path.display(), "Raster already downloaded, skipping");
            return Ok(path);
        }
        let url = self.url(dekad);
        debug!(url = %url, "Fetching NDVI raster");
        let bytes = self.fetcher.fetch(&url)?;
        write_atomic(&path, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "Downloaded NDVI raster");
        Ok(path)
    }
}

/// `<iso3>_usgs_ndvi_<variable>_<feature_col>.json` in the country's
/// processed directory.
pub fn processed_table_path(
    paths: &PathConfig,
    iso3: &str,
    variable: NdviVariable,
    feature_col: &str,
) -> PathBuf {
    paths
        .module_dir(true, Stage::Processed, Some(iso3), MODULE_NAME)
        .join(format!(
            "{}_usgs_ndvi_{}_{}.json",
            iso3,
            variable.as_str(),
            feature_col
        ))
}

/// Recover the dekad from a local raster name such as `wa2020_05.tif`.
pub fn dekad_from_filename(path: &Path) -> Option<Dekad> {
    let stem = path.file_stem()?.to_str()?.as_bytes();
    stem.windows(7).find_map(|w| {
        let digits = |s: &[u8]| s.iter().all(u8::is_ascii_digit);
        if !(digits(&w[..4]) && w[4] == b'_' && digits(&w[5..])) {
            return None;
        }
        let text = std::str::from_utf8(w).ok()?;
        let year = text[..4].parse().ok()?;
        let dekad = text[5..].parse().ok()?;
        Dekad::new(year, dekad).ok()
    })
}
