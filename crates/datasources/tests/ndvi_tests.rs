//! USGS NDVI download and incremental processing with fake rasters.
//!
//! The fake "rasters" are the downloaded URL bytes; the reader recovers the
//! dekad from the file name and the zonal statistics derive every value
//! from that dekad, so each row is traceable.

use std::cell::Cell as Counter;
use std::path::Path;

use aa_common::{Dekad, DekadInput};
use bytes::Bytes;
use datasources::usgs_ndvi::dekad_from_filename;
use datasources::{
    Cell, ColumnSchema, CountryConfig, DataSourceError, FeatureStats, JsonTableStore, NdviVariable,
    PathConfig, PeriodOutcome, Pipeline, PlanAction, RasterFetcher, RasterReader, StatsConfig, UsgsNdvi,
    ZonalStats,
};
use test_utils::fixtures;
use test_utils::temp_data_dir;

const FEATURE_COL: &str = "ADM2";

// ============================================================================
// Fakes
// ============================================================================

/// Serves every URL except those containing one of `missing`.
#[derive(Default)]
struct FakeFetcher {
    missing: Vec<&'static str>,
    calls: Counter<usize>,
}

impl FakeFetcher {
    fn with_gaps(missing: Vec<&'static str>) -> Self {
        Self {
            missing,
            calls: Counter::new(0),
        }
    }
}

impl RasterFetcher for &FakeFetcher {
    fn fetch(&self, url: &str) -> datasources::Result<Bytes> {
        self.calls.set(self.calls.get() + 1);
        if self.missing.iter().any(|m| url.contains(m)) {
            return Err(DataSourceError::RemoteFetchGap(url.to_string()));
        }
        Ok(Bytes::from(url.to_string()))
    }
}

struct DekadReader;

impl RasterReader for DekadReader {
    type Raster = Dekad;

    fn open(&self, path: &Path) -> datasources::Result<Dekad> {
        dekad_from_filename(path)
            .ok_or_else(|| DataSourceError::configuration(format!("unexpected raster {}", path.display())))
    }
}

/// Two features, values `offset + dekad * 10 + column`.
struct FakeZonal {
    offset: f64,
    fail_on: Option<u8>,
    calls: Counter<usize>,
}

impl FakeZonal {
    fn new(offset: f64) -> Self {
        Self {
            offset,
            fail_on: None,
            calls: Counter::new(0),
        }
    }
}

impl ZonalStats<Dekad> for FakeZonal {
    fn compute(
        &self,
        raster: &Dekad,
        _feature_col: &str,
        stats: &StatsConfig,
    ) -> datasources::Result<Vec<FeatureStats>> {
        self.calls.set(self.calls.get() + 1);
        if self.fail_on == Some(raster.dekad()) {
            return Err(DataSourceError::remote("corrupt raster"));
        }
        Ok(["A", "B"]
            .iter()
            .map(|feature| FeatureStats {
                feature: feature.to_string(),
                values: (0..stats.value_count())
                    .map(|c| Some(self.offset + f64::from(raster.dekad()) * 10.0 + c as f64))
                    .collect(),
            })
            .collect())
    }
}

type TestNdvi<'a> = UsgsNdvi<&'a FakeFetcher, DekadReader, JsonTableStore>;

fn ndvi<'a>(root: &Path, fetcher: &'a FakeFetcher, start: (i32, u8), end: (i32, u8)) -> TestNdvi<'a> {
    let country = CountryConfig::from_yaml_str(fixtures::COUNTRY_CONFIG_YAML).unwrap();
    UsgsNdvi::new(
        NdviVariable::PercentMedian,
        &country,
        PathConfig::new(root),
        Some(DekadInput::from(start)),
        Some(DekadInput::from(end)),
        fetcher,
        DekadReader,
        JsonTableStore,
    )
    .unwrap()
}

fn d(year: i32, dekad: u8) -> Dekad {
    Dekad::new(year, dekad).unwrap()
}

fn first_value(cell: &Cell) -> f64 {
    match cell {
        Cell::Number(v) => *v,
        other => panic!("expected a number, got {other:?}"),
    }
}

// ============================================================================
// Naming
// ============================================================================

#[test]
fn test_url_and_paths() {
    let dir = temp_data_dir();
    let fetcher = FakeFetcher::default();
    let ndvi = ndvi(dir.path(), &fetcher, (2020, 1), (2020, 4));

    assert_eq!(
        ndvi.url(&d(2020, 5)),
        "https://edcintl.cr.usgs.gov/downloads/sciweb1/shared/fews/web/africa/west/dekadal/\
         emodis/ndvi_c6/percentofmedian/downloads/dekadal/wa2005pct.zip"
    );
    assert_eq!(
        ndvi.raw_path(&d(2020, 5)),
        dir.path().join("public/raw/glb/usgs_ndvi/wa2020_05pct.tif")
    );
    assert_eq!(
        ndvi.processed_path(FEATURE_COL),
        dir.path().join("public/processed/abc/usgs_ndvi/abc_usgs_ndvi_percent_median_ADM2.json")
    );
    assert_eq!(dekad_from_filename(&ndvi.raw_path(&d(2003, 36))), Some(d(2003, 36)));
}

#[test]
fn test_missing_ndvi_area() {
    let dir = temp_data_dir();
    let fetcher = FakeFetcher::default();
    let bare = CountryConfig::from_yaml_str(fixtures::BARE_COUNTRY_CONFIG_YAML).unwrap();
    let result = UsgsNdvi::new(
        NdviVariable::Smoothed,
        &bare,
        PathConfig::new(dir.path()),
        None,
        None,
        &fetcher,
        DekadReader,
        JsonTableStore,
    );
    assert!(matches!(result, Err(DataSourceError::Validation(_))));
}

#[test]
fn test_default_start_is_earliest_dekad() {
    let dir = temp_data_dir();
    let fetcher = FakeFetcher::default();
    let country = CountryConfig::from_yaml_str(fixtures::COUNTRY_CONFIG_YAML).unwrap();
    let ndvi = UsgsNdvi::new(
        NdviVariable::Smoothed,
        &country,
        PathConfig::new(dir.path()),
        None,
        Some(DekadInput::from((2004, 18))),
        &fetcher,
        DekadReader,
        JsonTableStore,
    )
    .unwrap();
    assert_eq!(ndvi.range().start, d(2002, 19));
    assert_eq!(ndvi.range().len(), 72);
}

// ============================================================================
// Download
// ============================================================================

#[test]
fn test_download_skips_gaps() {
    let dir = temp_data_dir();
    let fetcher = FakeFetcher::with_gaps(vec!["wa2003pct"]);
    let ndvi = ndvi(dir.path(), &fetcher, (2020, 1), (2020, 4));

    let report = ndvi.download(false);
    assert_eq!(report.len(), 4);
    assert_eq!(report.succeeded(), 3);
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.failed(), 0);
    assert!(matches!(report.outcome(&d(2020, 3)), Some(PeriodOutcome::Skipped(_))));
    assert!(!ndvi.raw_path(&d(2020, 3)).exists());

    let contents = std::fs::read(ndvi.raw_path(&d(2020, 2))).unwrap();
    assert_eq!(contents, ndvi.url(&d(2020, 2)).into_bytes());

    // cached files are not fetched again; the gap is retried
    ndvi.download(false);
    assert_eq!(fetcher.calls.get(), 5);

    ndvi.download(true);
    assert_eq!(fetcher.calls.get(), 9);
}

#[test]
fn test_fetch_gap_passes_through_acquire_unit() {
    let dir = temp_data_dir();
    let fetcher = FakeFetcher::with_gaps(vec!["wa2003pct"]);
    let ndvi = ndvi(dir.path(), &fetcher, (2020, 1), (2020, 4));

    let err = ndvi.acquire_unit(&d(2020, 3), false).unwrap_err();
    assert!(err.is_period_gap());
    let expected = err.to_string();

    let report = ndvi.download(false);
    match report.outcome(&d(2020, 3)) {
        Some(PeriodOutcome::Skipped(reason)) => assert_eq!(reason, &expected),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

// ============================================================================
// Processing
// ============================================================================

#[test]
fn test_process_skips_missing_rasters() {
    let dir = temp_data_dir();
    let fetcher = FakeFetcher::with_gaps(vec!["wa2003pct"]);
    let ndvi = ndvi(dir.path(), &fetcher, (2020, 1), (2020, 4));
    ndvi.download(false);

    let zonal = FakeZonal::new(0.0);
    let outcome = ndvi
        .process(&zonal, FEATURE_COL, &StatsConfig::default(), false)
        .unwrap();
    assert_eq!(outcome.action, PlanAction::Create);
    assert_eq!(outcome.report.succeeded(), 3);
    assert_eq!(outcome.report.skipped(), 1);

    let table = ndvi.load(FEATURE_COL).unwrap();
    assert_eq!(table.len(), 6);
    assert!(!table.contains_period(&d(2020, 3)));
    assert_eq!(
        table.schema.names(),
        vec!["mean", "std", "min", "max", "sum", "count", FEATURE_COL]
    );

    let row = &table.rows[2];
    assert_eq!((row.year, row.dekad), (2020, 2));
    assert_eq!(row.date.to_string(), "2020-01-11");
    assert_eq!(first_value(&row.values[0]), 20.0);
    assert_eq!(first_value(&row.values[5]), 25.0);
    assert_eq!(row.values[6], Cell::Text("A".to_string()));
}

#[test]
fn test_process_is_idempotent() {
    let dir = temp_data_dir();
    let fetcher = FakeFetcher::default();
    let ndvi = ndvi(dir.path(), &fetcher, (2020, 1), (2020, 3));
    ndvi.download(false);

    let zonal = FakeZonal::new(0.0);
    let stats = StatsConfig::default();
    ndvi.process(&zonal, FEATURE_COL, &stats, false).unwrap();
    let path = ndvi.processed_path(FEATURE_COL);
    let first = std::fs::read(&path).unwrap();
    assert_eq!(zonal.calls.get(), 3);

    let outcome = ndvi.process(&zonal, FEATURE_COL, &stats, false).unwrap();
    assert_eq!(outcome.action, PlanAction::UpToDate);
    assert!(outcome.report.is_empty());
    assert_eq!(zonal.calls.get(), 3);
    assert_eq!(std::fs::read(&path).unwrap(), first);
}

#[test]
fn test_process_appends_new_dekads() {
    let dir = temp_data_dir();
    let fetcher = FakeFetcher::default();
    let stats = StatsConfig::default();

    let early = ndvi(dir.path(), &fetcher, (2020, 35), (2020, 36));
    early.download(false);
    early.process(&FakeZonal::new(0.0), FEATURE_COL, &stats, false).unwrap();

    let later = ndvi(dir.path(), &fetcher, (2020, 35), (2021, 2));
    later.download(false);
    let zonal = FakeZonal::new(0.0);
    let outcome = later.process(&zonal, FEATURE_COL, &stats, false).unwrap();
    assert_eq!(outcome.action, PlanAction::Append);
    assert_eq!(zonal.calls.get(), 2);

    let table = later.load(FEATURE_COL).unwrap();
    let periods: Vec<(i32, u8)> = table.rows.iter().map(|r| (r.year, r.dekad)).collect();
    assert_eq!(
        periods,
        vec![
            (2020, 35),
            (2020, 35),
            (2020, 36),
            (2020, 36),
            (2021, 1),
            (2021, 1),
            (2021, 2),
            (2021, 2)
        ]
    );
}

#[test]
fn test_overwrite_recomputes_sub_range() {
    let dir = temp_data_dir();
    let fetcher = FakeFetcher::default();
    let stats = StatsConfig::default();

    let full = ndvi(dir.path(), &fetcher, (2020, 1), (2020, 6));
    full.download(false);
    full.process(&FakeZonal::new(0.0), FEATURE_COL, &stats, false).unwrap();
    assert_eq!(full.load(FEATURE_COL).unwrap().len(), 12);

    let part = ndvi(dir.path(), &fetcher, (2020, 3), (2020, 4));
    let zonal = FakeZonal::new(1000.0);
    let outcome = part.process(&zonal, FEATURE_COL, &stats, true).unwrap();
    assert_eq!(outcome.action, PlanAction::Replace { removed: 4 });
    assert_eq!(zonal.calls.get(), 2);

    let table = full.load(FEATURE_COL).unwrap();
    assert_eq!(table.len(), 12 - 4 + 4);
    for row in &table.rows {
        let expected = if (3..=4).contains(&row.dekad) { 1000.0 } else { 0.0 };
        assert_eq!(first_value(&row.values[0]), expected + f64::from(row.dekad) * 10.0);
    }
    let dekads: Vec<u8> = table.rows.iter().map(|r| r.dekad).collect();
    assert_eq!(dekads, vec![1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6]);
}

#[test]
fn test_overwrite_keeps_rows_of_missing_raster() {
    let dir = temp_data_dir();
    let fetcher = FakeFetcher::default();
    let stats = StatsConfig::default();
    let ndvi = ndvi(dir.path(), &fetcher, (2020, 1), (2020, 4));
    ndvi.download(false);
    ndvi.process(&FakeZonal::new(0.0), FEATURE_COL, &stats, false).unwrap();
    std::fs::remove_file(ndvi.raw_path(&d(2020, 3))).unwrap();

    let outcome = ndvi
        .process(&FakeZonal::new(1000.0), FEATURE_COL, &stats, true)
        .unwrap();
    assert_eq!(outcome.action, PlanAction::Replace { removed: 8 });
    assert_eq!(outcome.report.succeeded(), 3);
    assert_eq!(outcome.report.skipped(), 1);

    let table = ndvi.load(FEATURE_COL).unwrap();
    assert_eq!(table.len(), 8);
    for row in &table.rows {
        let offset = if row.dekad == 3 { 0.0 } else { 1000.0 };
        assert_eq!(first_value(&row.values[0]), offset + f64::from(row.dekad) * 10.0);
    }
    let dekads: Vec<u8> = table.rows.iter().map(|r| r.dekad).collect();
    assert_eq!(dekads, vec![1, 1, 2, 2, 3, 3, 4, 4]);
}

#[test]
fn test_schema_mismatch() {
    let dir = temp_data_dir();
    let fetcher = FakeFetcher::default();
    let ndvi = ndvi(dir.path(), &fetcher, (2020, 1), (2020, 2));
    ndvi.download(false);
    ndvi.process(&FakeZonal::new(0.0), FEATURE_COL, &StatsConfig::default(), false)
        .unwrap();
    let path = ndvi.processed_path(FEATURE_COL);
    let before = std::fs::read(&path).unwrap();

    let with_percentiles = StatsConfig::default().with_percentiles(vec![90, 10]);
    let err = ndvi
        .process(&FakeZonal::new(0.0), FEATURE_COL, &with_percentiles, false)
        .unwrap_err();
    assert!(matches!(err, DataSourceError::SchemaMismatch { .. }));
    assert!(err.to_string().contains("overwrite"));
    assert_eq!(std::fs::read(&path).unwrap(), before);

    let outcome = ndvi
        .process(&FakeZonal::new(0.0), FEATURE_COL, &with_percentiles, true)
        .unwrap();
    assert!(matches!(outcome.action, PlanAction::Discard { .. }));
    let table = ndvi.load(FEATURE_COL).unwrap();
    assert_eq!(table.schema, ColumnSchema::expected(&with_percentiles, FEATURE_COL));
    assert_eq!(table.len(), 4);
    assert_eq!(table.rows[0].values.len(), 9);
}

#[test]
fn test_process_aborts_on_failure() {
    let dir = temp_data_dir();
    let fetcher = FakeFetcher::default();
    let ndvi = ndvi(dir.path(), &fetcher, (2020, 1), (2020, 3));
    ndvi.download(false);

    let zonal = FakeZonal {
        fail_on: Some(2),
        ..FakeZonal::new(0.0)
    };
    let err = ndvi
        .process(&zonal, FEATURE_COL, &StatsConfig::default(), false)
        .unwrap_err();
    assert!(matches!(err, DataSourceError::Remote(_)));
    assert!(!ndvi.processed_path(FEATURE_COL).exists());
}

#[test]
fn test_process_rejects_invalid_stats() {
    let dir = temp_data_dir();
    let fetcher = FakeFetcher::default();
    let ndvi = ndvi(dir.path(), &fetcher, (2020, 1), (2020, 1));
    let stats = StatsConfig::default().with_percentiles(vec![101]);
    assert!(matches!(
        ndvi.process(&FakeZonal::new(0.0), FEATURE_COL, &stats, false),
        Err(DataSourceError::Validation(_))
    ));
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_raster_hints() {
    let dir = temp_data_dir();
    let fetcher = FakeFetcher::default();
    let ndvi = ndvi(dir.path(), &fetcher, (2020, 1), (2020, 4));

    let hint = |dekad: Dekad| match ndvi.load_raster(&dekad) {
        Err(DataSourceError::ArtifactNotFound { hint, .. }) => hint,
        other => panic!("expected a missing raster, got {other:?}"),
    };
    assert!(hint(d(2020, 6)).contains("greater than the instance end dekad 2020-d04"));
    assert!(hint(d(2019, 36)).contains("less than the instance start dekad 2020-d01"));
    let inside = hint(d(2020, 2));
    assert!(inside.contains("download()"));
    assert!(inside.contains("wa2020_02pct.tif"));

    ndvi.download(false);
    assert_eq!(ndvi.load_raster(&d(2020, 2)).unwrap(), d(2020, 2));
}

#[test]
fn test_load_filters_to_range() {
    let dir = temp_data_dir();
    let fetcher = FakeFetcher::default();

    let narrow = ndvi(dir.path(), &fetcher, (2020, 2), (2020, 3));
    assert!(matches!(
        narrow.load(FEATURE_COL),
        Err(DataSourceError::ArtifactNotFound { .. })
    ));

    let full = ndvi(dir.path(), &fetcher, (2020, 1), (2020, 6));
    full.download(false);
    full.process(&FakeZonal::new(0.0), FEATURE_COL, &StatsConfig::default(), false)
        .unwrap();

    let table = narrow.load(FEATURE_COL).unwrap();
    assert_eq!(table.len(), 4);
    assert!(table
        .rows
        .iter()
        .all(|r| narrow.range().contains(&r.period().unwrap())));
}
