//! Subcommand implementations.
//!
//! Each command returns a serializable report; `main` decides whether to
//! print it as text or JSON.

use std::fmt;
use std::path::{Path, PathBuf};

use aa_common::{Dekad, DekadInput, DekadRange, GeoBoundingBox};
use anyhow::{anyhow, Context, Result};
use datasources::usgs_ndvi::processed_table_path;
use datasources::{
    plan, ColumnSchema, CountryConfig, JsonTableStore, NdviVariable, PathConfig, PlanAction,
    Statistic, StatsConfig, TableStore,
};
use serde::Serialize;
use tracing::{debug, info};

/// One dekad of an expanded range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DekadRow {
    pub label: String,
    pub year: i32,
    pub dekad: u8,
    pub start_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DekadList {
    pub dekads: Vec<DekadRow>,
}

impl fmt::Display for DekadList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.dekads {
            writeln!(f, "{}\t{}", row.label, row.start_date)?;
        }
        write!(f, "{} dekads", self.dekads.len())
    }
}

/// Expand `start..=end`; `end` defaults to the current dekad.
pub fn list_dekads(start: DekadInput, end: Option<DekadInput>) -> Result<DekadList> {
    let start = start.resolve().context("Invalid start dekad")?;
    let end = Dekad::from_input(end, Dekad::today().into()).context("Invalid end dekad")?;
    let dekads = DekadRange::new(start, end)
        .iter()
        .map(|d| DekadRow {
            label: d.to_string(),
            year: d.year(),
            dekad: d.dekad(),
            start_date: d.to_date().to_string(),
        })
        .collect();
    Ok(DekadList { dekads })
}

/// A bounding box snapped to GloFAS cell centres.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BboxReport {
    pub requested: GeoBoundingBox,
    pub normalized: GeoBoundingBox,
    pub encoding: String,
    /// North, west, south, east.
    pub cds_area: [f64; 4],
}

impl fmt::Display for BboxReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.normalized;
        writeln!(
            f,
            "normalized: north={} south={} east={} west={}",
            b.north, b.south, b.east, b.west
        )?;
        writeln!(f, "encoding:   {}", self.encoding)?;
        write!(f, "cds area:   {:?}", self.cds_area)
    }
}

pub fn describe_bbox(north: f64, south: f64, east: f64, west: f64, precision: usize) -> Result<BboxReport> {
    let requested = GeoBoundingBox::new(north, south, east, west)?;
    let normalized = requested.normalized();
    Ok(BboxReport {
        requested,
        normalized,
        encoding: normalized.compact_encoding_with_precision(precision),
        cds_area: normalized.cds_area(),
    })
}

/// Summary of a country configuration file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigReport {
    pub iso3: String,
    pub reporting_points: Vec<String>,
    pub ndvi_area: Option<String>,
}

impl fmt::Display for ConfigReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "iso3:             {}", self.iso3)?;
        writeln!(f, "reporting points: {}", self.reporting_points.join(", "))?;
        write!(f, "ndvi area:        {}", self.ndvi_area.as_deref().unwrap_or("-"))
    }
}

pub fn check_config(path: &Path) -> Result<ConfigReport> {
    let country = CountryConfig::from_path(path)
        .with_context(|| format!("Failed to load country configuration {}", path.display()))?;
    Ok(ConfigReport {
        reporting_points: country
            .glofas
            .iter()
            .flat_map(|g| g.reporting_points.iter().map(|p| p.name.clone()))
            .collect(),
        ndvi_area: country
            .usgs_ndvi
            .as_ref()
            .map(|a| format!("{} ({})", a.area_url, a.area_prefix)),
        iso3: country.iso3,
    })
}

/// Inputs of a reconciliation dry run.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub country: PathBuf,
    pub variable: String,
    pub feature_col: String,
    pub start: DekadInput,
    pub end: Option<DekadInput>,
    pub stats: Vec<String>,
    pub percentiles: Vec<u8>,
    pub overwrite: bool,
}

/// What `process` would do to a derived NDVI table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanReport {
    pub table: PathBuf,
    pub action: String,
    pub existing_rows: usize,
    pub to_process: Vec<String>,
}

impl fmt::Display for PlanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "table:         {}", self.table.display())?;
        writeln!(f, "action:        {}", self.action)?;
        writeln!(f, "stored rows:   {}", self.existing_rows)?;
        write!(f, "to process:    {}", self.to_process.len())?;
        if let (Some(first), Some(last)) = (self.to_process.first(), self.to_process.last()) {
            write!(f, " ({} .. {})", first, last)?;
        }
        Ok(())
    }
}

fn describe_action(action: &PlanAction) -> String {
    match action {
        PlanAction::Create => "create".to_string(),
        PlanAction::Append => "append".to_string(),
        PlanAction::Replace { removed } => format!("replace ({} rows recomputed)", removed),
        PlanAction::Discard { previous } => format!("discard (previous columns: {})", previous),
        PlanAction::UpToDate => "up to date".to_string(),
    }
}

fn stats_config(stats: &[String], percentiles: &[u8]) -> Result<StatsConfig> {
    let mut config = StatsConfig::default().with_percentiles(percentiles.to_vec());
    if !stats.is_empty() {
        config.stats = stats
            .iter()
            .map(|s| Statistic::from_str(s).ok_or_else(|| anyhow!("Unknown statistic '{}'", s)))
            .collect::<Result<_>>()?;
    }
    config.validate().map_err(|e| anyhow!(e))?;
    Ok(config)
}

/// Compare the stored table with a requested range without computing anything.
pub fn plan_ndvi(request: PlanRequest, paths: &PathConfig) -> Result<PlanReport> {
    let country = CountryConfig::from_path(&request.country)
        .with_context(|| format!("Failed to load country configuration {}", request.country.display()))?;
    let variable = NdviVariable::from_str(&request.variable)
        .ok_or_else(|| anyhow!("Unknown NDVI variable '{}'", request.variable))?;
    let stats = stats_config(&request.stats, &request.percentiles)?;

    let start = request.start.resolve().context("Invalid start dekad")?;
    let end = Dekad::from_input(request.end, Dekad::today().into()).context("Invalid end dekad")?;
    let range = DekadRange::new(start, end);

    let schema = ColumnSchema::expected(&stats, &request.feature_col);
    let table = processed_table_path(paths, &country.iso3, variable, &request.feature_col);
    debug!(table = %table.display(), columns = %schema, "Reading derived table");

    let existing = JsonTableStore.read(&table)?;
    let plan = plan(existing, &range, request.overwrite, &schema)?;
    info!(
        table = %table.display(),
        to_process = plan.to_process.len(),
        "Planned reconciliation"
    );

    Ok(PlanReport {
        table,
        action: describe_action(&plan.action),
        existing_rows: plan.working.len(),
        to_process: plan.to_process.iter().map(ToString::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use datasources::{Cell, DerivedTable, Row};
    use test_utils::fixtures;
    use test_utils::{temp_data_dir, write_file};

    #[test]
    fn test_list_dekads_across_year() {
        let list = list_dekads(DekadInput::Pair(2020, 35), Some(DekadInput::Pair(2021, 2))).unwrap();
        let labels: Vec<&str> = list.dekads.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["2020-d35", "2020-d36", "2021-d01", "2021-d02"]);
        assert_eq!(list.dekads[1].start_date, "2020-12-21");
    }

    #[test]
    fn test_list_dekads_empty_when_reversed() {
        let list = list_dekads(DekadInput::Pair(2021, 2), Some(DekadInput::Pair(2020, 1))).unwrap();
        assert!(list.dekads.is_empty());
    }

    #[test]
    fn test_describe_bbox() {
        let report = describe_bbox(1.0, -2.2, 3.3, -4.4, 2).unwrap();
        assert_eq!(report.encoding, fixtures::bbox::DOWNLOAD_AREA_ENCODING);
        assert_eq!(report.cds_area, [1.05, -4.45, -2.25, 3.35]);
        assert!(describe_bbox(-1.0, 1.0, 3.0, 2.0, 2).is_err());
    }

    #[test]
    fn test_check_config() {
        let dir = temp_data_dir();
        let path = write_file(&dir.path().join("abc.yaml"), fixtures::COUNTRY_CONFIG_YAML.as_bytes());
        let report = check_config(&path).unwrap();
        assert_eq!(report.iso3, "abc");
        assert_eq!(report.reporting_points, vec!["station_north", "station_south"]);
        assert_eq!(report.ndvi_area.as_deref(), Some("africa/west (wa)"));
    }

    fn request(config: PathBuf, overwrite: bool) -> PlanRequest {
        PlanRequest {
            country: config,
            variable: "smoothed".to_string(),
            feature_col: "ADM2".to_string(),
            start: DekadInput::Pair(2020, 1),
            end: Some(DekadInput::Pair(2020, 4)),
            stats: vec!["mean".to_string()],
            percentiles: Vec::new(),
            overwrite,
        }
    }

    #[test]
    fn test_plan_against_stored_table() {
        let dir = temp_data_dir();
        let config = write_file(&dir.path().join("abc.yaml"), fixtures::COUNTRY_CONFIG_YAML.as_bytes());
        let paths = PathConfig::new(dir.path().join("data"));

        let report = plan_ndvi(request(config.clone(), false), &paths).unwrap();
        assert_eq!(report.action, "create");
        assert_eq!(report.to_process.len(), 4);

        let stats = stats_config(&["mean".to_string()], &[]).unwrap();
        let mut table = DerivedTable::new(ColumnSchema::expected(&stats, "ADM2"));
        for dekad in [1, 2] {
            let period = Dekad::new(2020, dekad).unwrap();
            table
                .rows
                .push(Row::new(period, vec![Cell::Number(0.4), Cell::Text("A".to_string())]));
        }
        JsonTableStore.write(&report.table, &table).unwrap();

        let report = plan_ndvi(request(config.clone(), false), &paths).unwrap();
        assert_eq!(report.action, "append");
        assert_eq!(report.existing_rows, 2);
        assert_eq!(report.to_process, vec!["2020-d03", "2020-d04"]);

        let report = plan_ndvi(request(config, true), &paths).unwrap();
        assert_eq!(report.action, "replace (2 rows recomputed)");
        assert_eq!(report.existing_rows, 2);
        assert_eq!(report.to_process.len(), 4);
    }

    #[test]
    fn test_plan_rejects_unknown_statistic() {
        let dir = temp_data_dir();
        let config = write_file(&dir.path().join("abc.yaml"), fixtures::COUNTRY_CONFIG_YAML.as_bytes());
        let mut req = request(config, false);
        req.stats = vec!["median".to_string()];
        let err = plan_ndvi(req, &PathConfig::new(dir.path())).unwrap_err();
        assert!(err.to_string().contains("median"));
    }
}
