//! Shared acquisition loop for dataset pipelines.

use std::fmt::Display;
use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::error::Result;
use crate::report::{BatchReport, PeriodOutcome};

/// A dataset whose raw files are fetched one unit at a time.
///
/// Units are independent files, so a failed unit is recorded and the loop
/// moves on to the next one.
pub trait Pipeline {
    /// One raw file's worth of data, e.g. a year or a dekad.
    type Unit: Clone + Display;

    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Units covered by this pipeline instance, in fetch order.
    fn units(&self) -> Vec<Self::Unit>;

    /// Fetch one unit into the raw cache, returning its path.
    ///
    /// Existing files are reused unless `overwrite` is set.
    fn acquire_unit(&self, unit: &Self::Unit, overwrite: bool) -> Result<PathBuf>;

    /// Fetch every unit.
    fn acquire(&self, overwrite: bool) -> BatchReport<Self::Unit> {
        let mut report = BatchReport::new();
        for unit in self.units() {
            let outcome = match self.acquire_unit(&unit, overwrite) {
                Ok(path) => PeriodOutcome::Success(path),
                Err(err) if err.is_period_gap() => {
                    warn!(pipeline = self.name(), unit = %unit, "{}, skipping", err);
                    PeriodOutcome::Skipped(err.to_string())
                }
                Err(err) => {
                    error!(pipeline = self.name(), unit = %unit, error = %err, "Acquisition failed");
                    PeriodOutcome::Fatal(err.to_string())
                }
            };
            report.push(unit, outcome);
        }
        info!(pipeline = self.name(), summary = %report, "Acquisition finished");
        report
    }
}
