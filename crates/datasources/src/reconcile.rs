//! Incremental reconciliation of derived tables.
//!
//! Given the table already on disk and a requested dekad range, decide which
//! periods still need computing, run the computation for each, and persist
//! the merged result.
//!
//! | existing table | schema   | overwrite | outcome                              |
//! |----------------|----------|-----------|--------------------------------------|
//! | none           | -        | any       | process every period                 |
//! | present        | differs  | false     | `SchemaMismatch`, nothing written    |
//! | present        | differs  | true      | discard table, process every period  |
//! | present        | matches  | true      | reprocess range, replacing its rows  |
//! | present        | matches  | false     | process only periods not yet present |

use std::path::{Path, PathBuf};

use aa_common::{Dekad, DekadRange};
use tracing::{info, warn};

use crate::error::{DataSourceError, Result};
use crate::report::{BatchReport, PeriodOutcome};
use crate::schema::ColumnSchema;
use crate::table::{DerivedTable, Row, TableStore};

/// What reconciliation will do to the stored table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanAction {
    /// No table yet.
    Create,
    /// Append the missing periods.
    Append,
    /// Stored rows in the range are recomputed. Old rows of a period are
    /// only replaced once that period succeeds.
    Replace { removed: usize },
    /// The stored table had other columns and was thrown away.
    Discard { previous: ColumnSchema },
    /// Every requested period is already present.
    UpToDate,
}

/// Periods to compute and the table to add them to.
#[derive(Debug, Clone)]
pub struct ReconcilePlan {
    pub to_process: Vec<Dekad>,
    pub working: DerivedTable,
    pub action: PlanAction,
}

/// Decide which periods of `range` need (re)computing.
pub fn plan(
    existing: Option<DerivedTable>,
    range: &DekadRange,
    overwrite: bool,
    expected: &ColumnSchema,
) -> Result<ReconcilePlan> {
    let requested: Vec<Dekad> = range.iter().collect();

    let Some(mut table) = existing else {
        return Ok(ReconcilePlan {
            to_process: requested,
            working: DerivedTable::new(expected.clone()),
            action: PlanAction::Create,
        });
    };

    if table.schema != *expected {
        if !overwrite {
            return Err(DataSourceError::SchemaMismatch {
                expected: expected.to_string(),
                found: table.schema.to_string(),
            });
        }
        warn!(
            previous = %table.schema,
            requested = %expected,
            "Existing table has different columns and is being overwritten"
        );
        return Ok(ReconcilePlan {
            to_process: requested,
            working: DerivedTable::new(expected.clone()),
            action: PlanAction::Discard {
                previous: table.schema,
            },
        });
    }

    if overwrite {
        let removed = table.rows_in_range(range);
        return Ok(ReconcilePlan {
            to_process: requested,
            working: table,
            action: PlanAction::Replace { removed },
        });
    }

    let to_process: Vec<Dekad> = requested
        .into_iter()
        .filter(|p| !table.contains_period(p))
        .collect();
    let action = if to_process.is_empty() {
        PlanAction::UpToDate
    } else {
        PlanAction::Append
    };
    Ok(ReconcilePlan {
        to_process,
        working: table,
        action,
    })
}

/// Result of a reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub path: PathBuf,
    pub action: PlanAction,
    pub report: BatchReport<Dekad>,
}

/// Runs a per-period computation against a stored table.
#[derive(Debug, Clone)]
pub struct Reconciler<S> {
    store: S,
}

impl<S: TableStore> Reconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Bring the table at `path` up to date for `range`.
    ///
    /// `compute` yields the rows for one period, which replace any stored
    /// rows of that period. A period whose computation reports a gap is
    /// skipped and keeps its stored rows; any other error aborts before
    /// anything is written.
    pub fn process<F>(
        &self,
        path: &Path,
        range: &DekadRange,
        overwrite: bool,
        expected: &ColumnSchema,
        mut compute: F,
    ) -> Result<ReconcileOutcome>
    where
        F: FnMut(Dekad) -> Result<Vec<Row>>,
    {
        let existing = self.store.read(path)?;
        let ReconcilePlan {
            to_process,
            mut working,
            action,
        } = plan(existing, range, overwrite, expected)?;

        let mut report = BatchReport::new();
        if action == PlanAction::UpToDate {
            info!(
                path = %path.display(),
                start = %range.start,
                end = %range.end,
                "No new periods to process; set overwrite to reprocess them"
            );
            return Ok(ReconcileOutcome {
                path: path.to_path_buf(),
                action,
                report,
            });
        }

        for period in to_process {
            match compute(period) {
                Ok(rows) => {
                    if let Some(bad) = rows.iter().find(|r| r.values.len() != expected.len()) {
                        return Err(DataSourceError::SchemaMismatch {
                            expected: expected.to_string(),
                            found: format!("{} values for {}", bad.values.len(), period),
                        });
                    }
                    working.remove_period(&period);
                    working.rows.extend(rows);
                    report.push(period, PeriodOutcome::Success(path.to_path_buf()));
                }
                Err(err) if err.is_period_gap() => {
                    warn!(period = %period, "{}, skipping", err);
                    report.push(period, PeriodOutcome::Skipped(err.to_string()));
                }
                Err(err) => return Err(err),
            }
        }

        working.sort_by_period();
        self.store.write(path, &working)?;
        info!(path = %path.display(), rows = working.len(), summary = %report, "Derived table updated");

        Ok(ReconcileOutcome {
            path: path.to_path_buf(),
            action,
            report,
        })
    }
}
