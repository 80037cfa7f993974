//! Column schemas for derived tables.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Zonal statistic computed per feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Mean,
    Std,
    Min,
    Max,
    Sum,
    Count,
}

impl Statistic {
    pub const ALL: [Statistic; 6] = [
        Statistic::Mean,
        Statistic::Std,
        Statistic::Min,
        Statistic::Max,
        Statistic::Sum,
        Statistic::Count,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Mean => "mean",
            Statistic::Std => "std",
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Sum => "sum",
            Statistic::Count => "count",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stat| stat.as_str() == s.trim().to_lowercase())
    }

    fn kind(&self) -> ColumnKind {
        match self {
            Statistic::Count => ColumnKind::Integer,
            _ => ColumnKind::Float,
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which statistics to compute, and which percentiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_stats")]
    pub stats: Vec<Statistic>,

    /// Percentiles in request order; each becomes a `{p}quant` column.
    #[serde(default)]
    pub percentiles: Vec<u8>,
}

fn default_stats() -> Vec<Statistic> {
    Statistic::ALL.to_vec()
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            stats: default_stats(),
            percentiles: Vec::new(),
        }
    }
}

impl StatsConfig {
    pub fn with_percentiles(mut self, percentiles: Vec<u8>) -> Self {
        self.percentiles = percentiles;
        self
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.stats.is_empty() && self.percentiles.is_empty() {
            return Err("at least one statistic or percentile is required".to_string());
        }
        if let Some(p) = self.percentiles.iter().find(|p| **p > 100) {
            return Err(format!("percentile {} is outside 0..=100", p));
        }
        Ok(())
    }

    /// Number of value columns produced per feature, excluding the feature id.
    pub fn value_count(&self) -> usize {
        self.stats.len() + self.percentiles.len()
    }
}

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Float,
    Integer,
    Text,
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered trailing columns of a derived table.
///
/// The leading `year`, `dekad` and `date` key columns are implied.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub columns: Vec<Column>,
}

/// Key columns every derived table starts with.
pub const KEY_COLUMNS: [&str; 3] = ["year", "dekad", "date"];

impl ColumnSchema {
    /// Statistics in configured order, then percentiles, then the feature column.
    pub fn expected(stats: &StatsConfig, feature_col: &str) -> Self {
        let mut columns: Vec<Column> = stats
            .stats
            .iter()
            .map(|s| Column::new(s.as_str(), s.kind()))
            .collect();
        columns.extend(
            stats
                .percentiles
                .iter()
                .map(|p| Column::new(format!("{}quant", p), ColumnKind::Float)),
        );
        columns.push(Column::new(feature_col, ColumnKind::Text));
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

impl fmt::Display for ColumnSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(", "))
    }
}
