//! Anticipatory-action toolbox CLI.
//!
//! Offline inspection helpers:
//! - Expand dekad ranges
//! - Snap and encode GloFAS bounding boxes
//! - Validate country configuration files
//! - Dry-run reconciliation of derived NDVI tables

mod commands;

use std::fmt::Display;
use std::path::PathBuf;

use aa_common::DekadInput;
use anyhow::Result;
use clap::{Parser, Subcommand};
use datasources::PathConfig;
use serde::Serialize;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use commands::PlanRequest;

#[derive(Parser, Debug)]
#[command(name = "aa-cli")]
#[command(about = "Inspect dekad ranges, GloFAS areas and derived NDVI tables")]
struct Args {
    /// Log level
    #[arg(long, global = true, env = "AA_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the dekads between two periods (inclusive)
    Dekads {
        /// First dekad, as YYYY,NN or a YYYY-MM-DD date
        #[arg(long)]
        start: DekadInput,

        /// Last dekad (default: the current dekad)
        #[arg(long)]
        end: Option<DekadInput>,
    },

    /// Snap a bounding box to GloFAS cell centres and print its encoding
    Bbox {
        #[arg(long, allow_negative_numbers = true)]
        north: f64,

        #[arg(long, allow_negative_numbers = true)]
        south: f64,

        #[arg(long, allow_negative_numbers = true)]
        east: f64,

        #[arg(long, allow_negative_numbers = true)]
        west: f64,

        /// Digits kept after the decimal point in the encoding
        #[arg(long, default_value_t = aa_common::bbox::DEFAULT_ENCODING_PRECISION)]
        precision: usize,
    },

    /// Load and validate a country configuration file
    CheckConfig {
        /// Path to the country YAML file
        path: PathBuf,
    },

    /// Show what processing would do to a derived NDVI table
    Plan {
        /// Path to the country YAML file
        #[arg(long)]
        country: PathBuf,

        /// NDVI variable: smoothed, percent_median, median_anomaly or difference
        #[arg(long, default_value = "smoothed")]
        variable: String,

        /// Feature column the statistics are grouped by
        #[arg(long)]
        feature_col: String,

        #[arg(long)]
        start: DekadInput,

        #[arg(long)]
        end: Option<DekadInput>,

        /// Statistics to compute (default: all)
        #[arg(long, value_delimiter = ',')]
        stats: Vec<String>,

        /// Percentiles to compute
        #[arg(long, value_delimiter = ',')]
        percentiles: Vec<u8>,

        /// Recompute periods that are already stored
        #[arg(long)]
        overwrite: bool,

        /// Data root (falls back to AA_DATA_DIR)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn emit<T: Serialize + Display>(report: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", report);
    }
    Ok(())
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json)?;
    debug!(command = ?args.command, "Starting aa-cli");

    match args.command {
        Command::Dekads { start, end } => emit(&commands::list_dekads(start, end)?, args.json),
        Command::Bbox {
            north,
            south,
            east,
            west,
            precision,
        } => emit(
            &commands::describe_bbox(north, south, east, west, precision)?,
            args.json,
        ),
        Command::CheckConfig { path } => emit(&commands::check_config(&path)?, args.json),
        Command::Plan {
            country,
            variable,
            feature_col,
            start,
            end,
            stats,
            percentiles,
            overwrite,
            data_dir,
        } => {
            let paths = match data_dir {
                Some(dir) => PathConfig::new(dir),
                None => PathConfig::from_env()?,
            };
            let request = PlanRequest {
                country,
                variable,
                feature_col,
                start,
                end,
                stats,
                percentiles,
                overwrite,
            };
            emit(&commands::plan_ndvi(request, &paths)?, args.json)
        }
    }
}
