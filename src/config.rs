//! Application configuration.

use std::collections::BTreeSet;

use clap::Parser;

use crate::inventory::InventoryConfig;
use crate::output::OutputFormat;
use crate::report::ReportKind;
use crate::staleness::{DEFAULT_MAX_AGE_DAYS, MAX_AGE_DAYS_LIMIT};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const COMMIT: &str = env!("BUILD_COMMIT");
const BUILD_DATE: &str = env!("BUILD_DATE");

/// CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "tidy-aws")]
#[command(about = "Find unattached, unused and stale AWS resources in one region")]
#[command(version = const_format::formatcp!(
    "{} (commit: {}, build date: {})",
    VERSION, COMMIT, BUILD_DATE
))]
pub struct Args {
    /// AWS region (defaults to the SDK region chain)
    #[arg(short, long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// AWS profile to use
    #[arg(short, long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Reports to run, repeatable or comma-separated (default: all orphan reports)
    #[arg(long = "report", value_enum, value_delimiter = ',')]
    pub reports: Vec<ReportKind>,

    /// Snapshots and AMIs older than this many days are candidates (1-36500)
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_AGE_DAYS,
        value_parser = clap::value_parser!(i64).range(1..=MAX_AGE_DAYS_LIMIT)
    )]
    pub max_age_days: i64,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Log format: json or pretty
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Application configuration derived from CLI args.
#[derive(Debug, Clone)]
pub struct Config {
    pub region: Option<String>,
    pub profile: Option<String>,
    pub reports: BTreeSet<ReportKind>,
    pub max_age_days: i64,
    pub output: OutputFormat,
    pub log_format: String,
    pub log_level: String,
}

impl Config {
    /// Create config from CLI arguments.
    pub fn from_args(args: Args) -> Self {
        let reports = if args.reports.is_empty() {
            ReportKind::ORPHANS.into_iter().collect()
        } else {
            args.reports.into_iter().collect()
        };

        Self {
            region: args.region,
            profile: args.profile,
            reports,
            max_age_days: args.max_age_days,
            output: args.output,
            log_format: args.log_format,
            log_level: args.log_level,
        }
    }

    pub fn inventory_config(&self) -> InventoryConfig {
        InventoryConfig {
            region: self.region.clone(),
            profile: self.profile.clone(),
        }
    }

    pub fn display(&self, actual_region: &str) {
        let region_info = match &self.region {
            Some(region) => region.clone(),
            None => format!("auto-detect ({})", actual_region),
        };
        let report_names: Vec<&str> = self.reports.iter().map(ReportKind::as_str).collect();

        tracing::info!(
            region = %region_info,
            profile = self.profile.as_deref().unwrap_or("default"),
            reports = %report_names.join(","),
            max_age_days = self.max_age_days,
            output = ?self.output,
            log_format = %self.log_format,
            log_level = %self.log_level,
            "Configuration initialized"
        );
    }
}
