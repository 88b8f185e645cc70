use std::time::Instant;

use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use tracing::{info, warn};

use tidy_aws::analysis::Analyzer;
use tidy_aws::config::{Args, Config};
use tidy_aws::inventory::AwsInventory;
use tidy_aws::logging;
use tidy_aws::output;
use tidy_aws::staleness::Cutoff;

/// Application entry point.
struct App {
    config: Config,
}

impl App {
    fn new(config: Config) -> Self {
        Self { config }
    }

    /// Returns whether every selected report completed.
    async fn run(&self) -> anyhow::Result<bool> {
        let started = Instant::now();
        let inventory = AwsInventory::new(&self.config.inventory_config()).await;
        self.config.display(inventory.region());

        let cutoff = Cutoff::days(Utc::now(), self.config.max_age_days);
        let analysis = Analyzer::new(&inventory, cutoff)
            .run(&self.config.reports)
            .await?;

        print!("{}", output::render(&analysis, self.config.output)?);

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if analysis.is_complete() {
            info!(elapsed_ms, "Run completed");
        } else {
            warn!(
                failed_reports = analysis.failures.len(),
                elapsed_ms, "Run completed with failed reports"
            );
        }

        Ok(analysis.is_complete())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    let config = Config::from_args(args);

    logging::init(&config.log_format, &config.log_level);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("BUILD_COMMIT"),
        build_date = env!("BUILD_DATE"),
        "Starting tidy-aws"
    );

    let app = App::new(config);

    match app.run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}
