//! Portal Notifier CLI
//!
//! Runs the pipeline over saved portal pages. Fetching those pages (and
//! the login they need) is left to whatever polls the portal.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use portal_notifier::{
    error::Result,
    models::{BlackboardResponse, Config},
    pipeline::PortalPipeline,
    services::CollectingAlertSink,
};

/// Portal Notifier - blackboard and conference alert extraction
#[derive(Parser, Debug)]
#[command(name = "notifier", version, about = "Academic portal notifier")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "notifier.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a saved notification table for conference alerts
    Scan {
        /// HTML file holding the notification table
        #[arg(long)]
        table: PathBuf,
    },

    /// Extract blackboard messages from a saved list page
    Extract {
        /// HTML (or JSON envelope) file holding the blackboard list
        #[arg(long)]
        list: PathBuf,

        /// Treat the file as the portal's {"Status", "HTML"} envelope
        #[arg(long)]
        envelope: bool,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_or_default(&cli.config);
    log::debug!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Scan { table } => {
            let html = tokio::fs::read_to_string(&table).await?;
            let sink = Arc::new(CollectingAlertSink::new());
            let pipeline = PortalPipeline::from_config(&config, sink.clone())?;

            let outcome = pipeline.process_notifications(&html).await?;
            if outcome.time_parse_failures > 0 {
                log::warn!(
                    "{} row(s) had an unreadable time of day",
                    outcome.time_parse_failures
                );
            }
            println!("{}", serde_json::to_string_pretty(&sink.take())?);
        }

        Command::Extract { list, envelope } => {
            let content = tokio::fs::read_to_string(&list).await?;
            let sink = Arc::new(CollectingAlertSink::new());
            let pipeline = PortalPipeline::from_config(&config, sink)?;

            if envelope {
                let response: BlackboardResponse = serde_json::from_str(&content)?;
                pipeline.process_blackboard_response(&response).await?;
            } else {
                pipeline.process_announcements(&content).await?;
            }
            let messages = pipeline.queue().drain();
            println!("{}", serde_json::to_string_pretty(&messages)?);
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} alert window(s), base URL {})",
                config.notifications.windows.len(),
                config.portal.base_url
            );
        }
    }

    Ok(())
}
