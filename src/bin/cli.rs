//! eventfeed CLI
//!
//! Runs the feed server, or crawls a single performer once.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eventfeed::{
    error::Result,
    feeds::FeedFormat,
    models::{ActorKey, Config},
    pipeline,
};

/// eventfeed - eventernote performer event feeds
#[derive(Parser, Debug)]
#[command(
    name = "eventfeed",
    version,
    about = "JSON, RSS and iCal feeds for eventernote performers"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve feeds over HTTP with background refresh
    Serve,

    /// Crawl one performer and print the rendered feed
    Crawl {
        /// Performer name as it appears in eventernote URLs
        name: String,

        /// Numeric performer id
        id: u64,

        /// Output format: json, rss or ical
        #[arg(short, long, default_value = "json")]
        format: FeedFormat,
    },

    /// Validate configuration file
    Validate,
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging is not up yet, so a load failure is reported after init.
    let loaded = Config::load(&cli.config);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => Config::default(),
    };
    init_logging(cli.verbose, &config.logging.level);
    match loaded {
        Ok(_) => log::info!("Loaded configuration from {}", cli.config.display()),
        Err(e) => log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        ),
    }
    config.apply_env();

    match cli.command {
        Command::Serve => {
            pipeline::run_server(&config).await?;
        }

        Command::Crawl { name, id, format } => {
            let key = ActorKey::new(name, id);
            let body = pipeline::run_crawl(&config, &key, format).await?;
            println!("{body}");
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("Config OK");
        }
    }

    Ok(())
}
