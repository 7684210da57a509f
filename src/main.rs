//! Canvas Fetcher CLI application
//!
//! Command-line interface for downloading the files of actively-enrolled
//! Canvas LMS courses.

use std::process;

use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use canvas_fetcher::cli::{handle_auth, handle_courses, handle_download, Cli, Commands};
use canvas_fetcher::config::AppConfig;
use canvas_fetcher::constants::logging::LOG_TARGET;
use canvas_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        error!(category = e.category(), "{}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    let config = AppConfig::load(cli.global.config.as_deref()).await?;

    init_logging(&cli, &config);

    info!("Canvas Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Download(args) => {
            info!("Executing download command");
            handle_download(args, config).await
        }
        Commands::Courses(args) => {
            info!("Executing courses command");
            handle_courses(args, config).await
        }
        Commands::Auth(args) => handle_auth(args).await,
    }
}

/// Initialize logging from the CLI flags, falling back to the configured level
fn init_logging(cli: &Cli, config: &AppConfig) {
    let log_level = cli.log_level(&config.logging.level);

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("{}={}", LOG_TARGET, log_level).parse() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.verbose || cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
