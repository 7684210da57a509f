//! Command-line argument parsing for Canvas Fetcher
//!
//! This module defines the CLI structure using clap derive macros: the
//! download command, course listing, and token management.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::filter::{parse_extension_list, ExtensionMode};
use crate::config::ConfigOverrides;
use crate::errors::{ConfigError, ConfigResult};

/// Canvas Fetcher - download your course files from Canvas LMS
#[derive(Parser, Debug)]
#[command(
    name = "canvas_fetcher",
    version,
    about = "Download the files of your active Canvas courses",
    long_about = "Downloads every file of every course you are actively enrolled in on a Canvas LMS
instance into one directory per course code. Files already on disk are skipped, so the
command can be re-run to pick up new uploads."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (trace level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - warnings and errors only
    #[arg(short, long, global = true, conflicts_with_all = ["verbose", "very_verbose"])]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download files from all actively-enrolled courses
    Download(DownloadArgs),

    /// List actively-enrolled courses
    Courses(ConnectionArgs),

    /// Manage the stored access token
    Auth(AuthArgs),
}

/// How to reach Canvas and authenticate
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Canvas access token (falls back to CANVAS_TOKEN, then .token, then a prompt)
    #[arg(short, long, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Save the resolved token to .token for later runs
    #[arg(long)]
    pub store: bool,

    /// Canvas host, e.g. canvas.example.edu or http://localhost:8080
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// REST API path prefix
    #[arg(long, value_name = "PATH")]
    pub api_path: Option<String>,
}

/// Arguments for the download command
#[derive(Args, Debug, Clone, Default)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Skip files larger than this many megabytes (1 MB = 1,000,000 bytes)
    #[arg(short = 's', long, value_name = "MB")]
    pub max_size: Option<u64>,

    /// Only download these extensions, comma-separated (e.g. "pdf,pptx")
    #[arg(short, long, value_name = "LIST", conflicts_with = "exclude_extensions")]
    pub extensions: Option<String>,

    /// Never download these extensions, comma-separated (e.g. "mp4,mov")
    #[arg(short = 'x', long, value_name = "LIST")]
    pub exclude_extensions: Option<String>,

    /// Directory under which course folders are created
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Abort when any course's file listing fails
    #[arg(long)]
    pub fail_fast: bool,

    /// Dry run - show what would be downloaded without downloading
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for token management
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthAction,
}

/// Token management actions
#[derive(Subcommand, Debug)]
pub enum AuthAction {
    /// Save a token to .token (prompts when none is given)
    Store {
        /// Token to save
        #[arg(short, long, value_name = "TOKEN")]
        token: Option<String>,
    },

    /// Show which token sources are available
    Status,

    /// Remove the stored token
    Clear,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level from the flags, or `configured` when none is set
    pub fn log_level(&self, configured: &str) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::WARN
        } else if self.global.very_verbose {
            tracing::Level::TRACE
        } else if self.global.verbose {
            tracing::Level::DEBUG
        } else {
            configured.parse().unwrap_or(tracing::Level::INFO)
        }
    }
}

impl ConnectionArgs {
    fn apply_to(&self, overrides: &mut ConfigOverrides) {
        overrides.host = self.host.clone();
        overrides.api_path = self.api_path.clone();
    }

    /// Configuration overrides for commands that only talk to Canvas
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::default();
        self.apply_to(&mut overrides);
        overrides
    }
}

impl DownloadArgs {
    /// Check combinations clap cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if self.extensions.is_some() && self.exclude_extensions.is_some() {
            return Err(ConfigError::Conflict(
                "--extensions cannot be combined with --exclude-extensions".to_string(),
            ));
        }

        if self.max_size == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "--max-size".to_string(),
                value: "0".to_string(),
                reason: "Maximum size must be at least 1 MB".to_string(),
            });
        }

        Ok(())
    }

    /// Configuration overrides carried by these flags
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides {
            max_size_mb: self.max_size,
            destination: self.output.clone(),
            fail_fast: self.fail_fast,
            ..Default::default()
        };
        self.connection.apply_to(&mut overrides);

        overrides.extensions = match (&self.extensions, &self.exclude_extensions) {
            (Some(list), _) => Some((ExtensionMode::Allow, parse_extension_list(list))),
            (None, Some(list)) => Some((ExtensionMode::Deny, parse_extension_list(list))),
            (None, None) => None,
        };
        overrides
    }
}
