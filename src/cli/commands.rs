//! Command handlers for Canvas Fetcher CLI
//!
//! This module implements the command handlers that turn parsed arguments and
//! the loaded configuration into calls on the core library.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

use crate::app::coordinator::{Discovery, PlannedFile, SessionResult};
use crate::app::{CanvasClient, Coordinator};
use crate::auth::{clear_token, prompt_token, resolve_token, show_auth_status, store_token};
use crate::cli::{AuthAction, AuthArgs, ConnectionArgs, DownloadArgs};
use crate::config::AppConfig;
use crate::constants::auth::TOKEN_FILE_NAME;
use crate::errors::{AppError, AuthError, Result};

/// Handle the download command
///
/// Discovers courses and files, applies the filter, then either prints the
/// plan (`--dry-run`) or downloads every remaining file.
pub async fn handle_download(args: DownloadArgs, mut config: AppConfig) -> Result<()> {
    args.validate()?;
    config.apply_overrides(args.overrides())?;

    let client = connect(&args.connection, &config)?;
    let coordinator = Coordinator::new(config.coordinator_config(), client, config.filter_policy());
    coordinator.config().validate().map_err(AppError::generic)?;

    let spinner = discovery_spinner("Discovering courses and files...");
    let discovery = coordinator.discover().await;
    spinner.finish_and_clear();
    let Discovery {
        mut index,
        listing_failures,
    } = discovery?;

    let filter = coordinator.apply_filter(&mut index);

    if args.dry_run {
        let planned = coordinator.plan(&index).await;
        print_plan(&planned);
        for failure in &listing_failures {
            println!(
                "Could not list files for {}: {}",
                failure.course_code, failure.error
            );
        }
        return listing_status(listing_failures.len());
    }

    let mut result = coordinator.download_all(index).await;
    result.listing_failures = listing_failures;
    result.filter = filter;

    println!();
    println!("{}", result.summary());
    exit_status(&result)
}

/// Handle the courses command
pub async fn handle_courses(args: ConnectionArgs, mut config: AppConfig) -> Result<()> {
    config.apply_overrides(args.overrides())?;
    let client = connect(&args, &config)?;

    let mut courses = client.list_enrolled_courses().await?;
    courses.sort_by(|a, b| a.course_code.cmp(&b.course_code));

    if courses.is_empty() {
        println!("No active enrollments found.");
        return Ok(());
    }

    println!("{:>10}  Course", "ID");
    for course in &courses {
        println!("{:>10}  {}", course.id, course.course_code);
    }
    Ok(())
}

/// Handle the auth command
pub async fn handle_auth(args: AuthArgs) -> Result<()> {
    let token_file = Path::new(TOKEN_FILE_NAME);

    match args.action {
        AuthAction::Store { token } => {
            let token = match token {
                Some(token) => token,
                None if atty::is(atty::Stream::Stdin) => prompt_token()?,
                None => return Err(AuthError::MissingToken.into()),
            };
            store_token(token_file, &token)?;
            println!("Token saved to {}", token_file.display());
            #[cfg(unix)]
            println!("File permissions set to owner-only (600)");
        }
        AuthAction::Status => show_auth_status(),
        AuthAction::Clear => {
            if clear_token(token_file)? {
                println!("Removed {}", token_file.display());
            } else {
                println!("No stored token to remove");
            }
        }
    }
    Ok(())
}

/// Resolve the token, optionally persist it, and build the shared client
fn connect(args: &ConnectionArgs, config: &AppConfig) -> Result<Arc<CanvasClient>> {
    let resolved = resolve_token(args.token.as_deref())?;
    info!("Using access token from {}", resolved.source);

    if args.store {
        store_token(Path::new(TOKEN_FILE_NAME), &resolved.token)?;
    }

    Ok(Arc::new(CanvasClient::new(
        resolved.token,
        config.client_config(),
    )?))
}

fn discovery_spinner(message: &str) -> ProgressBar {
    if !atty::is(atty::Stream::Stderr) {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["◐", "◓", "◑", "◒"]),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

fn print_plan(planned: &[PlannedFile]) {
    let (existing, pending): (Vec<&PlannedFile>, Vec<&PlannedFile>) =
        planned.iter().partition(|p| p.exists);
    let pending_bytes: u64 = pending.iter().map(|p| p.size).sum();

    println!(
        "Dry run - would download {} file(s) ({} bytes), {} already present:",
        pending.len(),
        pending_bytes,
        existing.len()
    );
    for file in planned {
        let marker = if file.exists { "exists" } else { "new" };
        println!(
            "  [{:>6}] {} ({} bytes)",
            marker,
            file.destination.display(),
            file.size
        );
    }
}

fn listing_status(listing_failures: usize) -> Result<()> {
    if listing_failures > 0 {
        return Err(AppError::generic(format!(
            "File listing failed for {} course(s)",
            listing_failures
        )));
    }
    Ok(())
}

/// Per-file failures are reported but do not fail the run
fn exit_status(result: &SessionResult) -> Result<()> {
    if result.stats.files_failed > 0 {
        warn!(
            "{} file(s) failed to download; re-run to retry them",
            result.stats.files_failed
        );
    }
    if !result.task_failures.is_empty() {
        error!("{} course task(s) did not finish", result.task_failures.len());
        return Err(AppError::generic("One or more course downloads did not finish"));
    }
    if result.interrupted {
        return Err(AppError::generic("Download interrupted"));
    }
    listing_status(result.listing_failures.len())
}
