//! Download orchestration
//!
//! This module drives a complete run: course discovery, per-course file
//! listing, filtering, and the concurrent download phase.
//!
//! # Key Features
//!
//! - **Sequential discovery**: courses and their files are listed one after
//!   another before any download starts
//! - **One task per course**: courses download concurrently, files within a
//!   course strictly in listed order
//! - **Failure isolation**: a failed file never stops its siblings; a failed
//!   course listing excludes only that course unless `fail_fast` is set
//! - **Graceful Shutdown**: CTRL-C stops new files from being started; a
//!   second CTRL-C cancels the downloads in flight
//!
//! # Architecture
//!
//! - [`config`] - Configuration structures and validation
//! - [`stats`] - Per-course reports and session statistics
//! - [`signals`] - Signal handling for graceful shutdown
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use canvas_fetcher::app::{CanvasClient, ClientConfig, Coordinator, CoordinatorConfig};
//! use canvas_fetcher::app::filter::{ExtensionPolicy, FilterPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(CanvasClient::new("token", ClientConfig::default())?);
//! let filter = FilterPolicy::from_megabytes(50, ExtensionPolicy::deny(["mp4"]));
//! let coordinator = Coordinator::new(CoordinatorConfig::default(), client, filter);
//!
//! let result = coordinator.run().await?;
//! println!("{}", result.summary());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod signals;
pub mod stats;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::app::client::CanvasClient;
use crate::app::filter::{filter_index, FilterPolicy, FilterReport};
use crate::app::models::{destination_path, CourseFileIndex, FileDescriptor};
use crate::errors::{ApiError, ApiResult, AppError, Result};

pub use config::CoordinatorConfig;
pub use signals::{
    abort_requested, create_shutdown_channel, request_abort, request_shutdown,
    shutdown_requested, ShutdownReceiver, ShutdownSender, ShutdownStage, SignalHandler,
};
pub use stats::{CourseReport, DownloadStats, FileResult, ListingFailure, SessionResult};

/// Files found during discovery, plus the courses that could not be listed
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub index: CourseFileIndex,
    pub listing_failures: Vec<ListingFailure>,
}

/// One entry of a dry run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub course_code: String,
    pub display_name: String,
    pub size: u64,
    pub destination: PathBuf,
    /// Destination already present; a real run would skip it
    pub exists: bool,
}

/// Main coordinator for a download run
pub struct Coordinator {
    config: CoordinatorConfig,
    client: Arc<CanvasClient>,
    filter: FilterPolicy,
}

impl Coordinator {
    /// Create a new coordinator with the given configuration and shared client
    pub fn new(config: CoordinatorConfig, client: Arc<CanvasClient>, filter: FilterPolicy) -> Self {
        Self {
            config,
            client,
            filter,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Run the complete process: discover, filter, download
    ///
    /// # Errors
    ///
    /// Returns `AppError` if the configuration is invalid, course discovery
    /// fails, or a file listing fails while `fail_fast` is set. Per-file
    /// failures are reported in the returned [`SessionResult`].
    pub async fn run(&self) -> Result<SessionResult> {
        self.config.validate().map_err(AppError::generic)?;

        let Discovery {
            mut index,
            listing_failures,
        } = self.discover().await?;

        let filter = self.apply_filter(&mut index);

        let mut result = self.download_all(index).await;
        result.listing_failures = listing_failures;
        result.filter = filter;
        Ok(result)
    }

    /// List enrolled courses and the files of each, one course at a time
    ///
    /// # Errors
    ///
    /// Course discovery failures are always returned. A file listing failure
    /// is returned only with `fail_fast`; otherwise it is logged, recorded and
    /// the course is left out of the index.
    pub async fn discover(&self) -> ApiResult<Discovery> {
        let courses = self.client.list_enrolled_courses().await?;

        let mut discovery = Discovery::default();
        for course in &courses {
            debug!(id = course.id, course = %course.course_code, "getting file info");
            match self.client.list_files_in_course(course).await {
                Ok(files) => {
                    if !discovery.index.insert(&course.course_code, files) {
                        warn!(
                            course = %course.course_code,
                            id = course.id,
                            "course directory already used by another course, merging file lists"
                        );
                    }
                }
                Err(e) if self.config.fail_fast => {
                    error!(course = %course.course_code, "unable to list course files: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    error!(
                        course = %course.course_code,
                        "unable to list course files, skipping course: {}",
                        e
                    );
                    discovery.listing_failures.push(ListingFailure {
                        course_code: course.course_code.clone(),
                        error: describe(&e),
                    });
                }
            }
        }

        info!(
            "Discovered {} file(s) ({} bytes) across {} course(s)",
            discovery.index.total_files(),
            discovery.index.total_bytes(),
            discovery.index.len()
        );
        Ok(discovery)
    }

    /// Reduce every course's file list according to the filter policy
    pub fn apply_filter(&self, index: &mut CourseFileIndex) -> FilterReport {
        debug!(
            "Filtering with {} up to {} bytes",
            self.filter.extensions(),
            self.filter.max_size_bytes()
        );
        let report = filter_index(index, &self.filter);
        info!(
            "{} file(s) eligible for download, {} filtered out",
            report.kept,
            report.rejected()
        );
        report
    }

    /// Describe what a download run would do, without downloading
    pub async fn plan(&self, index: &CourseFileIndex) -> Vec<PlannedFile> {
        let mut planned = Vec::with_capacity(index.total_files());
        for (course_code, files) in index.iter() {
            for file in files {
                let destination = destination_path(&self.config.destination_root, course_code, file);
                let exists = tokio::fs::metadata(&destination).await.is_ok();
                planned.push(PlannedFile {
                    course_code: course_code.clone(),
                    display_name: file.display_name.clone(),
                    size: file.size,
                    destination,
                    exists,
                });
            }
        }
        planned
    }

    /// Download every course concurrently and wait for all of them
    ///
    /// Installs signal handlers for the duration of the call when the
    /// configuration asks for it.
    pub async fn download_all(&self, index: CourseFileIndex) -> SessionResult {
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let signal_task = self
            .config
            .handle_signals
            .then(|| SignalHandler::new(shutdown_tx.clone()).setup());

        let result = self.download_all_until(index, shutdown_rx).await;

        if let Some(task) = signal_task {
            task.abort();
        }
        result
    }

    /// Download every course concurrently until done or `shutdown` is set
    ///
    /// `Draining` lets each course finish its current file; `Aborting`
    /// cancels every course task still running.
    pub async fn download_all_until(
        &self,
        index: CourseFileIndex,
        shutdown: ShutdownReceiver,
    ) -> SessionResult {
        let mut stats = DownloadStats {
            total_courses: index.len(),
            total_files: index.total_files(),
            ..Default::default()
        };
        info!(
            "Downloading {} file(s) for {} course(s)",
            stats.total_files, stats.total_courses
        );

        let mut tasks = JoinSet::new();
        for (course_code, files) in index {
            let client = Arc::clone(&self.client);
            let root = self.config.destination_root.clone();
            let shutdown = shutdown.clone();
            tasks.spawn(async move {
                download_course(&client, &root, course_code, files, &shutdown).await
            });
        }

        let mut courses = Vec::with_capacity(stats.total_courses);
        let mut task_failures = Vec::new();
        let mut watcher = shutdown.clone();
        let mut watching = true;
        if abort_requested(&watcher) {
            tasks.abort_all();
            watching = false;
        }

        loop {
            tokio::select! {
                joined = tasks.join_next() => {
                    let Some(joined) = joined else { break };
                    match joined {
                        Ok(report) => {
                            stats.add_course(&report);
                            courses.push(report);
                        }
                        Err(e) if e.is_cancelled() => stats.courses_aborted += 1,
                        Err(e) => {
                            error!("Course download task failed: {}", e);
                            task_failures.push(e.to_string());
                        }
                    }
                }
                changed = watcher.changed(), if watching => {
                    if changed.is_err() {
                        watching = false;
                    } else if abort_requested(&watcher) {
                        warn!("Aborting {} course download(s) in flight", tasks.len());
                        tasks.abort_all();
                        watching = false;
                    }
                }
            }
        }
        courses.sort_by(|a, b| a.course_code.cmp(&b.course_code));
        stats.update_duration();

        let interrupted = shutdown_requested(&shutdown);
        if interrupted {
            warn!(
                "Shutdown requested: {} file(s) were not attempted",
                stats.files_not_attempted
            );
        }

        SessionResult {
            stats,
            courses,
            listing_failures: Vec::new(),
            task_failures,
            filter: FilterReport::default(),
            interrupted,
        }
    }
}

/// Download one course's files in order, continuing past failures
async fn download_course(
    client: &CanvasClient,
    root: &Path,
    course_code: String,
    files: Vec<FileDescriptor>,
    shutdown: &ShutdownReceiver,
) -> CourseReport {
    let total = files.len();
    let mut report = CourseReport::new(course_code.clone());

    for (position, file) in files.iter().enumerate() {
        if shutdown_requested(shutdown) {
            report.not_attempted = total - position;
            warn!(
                course = %course_code,
                "stopping, {} file(s) not attempted",
                report.not_attempted
            );
            break;
        }

        let index = position + 1;
        info!(course = %course_code, file = %file.display_name, "attempting to download...");
        let outcome = client
            .download_file(root, &course_code, file, index, total)
            .await;
        if outcome.is_succeeded() {
            info!(
                course = %course_code,
                file = %file.display_name,
                "[{}/{}] download completed",
                index,
                total
            );
        }
        report.record(file.display_name.clone(), outcome);
    }

    report
}

fn describe(error: &ApiError) -> String {
    match error {
        ApiError::Request { url, source } => format!("request to {} failed: {}", url, source),
        ApiError::Decode { url, source } => {
            format!("unexpected response body from {}: {}", url, source)
        }
        other => other.to_string(),
    }
}
