//! Download statistics and session results
//!
//! This module handles per-course reports and the aggregate statistics of a
//! download session.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::filter::FilterReport;
use crate::app::models::DownloadOutcome;

/// Outcome of one file within a course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileResult {
    /// Display name of the file
    pub display_name: String,
    /// What happened
    pub outcome: DownloadOutcome,
}

/// What a single course task did, in download order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseReport {
    /// Course code the files were stored under
    pub course_code: String,
    /// One entry per attempted file
    pub files: Vec<FileResult>,
    /// Files left untouched because shutdown was requested
    pub not_attempted: usize,
}

impl CourseReport {
    pub fn new(course_code: impl Into<String>) -> Self {
        Self {
            course_code: course_code.into(),
            files: Vec::new(),
            not_attempted: 0,
        }
    }

    /// Record the outcome of the next file
    pub fn record(&mut self, display_name: impl Into<String>, outcome: DownloadOutcome) {
        self.files.push(FileResult {
            display_name: display_name.into(),
            outcome,
        });
    }

    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_succeeded()).count()
    }

    pub fn skipped(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_failed()).count()
    }

    /// Bytes written by successful downloads
    pub fn bytes_downloaded(&self) -> u64 {
        self.files
            .iter()
            .map(|f| match f.outcome {
                DownloadOutcome::Succeeded { bytes } => bytes,
                _ => 0,
            })
            .sum()
    }

    /// Outcome of the named file, if it was attempted
    pub fn outcome_of(&self, display_name: &str) -> Option<&DownloadOutcome> {
        self.files
            .iter()
            .find(|f| f.display_name == display_name)
            .map(|f| &f.outcome)
    }
}

/// Course whose file listing failed during discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingFailure {
    pub course_code: String,
    pub error: String,
}

/// Aggregated download statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadStats {
    /// Courses that had a download task
    pub total_courses: usize,
    /// Files handed to the download phase
    pub total_files: usize,
    /// Files successfully downloaded
    pub files_succeeded: usize,
    /// Files already present on disk
    pub files_skipped: usize,
    /// Files that failed
    pub files_failed: usize,
    /// Files not attempted due to shutdown
    pub files_not_attempted: usize,
    /// Course tasks cancelled by a second shutdown signal
    pub courses_aborted: usize,
    /// Total bytes written
    pub bytes_downloaded: u64,
    /// Start time of the download session
    pub session_start: DateTime<Utc>,
    /// Duration of the download phase
    pub session_duration: Duration,
}

impl Default for DownloadStats {
    fn default() -> Self {
        Self {
            total_courses: 0,
            total_files: 0,
            files_succeeded: 0,
            files_skipped: 0,
            files_failed: 0,
            files_not_attempted: 0,
            courses_aborted: 0,
            bytes_downloaded: 0,
            session_start: Utc::now(),
            session_duration: Duration::ZERO,
        }
    }
}

impl DownloadStats {
    /// Fold one course report into the totals
    pub fn add_course(&mut self, report: &CourseReport) {
        self.files_succeeded += report.succeeded();
        self.files_skipped += report.skipped();
        self.files_failed += report.failed();
        self.files_not_attempted += report.not_attempted;
        self.bytes_downloaded += report.bytes_downloaded();
    }

    /// Files that reached a terminal outcome
    pub fn total_processed(&self) -> usize {
        self.files_succeeded + self.files_skipped + self.files_failed
    }

    /// Update session duration from start time
    pub fn update_duration(&mut self) {
        self.session_duration = Utc::now()
            .signed_duration_since(self.session_start)
            .to_std()
            .unwrap_or(Duration::ZERO);
    }

    /// Average throughput of the session in bytes per second
    pub fn download_rate_bps(&self) -> f64 {
        let secs = self.session_duration.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.bytes_downloaded as f64 / secs
    }
}

/// Final result of a download session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResult {
    /// Aggregate statistics
    pub stats: DownloadStats,
    /// One report per course, ordered by course code
    pub courses: Vec<CourseReport>,
    /// Courses excluded because their file listing failed
    pub listing_failures: Vec<ListingFailure>,
    /// Course tasks that panicked
    pub task_failures: Vec<String>,
    /// Result of the filter stage
    pub filter: FilterReport,
    /// Whether shutdown was requested while downloading
    pub interrupted: bool,
}

impl SessionResult {
    /// True when every course was listed and every file is on disk
    pub fn success(&self) -> bool {
        self.stats.files_failed == 0
            && self.listing_failures.is_empty()
            && self.task_failures.is_empty()
            && !self.interrupted
    }

    /// Report for one course
    pub fn course(&self, course_code: &str) -> Option<&CourseReport> {
        self.courses.iter().find(|c| c.course_code == course_code)
    }

    /// Multi-line human readable summary
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "{} downloaded, {} already present, {} failed across {} course(s) ({} bytes in {:.1}s, {:.0} B/s)",
            self.stats.files_succeeded,
            self.stats.files_skipped,
            self.stats.files_failed,
            self.stats.total_courses,
            self.stats.bytes_downloaded,
            self.stats.session_duration.as_secs_f64(),
            self.stats.download_rate_bps()
        )];

        if self.filter.rejected() > 0 {
            lines.push(format!(
                "{} file(s) filtered out ({} by extension, {} by size)",
                self.filter.rejected(),
                self.filter.rejected_extension,
                self.filter.rejected_size
            ));
        }
        for failure in &self.listing_failures {
            lines.push(format!(
                "Could not list files for {}: {}",
                failure.course_code, failure.error
            ));
        }
        for course in &self.courses {
            for file in course.files.iter().filter(|f| f.outcome.is_failed()) {
                lines.push(format!(
                    "{}/{}: {}",
                    course.course_code, file.display_name, file.outcome
                ));
            }
        }
        if self.interrupted {
            lines.push(format!(
                "Interrupted: {} file(s) not attempted",
                self.stats.files_not_attempted
            ));
        }
        if self.stats.courses_aborted > 0 {
            lines.push(format!(
                "Aborted: {} course download(s) cancelled mid-file",
                self.stats.courses_aborted
            ));
        }

        lines.join("\n")
    }
}
