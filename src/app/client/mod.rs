//! HTTP client implementation for Canvas LMS interaction
//!
//! This module provides the authenticated client used for course discovery,
//! file listing and file downloads.
//!
//! The module is organized into specialized components:
//! - `config`: where the API lives and how the transport is built
//! - `http`: authenticated requests and JSON decoding
//! - `download`: file download operations with atomic writes

use std::path::Path;

use tracing::{debug, error, info};
use url::Url;

use crate::app::models::{destination_path, Course, DownloadOutcome, FileDescriptor};
use crate::constants::canvas;
use crate::errors::{ApiError, ApiResult, AuthError, Result};

// Module declarations
pub mod config;
pub mod download;
pub mod http;

pub use config::ClientConfig;

use download::DownloadHandler;
use http::HttpHandler;

/// HTTP client for the Canvas REST API
///
/// Every request carries the bearer token given at construction.
#[derive(Debug)]
pub struct CanvasClient {
    http_handler: HttpHandler,
    base_url: Url,
}

impl CanvasClient {
    /// Creates a new CanvasClient
    ///
    /// # Arguments
    ///
    /// * `token` - Canvas access token
    /// * `config` - Host, API prefix and transport settings
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingToken` for a blank token, `ApiError` if the
    /// host and prefix do not form a URL, or `AuthError::Http` if the HTTP
    /// client cannot be built
    pub fn new(token: impl Into<String>, config: ClientConfig) -> Result<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(AuthError::MissingToken.into());
        }

        let base_url = config.api_base_url()?;
        let client = config.build_http_client()?;
        debug!("Created Canvas client for {}", base_url);

        Ok(Self {
            http_handler: HttpHandler::new(client, token),
            base_url,
        })
    }

    /// Lists the courses the token's user is actively enrolled in
    ///
    /// Courses are returned in server order. The codes are logged sorted.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure, HTTP status of 400 or above,
    /// or an undecodable body
    pub async fn list_enrolled_courses(&self) -> ApiResult<Vec<Course>> {
        let mut url = self.endpoint(canvas::ENROLLED_COURSES_PATH)?;
        let (key, value) = canvas::ENROLLMENT_STATE_PARAM;
        url.query_pairs_mut().append_pair(key, value);

        debug!("Requesting enrolled courses from {}", url);
        let courses: Vec<Course> = self.http_handler.get_json(&url).await?;

        let mut codes: Vec<&str> = courses.iter().map(|c| c.course_code.as_str()).collect();
        codes.sort_unstable();
        info!(courses = %codes.join(","), "obtained enrolled courses");

        Ok(courses)
    }

    /// Lists the files attached to one course
    ///
    /// # Errors
    ///
    /// Same as [`CanvasClient::list_enrolled_courses`], scoped to the course
    pub async fn list_files_in_course(&self, course: &Course) -> ApiResult<Vec<FileDescriptor>> {
        let url = self.endpoint(&format!("/courses/{}/files", course.id))?;

        debug!(id = course.id, course = %course.course_code, "requesting files");
        let files: Vec<FileDescriptor> = self.http_handler.get_json(&url).await?;
        info!(
            course = %course.course_code,
            files = files.len(),
            "obtained course file info"
        );

        Ok(files)
    }

    /// Downloads one file to `<root>/<course code>/<display name>`
    ///
    /// `index` and `total` are only used for the `[index/total]` log prefix.
    /// An existing destination is never touched and no request is made for
    /// it. Failures are logged and reported as [`DownloadOutcome::Failed`].
    pub async fn download_file(
        &self,
        root: &Path,
        course_code: &str,
        file: &FileDescriptor,
        index: usize,
        total: usize,
    ) -> DownloadOutcome {
        let path = destination_path(root, course_code, file);
        if tokio::fs::metadata(&path).await.is_ok() {
            info!(path = %path.display(), "[{}/{}] file exists, skipping", index, total);
            return DownloadOutcome::Skipped;
        }

        match DownloadHandler::new(&self.http_handler)
            .download_to(&file.url, &path)
            .await
        {
            Ok(bytes) => DownloadOutcome::Succeeded { bytes },
            Err(e) => {
                let reason = error_chain(&e);
                error!(
                    course = %course_code,
                    file = %file.display_name,
                    path = %path.display(),
                    error = %reason,
                    "[{}/{}] unable to download",
                    index,
                    total
                );
                DownloadOutcome::Failed { reason }
            }
        }
    }

    /// Base URL of the API, always ending in `/`
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl {
                url: format!("{}{}", self.base_url, path),
                error: e.to_string(),
            })
    }
}

/// Render an error with its sources, `outer: inner: innermost`
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
