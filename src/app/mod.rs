//! Core application logic for Canvas Fetcher
//!
//! This module contains the main application components: the Canvas API
//! client, data models, file filtering, and download orchestration.
//!
//! # Examples
//!
//! ```rust,no_run
//! use canvas_fetcher::app::{CanvasClient, ClientConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CanvasClient::new("my-token", ClientConfig::default())?;
//!
//! for course in client.list_enrolled_courses().await? {
//!     let files = client.list_files_in_course(&course).await?;
//!     println!("{}: {} file(s)", course.course_code, files.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod coordinator;
pub mod filter;
pub mod models;
pub mod stringset;

// Re-export main public API
pub use client::{CanvasClient, ClientConfig};
pub use coordinator::{
    Coordinator, CoordinatorConfig, CourseReport, Discovery, DownloadStats, PlannedFile,
    SessionResult,
};
pub use filter::{ExtensionMode, ExtensionPolicy, FilterPolicy, FilterReport};
pub use models::{Course, CourseFileIndex, DownloadOutcome, FileDescriptor};
pub use stringset::StringSet;
