//! Canvas Fetcher Library
//!
//! A Rust library for downloading the files of every course a user is
//! actively enrolled in on a Canvas LMS instance. Courses download
//! concurrently, files already on disk are skipped, and a failed file never
//! stops the rest.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
