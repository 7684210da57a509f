//! Prelude module for Canvas Fetcher Library
//!
//! This module re-exports the most commonly used items from the library,
//! so typical usage needs a single `use canvas_fetcher::prelude::*;`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use canvas_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let token = resolve_token(None)?;
//!     let client = Arc::new(CanvasClient::new(token.token, ClientConfig::default())?);
//!     let coordinator = Coordinator::new(
//!         CoordinatorConfig::default().with_destination("courses"),
//!         client,
//!         FilterPolicy::default(),
//!     );
//!
//!     let result = coordinator.run().await?;
//!     println!("{}", result.summary());
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Essential app components
pub use crate::app::{
    CanvasClient, ClientConfig, Coordinator, CoordinatorConfig, Course, CourseFileIndex,
    DownloadOutcome, DownloadStats, ExtensionPolicy, FileDescriptor, FilterPolicy, SessionResult,
    StringSet,
};

// Configuration and credentials
pub use crate::auth::{resolve_token, ResolvedToken, TokenSource};
pub use crate::config::AppConfig;

// Commonly used constants
pub use crate::constants::{BYTES_PER_MEGABYTE, DEFAULT_HOST, ENV_TOKEN, USER_AGENT};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

pub use tokio;
