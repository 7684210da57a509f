//! Configuration structures for the download coordinator
//!
//! This module defines where downloads land, how listing failures are
//! handled, and whether OS signals request a graceful stop.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::files;

/// Configuration for the download coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Directory under which one folder per course code is created
    pub destination_root: PathBuf,
    /// Abort discovery on the first course whose file listing fails
    pub fail_fast: bool,
    /// Install Ctrl+C / SIGTERM handlers while downloading
    pub handle_signals: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            destination_root: PathBuf::from(files::DEFAULT_DESTINATION),
            fail_fast: false,
            handle_signals: true,
        }
    }
}

impl CoordinatorConfig {
    /// Download into another directory
    pub fn with_destination(mut self, root: impl Into<PathBuf>) -> Self {
        self.destination_root = root.into();
        self
    }

    /// Abort the whole run when any course's file listing fails
    pub fn with_fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    /// Enable or disable OS signal handling
    pub fn with_signal_handling(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.destination_root.as_os_str().is_empty() {
            return Err("Destination directory cannot be empty".to_string());
        }

        if self.destination_root.is_file() {
            return Err(format!(
                "Destination {} is a file, not a directory",
                self.destination_root.display()
            ));
        }

        Ok(())
    }
}
