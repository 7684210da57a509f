//! Application constants for Canvas Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names
pub mod env {
    /// Environment variable holding the Canvas access token
    pub const TOKEN: &str = "CANVAS_TOKEN";
}

/// Canvas LMS endpoints and defaults
pub mod canvas {
    /// Default Canvas host
    pub const DEFAULT_HOST: &str = "canvas.nus.edu.sg";

    /// Default REST API path prefix
    pub const DEFAULT_API_PATH: &str = "/api/v1";

    /// Scheme used when the configured host carries none
    pub const DEFAULT_SCHEME: &str = "https";

    /// Enrolled course listing, relative to the API prefix
    pub const ENROLLED_COURSES_PATH: &str = "/users/self/courses";

    /// Query parameter restricting the listing to active enrollments
    pub const ENROLLMENT_STATE_PARAM: (&str, &str) = ("enrollment_state", "active");
}

/// Credential storage constants
pub mod auth {
    /// Token file, relative to the working directory
    pub const TOKEN_FILE_NAME: &str = ".token";

    /// File permissions for the token file (Unix only) - owner read/write only
    #[cfg(unix)]
    pub const TOKEN_FILE_PERMISSIONS: u32 = 0o600;
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("Canvas-Fetcher/", env!("CARGO_PKG_VERSION"));

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 16;
}

/// File operation constants
pub mod files {
    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Permissions for created course directories (Unix only)
    #[cfg(unix)]
    pub const DIR_PERMISSIONS: u32 = 0o775;

    /// Default download root (the working directory)
    pub const DEFAULT_DESTINATION: &str = ".";

    /// Replacement for characters that cannot appear in a path component
    pub const PATH_REPLACEMENT: char = '_';
}

/// File filter constants
pub mod filter {
    /// Bytes per configured megabyte (decimal, not binary)
    pub const BYTES_PER_MEGABYTE: u64 = 1_000_000;

    /// Default maximum file size in megabytes
    pub const DEFAULT_MAX_SIZE_MB: u64 = 100;

    /// Separator for extension lists given on the command line
    pub const EXTENSION_LIST_SEPARATOR: char = ',';
}

/// Configuration file locations
pub mod config {
    /// Project-local configuration file
    pub const LOCAL_CONFIG_FILE: &str = "canvas-fetcher.toml";

    /// Directory under the user config dir
    pub const CONFIG_DIR_NAME: &str = "canvas-fetcher";

    /// File name under the user config dir
    pub const CONFIG_FILE_NAME: &str = "config.toml";
}

/// Logging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "info";

    /// Crate target used for the log filter directive
    pub const LOG_TARGET: &str = "canvas_fetcher";
}

// Re-export commonly used constants for convenience
pub use canvas::{DEFAULT_API_PATH, DEFAULT_HOST};
pub use env::TOKEN as ENV_TOKEN;
pub use filter::{BYTES_PER_MEGABYTE, DEFAULT_MAX_SIZE_MB};
pub use http::USER_AGENT;
