//! Error types for Canvas Fetcher
//!
//! This module defines the error types for all components of the application.
//! Listing errors abort a run; download errors are scoped to a single file and
//! are turned into a failed outcome by the client, so they never reach
//! `AppError`.

use std::path::PathBuf;
use thiserror::Error;

/// Credential resolution and storage errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// No token could be resolved from any source
    #[error(
        "Missing Canvas access token. Pass --token, set CANVAS_TOKEN, or store one with 'auth store'"
    )]
    MissingToken,

    /// Token file exists but is not a regular file
    #[error("Token path is not a file: {path}")]
    NotAFile { path: PathBuf },

    /// File I/O error during token storage or retrieval
    #[error("Failed to access token file")]
    TokenStorage(#[from] std::io::Error),

    /// Interactive prompt failed
    #[error("Failed to read token from terminal: {reason}")]
    Prompt { reason: String },

    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client")]
    Http(#[from] reqwest::Error),
}

/// Canvas API listing errors (fatal for the run or the course)
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request could not be built or the transport failed
    #[error("Request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with an error status
    #[error("Canvas returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// Response body did not have the expected shape
    #[error("Unexpected response body from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Endpoint URL could not be built
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },
}

/// Per-file download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// I/O error during file operations
    #[error("File I/O error")]
    Io(#[from] std::io::Error),

    /// Invalid download link
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Server returned error status
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// Destination directory could not be created
    #[error("Could not create directory {path}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Atomic file operation failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Mutually exclusive options were both given
    #[error("Conflicting options: {0}")]
    Conflict(String),
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Listing error
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "authentication",
            AppError::Api(_) => "api",
            AppError::Config(_) => "config",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Authentication result type alias
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Listing result type alias
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
