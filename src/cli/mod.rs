//! Command-line interface components
//!
//! This module contains CLI-specific code for the Canvas Fetcher application:
//! argument parsing and the command handlers.

pub mod args;
pub mod commands;

pub use args::{AuthAction, AuthArgs, Cli, Commands, ConnectionArgs, DownloadArgs, GlobalArgs};
pub use commands::{handle_auth, handle_courses, handle_download};
