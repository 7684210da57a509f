//! Access token management for Canvas
//!
//! This module resolves the bearer token used for every API call and manages
//! the `.token` file it can be stored in.
//!
//! # Examples
//!
//! ```rust,no_run
//! use canvas_fetcher::auth::resolve_token;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Flag, then CANVAS_TOKEN, then .token, then a prompt on a terminal
//! let resolved = resolve_token(None)?;
//! println!("Using token from {}", resolved.source);
//! # Ok(())
//! # }
//! ```

pub mod credentials;

// Re-export main public API
pub use credentials::{
    clear_token, get_auth_status, get_auth_status_at, prompt_token, read_token_file,
    resolve_token, resolve_token_from, show_auth_status, store_token, AuthStatus, ResolvedToken,
    TokenSource,
};
