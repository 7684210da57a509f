//! Access token resolution and storage
//!
//! The token is looked up in order: command-line flag, `CANVAS_TOKEN`
//! environment variable (including a `.env` file), the `.token` file in the
//! working directory, and finally an interactive hidden prompt when stdin is
//! a terminal. The token file is written with owner-only permissions.

use std::env;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::constants::{auth, env as env_constants};
use crate::errors::{AuthError, AuthResult};

/// Where a resolved token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Flag,
    Environment,
    TokenFile,
    Prompt,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenSource::Flag => "command line",
            TokenSource::Environment => env_constants::TOKEN,
            TokenSource::TokenFile => auth::TOKEN_FILE_NAME,
            TokenSource::Prompt => "prompt",
        };
        f.write_str(name)
    }
}

/// A non-empty access token and its origin
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub token: String,
    pub source: TokenSource,
}

impl fmt::Debug for ResolvedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedToken")
            .field("token", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Authentication status information
#[derive(Debug, Clone)]
pub struct AuthStatus {
    /// Whether the token environment variable is set and non-empty
    pub env_token_set: bool,
    /// Whether the token file holds a token
    pub token_file_present: bool,
    /// Whether a prompt would be shown as a last resort
    pub interactive: bool,
}

impl AuthStatus {
    /// Get descriptive status message for display
    pub fn status_message(&self) -> String {
        match (self.env_token_set, self.token_file_present, self.interactive) {
            (true, _, _) => format!("Token available from {}", env_constants::TOKEN),
            (false, true, _) => format!("Token available from {}", auth::TOKEN_FILE_NAME),
            (false, false, true) => {
                "No stored token - you will be prompted, or run 'auth store'".to_string()
            }
            (false, false, false) => {
                "Missing token - pass --token, set CANVAS_TOKEN, or run 'auth store'".to_string()
            }
        }
    }
}

/// Resolve the token from the standard sources for this process
pub fn resolve_token(flag: Option<&str>) -> AuthResult<ResolvedToken> {
    resolve_token_from(
        flag,
        env::var(env_constants::TOKEN).ok(),
        Path::new(auth::TOKEN_FILE_NAME),
        stdin_is_terminal(),
    )
}

/// Resolve the token from explicit sources
///
/// Blank values are treated as absent so that the next source is tried.
pub fn resolve_token_from(
    flag: Option<&str>,
    env_value: Option<String>,
    token_file: &Path,
    interactive: bool,
) -> AuthResult<ResolvedToken> {
    if let Some(token) = non_blank(flag) {
        return Ok(resolved(token, TokenSource::Flag));
    }

    if let Some(token) = non_blank(env_value.as_deref()) {
        return Ok(resolved(token, TokenSource::Environment));
    }

    if let Some(token) = read_token_file(token_file)? {
        return Ok(resolved(&token, TokenSource::TokenFile));
    }

    if interactive {
        let token = prompt_token()?;
        if let Some(token) = non_blank(Some(token.as_str())) {
            return Ok(resolved(token, TokenSource::Prompt));
        }
    }

    Err(AuthError::MissingToken)
}

/// Read a stored token, `None` when the file is absent or blank
pub fn read_token_file(path: &Path) -> AuthResult<Option<String>> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No token file at {}", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    if !metadata.is_file() {
        return Err(AuthError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path)?;
    Ok(non_blank(Some(content.as_str())).map(str::to_string))
}

/// Write the token to `path`, readable and writable by the owner only
pub fn store_token(path: &Path, token: &str) -> AuthResult<()> {
    let token = non_blank(Some(token)).ok_or(AuthError::MissingToken)?;

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(auth::TOKEN_FILE_PERMISSIONS);
    }

    let mut file = options.open(path)?;
    file.write_all(token.as_bytes())?;

    // mode() only applies on creation
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(auth::TOKEN_FILE_PERMISSIONS))?;
    }

    info!("Stored access token in {}", path.display());
    Ok(())
}

/// Remove the token file; returns whether one existed
pub fn clear_token(path: &Path) -> AuthResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!("Removed token file {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Ask for the token on the terminal without echoing it
pub fn prompt_token() -> AuthResult<String> {
    rpassword::prompt_password("Canvas access token: ").map_err(|e| AuthError::Prompt {
        reason: e.to_string(),
    })
}

/// Check current authentication status for the token file at `path`
pub fn get_auth_status_at(path: &Path) -> AuthStatus {
    AuthStatus {
        env_token_set: non_blank(env::var(env_constants::TOKEN).ok().as_deref()).is_some(),
        token_file_present: matches!(read_token_file(path), Ok(Some(_))),
        interactive: stdin_is_terminal(),
    }
}

/// Check current authentication status
pub fn get_auth_status() -> AuthStatus {
    get_auth_status_at(Path::new(auth::TOKEN_FILE_NAME))
}

/// Print current authentication status
pub fn show_auth_status() {
    let status = get_auth_status();

    println!("Canvas Authentication Status");
    println!("============================");
    println!();
    println!(
        "{}: {}",
        env_constants::TOKEN,
        if status.env_token_set { "Set" } else { "Not set" }
    );
    println!(
        "{} file: {}",
        auth::TOKEN_FILE_NAME,
        if status.token_file_present {
            "Present"
        } else {
            "Not found"
        }
    );
    println!();
    println!("Status: {}", status.status_message());
}

fn stdin_is_terminal() -> bool {
    atty::is(atty::Stream::Stdin)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn resolved(token: &str, source: TokenSource) -> ResolvedToken {
    debug!("Using access token from {}", source);
    ResolvedToken {
        token: token.to_string(),
        source,
    }
}
