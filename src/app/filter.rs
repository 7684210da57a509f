//! File filtering by extension and size
//!
//! Each course's file list is reduced in place before any download starts.
//! A file survives only if it passes both the extension policy and the size
//! ceiling; surviving files keep their original order.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::app::models::{CourseFileIndex, FileDescriptor};
use crate::app::stringset::StringSet;
use crate::constants::filter::{BYTES_PER_MEGABYTE, DEFAULT_MAX_SIZE_MB, EXTENSION_LIST_SEPARATOR};

/// Which extensions are eligible for download
///
/// Only one mode is active per policy. An empty allow-set and an empty
/// deny-set both admit every file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionPolicy {
    /// Only listed extensions survive (all survive when empty)
    Allow(StringSet),
    /// Listed extensions are rejected
    Deny(StringSet),
}

/// Selects the extension policy mode in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionMode {
    #[default]
    Allow,
    Deny,
}

impl ExtensionPolicy {
    /// Policy that admits every extension
    pub fn allow_all() -> Self {
        ExtensionPolicy::Allow(StringSet::new())
    }

    pub fn allow<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ExtensionPolicy::Allow(normalized_set(extensions))
    }

    pub fn deny<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ExtensionPolicy::Deny(normalized_set(extensions))
    }

    /// Build a policy for the given mode
    pub fn with_mode<I, S>(mode: ExtensionMode, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match mode {
            ExtensionMode::Allow => Self::allow(extensions),
            ExtensionMode::Deny => Self::deny(extensions),
        }
    }

    /// Whether a file with this extension may be downloaded
    pub fn permits(&self, extension: &str) -> bool {
        let extension = normalize_extension(extension);
        match self {
            ExtensionPolicy::Allow(set) => set.is_empty() || set.contains(&extension),
            ExtensionPolicy::Deny(set) => !set.contains(&extension),
        }
    }
}

impl Default for ExtensionPolicy {
    fn default() -> Self {
        Self::allow_all()
    }
}

impl fmt::Display for ExtensionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionPolicy::Allow(set) if set.is_empty() => f.write_str("any extension"),
            ExtensionPolicy::Allow(set) => write!(f, "only {}", set.to_sorted_vec().join(", ")),
            ExtensionPolicy::Deny(set) if set.is_empty() => f.write_str("any extension"),
            ExtensionPolicy::Deny(set) => write!(f, "all but {}", set.to_sorted_vec().join(", ")),
        }
    }
}

/// Why a file was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Extension { extension: String },
    Size { size: u64, max_size_bytes: u64 },
}

/// Extension and size rules applied before download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPolicy {
    extensions: ExtensionPolicy,
    max_size_bytes: u64,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self::from_megabytes(DEFAULT_MAX_SIZE_MB, ExtensionPolicy::allow_all())
    }
}

impl FilterPolicy {
    /// Create a policy with a ceiling given in bytes
    pub fn new(max_size_bytes: u64, extensions: ExtensionPolicy) -> Self {
        Self {
            extensions,
            max_size_bytes,
        }
    }

    /// Create a policy with a ceiling given in decimal megabytes
    pub fn from_megabytes(max_size_mb: u64, extensions: ExtensionPolicy) -> Self {
        Self::new(max_size_mb.saturating_mul(BYTES_PER_MEGABYTE), extensions)
    }

    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    pub fn extensions(&self) -> &ExtensionPolicy {
        &self.extensions
    }

    /// Check a single file against both rules, extension first
    pub fn evaluate(&self, file: &FileDescriptor) -> Result<(), Rejection> {
        let extension = file.extension();
        if !self.extensions.permits(extension) {
            return Err(Rejection::Extension {
                extension: extension.to_string(),
            });
        }

        if file.size > self.max_size_bytes {
            return Err(Rejection::Size {
                size: file.size,
                max_size_bytes: self.max_size_bytes,
            });
        }

        Ok(())
    }

    /// Keep the files of one course that pass the policy, logging each rejection
    pub fn filter_files(
        &self,
        course_code: &str,
        files: Vec<FileDescriptor>,
        report: &mut FilterReport,
    ) -> Vec<FileDescriptor> {
        let mut kept = Vec::with_capacity(files.len());
        for file in files {
            match self.evaluate(&file) {
                Ok(()) => {
                    report.kept += 1;
                    kept.push(file);
                }
                Err(Rejection::Extension { extension }) => {
                    report.rejected_extension += 1;
                    warn!(
                        course = %course_code,
                        file = %file.display_name,
                        extension = %extension,
                        "extension not permitted, skipping"
                    );
                }
                Err(Rejection::Size {
                    size,
                    max_size_bytes,
                }) => {
                    report.rejected_size += 1;
                    warn!(
                        course = %course_code,
                        file = %file.display_name,
                        size,
                        max_size_bytes,
                        "file larger than {} bytes, skipping",
                        max_size_bytes
                    );
                }
            }
        }
        kept
    }
}

/// Counts produced by a filter pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReport {
    pub kept: usize,
    pub rejected_extension: usize,
    pub rejected_size: usize,
}

impl FilterReport {
    pub fn rejected(&self) -> usize {
        self.rejected_extension + self.rejected_size
    }
}

/// Replace every course's file list with the subset that passes `policy`
pub fn filter_index(index: &mut CourseFileIndex, policy: &FilterPolicy) -> FilterReport {
    let mut report = FilterReport::default();
    for (course_code, files) in index.iter_mut() {
        let original = std::mem::take(files);
        *files = policy.filter_files(course_code, original, &mut report);
        debug!(course = %course_code, kept = files.len(), "filtered course files");
    }
    report
}

/// Canonical form of an extension: trimmed, no leading dot, lower-case
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

/// Parse a comma-separated extension list such as `"pdf, .PPTX,,docx"`
pub fn parse_extension_list(list: &str) -> Vec<String> {
    list.split(EXTENSION_LIST_SEPARATOR)
        .map(normalize_extension)
        .filter(|ext| !ext.is_empty())
        .collect()
}

fn normalized_set<I, S>(extensions: I) -> StringSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    extensions
        .into_iter()
        .map(|ext| normalize_extension(ext.as_ref()))
        .filter(|ext| !ext.is_empty())
        .collect()
}
