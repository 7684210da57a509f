//! Data models for Canvas Fetcher
//!
//! This module defines the core data structures used throughout the application:
//! courses and file descriptors as returned by the Canvas API, the per-course
//! file index built before downloading, and the outcome of a download attempt.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::files;

/// An actively-enrolled course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Canvas course identifier
    pub id: u64,
    /// Human-readable course code (e.g. "CS1010")
    pub course_code: String,
}

/// Metadata for one downloadable file attached to a course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Canvas file identifier
    pub id: u64,
    /// Canvas folder identifier
    pub folder_id: u64,
    /// Name shown in the Canvas UI; used as the on-disk name
    pub display_name: String,
    /// Escaped storage name
    pub filename: String,
    /// MIME type reported by Canvas
    #[serde(rename = "content-type")]
    pub content_type: String,
    /// Direct download link
    pub url: String,
    /// Declared size in bytes
    pub size: u64,
}

impl FileDescriptor {
    /// Text after the last `.` of the display name
    ///
    /// A name without any `.` is its own extension, so `README` yields
    /// `README`.
    pub fn extension(&self) -> &str {
        self.display_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.display_name)
    }
}

/// Result of a single download attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadOutcome {
    /// Destination already existed; nothing was fetched
    Skipped,
    /// File was fetched and fully written
    Succeeded { bytes: u64 },
    /// Attempt failed; the destination was left untouched
    Failed { reason: String },
}

impl DownloadOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, DownloadOutcome::Skipped)
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, DownloadOutcome::Succeeded { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DownloadOutcome::Failed { .. })
    }
}

impl fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadOutcome::Skipped => write!(f, "skipped"),
            DownloadOutcome::Succeeded { bytes } => write!(f, "downloaded ({} bytes)", bytes),
            DownloadOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Files to download, grouped by course directory
///
/// Keys are course codes after [`sanitize_component`], so two codes that
/// would share a directory (`A/B` and `A_B`) share one entry and one task.
/// Iteration is ordered by key; each course keeps the order in which Canvas
/// listed its files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseFileIndex {
    courses: BTreeMap<String, Vec<FileDescriptor>>,
}

impl CourseFileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a course's files, appending if its directory is already present
    ///
    /// Returns `false` when the directory was already indexed.
    pub fn insert(&mut self, course_code: impl AsRef<str>, files: Vec<FileDescriptor>) -> bool {
        match self.courses.entry(sanitize_component(course_code.as_ref())) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(files);
                true
            }
            btree_map::Entry::Occupied(mut entry) => {
                entry.get_mut().extend(files);
                false
            }
        }
    }

    pub fn get(&self, course_code: &str) -> Option<&[FileDescriptor]> {
        self.courses
            .get(&sanitize_component(course_code))
            .map(Vec::as_slice)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Vec<FileDescriptor>> {
        self.courses.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, String, Vec<FileDescriptor>> {
        self.courses.iter_mut()
    }

    /// Number of courses
    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    /// Number of files across all courses
    pub fn total_files(&self) -> usize {
        self.courses.values().map(Vec::len).sum()
    }

    /// Sum of declared sizes across all courses
    pub fn total_bytes(&self) -> u64 {
        self.courses
            .values()
            .flat_map(|files| files.iter().map(|f| f.size))
            .sum()
    }
}

impl IntoIterator for CourseFileIndex {
    type Item = (String, Vec<FileDescriptor>);
    type IntoIter = btree_map::IntoIter<String, Vec<FileDescriptor>>;

    fn into_iter(self) -> Self::IntoIter {
        self.courses.into_iter()
    }
}

impl FromIterator<(String, Vec<FileDescriptor>)> for CourseFileIndex {
    fn from_iter<I: IntoIterator<Item = (String, Vec<FileDescriptor>)>>(iter: I) -> Self {
        let mut index = Self::new();
        for (code, files) in iter {
            index.insert(code, files);
        }
        index
    }
}

/// Make a remote name safe to use as a single path component
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => files::PATH_REPLACEMENT,
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        return files::PATH_REPLACEMENT.to_string().repeat(cleaned.len().max(1));
    }
    cleaned
}

/// Destination of a file: `<root>/<course code>/<display name>`
pub fn destination_path(root: &Path, course_code: &str, file: &FileDescriptor) -> PathBuf {
    root.join(sanitize_component(course_code))
        .join(sanitize_component(&file.display_name))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::FileDescriptor;

    /// File descriptor with a predictable download link under `base_url`
    pub fn file(id: u64, display_name: &str, size: u64, base_url: &str) -> FileDescriptor {
        FileDescriptor {
            id,
            folder_id: 1,
            display_name: display_name.to_string(),
            filename: display_name.replace(' ', "+"),
            content_type: "application/octet-stream".to_string(),
            url: format!("{}/files/{}/download", base_url, id),
            size,
        }
    }
}
