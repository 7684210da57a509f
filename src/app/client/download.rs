//! File download operations with atomic writes and streaming
//!
//! The response body is streamed into a temporary sibling of the destination
//! and renamed into place once fully written, so an interrupted download
//! never leaves a file that a later run would mistake for a complete one.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;

use crate::app::client::http::HttpHandler;
use crate::constants::files;
use crate::errors::{DownloadError, DownloadResult};

/// File download operations handler
pub struct DownloadHandler<'a> {
    http_handler: &'a HttpHandler,
}

impl<'a> DownloadHandler<'a> {
    /// Creates a new DownloadHandler with the given HTTP handler
    pub fn new(http_handler: &'a HttpHandler) -> Self {
        Self { http_handler }
    }

    /// Downloads `url` to `destination`, returning the number of bytes written
    ///
    /// Parent directories are created as needed. The caller is responsible
    /// for deciding whether an existing destination should be replaced.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is malformed
    /// - The HTTP request fails or returns a status of 400 or above
    /// - The directory or file cannot be created or written
    pub async fn download_to(&self, url: &str, destination: &Path) -> DownloadResult<u64> {
        let url = Url::parse(url).map_err(|e| DownloadError::InvalidUrl {
            url: url.to_string(),
            error: e.to_string(),
        })?;

        let response = self.http_handler.get(&url).await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(DownloadError::ServerError {
                status: status.as_u16(),
            });
        }

        if let Some(parent) = destination.parent() {
            create_dir_all(parent).await?;
        }

        let temp_path = temp_path_for(destination);
        match write_body(response, &temp_path).await {
            Ok(bytes) => {
                fs::rename(&temp_path, destination).await.map_err(|_e| {
                    DownloadError::AtomicOperationFailed {
                        temp_path: temp_path.clone(),
                        final_path: destination.to_path_buf(),
                    }
                })?;
                debug!("Wrote {} bytes to {}", bytes, destination.display());
                Ok(bytes)
            }
            Err(e) => {
                discard_temp_file(&temp_path).await;
                Err(e)
            }
        }
    }
}

/// Streams the response body into `path`
async fn write_body(mut response: reqwest::Response, path: &Path) -> DownloadResult<u64> {
    let mut file = File::create(path).await?;
    let mut written = 0_u64;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}

/// Removes a partial download; returns whether `path` is gone afterwards
async fn discard_temp_file(path: &Path) -> bool {
    match fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!("Could not remove partial download {}: {}", path.display(), e);
            false
        }
    }
}

/// Creates `dir` and its ancestors with group-writable permissions
async fn create_dir_all(dir: &Path) -> DownloadResult<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(files::DIR_PERMISSIONS);

    builder
        .create(dir)
        .await
        .map_err(|source| DownloadError::CreateDirectory {
            path: dir.to_path_buf(),
            source,
        })
}

/// `notes.pdf` becomes `notes.pdf.tmp`
fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(files::TEMP_FILE_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;
    use tempfile::tempdir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn handler() -> HttpHandler {
        HttpHandler::new(Client::new(), "tok".to_string())
    }

    #[test]
    fn test_temp_file_path_generation() {
        let temp = temp_path_for(Path::new("/tmp/CS1010/notes.pdf"));
        assert_eq!(temp, PathBuf::from("/tmp/CS1010/notes.pdf.tmp"));

        let temp = temp_path_for(Path::new("/tmp/CS1010/Makefile"));
        assert_eq!(temp, PathBuf::from("/tmp/CS1010/Makefile.tmp"));
    }

    #[tokio::test]
    async fn test_download_writes_file_and_creates_directories() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/1/download"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PDF content here".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let temp_dir = tempdir().unwrap();
        let destination = temp_dir.path().join("CS1010").join("notes.pdf");
        let http_handler = handler();
        let bytes = DownloadHandler::new(&http_handler)
            .download_to(&format!("{}/files/1/download", server.uri()), &destination)
            .await
            .unwrap();

        assert_eq!(bytes, 16);
        assert_eq!(fs::read(&destination).await.unwrap(), b"PDF content here");
        assert!(fs::metadata(temp_path_for(&destination)).await.is_err());
    }

    #[tokio::test]
    async fn test_download_error_status_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let temp_dir = tempdir().unwrap();
        let destination = temp_dir.path().join("CS1010").join("missing.pdf");
        let http_handler = handler();
        let result = DownloadHandler::new(&http_handler)
            .download_to(&format!("{}/files/2/download", server.uri()), &destination)
            .await;

        assert!(matches!(
            result,
            Err(DownloadError::ServerError { status: 404 })
        ));
        assert!(!destination.exists());
        assert!(!destination.parent().unwrap().exists());
    }

    #[tokio::test]
    async fn test_discard_temp_file_reports_leftovers() {
        let temp_dir = tempdir().unwrap();

        let partial = temp_dir.path().join("notes.pdf.tmp");
        fs::write(&partial, b"half").await.unwrap();
        assert!(discard_temp_file(&partial).await);
        assert!(fs::metadata(&partial).await.is_err());

        // Already gone is not a failure
        assert!(discard_temp_file(&partial).await);

        // A directory cannot be removed with remove_file
        let blocked = temp_dir.path().join("lab.zip.tmp");
        fs::create_dir(&blocked).await.unwrap();
        assert!(!discard_temp_file(&blocked).await);
        assert!(fs::metadata(&blocked).await.is_ok());
    }

    #[tokio::test]
    async fn test_download_invalid_url() {
        let temp_dir = tempdir().unwrap();
        let http_handler = handler();
        let result = DownloadHandler::new(&http_handler)
            .download_to("not-a-url", &temp_dir.path().join("file.bin"))
            .await;
        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_download_directory_blocked_by_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
            .mount(&server)
            .await;

        let temp_dir = tempdir().unwrap();
        // A regular file where the course directory should go
        fs::write(temp_dir.path().join("CS1010"), b"").await.unwrap();
        let destination = temp_dir.path().join("CS1010").join("notes.pdf");

        let http_handler = handler();
        let result = DownloadHandler::new(&http_handler)
            .download_to(&format!("{}/files/3/download", server.uri()), &destination)
            .await;
        assert!(matches!(result, Err(DownloadError::CreateDirectory { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_created_directory_is_not_world_writable() {
        use std::os::unix::fs::PermissionsExt;

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
            .mount(&server)
            .await;

        let temp_dir = tempdir().unwrap();
        let destination = temp_dir.path().join("CS2030").join("lab.zip");
        let http_handler = handler();
        DownloadHandler::new(&http_handler)
            .download_to(&format!("{}/files/4/download", server.uri()), &destination)
            .await
            .unwrap();

        let mode = fs::metadata(destination.parent().unwrap())
            .await
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o002, 0);
        assert_eq!(mode & 0o700, 0o700);
    }
}
