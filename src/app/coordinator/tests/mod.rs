//! Unit tests for the coordinator
//!
//! Every test talks to a local mock Canvas server and downloads into a
//! temporary directory. End-to-end runs through the CLI layer live in the
//! top-level tests directory.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::app::client::{CanvasClient, ClientConfig};
use crate::app::filter::{ExtensionPolicy, FilterPolicy};
use crate::app::models::test_support::file;
use crate::app::models::{CourseFileIndex, DownloadOutcome};
use crate::errors::ApiError;

use super::*;

/// Coordinator pointed at `server`, writing into `root`, without signal handlers
fn create_test_coordinator(server: &MockServer, root: &TempDir) -> Coordinator {
    create_coordinator_with(server, root, false, FilterPolicy::default())
}

fn create_coordinator_with(
    server: &MockServer,
    root: &TempDir,
    fail_fast: bool,
    filter: FilterPolicy,
) -> Coordinator {
    let client = CanvasClient::new("test-token", ClientConfig::default().with_host(server.uri()))
        .unwrap();
    let config = CoordinatorConfig::default()
        .with_destination(root.path())
        .with_fail_fast(fail_fast)
        .with_signal_handling(false);
    Coordinator::new(config, Arc::new(client), filter)
}

async fn mount_courses(server: &MockServer, courses: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/v1/users/self/courses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(courses))
        .mount(server)
        .await;
}

async fn mount_files(server: &MockServer, course_id: u64, files: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/courses/{}/files", course_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(files))
        .mount(server)
        .await;
}

async fn mount_body(server: &MockServer, file_id: u64, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{}/download", file_id)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

/// Poll the mock server until it has seen a request for `request_path`
async fn wait_for_request(server: &MockServer, request_path: &str) {
    for _ in 0..500 {
        let requests = server.received_requests().await.unwrap_or_default();
        if requests.iter().any(|r| r.url.path() == request_path) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no request for {} arrived", request_path);
}

fn file_json(server: &MockServer, id: u64, name: &str, size: u64) -> serde_json::Value {
    json!({
        "id": id,
        "folder_id": 1,
        "display_name": name,
        "filename": name,
        "content-type": "application/octet-stream",
        "url": format!("{}/files/{}/download", server.uri(), id),
        "size": size
    })
}

#[tokio::test]
async fn test_failed_file_does_not_stop_siblings() {
    let server = MockServer::start().await;
    mount_body(&server, 1, b"first").await;
    Mock::given(method("GET"))
        .and(path("/files/2/download"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_body(&server, 3, b"third").await;

    let root = TempDir::new().unwrap();
    let coordinator = create_test_coordinator(&server, &root);
    let index: CourseFileIndex = [(
        "CS1010".to_string(),
        vec![
            file(1, "a.pdf", 5, &server.uri()),
            file(2, "b.pdf", 5, &server.uri()),
            file(3, "c.pdf", 5, &server.uri()),
        ],
    )]
    .into_iter()
    .collect();

    let result = coordinator.download_all(index).await;

    let report = result.course("CS1010").unwrap();
    assert_eq!(report.files.len(), 3);
    assert!(report.outcome_of("a.pdf").unwrap().is_succeeded());
    assert!(report.outcome_of("b.pdf").unwrap().is_failed());
    assert!(report.outcome_of("c.pdf").unwrap().is_succeeded());
    assert_eq!(result.stats.files_failed, 1);
    assert!(!result.success());

    assert_eq!(std::fs::read(root.path().join("CS1010/a.pdf")).unwrap(), b"first");
    assert!(!root.path().join("CS1010/b.pdf").exists());
    assert!(!root.path().join("CS1010/b.pdf.tmp").exists());
    assert_eq!(std::fs::read(root.path().join("CS1010/c.pdf")).unwrap(), b"third");
}

#[tokio::test]
async fn test_empty_course_does_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let coordinator = create_test_coordinator(&server, &root);
    let index: CourseFileIndex = [("GEA1000".to_string(), Vec::new())].into_iter().collect();

    let result = coordinator.download_all(index).await;

    assert!(result.success());
    assert_eq!(result.stats.total_courses, 1);
    assert_eq!(result.stats.total_processed(), 0);
    assert!(!root.path().join("GEA1000").exists());
}

#[tokio::test]
async fn test_second_run_skips_existing_files() {
    let server = MockServer::start().await;
    mount_courses(&server, json!([{"id": 1, "course_code": "CS1010"}])).await;
    mount_files(
        &server,
        1,
        json!([file_json(&server, 10, "notes.pdf", 4), file_json(&server, 11, "lab.zip", 3)]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/files/10/download"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ABCD".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/11/download"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"xyz".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let coordinator = create_test_coordinator(&server, &root);

    let first = coordinator.run().await.unwrap();
    assert!(first.success());
    assert_eq!(first.stats.files_succeeded, 2);
    assert_eq!(first.stats.bytes_downloaded, 7);

    let second = coordinator.run().await.unwrap();
    assert!(second.success());
    assert_eq!(second.stats.files_succeeded, 0);
    assert_eq!(second.stats.files_skipped, 2);
    assert_eq!(
        std::fs::read(root.path().join("CS1010/notes.pdf")).unwrap(),
        b"ABCD"
    );
    assert_eq!(std::fs::read(root.path().join("CS1010/lab.zip")).unwrap(), b"xyz");
}

#[tokio::test]
async fn test_listing_failure_excludes_only_that_course() {
    let server = MockServer::start().await;
    mount_courses(
        &server,
        json!([
            {"id": 1, "course_code": "CS1010"},
            {"id": 2, "course_code": "MA1521"}
        ]),
    )
    .await;
    mount_files(&server, 1, json!([file_json(&server, 10, "notes.pdf", 2)])).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/courses/2/files"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    mount_body(&server, 10, b"ok").await;

    let root = TempDir::new().unwrap();
    let coordinator = create_test_coordinator(&server, &root);

    let discovery = coordinator.discover().await.unwrap();
    assert_eq!(discovery.index.len(), 1);
    assert!(discovery.index.get("MA1521").is_none());
    assert_eq!(discovery.listing_failures.len(), 1);
    assert_eq!(discovery.listing_failures[0].course_code, "MA1521");

    let result = coordinator.run().await.unwrap();
    assert_eq!(result.stats.files_succeeded, 1);
    assert_eq!(result.listing_failures.len(), 1);
    assert!(!result.success());
    assert!(root.path().join("CS1010/notes.pdf").exists());
    assert!(!root.path().join("MA1521").exists());
}

#[tokio::test]
async fn test_listing_failure_with_fail_fast_aborts() {
    let server = MockServer::start().await;
    mount_courses(
        &server,
        json!([
            {"id": 1, "course_code": "CS1010"},
            {"id": 2, "course_code": "MA1521"}
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/courses/1/files"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/courses/2/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let coordinator = create_coordinator_with(&server, &root, true, FilterPolicy::default());

    let result = coordinator.discover().await;
    assert!(matches!(result, Err(ApiError::Status { status: 500, .. })));
}

#[tokio::test]
async fn test_course_listing_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/self/courses"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let coordinator = create_test_coordinator(&server, &root);

    let result = coordinator.run().await;
    assert!(matches!(
        result,
        Err(AppError::Api(ApiError::Status { status: 401, .. }))
    ));
}

#[tokio::test]
async fn test_shutdown_before_start_attempts_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
        .expect(0)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let coordinator = create_test_coordinator(&server, &root);
    let index: CourseFileIndex = [
        (
            "CS1010".to_string(),
            vec![file(1, "a.pdf", 4, &server.uri()), file(2, "b.pdf", 4, &server.uri())],
        ),
        ("MA1521".to_string(), vec![file(3, "c.pdf", 4, &server.uri())]),
    ]
    .into_iter()
    .collect();

    let (tx, rx) = create_shutdown_channel();
    request_shutdown(&tx);
    let result = coordinator.download_all_until(index, rx).await;

    assert!(result.interrupted);
    assert!(!result.success());
    assert_eq!(result.stats.files_not_attempted, 3);
    assert_eq!(result.stats.total_processed(), 0);
    assert_eq!(result.course("CS1010").unwrap().not_attempted, 2);
}

#[tokio::test]
async fn test_duplicate_course_codes_merge() {
    let server = MockServer::start().await;
    mount_courses(
        &server,
        json!([
            {"id": 1, "course_code": "CS1010"},
            {"id": 2, "course_code": "CS1010"}
        ]),
    )
    .await;
    mount_files(&server, 1, json!([file_json(&server, 10, "a.pdf", 1)])).await;
    mount_files(&server, 2, json!([file_json(&server, 20, "b.pdf", 1)])).await;

    let root = TempDir::new().unwrap();
    let coordinator = create_test_coordinator(&server, &root);

    let discovery = coordinator.discover().await.unwrap();
    let files = discovery.index.get("CS1010").unwrap();
    let names: Vec<_> = files.iter().map(|f| f.display_name.as_str()).collect();
    assert_eq!(names, vec!["a.pdf", "b.pdf"]);
}

#[tokio::test]
async fn test_filter_applies_before_download() {
    let server = MockServer::start().await;
    mount_courses(&server, json!([{"id": 1, "course_code": "CS1010"}])).await;
    mount_files(
        &server,
        1,
        json!([
            file_json(&server, 10, "lecture.mp4", 10),
            file_json(&server, 11, "notes.pdf", 2),
            file_json(&server, 12, "huge.pdf", 5_000_000)
        ]),
    )
    .await;
    mount_body(&server, 11, b"ok").await;
    Mock::given(method("GET"))
        .and(path("/files/10/download"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/12/download"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let filter = FilterPolicy::from_megabytes(1, ExtensionPolicy::deny(["mp4"]));
    let coordinator = create_coordinator_with(&server, &root, false, filter);

    let result = coordinator.run().await.unwrap();
    assert!(result.success());
    assert_eq!(result.filter.kept, 1);
    assert_eq!(result.filter.rejected_extension, 1);
    assert_eq!(result.filter.rejected_size, 1);
    assert_eq!(
        result.course("CS1010").unwrap().outcome_of("notes.pdf"),
        Some(&DownloadOutcome::Succeeded { bytes: 2 })
    );
}

#[tokio::test]
async fn test_plan_reports_existing_files() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    std::fs::create_dir_all(root.path().join("CS1010")).unwrap();
    std::fs::write(root.path().join("CS1010/a.pdf"), b"old").unwrap();

    let coordinator = create_test_coordinator(&server, &root);
    let index: CourseFileIndex = [(
        "CS1010".to_string(),
        vec![file(1, "a.pdf", 3, &server.uri()), file(2, "b.pdf", 9, &server.uri())],
    )]
    .into_iter()
    .collect();

    let planned = coordinator.plan(&index).await;
    assert_eq!(planned.len(), 2);
    assert!(planned[0].exists);
    assert!(!planned[1].exists);
    assert_eq!(planned[1].destination, root.path().join("CS1010").join("b.pdf"));
    assert_eq!(planned[1].size, 9);
}

#[tokio::test]
async fn test_run_rejects_file_as_destination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let blocker = tempfile::NamedTempFile::new().unwrap();
    let client = CanvasClient::new("test-token", ClientConfig::default().with_host(server.uri()))
        .unwrap();
    let config = CoordinatorConfig::default()
        .with_destination(blocker.path())
        .with_signal_handling(false);
    let coordinator = Coordinator::new(config, Arc::new(client), FilterPolicy::default());

    let result = coordinator.run().await;
    assert!(matches!(result, Err(AppError::Generic { .. })));
}

#[tokio::test]
async fn test_courses_download_concurrently_into_own_directories() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/1/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"slow".to_vec())
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_body(&server, 2, b"second").await;
    mount_body(&server, 3, b"b-one").await;
    mount_body(&server, 4, b"b-two").await;
    mount_body(&server, 5, b"b-three").await;

    let root = TempDir::new().unwrap();
    let coordinator = create_test_coordinator(&server, &root);
    let index: CourseFileIndex = [
        (
            "CS1010".to_string(),
            vec![file(1, "slow.pdf", 4, &server.uri()), file(2, "notes.pdf", 6, &server.uri())],
        ),
        (
            "MA1521".to_string(),
            vec![
                file(3, "w1.pdf", 5, &server.uri()),
                file(4, "w2.pdf", 5, &server.uri()),
                file(5, "w3.pdf", 7, &server.uri()),
            ],
        ),
    ]
    .into_iter()
    .collect();

    let result = coordinator.download_all(index).await;

    assert!(result.success());
    assert_eq!(result.stats.total_courses, 2);
    assert_eq!(result.stats.files_succeeded, 5);

    // The second course finished while the first was stuck on its first file
    let order: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    let position = |p: &str| order.iter().position(|seen| seen == p).unwrap();
    assert!(position("/files/5/download") < position("/files/2/download"));

    let names = |code: &str| -> Vec<String> {
        result
            .course(code)
            .unwrap()
            .files
            .iter()
            .map(|f| f.display_name.clone())
            .collect()
    };
    assert_eq!(names("CS1010"), vec!["slow.pdf", "notes.pdf"]);
    assert_eq!(names("MA1521"), vec!["w1.pdf", "w2.pdf", "w3.pdf"]);
    assert!(result.courses.iter().all(|c| c.files.iter().all(|f| f.outcome.is_succeeded())));

    assert_eq!(std::fs::read(root.path().join("CS1010/slow.pdf")).unwrap(), b"slow");
    assert_eq!(std::fs::read(root.path().join("CS1010/notes.pdf")).unwrap(), b"second");
    assert_eq!(std::fs::read(root.path().join("MA1521/w1.pdf")).unwrap(), b"b-one");
    assert_eq!(std::fs::read(root.path().join("MA1521/w3.pdf")).unwrap(), b"b-three");
    assert!(!root.path().join("CS1010/w1.pdf").exists());
    assert!(!root.path().join("MA1521/slow.pdf").exists());
}

#[tokio::test]
async fn test_second_shutdown_request_cancels_in_flight_download() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/1/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"never".to_vec())
                .set_delay(Duration::from_secs(60)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/2/download"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"later".to_vec()))
        .expect(0)
        .mount(&server)
        .await;
    mount_body(&server, 3, b"quick").await;

    let root = TempDir::new().unwrap();
    let coordinator = create_test_coordinator(&server, &root);
    let index: CourseFileIndex = [
        (
            "CS1010".to_string(),
            vec![file(1, "stuck.pdf", 5, &server.uri()), file(2, "later.pdf", 5, &server.uri())],
        ),
        ("MA1521".to_string(), vec![file(3, "quick.pdf", 5, &server.uri())]),
    ]
    .into_iter()
    .collect();

    let (tx, rx) = create_shutdown_channel();
    let download = coordinator.download_all_until(index, rx);
    let finished = root.path().join("MA1521/quick.pdf");
    let signals = async {
        wait_for_request(&server, "/files/1/download").await;
        while !finished.exists() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        request_shutdown(&tx);
        tokio::time::sleep(Duration::from_millis(50)).await;
        request_abort(&tx);
    };

    let (result, ()) = tokio::time::timeout(Duration::from_secs(10), async {
        tokio::join!(download, signals)
    })
    .await
    .expect("download did not stop after the second request");

    assert!(result.interrupted);
    assert!(!result.success());
    assert_eq!(result.stats.courses_aborted, 1);
    assert!(result.task_failures.is_empty());
    assert!(result.course("CS1010").is_none());
    assert!(result
        .course("MA1521")
        .unwrap()
        .outcome_of("quick.pdf")
        .unwrap()
        .is_succeeded());
    assert!(!root.path().join("CS1010/stuck.pdf").exists());
    assert!(!root.path().join("CS1010/later.pdf").exists());
}

#[tokio::test]
async fn test_codes_sharing_a_directory_run_as_one_course() {
    let server = MockServer::start().await;
    mount_courses(
        &server,
        json!([
            {"id": 1, "course_code": "EE/CS2100"},
            {"id": 2, "course_code": "EE_CS2100"}
        ]),
    )
    .await;
    mount_files(&server, 1, json!([file_json(&server, 10, "a.pdf", 1)])).await;
    mount_files(&server, 2, json!([file_json(&server, 20, "b.pdf", 1)])).await;
    mount_body(&server, 10, b"a").await;
    mount_body(&server, 20, b"b").await;

    let root = TempDir::new().unwrap();
    let coordinator = create_test_coordinator(&server, &root);

    let result = coordinator.run().await.unwrap();
    assert!(result.success());
    assert_eq!(result.stats.total_courses, 1);
    let report = result.course("EE_CS2100").unwrap();
    let names: Vec<_> = report.files.iter().map(|f| f.display_name.as_str()).collect();
    assert_eq!(names, vec!["a.pdf", "b.pdf"]);
    assert_eq!(std::fs::read(root.path().join("EE_CS2100/a.pdf")).unwrap(), b"a");
    assert_eq!(std::fs::read(root.path().join("EE_CS2100/b.pdf")).unwrap(), b"b");
}
