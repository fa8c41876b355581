use mockito::Matcher;
use repodoc::config::GeminiConfig;
use repodoc::gemini::{GeminiClient, PollPolicy, SkipReason, UploadBatcher};
use std::path::Path;
use std::time::Duration;

fn test_client(base_url: String) -> GeminiClient {
    GeminiClient::new(GeminiConfig {
        base_url,
        api_key: "test-key".to_string(),
    })
    .expect("Failed to create Gemini client")
}

fn quick_poll() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(10),
        max_attempts: 3,
        deadline: Duration::from_secs(5),
    }
}

fn file_json(name: &str, state: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "uri": format!("https://files.test/{name}"),
        "mimeType": "text/plain",
        "state": state,
    })
}

/// Mock the two-step upload: a start request that hands out a session URL,
/// then a finalize request on that URL returning the created file entry.
async fn mock_upload(
    server: &mut mockito::Server,
    session_path: &str,
    file: serde_json::Value,
    hits: usize,
) -> (mockito::Mock, mockito::Mock) {
    let session_url = format!("{}{}", server.url(), session_path);
    let start = server
        .mock("POST", "/upload/v1beta/files?key=test-key")
        .match_header("x-goog-upload-command", "start")
        .with_status(200)
        .with_header("x-goog-upload-url", &session_url)
        .expect(hits)
        .create_async()
        .await;
    let finalize = server
        .mock("POST", session_path)
        .match_header("x-goog-upload-command", "upload, finalize")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(serde_json::json!({ "file": file }).to_string())
        .expect(hits)
        .create_async()
        .await;
    (start, finalize)
}

fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (rel, contents) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create tree directory");
        }
        std::fs::write(&path, contents).expect("Failed to write tree file");
    }
}

#[tokio::test]
async fn test_batch_uploads_every_file_under_the_limit() {
    let mut server = mockito::Server::new_async().await;
    let (start, finalize) = mock_upload(
        &mut server,
        "/session/u1",
        file_json("files/u1", "ACTIVE"),
        3,
    )
    .await;

    // Nested tree with three files, well under the limit
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_tree(
        dir.path(),
        &[
            ("README.md", "docs"),
            ("src/main.rs", "fn main() {}"),
            ("src/util/mod.rs", "pub fn noop() {}"),
        ],
    );

    let batcher = UploadBatcher::new(test_client(server.url()), quick_poll());
    let batch = batcher
        .collect_file_references(dir.path(), 15)
        .await
        .expect("Batching should succeed");

    start.assert_async().await;
    finalize.assert_async().await;
    assert_eq!(batch.references.len(), 3, "All three files should upload");
    assert!(batch.skipped.is_empty(), "Nothing should be skipped");

    // Display names are paths relative to the tree root
    let mut names: Vec<&str> = batch
        .references
        .iter()
        .map(|r| r.display_name.as_str())
        .collect();
    names.sort();
    assert_eq!(names, vec!["README.md", "src/main.rs", "src/util/mod.rs"]);
}

#[tokio::test]
async fn test_batch_stops_at_the_upload_limit() {
    let mut server = mockito::Server::new_async().await;
    let (start, finalize) = mock_upload(
        &mut server,
        "/session/u1",
        file_json("files/u1", "ACTIVE"),
        15,
    )
    .await;

    // Twenty files; only the first fifteen encountered may upload
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let files: Vec<(String, String)> = (0..20)
        .map(|i| (format!("file-{i:02}.txt"), format!("contents {i}")))
        .collect();
    for (rel, contents) in &files {
        std::fs::write(dir.path().join(rel), contents).expect("Failed to write tree file");
    }

    let batcher = UploadBatcher::new(test_client(server.url()), quick_poll());
    let batch = batcher
        .collect_file_references(dir.path(), 15)
        .await
        .expect("Batching should succeed");

    // The mocks assert exactly fifteen uploads went over the wire
    start.assert_async().await;
    finalize.assert_async().await;
    assert_eq!(batch.references.len(), 15);
    assert!(batch.skipped.is_empty(), "Unvisited files are not skips");
}

#[tokio::test]
async fn test_failed_upload_is_skipped_and_traversal_continues() {
    let mut server = mockito::Server::new_async().await;

    // Registered before the generic start mock: mockito serves the first
    // matching unsatisfied mock in insertion order, so only broken.txt
    // hits this one regardless of traversal order
    let rejected = server
        .mock("POST", "/upload/v1beta/files?key=test-key")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "file": { "display_name": "broken.txt" }
        })))
        .with_status(500)
        .with_body("upstream store unavailable")
        .expect(1)
        .create_async()
        .await;

    let (_start, _finalize) = mock_upload(
        &mut server,
        "/session/u1",
        file_json("files/u1", "ACTIVE"),
        2,
    )
    .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_tree(
        dir.path(),
        &[
            ("alpha.txt", "ok"),
            ("broken.txt", "rejected by the store"),
            ("omega.txt", "ok"),
        ],
    );

    let batcher = UploadBatcher::new(test_client(server.url()), quick_poll());
    let batch = batcher
        .collect_file_references(dir.path(), 15)
        .await
        .expect("A per-file failure should not abort the batch");

    rejected.assert_async().await;
    assert_eq!(batch.references.len(), 2, "Other files still upload");
    assert_eq!(batch.skipped.len(), 1);
    assert!(batch.skipped[0].path.ends_with("broken.txt"));
    assert!(
        matches!(batch.skipped[0].reason, SkipReason::UploadError(_)),
        "Rejected upload should be recorded as an upload error"
    );
}

#[tokio::test]
async fn test_file_in_failed_state_is_skipped() {
    let mut server = mockito::Server::new_async().await;
    let (_start, _finalize) = mock_upload(
        &mut server,
        "/session/u1",
        file_json("files/u1", "FAILED"),
        1,
    )
    .await;

    // The store never needs to be polled for a terminal state
    let poll = server
        .mock("GET", "/v1beta/files/u1?key=test-key")
        .expect(0)
        .create_async()
        .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_tree(dir.path(), &[("doomed.txt", "contents")]);

    let batcher = UploadBatcher::new(test_client(server.url()), quick_poll());
    let batch = batcher
        .collect_file_references(dir.path(), 15)
        .await
        .expect("A failed file should not abort the batch");

    poll.assert_async().await;
    assert!(batch.references.is_empty());
    assert_eq!(batch.skipped.len(), 1);
    assert_eq!(batch.skipped[0].reason, SkipReason::ProcessingFailed);
}

#[tokio::test]
async fn test_processing_file_is_polled_until_active() {
    let mut server = mockito::Server::new_async().await;
    let (_start, _finalize) = mock_upload(
        &mut server,
        "/session/u1",
        file_json("files/u1", "PROCESSING"),
        1,
    )
    .await;

    let poll = server
        .mock("GET", "/v1beta/files/u1?key=test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(file_json("files/u1", "ACTIVE").to_string())
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_tree(dir.path(), &[("slow.txt", "contents")]);

    let batcher = UploadBatcher::new(test_client(server.url()), quick_poll());
    let batch = batcher
        .collect_file_references(dir.path(), 15)
        .await
        .expect("Batching should succeed");

    poll.assert_async().await;
    assert_eq!(batch.references.len(), 1);
    assert_eq!(batch.references[0].display_name, "slow.txt");
    assert!(batch.skipped.is_empty());
}

#[tokio::test]
async fn test_file_stuck_in_processing_times_out() {
    let mut server = mockito::Server::new_async().await;
    let (_start, _finalize) = mock_upload(
        &mut server,
        "/session/u1",
        file_json("files/u1", "PROCESSING"),
        1,
    )
    .await;

    // Never leaves PROCESSING; the poll budget allows two attempts
    let poll = server
        .mock("GET", "/v1beta/files/u1?key=test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(file_json("files/u1", "PROCESSING").to_string())
        .expect(2)
        .create_async()
        .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write_tree(dir.path(), &[("stuck.txt", "contents")]);

    let policy = PollPolicy {
        interval: Duration::from_millis(10),
        max_attempts: 2,
        deadline: Duration::from_secs(5),
    };
    let batcher = UploadBatcher::new(test_client(server.url()), policy);
    let batch = batcher
        .collect_file_references(dir.path(), 15)
        .await
        .expect("A timed-out file should not abort the batch");

    poll.assert_async().await;
    assert!(batch.references.is_empty());
    assert_eq!(batch.skipped.len(), 1);
    assert_eq!(batch.skipped[0].reason, SkipReason::Timeout);
}
