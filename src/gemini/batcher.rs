use crate::error::{Error, Result};
use crate::gemini::client::GeminiClient;
use crate::gemini::models::{FileReference, FileState, GeminiFile};
use futures::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Bounds on waiting for an uploaded file to leave the PROCESSING state
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    /// Delay between consecutive status polls
    pub interval: Duration,
    /// Maximum number of polls per file
    pub max_attempts: u32,
    /// Overall per-file budget for reaching a terminal state
    pub deadline: Duration,
}

/// Why a file was left out of the batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Read, upload, or status poll failed before a terminal state was seen
    UploadError(String),
    /// The file store reported a terminal FAILED state
    ProcessingFailed,
    /// The file never reached a terminal state within the poll budget
    Timeout,
}

impl From<Error> for SkipReason {
    fn from(e: Error) -> Self {
        match e {
            Error::ProcessingFailed(_) => SkipReason::ProcessingFailed,
            Error::UploadTimeout(_) => SkipReason::Timeout,
            // reqwest renders the full request URL, key included, so the
            // URL is dropped before the message reaches the logs
            Error::Http(e) => SkipReason::UploadError(Error::Http(e.without_url()).to_string()),
            other => SkipReason::UploadError(other.to_string()),
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::UploadError(msg) => write!(f, "upload failed: {msg}"),
            SkipReason::ProcessingFailed => write!(f, "file store reported FAILED"),
            SkipReason::Timeout => write!(f, "no terminal state within the poll budget"),
        }
    }
}

/// A file skipped during batching, with the reason recorded
#[derive(Debug, Clone)]
pub struct SkippedUpload {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Outcome of one batching pass over an extracted tree
#[derive(Debug, Default)]
pub struct UploadBatch {
    /// Successful uploads in traversal order, at most `max_files` long
    pub references: Vec<FileReference>,
    pub skipped: Vec<SkippedUpload>,
}

/// Walks an extracted repository tree and uploads files to the file store
pub struct UploadBatcher {
    client: GeminiClient,
    poll: PollPolicy,
}

impl UploadBatcher {
    pub fn new(client: GeminiClient, poll: PollPolicy) -> Self {
        Self { client, poll }
    }

    /// Upload files under `root` depth-first in directory-listing order.
    ///
    /// A regular file is uploaded as soon as it is encountered; a directory is
    /// descended into immediately. Traversal stops once `max_files` uploads
    /// have succeeded. A failed upload is recorded and skipped; a failed
    /// directory listing aborts the whole batch.
    pub async fn collect_file_references(
        &self,
        root: &Path,
        max_files: usize,
    ) -> Result<UploadBatch> {
        let mut batch = UploadBatch::default();
        self.visit_directory(root, root, max_files, &mut batch)
            .await?;

        info!(
            "Collected {} file references ({} skipped)",
            batch.references.len(),
            batch.skipped.len()
        );
        Ok(batch)
    }

    fn visit_directory<'a>(
        &'a self,
        dir: &'a Path,
        base: &'a Path,
        max_files: usize,
        batch: &'a mut UploadBatch,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let mut entries = tokio::fs::read_dir(dir).await?;

            while let Some(entry) = entries.next_entry().await? {
                if batch.references.len() >= max_files {
                    debug!("Reached upload limit of {} files", max_files);
                    break;
                }

                let path = entry.path();
                let file_type = entry.file_type().await?;

                if file_type.is_file() {
                    let display_name = display_name_for(&path, base);
                    match self.upload_and_wait(&path, &display_name).await {
                        Ok(file) => {
                            debug!(
                                "Uploaded {} as {} ({}/{})",
                                display_name,
                                file.name,
                                batch.references.len() + 1,
                                max_files
                            );
                            batch.references.push(FileReference {
                                uri: file.uri,
                                mime_type: file.mime_type,
                                display_name,
                            });
                        }
                        Err(e) => {
                            let reason = SkipReason::from(e);
                            warn!("Skipping {}: {}", display_name, reason);
                            batch.skipped.push(SkippedUpload { path, reason });
                        }
                    }
                } else if file_type.is_dir() {
                    self.visit_directory(&path, base, max_files, batch).await?;
                }
                // Symlinks and other special entries are ignored
            }

            Ok(())
        }
        .boxed()
    }

    async fn upload_and_wait(&self, path: &Path, display_name: &str) -> Result<GeminiFile> {
        let bytes = tokio::fs::read(path).await?;
        let uploaded = self.client.upload_file(bytes, display_name).await?;
        self.wait_until_ready(uploaded).await
    }

    /// Poll the file store until the upload reaches a terminal state
    async fn wait_until_ready(&self, mut file: GeminiFile) -> Result<GeminiFile> {
        let started = tokio::time::Instant::now();
        let mut attempts = 0;

        while file.state == FileState::Processing {
            if attempts >= self.poll.max_attempts || started.elapsed() >= self.poll.deadline {
                return Err(Error::UploadTimeout(format!(
                    "{} still processing after {} polls",
                    file.name, attempts
                )));
            }
            sleep(self.poll.interval).await;
            attempts += 1;

            file = self.client.get_file(&file.name).await?;
            debug!("File {} state: {:?}", file.name, file.state);
        }

        if file.state == FileState::Failed {
            return Err(Error::ProcessingFailed(format!(
                "{} reached terminal FAILED state",
                file.name
            )));
        }

        Ok(file)
    }
}

fn display_name_for(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}
