pub mod context;

use crate::config::{PipelineConfig, Settings};
use crate::confluence::{publisher, ConfluenceClient};
use crate::error::{Error, Result};
use crate::gemini::batcher::{PollPolicy, UploadBatcher};
use crate::gemini::{generator, GeminiClient};
use crate::github::{GitHubClient, PushEvent, RepoFetcher};
use chrono::{DateTime, Utc};
use context::RunContext;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Wiki page overwritten on every run
pub const WIKI_PAGE_ID: &str = "262147";

/// Upper bound on files uploaded per run
pub const MAX_UPLOAD_FILES: usize = 15;

/// Outcome of one webhook delivery
#[derive(Debug)]
pub enum RunOutcome {
    Completed(PipelineReport),
    /// The commit pair was already published by an earlier delivery
    AlreadyPublished { before: String, after: String },
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub files_uploaded: usize,
    pub files_skipped: usize,
    pub page_id: String,
    pub page_version: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Drives one webhook delivery through fetch, upload, generate, publish
pub struct Pipeline {
    fetcher: RepoFetcher,
    gemini: GeminiClient,
    confluence: ConfluenceClient,
    config: PipelineConfig,
    /// Commit pairs that have already been published
    published: Mutex<HashSet<(String, String)>>,
}

impl Pipeline {
    pub fn new(
        fetcher: RepoFetcher,
        gemini: GeminiClient,
        confluence: ConfluenceClient,
        config: PipelineConfig,
    ) -> Self {
        Self {
            fetcher,
            gemini,
            confluence,
            config,
            published: Mutex::new(HashSet::new()),
        }
    }

    /// Build a pipeline with clients derived from settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let github = GitHubClient::new(settings.github.clone())?;
        let gemini = GeminiClient::new(settings.gemini.clone())?;
        let confluence = ConfluenceClient::new(settings.confluence.clone())?;

        Ok(Self::new(
            RepoFetcher::new(github),
            gemini,
            confluence,
            settings.pipeline.clone(),
        ))
    }

    /// Handle one webhook delivery.
    ///
    /// Stages run strictly in sequence; the first failure short-circuits the
    /// rest, discards the run directory, and propagates. A delivery whose
    /// commit pair was already published returns without side effects. A
    /// successful run keeps its snapshot directory and removes those left by
    /// earlier runs for the same repository.
    pub async fn run(&self, payload: &PushEvent) -> Result<RunOutcome> {
        validate_payload(payload)?;

        let key = idempotency_key(payload);
        if let Some(key) = &key {
            let published = self.published.lock().await;
            if published.contains(key) {
                info!(
                    "Commit pair {}..{} already published, skipping",
                    key.0, key.1
                );
                return Ok(RunOutcome::AlreadyPublished {
                    before: key.0.clone(),
                    after: key.1.clone(),
                });
            }
        }

        let started_at = Utc::now();
        let ctx = RunContext::create(
            &self.config.workdir,
            &payload.repository.owner.login,
            &payload.repository.name,
        )
        .await?;

        let report = match self.execute(payload, &ctx, started_at).await {
            Ok(report) => report,
            Err(e) => {
                ctx.discard().await;
                return Err(e);
            }
        };

        // Recorded only after a fully successful run, so a retry after a
        // failure runs the pipeline again
        if let Some(key) = key {
            self.published.lock().await.insert(key);
        }

        // The new snapshot supersedes any earlier ones for this repository
        ctx.prune_previous().await;

        Ok(RunOutcome::Completed(report))
    }

    async fn execute(
        &self,
        payload: &PushEvent,
        ctx: &RunContext,
        started_at: DateTime<Utc>,
    ) -> Result<PipelineReport> {
        let fetched = self.fetcher.fetch(payload, &ctx.dir).await?;
        info!("Repository snapshot ready at {}", fetched.root.display());

        let batcher = UploadBatcher::new(self.gemini.clone(), self.poll_policy());
        let batch = batcher
            .collect_file_references(&fetched.root, MAX_UPLOAD_FILES)
            .await?;
        if batch.references.is_empty() {
            return Err(Error::EmptyBatch);
        }

        let documentation =
            generator::generate_documentation(&self.gemini, &batch.references).await?;
        info!("Documentation generated ({} chars)", documentation.len());

        let page = publisher::publish(&self.confluence, WIKI_PAGE_ID, &documentation).await?;
        info!(
            "Documentation published to page {} at version {}",
            page.id, page.version.number
        );

        Ok(PipelineReport {
            run_id: ctx.run_id,
            owner: fetched.owner,
            repo: fetched.repo,
            branch: fetched.branch,
            files_uploaded: batch.references.len(),
            files_skipped: batch.skipped.len(),
            page_id: page.id,
            page_version: page.version.number,
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.config.poll_interval_secs),
            max_attempts: self.config.poll_max_attempts,
            deadline: Duration::from_secs(self.config.poll_deadline_secs),
        }
    }
}

fn validate_payload(payload: &PushEvent) -> Result<()> {
    if payload.repository.owner.login.is_empty() {
        return Err(Error::Validation(
            "Webhook payload missing repository owner".to_string(),
        ));
    }
    if payload.repository.name.is_empty() {
        return Err(Error::Validation(
            "Webhook payload missing repository name".to_string(),
        ));
    }
    if payload.ref_name.is_empty() {
        return Err(Error::Validation(
            "Webhook payload missing ref".to_string(),
        ));
    }
    // Owner and repo name both become part of the run directory name
    for field in [&payload.repository.owner.login, &payload.repository.name] {
        if field.contains(['/', '\\']) || field.contains("..") {
            warn!("Blocked path traversal attempt in repository identifier: {field}");
            return Err(Error::Validation(
                "Path traversal not allowed in repository identifiers".to_string(),
            ));
        }
    }
    Ok(())
}

/// Commit pair guarding against double publication. Only meaningful when
/// both hashes are present in the payload.
fn idempotency_key(payload: &PushEvent) -> Option<(String, String)> {
    if payload.before.is_empty() || payload.after.is_empty() {
        return None;
    }
    Some((payload.before.clone(), payload.after.clone()))
}
