use crate::config::Settings;
use crate::github::models::{Owner, PushEvent, Repository};
use crate::pipeline::{Pipeline, RunOutcome};
use crate::Result;

/// Run the pipeline once for a repository branch
pub async fn run_once(settings: &Settings, owner: &str, repo: &str, branch: &str) -> Result<()> {
    tokio::fs::create_dir_all(&settings.pipeline.workdir).await?;
    let pipeline = Pipeline::from_settings(settings)?;

    // Synthetic payload; without commit hashes the idempotency guard is inert
    let payload = PushEvent {
        ref_name: format!("refs/heads/{branch}"),
        before: String::new(),
        after: String::new(),
        repository: Repository {
            name: repo.to_string(),
            owner: Owner {
                login: owner.to_string(),
            },
        },
    };

    match pipeline.run(&payload).await? {
        RunOutcome::Completed(report) => {
            println!("\x1b[32m\u{2713}\x1b[0m Documentation published");
            println!("  Run: {}", report.run_id);
            println!(
                "  Repository: {}/{} @ {}",
                report.owner, report.repo, report.branch
            );
            println!(
                "  Files uploaded: {} ({} skipped)",
                report.files_uploaded, report.files_skipped
            );
            println!("  Page: {} (version {})", report.page_id, report.page_version);
            println!(
                "  Duration: {}s",
                (report.finished_at - report.started_at).num_seconds()
            );
        }
        RunOutcome::AlreadyPublished { before, after } => {
            println!("Commit pair {before}..{after} already published, nothing to do");
        }
    }

    Ok(())
}
