use crate::error::Result;
use crate::github::archive;
use crate::github::client::GitHubClient;
use crate::github::models::PushEvent;
use std::path::{Path, PathBuf};
use tracing::info;

/// Snapshot of a repository branch extracted to local disk
#[derive(Debug, Clone)]
pub struct FetchedRepository {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Directory holding the extracted tree
    pub root: PathBuf,
    pub archive_bytes: u64,
    pub file_count: usize,
}

/// Downloads and extracts repository snapshots
#[derive(Clone)]
pub struct RepoFetcher {
    client: GitHubClient,
}

impl RepoFetcher {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }

    /// Fetch the branch named by the payload into `workdir`.
    ///
    /// The zipball is streamed to `workdir/snapshot.zip` and extracted into
    /// `workdir/tree`; the zipball is deleted once extraction succeeds.
    pub async fn fetch(&self, payload: &PushEvent, workdir: &Path) -> Result<FetchedRepository> {
        let owner = payload.repository.owner.login.as_str();
        let repo = payload.repository.name.as_str();
        let branch = payload.branch();

        let zip_path = workdir.join("snapshot.zip");
        let tree_path = workdir.join("tree");

        let archive_bytes = self
            .client
            .download_zipball(owner, repo, branch, &zip_path)
            .await?;

        let file_count = archive::extract(&zip_path, &tree_path).await?;

        tokio::fs::remove_file(&zip_path).await?;

        info!(
            "Fetched {}/{}@{}: {} files ({} archive bytes)",
            owner, repo, branch, file_count, archive_bytes
        );

        Ok(FetchedRepository {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: branch.to_string(),
            root: tree_path,
            archive_bytes,
            file_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GithubConfig;
    use crate::github::models::{Owner, Repository};
    use std::io::Write;

    fn zipball_bytes() -> Vec<u8> {
        let cursor = std::io::Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(cursor);
        let options = zip::write::SimpleFileOptions::default();
        writer
            .start_file("acme-widgets-abc123/README.md", options)
            .unwrap();
        writer.write_all(b"hello").unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn push_event() -> PushEvent {
        PushEvent {
            ref_name: "refs/heads/main".to_string(),
            before: String::new(),
            after: String::new(),
            repository: Repository {
                name: "widgets".to_string(),
                owner: Owner {
                    login: "acme".to_string(),
                },
            },
        }
    }

    #[tokio::test]
    async fn test_fetch_downloads_and_extracts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/acme/widgets/zipball/main")
            .with_status(200)
            .with_header("content-type", "application/zip")
            .with_body(zipball_bytes())
            .create_async()
            .await;

        let client = GitHubClient::new(GithubConfig {
            base_url: server.url(),
            token: None,
            user_agent: "TestBot/1.0".to_string(),
        })
        .unwrap();

        let workdir = tempfile::tempdir().unwrap();
        let fetched = RepoFetcher::new(client)
            .fetch(&push_event(), workdir.path())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(fetched.owner, "acme");
        assert_eq!(fetched.branch, "main");
        assert_eq!(fetched.file_count, 1);
        assert!(fetched.root.join("acme-widgets-abc123/README.md").exists());
        assert!(!workdir.path().join("snapshot.zip").exists());
    }
}
