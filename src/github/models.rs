use serde::{Deserialize, Serialize};

/// GitHub push/merge webhook payload, narrowed to the fields the pipeline reads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref")]
    pub ref_name: String,
    #[serde(default)]
    pub before: String,
    #[serde(default)]
    pub after: String,
    pub repository: Repository,
}

/// Repository block of the webhook payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: Owner,
}

/// Repository owner information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
}

impl PushEvent {
    /// Branch name, taken as the last path segment of the ref
    /// (`refs/heads/main` yields `main`)
    pub fn branch(&self) -> &str {
        self.ref_name.rsplit('/').next().unwrap_or(&self.ref_name)
    }
}

/// Commit comparison (`GET /repos/{owner}/{repo}/compare/{base}...{head}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub status: String,
    pub ahead_by: u32,
    pub behind_by: u32,
    pub total_commits: u32,
    #[serde(default)]
    pub files: Vec<FileDiff>,
}

/// One changed file in a comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDiff {
    pub filename: String,
    pub status: String,
    pub additions: u32,
    pub deletions: u32,
    pub changes: u32,
    pub patch: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_from_full_ref() {
        let event: PushEvent = serde_json::from_value(serde_json::json!({
            "ref": "refs/heads/main",
            "before": "aaa",
            "after": "bbb",
            "repository": {"name": "widgets", "owner": {"login": "acme"}}
        }))
        .unwrap();

        assert_eq!(event.branch(), "main");
        assert_eq!(event.repository.name, "widgets");
        assert_eq!(event.repository.owner.login, "acme");
    }

    #[test]
    fn test_branch_with_slashes_in_name() {
        let event: PushEvent = serde_json::from_value(serde_json::json!({
            "ref": "refs/heads/feature/polish",
            "repository": {"name": "widgets", "owner": {"login": "acme"}}
        }))
        .unwrap();

        assert_eq!(event.branch(), "polish");
    }

    #[test]
    fn test_missing_commit_hashes_default_empty() {
        let event: PushEvent = serde_json::from_value(serde_json::json!({
            "ref": "refs/heads/main",
            "repository": {"name": "widgets", "owner": {"login": "acme"}}
        }))
        .unwrap();

        assert!(event.before.is_empty());
        assert!(event.after.is_empty());
    }

    #[test]
    fn test_comparison_deserializes_without_files() {
        let cmp: Comparison = serde_json::from_value(serde_json::json!({
            "status": "ahead",
            "ahead_by": 2,
            "behind_by": 0,
            "total_commits": 2
        }))
        .unwrap();

        assert!(cmp.files.is_empty());
    }
}
