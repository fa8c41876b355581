use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Working directory for one pipeline invocation.
///
/// Each run gets a fresh directory under the configured root, keyed by a
/// random id, so overlapping deliveries never share extraction paths.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub dir: PathBuf,
    /// Directory-name prefix shared by all runs for the same repository
    prefix: String,
}

impl RunContext {
    /// Create the run directory under `root`
    pub async fn create(root: &Path, owner: &str, repo: &str) -> Result<Self> {
        let run_id = Uuid::new_v4();
        // Owner and repo come straight from the webhook payload; only
        // sanitized forms may be joined onto the workdir root
        let prefix = format!(
            "{}-{}-",
            sanitize_component(owner),
            sanitize_component(repo)
        );
        let dir = root.join(format!("{prefix}{run_id}"));
        tokio::fs::create_dir_all(&dir).await?;
        debug!("Created run directory {}", dir.display());
        Ok(Self {
            run_id,
            dir,
            prefix,
        })
    }

    /// Remove the run directory. Called when a run fails partway through.
    pub async fn discard(&self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.dir).await {
            warn!(
                "Failed to remove run directory {}: {}",
                self.dir.display(),
                e
            );
        }
    }

    /// Remove directories left by earlier runs for the same repository, so
    /// only this run survives as the last good snapshot. Best effort; a
    /// directory that cannot be removed is logged and left in place.
    pub async fn prune_previous(&self) {
        let Some(root) = self.dir.parent() else {
            return;
        };
        let mut entries = match tokio::fs::read_dir(root).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to scan workdir {}: {}", root.display(), e);
                return;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path == self.dir {
                continue;
            }
            let name = entry.file_name();
            let Some(rest) = name.to_str().and_then(|n| n.strip_prefix(&self.prefix)) else {
                continue;
            };
            // Repositories can share a name prefix (widgets, widgets-2), so
            // a sibling counts only when the remainder is a full run id
            if Uuid::parse_str(rest).is_err() {
                continue;
            }
            if let Err(e) = tokio::fs::remove_dir_all(&path).await {
                warn!(
                    "Failed to remove previous run directory {}: {}",
                    path.display(),
                    e
                );
            } else {
                debug!("Removed previous run directory {}", path.display());
            }
        }
    }
}

/// Reduce a repository owner or name to characters safe inside a single
/// directory-name component
fn sanitize_component(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_' || *c == '.')
        .collect::<String>()
        .trim_matches(['-', '.'])
        .to_string()
}
