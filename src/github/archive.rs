use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

/// Extract a ZIP archive into `dest`, returning the number of files written.
///
/// Entries whose names would escape the destination directory are skipped.
pub async fn extract(archive_path: &Path, dest: &Path) -> Result<usize> {
    let archive_path = archive_path.to_path_buf();
    let dest = dest.to_path_buf();

    // ZIP inflation is CPU-bound, keep it off the async runtime
    tokio::task::spawn_blocking(move || extract_blocking(&archive_path, &dest))
        .await
        .map_err(|e| Error::Internal(format!("Extraction task failed: {e}")))?
}

fn extract_blocking(archive_path: &Path, dest: &Path) -> Result<usize> {
    let file = std::fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut extracted = 0;

    std::fs::create_dir_all(dest)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;

        // Entries with traversal components have no enclosed name
        let relative = match entry.enclosed_name() {
            Some(path) => path,
            None => continue,
        };
        let outpath = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut outfile = std::fs::File::create(&outpath)?;
            std::io::copy(&mut entry, &mut outfile)?;
            extracted += 1;
        }
    }

    debug!("Extracted {} files into {}", extracted, dest.display());
    Ok(extracted)
}
