//! Turns local files and folders into upload entries.

use crate::uploader::FileEntry;
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A regular file found under a scanned folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    /// Forward-slash path starting with the scanned folder's own name
    pub relative_path: String,
}

/// List every regular file under `root`, sorted by path.
///
/// Unreadable entries are logged and skipped. Blocking; async callers should
/// go through [`collect_files`].
pub fn scan_folder(root: &Path) -> Result<Vec<ScannedFile>> {
    // `.` and `..` have no name of their own
    let canonical = std::fs::canonicalize(root)
        .with_context(|| format!("Cannot resolve {}", root.display()))?;
    let root = canonical.as_path();
    let folder_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no folder name", root.display()))?;

    let mut files = Vec::new();
    let walker = WalkDir::new(root).sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(target: "scan", error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .with_context(|| format!("{} escaped {}", entry.path().display(), root.display()))?;
        let relative_str = relative.to_string_lossy().replace('\\', "/");

        files.push(ScannedFile {
            path: entry.path().to_path_buf(),
            relative_path: format!("{}/{}", folder_name, relative_str),
        });
    }

    tracing::debug!(target: "scan", root = %root.display(), files = files.len(), "Folder scanned");
    Ok(files)
}

/// Build upload entries for command-line inputs. Files are uploaded as-is,
/// folders are expanded recursively keeping their structure.
pub async fn collect_files(inputs: &[PathBuf]) -> Result<Vec<FileEntry>> {
    let mut entries = Vec::new();
    for input in inputs {
        let metadata = tokio::fs::metadata(input)
            .await
            .with_context(|| format!("Cannot access {}", input.display()))?;

        if metadata.is_dir() {
            let root = input.clone();
            let scanned_files = tokio::task::spawn_blocking(move || scan_folder(&root))
                .await
                .context("Folder scan task failed")??;
            for scanned in scanned_files {
                let entry = FileEntry::from_path(&scanned.path)
                    .await
                    .with_context(|| format!("Cannot read {}", scanned.path.display()))?;
                entries.push(entry.with_relative_path(scanned.relative_path));
            }
        } else if metadata.is_file() {
            entries.push(FileEntry::from_path(input).await?);
        } else {
            bail!("{} is neither a file nor a folder", input.display());
        }
    }
    Ok(entries)
}
