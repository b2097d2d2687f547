//! Creates the remote folders a batch needs, parents first.

use crate::uploader::paths::{depth, parent_dir, split_parent};
use crate::uploader::remote::RemoteDrive;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Where a file should be registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentResolution {
    /// The file has no directory part; it goes under the batch root
    Root,
    /// The file's directory was created with this id
    Resolved(String),
    /// The file's directory (given) could not be created
    Unresolved(String),
}

/// Folder path to remote id, for one batch
#[derive(Debug, Default)]
pub struct FolderMap {
    created: HashMap<String, String>,
    failed: HashSet<String>,
}

impl FolderMap {
    pub fn get(&self, path: &str) -> Option<&str> {
        self.created.get(path).map(String::as_str)
    }

    pub fn is_failed(&self, path: &str) -> bool {
        self.failed.contains(path)
    }

    /// Number of folders created
    pub fn len(&self) -> usize {
        self.created.len()
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
    }

    /// Number of folders that could not be created
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Resolve the parent folder of a file from its relative path
    pub fn resolve_parent(&self, relative_path: Option<&str>) -> ParentResolution {
        let Some(dir) = relative_path.and_then(parent_dir) else {
            return ParentResolution::Root;
        };
        match self.created.get(&dir) {
            Some(id) => ParentResolution::Resolved(id.clone()),
            None => ParentResolution::Unresolved(dir),
        }
    }
}

/// Options for [`materialize`]
#[derive(Debug, Clone)]
pub struct MaterializeOptions {
    /// Pause after each successful creation
    pub delay: Duration,
    /// Skip descendants of a folder that failed instead of creating them under the root
    pub skip_orphans: bool,
}

/// Create every folder in `paths`, shallowest first, one call at a time.
///
/// Failures are logged and recorded in the returned map; they never abort the run.
pub async fn materialize(
    remote: &dyn RemoteDrive,
    paths: &BTreeSet<String>,
    root_parent_id: Option<&str>,
    options: &MaterializeOptions,
    cancel_token: &CancellationToken,
) -> FolderMap {
    let mut ordered: Vec<&String> = paths.iter().collect();
    // BTreeSet order breaks ties lexicographically
    ordered.sort_by_key(|p| depth(p));

    let mut map = FolderMap::default();

    for path in ordered {
        if cancel_token.is_cancelled() {
            info!(target: "uploader::folders", path = %path, "Folder creation cancelled");
            break;
        }
        if map.created.contains_key(path.as_str()) {
            continue;
        }

        let (parent_path, name) = split_parent(path);
        let parent_id = if parent_path.is_empty() {
            root_parent_id.map(str::to_string)
        } else if let Some(id) = map.created.get(&parent_path) {
            Some(id.clone())
        } else if options.skip_orphans {
            warn!(
                target: "uploader::folders",
                path = %path,
                parent = %parent_path,
                "Skipping folder whose parent could not be created"
            );
            map.failed.insert(path.clone());
            continue;
        } else {
            warn!(
                target: "uploader::folders",
                path = %path,
                parent = %parent_path,
                "Parent folder missing, creating under the upload root"
            );
            root_parent_id.map(str::to_string)
        };

        match remote.create_folder(&name, parent_id.as_deref()).await {
            Ok(id) => {
                debug!(
                    target: "uploader::folders",
                    path = %path,
                    folder_id = %id,
                    "Folder created"
                );
                map.created.insert(path.clone(), id);
                if !options.delay.is_zero() {
                    tokio::time::sleep(options.delay).await;
                }
            }
            Err(e) => {
                warn!(
                    target: "uploader::folders",
                    path = %path,
                    error = %e,
                    "Failed to create folder"
                );
                map.failed.insert(path.clone());
            }
        }
    }

    map
}
