//! Batched upload pipeline for the drive
//!
//! A batch registers every file in the [`UploadStore`], creates the folders the
//! files' relative paths imply, then walks the files in fixed-size chunks: one
//! destination request per chunk, bounded-concurrency direct writes, and one
//! metadata commit for the chunk's successes.

pub mod error;
pub mod finalize;
pub mod folders;
pub mod paths;
pub mod progress;
pub mod remote;
pub mod source;
pub mod store;
pub mod transfer;

pub use error::{UploadError, UploadResult};
pub use folders::{FolderMap, ParentResolution};
pub use progress::{ProgressCallback, ProgressUpdate};
pub use remote::RemoteDrive;
pub use source::{FileEntry, FileSource};
pub use store::{UploadEntry, UploadPatch, UploadState, UploadStatus, UploadStore, UploadSummary};
pub use transfer::{HttpTransport, RetryPolicy, Transport};

use crate::events::EventBroadcaster;
use drive_api::models::{DriveItem, MetadataRequest, UploadDestination, UploadFileSpec};
use finalize::CommitItem;
use folders::MaterializeOptions;
use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const BATCH_FAILED_MESSAGE: &str = "Batch failed";
pub const CANCELLED_MESSAGE: &str = "Upload cancelled";
pub const UNRESOLVED_PARENT_MESSAGE: &str = "Parent folder could not be created";

/// What to do with a file whose folder could not be created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedFolderPolicy {
    /// Fail the file without transferring it
    #[default]
    MarkError,
    /// Log a warning and place the file under the batch root
    FallbackToRoot,
}

/// Configuration for the uploader
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    /// Files per destination request and metadata commit
    pub chunk_size: usize,
    /// Direct writes in flight at once within a chunk
    pub concurrency: usize,
    /// Pause after each folder creation
    pub folder_creation_delay: Duration,
    /// Maximum number of retry attempts per transient write failure
    pub max_retries: u32,
    /// Base delay between retries (exponential backoff)
    pub retry_base_delay: Duration,
    /// Maximum delay between retries
    pub retry_max_delay: Duration,
    /// Connect and read timeout for direct writes
    pub request_timeout: Duration,
    pub unresolved_folder_policy: UnresolvedFolderPolicy,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            concurrency: 5,
            folder_creation_delay: Duration::from_millis(50),
            max_retries: 0,
            retry_base_delay: Duration::from_millis(500),
            retry_max_delay: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            unresolved_folder_policy: UnresolvedFolderPolicy::MarkError,
        }
    }
}

impl UploaderConfig {
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: self.retry_base_delay,
            max_delay: self.retry_max_delay,
        }
    }
}

/// Outcome counts of one [`Uploader::run_batch`] call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub folders_created: usize,
    pub folders_failed: usize,
    /// Payload bytes of registered files
    pub bytes_uploaded: u64,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.cancelled == 0
    }
}

/// Forwards transfer progress into the store. Values stay in `1..=99`;
/// 100 is reserved for an acknowledged write.
struct StoreProgress {
    store: UploadStore,
    upload_id: String,
}

impl ProgressCallback for StoreProgress {
    fn on_progress(&self, update: ProgressUpdate) {
        let percent = update.percent().clamp(1, 99);
        self.store.update_progress(&self.upload_id, percent);
    }
}

/// A file of the current chunk with its resolved parent
struct PlannedFile<'a> {
    upload_id: &'a str,
    file: &'a FileEntry,
    parent_id: Option<String>,
}

enum TransferOutcome {
    Done,
    Failed,
    Cancelled,
}

/// Main uploader struct
pub struct Uploader {
    remote: Arc<dyn RemoteDrive>,
    transport: Arc<dyn Transport>,
    store: UploadStore,
    events: EventBroadcaster,
    config: UploaderConfig,
    retry: RetryPolicy,
    cancel_token: CancellationToken,
}

impl Uploader {
    pub fn new(
        remote: Arc<dyn RemoteDrive>,
        transport: Arc<dyn Transport>,
        store: UploadStore,
        events: EventBroadcaster,
        config: UploaderConfig,
    ) -> Self {
        Self {
            remote,
            transport,
            store,
            events,
            retry: config.retry_policy(),
            config,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Uploader writing to storage over HTTP
    pub fn with_http_transport(
        remote: Arc<dyn RemoteDrive>,
        store: UploadStore,
        events: EventBroadcaster,
        config: UploaderConfig,
    ) -> UploadResult<Self> {
        let transport = Arc::new(HttpTransport::new(config.request_timeout)?);
        Ok(Self::new(remote, transport, store, events, config))
    }

    /// Create uploader with a custom cancellation token
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn store(&self) -> &UploadStore {
        &self.store
    }

    /// Stop the running batch and every later one. Unfinished files end up failed.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Upload `files` under `root_parent_id` (the user's root when `None`).
    ///
    /// Never fails: every file ends as `success` or `error` in the store, and the
    /// returned report counts the outcomes.
    pub async fn run_batch(
        &self,
        files: Vec<FileEntry>,
        root_parent_id: Option<String>,
    ) -> BatchReport {
        let mut report = BatchReport {
            total: files.len(),
            ..Default::default()
        };
        if files.is_empty() {
            return report;
        }

        let entries: Vec<UploadEntry> = files.iter().map(|f| UploadEntry::pending(&f.name)).collect();
        let ids: Vec<String> = entries.iter().map(|e| e.id.clone()).collect();
        self.store.add_uploads(entries);

        info!(
            target: "uploader",
            files = files.len(),
            root = ?root_parent_id,
            "Starting upload batch"
        );

        let root = root_parent_id.as_deref();
        let required = paths::resolve_required_paths(&files);
        let folder_map = if required.is_empty() {
            FolderMap::default()
        } else {
            let options = MaterializeOptions {
                delay: self.config.folder_creation_delay,
                skip_orphans: self.config.unresolved_folder_policy
                    == UnresolvedFolderPolicy::MarkError,
            };
            folders::materialize(
                self.remote.as_ref(),
                &required,
                root,
                &options,
                &self.cancel_token,
            )
            .await
        };
        report.folders_created = folder_map.len();
        report.folders_failed = folder_map.failed_count();

        let queue: Vec<(&str, &FileEntry)> = ids.iter().map(String::as_str).zip(files.iter()).collect();
        for (index, chunk) in queue.chunks(self.config.chunk_size.max(1)).enumerate() {
            if self.cancel_token.is_cancelled() {
                for (upload_id, _) in chunk {
                    self.store.mark_as_error(upload_id, CANCELLED_MESSAGE);
                }
                report.cancelled += chunk.len();
                continue;
            }
            self.run_chunk(index, chunk, &folder_map, root, &mut report)
                .await;
        }

        self.events.refresh_files(root_parent_id.clone());

        info!(
            target: "uploader",
            succeeded = report.succeeded,
            failed = report.failed,
            cancelled = report.cancelled,
            folders_created = report.folders_created,
            "Upload batch finished"
        );
        report
    }

    async fn run_chunk(
        &self,
        index: usize,
        chunk: &[(&str, &FileEntry)],
        folder_map: &FolderMap,
        root: Option<&str>,
        report: &mut BatchReport,
    ) {
        let mut planned = Vec::with_capacity(chunk.len());
        for &(upload_id, file) in chunk {
            let parent_id = match folder_map.resolve_parent(file.relative_path.as_deref()) {
                ParentResolution::Root => root.map(str::to_string),
                ParentResolution::Resolved(id) => Some(id),
                ParentResolution::Unresolved(dir) => match self.config.unresolved_folder_policy {
                    UnresolvedFolderPolicy::MarkError => {
                        let e = UploadError::UnresolvedParent { folder: dir };
                        warn!(
                            target: "uploader",
                            file = %file.name,
                            error = ?e,
                            "Parent folder missing, skipping file"
                        );
                        self.store.mark_as_error(upload_id, e.to_string());
                        report.failed += 1;
                        continue;
                    }
                    UnresolvedFolderPolicy::FallbackToRoot => {
                        warn!(
                            target: "uploader",
                            file = %file.name,
                            folder = %dir,
                            "Parent folder missing, uploading to the batch root"
                        );
                        root.map(str::to_string)
                    }
                },
            };
            planned.push(PlannedFile {
                upload_id,
                file,
                parent_id,
            });
        }
        if planned.is_empty() {
            return;
        }

        let specs: Vec<UploadFileSpec> = planned
            .iter()
            .map(|p| UploadFileSpec {
                name: p.file.name.clone(),
                content_type: p.file.content_type().to_string(),
            })
            .collect();

        let destinations = match self.remote.upload_destinations(&specs).await {
            Ok(destinations) if destinations.len() == specs.len() => destinations,
            Ok(destinations) => {
                let e = UploadError::DestinationMismatch {
                    expected: specs.len(),
                    actual: destinations.len(),
                };
                self.fail_chunk(index, &planned, &e, report);
                return;
            }
            Err(e) => {
                self.fail_chunk(index, &planned, &e.into(), report);
                return;
            }
        };

        // `run_batch` must stay `Send` for `tokio::spawn`
        let (plans, targets) = (&planned, &destinations);
        let transfers: Vec<_> = (0..plans.len())
            .map(move |i| async move { (i, self.transfer_one(&plans[i], &targets[i]).await) })
            .collect();
        let mut outcomes: Vec<(usize, TransferOutcome)> = stream::iter(transfers)
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;
        outcomes.sort_by_key(|(i, _)| *i);

        let mut commit_items = Vec::new();
        let mut bytes = 0;
        for (i, outcome) in outcomes {
            match outcome {
                TransferOutcome::Done => {
                    let plan = &planned[i];
                    commit_items.push(CommitItem {
                        upload_id: plan.upload_id.to_string(),
                        request: MetadataRequest::file(
                            &plan.file.name,
                            &destinations[i].file_key,
                            plan.file.content_type(),
                            plan.file.size,
                            plan.parent_id.clone(),
                        ),
                    });
                    bytes += plan.file.size;
                }
                TransferOutcome::Failed => report.failed += 1,
                TransferOutcome::Cancelled => report.cancelled += 1,
            }
        }

        match finalize::commit(self.remote.as_ref(), &self.store, &commit_items).await {
            Ok(registered) => {
                report.succeeded += registered;
                report.bytes_uploaded += bytes;
            }
            Err(_) => report.failed += commit_items.len(),
        }

        debug!(
            target: "uploader",
            chunk = index,
            files = planned.len(),
            registered = commit_items.len(),
            "Chunk settled"
        );
    }

    fn fail_chunk(
        &self,
        index: usize,
        planned: &[PlannedFile<'_>],
        e: &UploadError,
        report: &mut BatchReport,
    ) {
        error!(
            target: "uploader",
            chunk = index,
            files = planned.len(),
            error = %e,
            "Batch failed"
        );
        for plan in planned {
            self.store.mark_as_error(plan.upload_id, BATCH_FAILED_MESSAGE);
        }
        report.failed += planned.len();
    }

    async fn transfer_one(
        &self,
        plan: &PlannedFile<'_>,
        destination: &UploadDestination,
    ) -> TransferOutcome {
        if self.cancel_token.is_cancelled() {
            self.store.mark_as_error(plan.upload_id, CANCELLED_MESSAGE);
            return TransferOutcome::Cancelled;
        }

        match self
            .transfer(plan.upload_id, plan.file, &destination.upload_url)
            .await
        {
            Ok(()) => {
                debug!(target: "uploader", file = %plan.file.name, "File transferred");
                TransferOutcome::Done
            }
            Err(UploadError::Cancelled) => {
                self.store.mark_as_error(plan.upload_id, CANCELLED_MESSAGE);
                TransferOutcome::Cancelled
            }
            Err(e) => {
                warn!(
                    target: "uploader",
                    file = %plan.file.name,
                    error = %e,
                    "Upload failed"
                );
                self.store
                    .mark_as_error(plan.upload_id, format!("Upload failed: {}", e));
                TransferOutcome::Failed
            }
        }
    }

    /// Direct write of one file with store progress; 100 once storage acknowledged it
    async fn transfer(&self, upload_id: &str, file: &FileEntry, url: &str) -> UploadResult<()> {
        self.store.update_progress(upload_id, 1);
        let progress: Arc<dyn ProgressCallback> = Arc::new(StoreProgress {
            store: self.store.clone(),
            upload_id: upload_id.to_string(),
        });

        transfer::put_with_retry(
            self.transport.as_ref(),
            url,
            file,
            progress,
            &self.retry,
            &self.cancel_token,
        )
        .await?;

        self.store.update_progress(upload_id, 100);
        Ok(())
    }

    /// Upload a single file: destination, direct write, then metadata.
    ///
    /// The file's store entry only reaches `success` once its metadata is saved.
    pub async fn upload_file(
        &self,
        file: FileEntry,
        parent_id: Option<String>,
    ) -> UploadResult<DriveItem> {
        let entry = UploadEntry::pending(&file.name);
        let upload_id = entry.id.clone();
        self.store.add_uploads(vec![entry]);

        let result = self
            .upload_single(&upload_id, &file, parent_id.clone())
            .await;

        match &result {
            Ok(item) => {
                self.store.update_progress(&upload_id, 100);
                info!(
                    target: "uploader",
                    file = %file.name,
                    item_id = ?item.item_id(),
                    "Upload completed successfully"
                );
                self.events.refresh_files(parent_id);
            }
            Err(UploadError::Cancelled) => {
                self.store.mark_as_error(&upload_id, CANCELLED_MESSAGE);
            }
            Err(e) => {
                error!(target: "uploader", file = %file.name, error = %e, "Upload failed");
                self.store
                    .mark_as_error(&upload_id, format!("Upload failed: {}", e));
            }
        }
        result
    }

    async fn upload_single(
        &self,
        upload_id: &str,
        file: &FileEntry,
        parent_id: Option<String>,
    ) -> UploadResult<DriveItem> {
        if self.cancel_token.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        let destination = self
            .remote
            .upload_destination(&file.name, file.content_type())
            .await?;

        // Progress stays below 100 until the metadata is saved
        self.store.update_progress(upload_id, 1);
        let progress: Arc<dyn ProgressCallback> = Arc::new(StoreProgress {
            store: self.store.clone(),
            upload_id: upload_id.to_string(),
        });
        transfer::put_with_retry(
            self.transport.as_ref(),
            &destination.upload_url,
            file,
            progress,
            &self.retry,
            &self.cancel_token,
        )
        .await?;

        let request = MetadataRequest::file(
            &file.name,
            &destination.file_key,
            file.content_type(),
            file.size,
            parent_id,
        );
        Ok(self.remote.save_metadata(&request).await?)
    }
}
