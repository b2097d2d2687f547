//! Registers a chunk's transferred files with the backend.

use crate::uploader::error::UploadResult;
use crate::uploader::remote::RemoteDrive;
use crate::uploader::store::UploadStore;
use drive_api::models::MetadataRequest;
use tracing::{debug, error};

pub const COMMIT_FAILED_MESSAGE: &str = "Failed to register file metadata";

/// A transferred file waiting to be registered
#[derive(Debug, Clone)]
pub struct CommitItem {
    /// Store entry of the file
    pub upload_id: String,
    pub request: MetadataRequest,
}

/// Register every item with one bulk call.
///
/// If the call fails, every item's entry is marked failed so the store never shows
/// a file whose metadata was not saved as uploaded. Returns the number registered.
pub async fn commit(
    remote: &dyn RemoteDrive,
    store: &UploadStore,
    items: &[CommitItem],
) -> UploadResult<usize> {
    if items.is_empty() {
        return Ok(0);
    }

    let requests: Vec<MetadataRequest> = items.iter().map(|i| i.request.clone()).collect();
    match remote.commit_metadata(&requests).await {
        Ok(()) => {
            debug!(target: "uploader::finalize", count = items.len(), "Metadata committed");
            Ok(items.len())
        }
        Err(e) => {
            error!(
                target: "uploader::finalize",
                count = items.len(),
                error = %e,
                "Failed to commit metadata"
            );
            for item in items {
                store.mark_as_error(&item.upload_id, COMMIT_FAILED_MESSAGE);
            }
            Err(e.into())
        }
    }
}
