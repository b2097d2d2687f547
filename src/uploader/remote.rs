//! Backend calls the upload pipeline depends on.

use async_trait::async_trait;
use drive_api::api::{FilesApi, StorageApi};
use drive_api::models::{DriveItem, MetadataRequest, UploadDestination, UploadFileSpec};
use drive_api::{ApiError, ApiResult, Client};

/// The slice of the drive backend used while uploading
#[async_trait]
pub trait RemoteDrive: Send + Sync {
    /// Create a folder and return its id
    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> ApiResult<String>;

    /// Presigned destinations for `files`, aligned by position
    async fn upload_destinations(
        &self,
        files: &[UploadFileSpec],
    ) -> ApiResult<Vec<UploadDestination>>;

    /// Register a chunk's uploaded files in one call
    async fn commit_metadata(&self, items: &[MetadataRequest]) -> ApiResult<()>;

    /// Presigned destination for a single file
    async fn upload_destination(&self, name: &str, content_type: &str)
    -> ApiResult<UploadDestination>;

    /// Register a single uploaded file
    async fn save_metadata(&self, item: &MetadataRequest) -> ApiResult<DriveItem>;
}

#[async_trait]
impl RemoteDrive for Client {
    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> ApiResult<String> {
        let folder = FilesApi::create_folder(self, name, parent_id).await?;
        folder
            .item_id()
            .map(str::to_string)
            .ok_or_else(|| ApiError::Other(format!("folder '{}' created without an id", name)))
    }

    async fn upload_destinations(
        &self,
        files: &[UploadFileSpec],
    ) -> ApiResult<Vec<UploadDestination>> {
        self.batch_generate_upload_urls(files).await
    }

    async fn commit_metadata(&self, items: &[MetadataRequest]) -> ApiResult<()> {
        self.batch_save_metadata(items).await?;
        Ok(())
    }

    async fn upload_destination(
        &self,
        name: &str,
        content_type: &str,
    ) -> ApiResult<UploadDestination> {
        self.generate_upload_url(name, content_type).await
    }

    async fn save_metadata(&self, item: &MetadataRequest) -> ApiResult<DriveItem> {
        StorageApi::save_metadata(self, item).await
    }
}
