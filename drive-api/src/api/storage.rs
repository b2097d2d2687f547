use crate::client::Client;
use crate::error::{ApiError, ApiResult};
use crate::models::files::{DriveItem, ItemResponse, MetadataRequest};
use crate::models::storage::*;
use async_trait::async_trait;
use serde_json::Value;

/// Storage API trait: presigned upload destinations and metadata registration
#[async_trait]
pub trait StorageApi {
    /// Request a presigned PUT destination for one file
    async fn generate_upload_url(
        &self,
        file_name: &str,
        file_type: &str,
    ) -> ApiResult<UploadDestination>;

    /// Register one uploaded file
    async fn save_metadata(&self, request: &MetadataRequest) -> ApiResult<DriveItem>;

    /// Request destinations for several files at once, in request order
    async fn batch_generate_upload_urls(
        &self,
        files: &[UploadFileSpec],
    ) -> ApiResult<Vec<UploadDestination>>;

    /// Register several uploaded files in one call
    async fn batch_save_metadata(&self, items: &[MetadataRequest]) -> ApiResult<Value>;
}

#[async_trait]
impl StorageApi for Client {
    async fn generate_upload_url(
        &self,
        file_name: &str,
        file_type: &str,
    ) -> ApiResult<UploadDestination> {
        let request = UploadUrlRequest {
            file_name: file_name.to_string(),
            file_type: file_type.to_string(),
        };
        self.post("/files/generate-upload-url", &request).await
    }

    async fn save_metadata(&self, request: &MetadataRequest) -> ApiResult<DriveItem> {
        let response: ItemResponse = self.post("/files/metadata", request).await?;
        Ok(response.item)
    }

    async fn batch_generate_upload_urls(
        &self,
        files: &[UploadFileSpec],
    ) -> ApiResult<Vec<UploadDestination>> {
        let request = BatchUploadUrlsRequest {
            files: files.to_vec(),
        };
        let destinations: Vec<UploadDestination> = self
            .post("/files/batch/generate-upload-urls", &request)
            .await?;

        // Destinations are matched to files by position
        if destinations.len() != files.len() {
            return Err(ApiError::Other(format!(
                "expected {} upload destinations, got {}",
                files.len(),
                destinations.len()
            )));
        }
        Ok(destinations)
    }

    async fn batch_save_metadata(&self, items: &[MetadataRequest]) -> ApiResult<Value> {
        let request = BatchMetadataRequest {
            items: items.to_vec(),
        };
        self.post("/files/batch/metadata", &request).await
    }
}
