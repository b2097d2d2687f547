use crate::client::Client;
use crate::error::ApiResult;
use crate::models::files::*;
use async_trait::async_trait;
use serde_json::Value;

/// Files API trait
#[async_trait]
pub trait FilesApi {
    /// List items, optionally inside a folder or in the trash
    async fn list_items(&self, query: &ListItemsQuery) -> ApiResult<Vec<DriveItem>>;

    /// Recently modified files
    async fn list_recent(&self) -> ApiResult<Vec<DriveItem>>;

    /// Starred items
    async fn list_starred(&self) -> ApiResult<Vec<DriveItem>>;

    /// Items in the trash
    async fn list_trash(&self) -> ApiResult<Vec<DriveItem>>;

    /// Get a single item
    async fn get_item(&self, id: &str) -> ApiResult<DriveItem>;

    /// Create a folder under `parent_folder_id` (root when `None`)
    async fn create_folder(
        &self,
        name: &str,
        parent_folder_id: Option<&str>,
    ) -> ApiResult<DriveItem>;

    /// Rename an item
    async fn rename_item(&self, id: &str, name: &str) -> ApiResult<Value>;

    /// Move an item to the trash
    async fn trash_item(&self, id: &str) -> ApiResult<Value>;

    /// Restore an item from the trash
    async fn restore_item(&self, id: &str) -> ApiResult<Value>;

    /// Toggle the starred flag
    async fn toggle_star(&self, id: &str) -> ApiResult<Value>;

    /// Permanently delete an item
    async fn delete_forever(&self, id: &str) -> ApiResult<Value>;

    /// Get a download link for a file
    async fn get_download_url(&self, id: &str) -> ApiResult<Value>;
}

#[async_trait]
impl FilesApi for Client {
    async fn list_items(&self, query: &ListItemsQuery) -> ApiResult<Vec<DriveItem>> {
        self.get(&format!("/files{}", query.to_query_string()))
            .await
    }

    async fn list_recent(&self) -> ApiResult<Vec<DriveItem>> {
        self.get("/files/recent").await
    }

    async fn list_starred(&self) -> ApiResult<Vec<DriveItem>> {
        self.get("/files/starred").await
    }

    async fn list_trash(&self) -> ApiResult<Vec<DriveItem>> {
        self.get("/files/trash").await
    }

    async fn get_item(&self, id: &str) -> ApiResult<DriveItem> {
        self.get(&format!("/files/{}", id)).await
    }

    async fn create_folder(
        &self,
        name: &str,
        parent_folder_id: Option<&str>,
    ) -> ApiResult<DriveItem> {
        let request = MetadataRequest::folder(name, parent_folder_id.map(str::to_string));
        let response: ItemResponse = self.post("/files/metadata", &request).await?;
        Ok(response.item)
    }

    async fn rename_item(&self, id: &str, name: &str) -> ApiResult<Value> {
        let request = RenameRequest {
            name: name.to_string(),
        };
        self.put(&format!("/files/{}/rename", id), Some(&request))
            .await
    }

    async fn trash_item(&self, id: &str) -> ApiResult<Value> {
        self.put::<(), _>(&format!("/files/{}/trash", id), None)
            .await
    }

    async fn restore_item(&self, id: &str) -> ApiResult<Value> {
        self.put::<(), _>(&format!("/files/{}/restore", id), None)
            .await
    }

    async fn toggle_star(&self, id: &str) -> ApiResult<Value> {
        self.put::<(), _>(&format!("/files/{}/star", id), None)
            .await
    }

    async fn delete_forever(&self, id: &str) -> ApiResult<Value> {
        self.delete(&format!("/files/{}", id)).await
    }

    async fn get_download_url(&self, id: &str) -> ApiResult<Value> {
        self.get(&format!("/files/{}/download", id)).await
    }
}
