use serde::{Deserialize, Serialize};

/// Item type constants
pub mod item_type {
    pub const FILE: &str = "file";
    pub const FOLDER: &str = "folder";
}

/// A file or folder record as stored by the backend
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    /// Database identifier (`_id`)
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// Virtual identifier some responses carry instead of `_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_folder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_starred: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_trashed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl DriveItem {
    /// The record's identifier, whichever field the backend filled in
    pub fn item_id(&self) -> Option<&str> {
        self.object_id.as_deref().or(self.id.as_deref())
    }

    pub fn is_folder(&self) -> bool {
        self.item_type == item_type::FOLDER
    }
}

/// Envelope for endpoints answering `{ item: ... }`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ItemResponse {
    #[serde(default)]
    pub item: DriveItem,
}

/// Body of `POST /files/metadata`, used both for folders and for uploaded files
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// `null` attaches the item to the user's root
    pub parent_folder_id: Option<String>,
}

impl MetadataRequest {
    /// Metadata for a new folder
    pub fn folder(name: impl Into<String>, parent_folder_id: Option<String>) -> Self {
        Self {
            name: name.into(),
            item_type: item_type::FOLDER.to_string(),
            file_key: None,
            file_type: None,
            size: None,
            parent_folder_id,
        }
    }

    /// Metadata registering a file whose bytes already sit in storage
    pub fn file(
        name: impl Into<String>,
        file_key: impl Into<String>,
        file_type: impl Into<String>,
        size: u64,
        parent_folder_id: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            item_type: item_type::FILE.to_string(),
            file_key: Some(file_key.into()),
            file_type: Some(file_type.into()),
            size: Some(size),
            parent_folder_id,
        }
    }
}

/// Body of `PUT /files/{id}/rename`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// Query for `GET /files`
#[derive(Debug, Clone, Default)]
pub struct ListItemsQuery {
    pub parent_folder_id: Option<String>,
    pub trashed: bool,
}

impl ListItemsQuery {
    pub fn in_folder(parent_folder_id: impl Into<String>) -> Self {
        Self {
            parent_folder_id: Some(parent_folder_id.into()),
            trashed: false,
        }
    }

    pub fn trashed(mut self) -> Self {
        self.trashed = true;
        self
    }

    /// Encode as a query string, including the leading `?` when non-empty
    pub fn to_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        if let Some(parent) = &self.parent_folder_id {
            serializer.append_pair("parentFolderId", parent);
        }
        if self.trashed {
            serializer.append_pair("trash", "true");
        }
        let query = serializer.finish();
        if query.is_empty() {
            query
        } else {
            format!("?{}", query)
        }
    }
}
