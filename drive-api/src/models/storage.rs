use crate::models::files::MetadataRequest;
use serde::{Deserialize, Serialize};

/// Body of `POST /files/generate-upload-url`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    pub file_name: String,
    pub file_type: String,
}

/// Where to PUT a file's bytes, and the storage key to register afterwards
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadDestination {
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
    pub file_key: String,
}

/// One entry of a batch destination request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadFileSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
}

/// Body of `POST /files/batch/generate-upload-urls`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchUploadUrlsRequest {
    pub files: Vec<UploadFileSpec>,
}

/// Body of `POST /files/batch/metadata`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMetadataRequest {
    pub items: Vec<MetadataRequest>,
}
