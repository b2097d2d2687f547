//! Observable state of every upload the user has started.
//!
//! [`UploadStore`] is a cheap handle; clones share one state. Every mutation goes
//! through a `watch` channel, so mutations are serialized and subscribers always
//! see a consistent snapshot.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// Upload status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Success,
    Error,
}

impl UploadStatus {
    /// `success` and `error` never change without a new upload attempt
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Success | UploadStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Success => "success",
            UploadStatus::Error => "error",
        }
    }
}

/// One row of the upload widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadEntry {
    pub id: String,
    pub name: String,
    /// 0-100
    pub progress: u8,
    pub status: UploadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadEntry {
    /// New pending entry with a fresh id
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            progress: 0,
            status: UploadStatus::Pending,
            error: None,
        }
    }
}

/// Partial update merged into an entry by [`UploadStore::update_upload`]
#[derive(Debug, Clone, Default)]
pub struct UploadPatch {
    pub name: Option<String>,
    pub progress: Option<u8>,
    pub status: Option<UploadStatus>,
    pub error: Option<String>,
}

/// Counts shown in the widget header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    /// Pending or uploading
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
}

impl UploadSummary {
    pub fn is_finished(&self) -> bool {
        self.in_progress == 0
    }
}

/// Snapshot of the whole store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadState {
    pub uploads: Vec<UploadEntry>,
    pub is_visible: bool,
    pub is_expanded: bool,
}

impl Default for UploadState {
    fn default() -> Self {
        Self {
            uploads: Vec::new(),
            is_visible: false,
            is_expanded: true,
        }
    }
}

impl UploadState {
    pub fn get(&self, id: &str) -> Option<&UploadEntry> {
        self.uploads.iter().find(|u| u.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut UploadEntry> {
        self.uploads.iter_mut().find(|u| u.id == id)
    }

    pub fn summary(&self) -> UploadSummary {
        let mut summary = UploadSummary::default();
        for upload in &self.uploads {
            match upload.status {
                UploadStatus::Pending | UploadStatus::Uploading => summary.in_progress += 1,
                UploadStatus::Success => summary.completed += 1,
                UploadStatus::Error => summary.failed += 1,
            }
        }
        summary
    }

    /// Header line of the upload widget
    pub fn header_text(&self) -> String {
        let summary = self.summary();
        if summary.is_finished() {
            let mut text = format!("{} uploads complete", summary.completed);
            if summary.failed > 0 {
                text.push_str(&format!(", {} failed", summary.failed));
            }
            text
        } else {
            let plural = if summary.in_progress == 1 { "" } else { "s" };
            format!("Uploading {} item{}", summary.in_progress, plural)
        }
    }
}

/// Shared handle to the upload state
#[derive(Clone)]
pub struct UploadStore {
    sender: Arc<watch::Sender<UploadState>>,
}

impl Default for UploadStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(UploadState::default());
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Receive a notification after every change
    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.sender.subscribe()
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> UploadState {
        self.sender.borrow().clone()
    }

    pub fn get(&self, id: &str) -> Option<UploadEntry> {
        self.sender.borrow().get(id).cloned()
    }

    pub fn summary(&self) -> UploadSummary {
        self.sender.borrow().summary()
    }

    pub fn header_text(&self) -> String {
        self.sender.borrow().header_text()
    }

    /// Append entries and pop the widget open
    pub fn add_uploads(&self, entries: impl IntoIterator<Item = UploadEntry>) {
        let entries: Vec<UploadEntry> = entries.into_iter().collect();
        self.sender.send_modify(|state| {
            state.uploads.extend(entries);
            state.is_visible = true;
            state.is_expanded = true;
        });
    }

    /// Merge `patch` into an entry. Unknown ids are ignored.
    pub fn update_upload(&self, id: &str, patch: UploadPatch) {
        self.sender.send_if_modified(|state| {
            let Some(entry) = state.get_mut(id) else {
                return false;
            };
            if let Some(name) = patch.name {
                entry.name = name;
            }
            if let Some(progress) = patch.progress {
                entry.progress = progress.min(100);
            }
            if let Some(status) = patch.status {
                entry.status = status;
            }
            if let Some(error) = patch.error {
                entry.error = Some(error);
            }
            true
        });
    }

    /// Record transfer progress. 100 means success, anything lower means uploading.
    ///
    /// Progress never decreases and entries that already finished are left alone.
    pub fn update_progress(&self, id: &str, percent: u8) {
        let percent = percent.min(100);
        self.sender.send_if_modified(|state| {
            let Some(entry) = state.get_mut(id) else {
                return false;
            };
            if entry.status.is_terminal() || percent < entry.progress {
                return false;
            }
            let status = if percent == 100 {
                UploadStatus::Success
            } else {
                UploadStatus::Uploading
            };
            if entry.progress == percent && entry.status == status {
                return false;
            }
            entry.progress = percent;
            entry.status = status;
            true
        });
    }

    /// Mark an entry failed, freezing its progress
    pub fn mark_as_error(&self, id: &str, message: impl Into<String>) {
        let message = message.into();
        self.sender.send_if_modified(|state| {
            let Some(entry) = state.get_mut(id) else {
                return false;
            };
            entry.status = UploadStatus::Error;
            entry.error = Some(message);
            true
        });
    }

    /// Drop one entry from the list. Does not abort its transfer.
    pub fn remove_upload(&self, id: &str) {
        self.sender.send_if_modified(|state| {
            let before = state.uploads.len();
            state.uploads.retain(|u| u.id != id);
            state.is_visible = !state.uploads.is_empty();
            state.uploads.len() != before
        });
    }

    /// Drop finished entries, keeping pending and uploading ones
    pub fn clear_completed(&self) {
        self.sender.send_modify(|state| {
            state.uploads.retain(|u| !u.status.is_terminal());
            state.is_visible = !state.uploads.is_empty();
        });
    }

    pub fn toggle_expanded(&self) {
        self.sender.send_modify(|state| {
            state.is_expanded = !state.is_expanded;
        });
    }

    /// Hide the widget and forget every entry
    pub fn close_widget(&self) {
        self.sender.send_modify(|state| {
            state.uploads.clear();
            state.is_visible = false;
        });
    }
}
