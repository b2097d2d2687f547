use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Process-wide notifications emitted by the upload pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    /// File listings under `folder_id` (root when `None`) are stale
    RefreshFiles {
        folder_id: Option<String>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::RefreshFiles { .. } => "RefreshFiles",
        }
    }
}

/// Fan-out of [`Event`]s to any number of listeners
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: Arc<broadcast::Sender<Event>>,
}

impl EventBroadcaster {
    /// Create a new event broadcaster
    ///
    /// # Arguments
    /// * `capacity` - The capacity of the broadcast channel (default: 100)
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Broadcast an event to all subscribers
    ///
    /// # Returns
    /// The number of receivers that received the event
    pub fn broadcast(&self, event: Event) -> usize {
        match self.sender.send(event.clone()) {
            Ok(count) => {
                tracing::debug!(target: "events", event = event.name(), subscribers = count, "Broadcast event to subscriber(s)");
                tracing::trace!(target: "events", event = ?event, "Event details");
                count
            }
            Err(_) => {
                tracing::debug!(target: "events", event = event.name(), "No active subscribers for event");
                0
            }
        }
    }

    /// Helper: Broadcast a file list refresh for a folder
    pub fn refresh_files(&self, folder_id: Option<String>) {
        self.broadcast(Event::RefreshFiles { folder_id });
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
