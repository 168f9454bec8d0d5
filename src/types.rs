use serde::{Deserialize, Serialize};

/// Delivery id recorded when the caller sends no `X-GitHub-Delivery` header.
pub const UNKNOWN_DELIVERY: &str = "unknown";

/// Event type recorded when the payload carries no string `action` field.
pub const DEFAULT_EVENT_TYPE: &str = "test";

/// A stored webhook delivery, as read back from the event store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: i64,
    pub delivery_id: String,
    pub event_type: String,
    /// ISO-8601 UTC time the delivery was received by this service.
    pub timestamp: String,
    pub payload: serde_json::Value,
    /// Set by storage on insert.
    pub created_at: Option<String>,
}

/// A normalized delivery waiting to be persisted; storage assigns `id` and
/// `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWebhookEvent {
    pub delivery_id: String,
    pub event_type: String,
    pub timestamp: String,
    pub payload: serde_json::Value,
}

/// Body returned for an accepted delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivedResponse {
    pub status: String,
    pub event_id: i64,
    pub delivery_id: String,
    pub message: String,
}

/// Body returned by the recent-events listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentEventsResponse {
    pub events: Vec<WebhookEvent>,
    pub count: usize,
}
