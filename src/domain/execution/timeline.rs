use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineEventType {
    Start,
    Success,
    Error,
    Stopped,
}

/// One append-only entry of a run's timeline.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: String,
    /// Milliseconds since the Unix epoch.
    pub ts: i64,
    pub node_id: String,
    #[serde(rename = "type")]
    pub event_type: TimelineEventType,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}
