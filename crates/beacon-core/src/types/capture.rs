//! Captured network, WebSocket, and user-action entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A captured network request/response pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkBody {
    /// Full request URL.
    pub url: String,
    /// HTTP method.
    pub method: String,
    /// Response status code.
    pub status: u16,
    /// Round-trip duration in milliseconds.
    pub duration_ms: f64,
    /// Captured response body (may be truncated by the producer).
    pub response_body: String,
    /// Response content type.
    pub content_type: String,
}

/// A captured WebSocket lifecycle or message event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketEvent {
    /// Event kind: "open", "close", "error", "message".
    pub event: String,
    /// Socket URL.
    pub url: String,
    /// Producer-assigned socket id.
    pub id: String,
    /// Close code, for "close" events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_code: Option<u16>,
    /// Close reason, for "close" events.
    pub close_reason: String,
    /// Payload excerpt, for "message" events.
    pub data: String,
}

/// A captured user interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAction {
    /// Interaction kind: "click", "navigate", "input", ...
    #[serde(rename = "type")]
    pub action_type: String,
    /// Page URL at the time of the interaction.
    pub url: String,
    /// When the interaction happened.
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_action_serializes_type_field() {
        let action = UserAction {
            action_type: "click".to_string(),
            url: "https://app.test/page".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "click");
    }

    #[test]
    fn test_websocket_close_code_elided_when_absent() {
        let event = WebSocketEvent {
            event: "open".to_string(),
            url: "wss://app.test/ws".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("close_code"));
    }
}
