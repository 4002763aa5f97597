//! Phoenix wire messages for the realtime websocket.
//!
//! The realtime service speaks the Phoenix channel protocol: every frame is
//! a JSON object with `topic`, `event`, `payload`, and `ref`. Joining the
//! topic `realtime:public:{table}` (optionally suffixed with a filter
//! expression) subscribes to postgres change events for that table, which
//! arrive with the event names `INSERT`, `UPDATE`, and `DELETE`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::ChangeKind;

/// Topic used for protocol-level heartbeats.
pub const HEARTBEAT_TOPIC: &str = "phoenix";

/// A frame sent to the server.
#[derive(Debug, Serialize)]
pub struct OutgoingMessage {
    pub topic: String,
    pub event: String,
    pub payload: Value,
    #[serde(rename = "ref")]
    pub reference: String,
}

impl OutgoingMessage {
    /// Join request for a channel topic.
    pub fn join(topic: &str, reference: u64) -> Self {
        Self {
            topic: topic.to_string(),
            event: "phx_join".into(),
            payload: json!({}),
            reference: reference.to_string(),
        }
    }

    /// Keepalive frame; the server drops clients that stop sending these.
    pub fn heartbeat(reference: u64) -> Self {
        Self {
            topic: HEARTBEAT_TOPIC.into(),
            event: "heartbeat".into(),
            payload: json!({}),
            reference: reference.to_string(),
        }
    }
}

/// A frame received from the server. The wire `ref` is not tracked; replies
/// are matched on topic and status instead.
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

impl IncomingMessage {
    /// Whether this is a successful join acknowledgement for `topic`.
    pub fn is_join_ack(&self, topic: &str) -> bool {
        self.topic == topic
            && self.event == "phx_reply"
            && self.payload.get("status").and_then(Value::as_str) == Some("ok")
    }

    /// Whether this frame terminates the channel (`phx_error` / `phx_close`).
    pub fn is_termination(&self) -> bool {
        self.event == "phx_error" || self.event == "phx_close"
    }

    /// The change discriminator, if this frame is a postgres change event.
    pub fn change_kind(&self) -> Option<ChangeKind> {
        match self.event.as_str() {
            "INSERT" | "UPDATE" | "DELETE" => Some(ChangeKind::from_event_name(&self.event)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_message_shape() {
        let msg = OutgoingMessage::join("realtime:public:patients", 1);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["topic"], "realtime:public:patients");
        assert_eq!(value["event"], "phx_join");
        assert_eq!(value["ref"], "1");
    }

    #[test]
    fn test_heartbeat_uses_phoenix_topic() {
        let msg = OutgoingMessage::heartbeat(7);
        assert_eq!(msg.topic, HEARTBEAT_TOPIC);
        assert_eq!(msg.event, "heartbeat");
    }

    #[test]
    fn test_parse_join_ack() {
        let raw = r#"{
            "topic": "realtime:public:patients",
            "event": "phx_reply",
            "payload": {"status": "ok", "response": {}},
            "ref": "1"
        }"#;
        let msg: IncomingMessage = serde_json::from_str(raw).unwrap();
        assert!(msg.is_join_ack("realtime:public:patients"));
        assert!(!msg.is_join_ack("realtime:public:therapists"));
        assert!(msg.change_kind().is_none());
    }

    #[test]
    fn test_parse_failed_join_reply_is_not_ack() {
        let raw = r#"{
            "topic": "realtime:public:patients",
            "event": "phx_reply",
            "payload": {"status": "error", "response": {"reason": "unauthorized"}},
            "ref": "1"
        }"#;
        let msg: IncomingMessage = serde_json::from_str(raw).unwrap();
        assert!(!msg.is_join_ack("realtime:public:patients"));
    }

    #[test]
    fn test_parse_insert_event() {
        let raw = r#"{
            "topic": "realtime:public:patients",
            "event": "INSERT",
            "payload": {"record": {"id": 9}, "schema": "public", "table": "patients"},
            "ref": null
        }"#;
        let msg: IncomingMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.change_kind(), Some(ChangeKind::Insert));
    }

    #[test]
    fn test_parse_termination_events() {
        for event in ["phx_error", "phx_close"] {
            let raw = format!(r#"{{"topic": "t", "event": "{event}", "payload": {{}}}}"#);
            let msg: IncomingMessage = serde_json::from_str(&raw).unwrap();
            assert!(msg.is_termination());
        }
    }

    #[test]
    fn test_heartbeat_reply_is_ignored_frame() {
        let raw = r#"{
            "topic": "phoenix",
            "event": "phx_reply",
            "payload": {"status": "ok", "response": {}},
            "ref": "2"
        }"#;
        let msg: IncomingMessage = serde_json::from_str(raw).unwrap();
        assert!(!msg.is_join_ack("realtime:public:patients"));
        assert!(msg.change_kind().is_none());
        assert!(!msg.is_termination());
    }
}
