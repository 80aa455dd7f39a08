//! Live update message types.
//!
//! Every event pushed to a live session uses the same envelope; the
//! feature-specific payload is carried as a JSON value.

use serde::{Deserialize, Serialize};

use crate::notifications::Notification;

/// Message type identifiers.
pub mod msg_types {
    /// A notification was created for the subscriber's owner.
    pub const NOTIFICATION_CREATED: &str = "notification.created";
}

/// Server -> live session message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub payload: serde_json::Value,
}

impl ServerMessage {
    /// Create a new server message with the given type and payload.
    pub fn new(msg_type: impl Into<String>, payload: impl Serialize) -> Self {
        Self {
            msg_type: msg_type.into(),
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn notification_created(notification: &Notification) -> Self {
        Self::new(msg_types::NOTIFICATION_CREATED, notification)
    }

    /// Decode the payload of a `notification.created` message.
    pub fn notification(&self) -> Option<Notification> {
        if self.msg_type != msg_types::NOTIFICATION_CREATED {
            return None;
        }
        serde_json::from_value(self.payload.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{DisplayChannel, NotificationKind, Owner};

    fn sample() -> Notification {
        Notification {
            id: "n-1".to_string(),
            owner: Owner::admin(2),
            kind: NotificationKind::Security,
            display: DisplayChannel::Center,
            title: "New login".to_string(),
            message: "A new device signed in".to_string(),
            action: None,
            read: false,
            read_at: None,
            dismissed: false,
            created_at: 1700000000,
            expires_at: None,
        }
    }

    #[test]
    fn notification_created_envelope() {
        let msg = ServerMessage::notification_created(&sample());
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "notification.created");
        assert_eq!(json["payload"]["kind"], "security");
        assert_eq!(json["payload"]["owner"]["kind"], "admin");
        assert_eq!(msg.notification().unwrap(), sample());
    }

    #[test]
    fn other_message_types_carry_no_notification() {
        let msg = ServerMessage::new("ping", serde_json::json!({}));
        assert!(msg.notification().is_none());
    }
}
