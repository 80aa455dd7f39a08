//! Response bodies handed to the HTTP layer.

use serde::{Deserialize, Serialize};

use super::models::{Notification, NotificationQuery};

/// `{"unread_count": N}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub unread_count: usize,
}

/// A page of notifications. `count` is the number of items in this page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub limit: usize,
    pub offset: usize,
    pub count: usize,
}

impl NotificationListResponse {
    pub fn new(notifications: Vec<Notification>, limit: usize, query: &NotificationQuery) -> Self {
        Self {
            count: notifications.len(),
            notifications,
            limit,
            offset: query.offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unread_count_shape() {
        let json = serde_json::to_value(UnreadCountResponse { unread_count: 4 }).unwrap();
        assert_eq!(json, serde_json::json!({"unread_count": 4}));
    }

    #[test]
    fn test_list_envelope_shape() {
        let query = NotificationQuery {
            offset: 10,
            ..Default::default()
        };
        let response = NotificationListResponse::new(Vec::new(), 50, &query);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"notifications": [], "limit": 50, "offset": 10, "count": 0})
        );
    }
}
