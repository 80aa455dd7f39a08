//! Common test infrastructure
//!
//! Every test gets its own database file in a temporary directory, a started
//! live update hub and a service wired to both.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::TestContext;
//!
//! #[tokio::test]
//! async fn test_send() {
//!     let ctx = TestContext::new();
//!     ctx.service.users().send(1, common::info("Hello")).unwrap();
//! }
//! ```

#![allow(dead_code)]

use std::sync::Arc;

use notification_center::live::LiveUpdateHub;
use notification_center::notifications::{
    NewNotification, NotificationKind, NotificationService, SqliteNotificationStore,
};
use tempfile::TempDir;

pub const USER_1: usize = 1;
pub const USER_2: usize = 2;
pub const ADMIN_1: usize = 1;

pub struct TestContext {
    pub service: NotificationService,
    pub store: Arc<SqliteNotificationStore>,
    pub hub: Arc<LiveUpdateHub>,
    // Keeps the database directory alive for the duration of the test
    _temp_dir: TempDir,
}

impl TestContext {
    /// Build a context with a started hub. Must run inside a tokio runtime.
    pub fn new() -> Self {
        Self::with_retention_limit(0)
    }

    pub fn with_retention_limit(limit: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("notifications.db");
        let store = Arc::new(
            SqliteNotificationStore::new(&db_path)
                .expect("Failed to create notification store")
                .with_retention_limit(limit),
        );
        let hub = Arc::new(LiveUpdateHub::new(8));
        hub.start().expect("Failed to start hub");

        let service = NotificationService::new(store.clone(), store.clone(), hub.clone());

        Self {
            service,
            store,
            hub,
            _temp_dir: temp_dir,
        }
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.hub.stop();
    }
}

pub fn notification(kind: NotificationKind, title: &str) -> NewNotification {
    NewNotification::new(kind, title, format!("{} message", title))
}

pub fn info(title: &str) -> NewNotification {
    notification(NotificationKind::Info, title)
}
