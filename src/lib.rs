//! Notification Center Library
//!
//! Stores per-user and per-admin notifications and display preferences, and
//! pushes newly created notifications to live sessions.

pub mod config;
pub mod live;
pub mod notifications;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use live::LiveUpdateHub;
pub use notifications::{NotificationService, SqliteNotificationStore};
