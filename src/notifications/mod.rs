//! Notifications for users and admins
//!
//! Each owner kind has its own storage namespace; everything above the store
//! is shared and parameterized by [`OwnerKind`].

mod api;
mod error;
mod models;
mod preferences;
mod schema;
mod service;
mod sqlite_store;
mod store;

pub use api::{NotificationListResponse, UnreadCountResponse};
pub use error::NotificationError;
pub use models::{
    DisplayChannel, NewNotification, Notification, NotificationKind, NotificationQuery,
    NotificationStatistics, Owner, OwnerKind,
};
pub use preferences::{
    NotificationPreferences, PreferencesUpdate, DEFAULT_TOAST_DURATION_INFO,
    DEFAULT_TOAST_DURATION_SUCCESS, DEFAULT_TOAST_DURATION_WARNING,
};
pub use schema::NOTIFICATION_VERSIONED_SCHEMAS;
pub use service::{
    ListLimits, NotificationService, ScopedNotifications, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT,
};
pub use sqlite_store::SqliteNotificationStore;
pub use store::{NotificationStore, PreferencesStore};
