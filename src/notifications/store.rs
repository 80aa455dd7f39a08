//! Notification and preferences storage traits

use anyhow::Result;

use super::models::{
    NewNotification, Notification, NotificationQuery, NotificationStatistics, Owner,
};
use super::preferences::{NotificationPreferences, PreferencesUpdate};

/// Trait for notification storage operations.
///
/// Every lookup is scoped to the owner: a record that exists but belongs to
/// someone else is reported exactly like a missing one (`None` / `false`).
pub trait NotificationStore: Send + Sync {
    /// Create a notification for an owner.
    /// Returns the created notification with its ID and timestamps set.
    fn create_notification(&self, owner: Owner, new: &NewNotification) -> Result<Notification>;

    /// Get a single notification by ID (verifies ownership).
    fn get_notification(&self, notification_id: &str, owner: Owner) -> Result<Option<Notification>>;

    /// Get notifications for an owner, ordered by created_at DESC.
    fn get_notifications(&self, owner: Owner, query: &NotificationQuery) -> Result<Vec<Notification>>;

    /// Mark a notification as read. Returns the updated notification.
    /// The first read timestamp is kept on repeated calls.
    fn mark_notification_read(
        &self,
        notification_id: &str,
        owner: Owner,
    ) -> Result<Option<Notification>>;

    /// Mark every unread notification of an owner as read in a single statement.
    /// Returns the number of notifications that changed.
    fn mark_all_read(&self, owner: Owner) -> Result<usize>;

    /// Mark a notification as dismissed. Returns the updated notification.
    fn dismiss_notification(
        &self,
        notification_id: &str,
        owner: Owner,
    ) -> Result<Option<Notification>>;

    /// Permanently delete a notification. Returns false if nothing was deleted.
    fn delete_notification(&self, notification_id: &str, owner: Owner) -> Result<bool>;

    /// Count an owner's notifications, optionally only the unread ones.
    fn count_notifications(&self, owner: Owner, unread_only: bool) -> Result<usize>;

    /// Total and unread counters, read in one statement so they are consistent.
    fn get_statistics(&self, owner: Owner) -> Result<NotificationStatistics>;

    /// Delete notifications of every owner whose `expires_at` is at or before `now`.
    fn delete_expired(&self, now: i64) -> Result<usize>;
}

/// Trait for per-owner preferences storage.
pub trait PreferencesStore: Send + Sync {
    /// Stored preferences of an owner, `None` when nothing was ever stored.
    fn get_preferences(&self, owner: Owner) -> Result<Option<NotificationPreferences>>;

    /// Store the full preferences row, stamping `updated_at`.
    fn upsert_preferences(
        &self,
        owner: Owner,
        preferences: &NotificationPreferences,
    ) -> Result<NotificationPreferences>;

    /// Merge `update` over the stored (or default) preferences and store the
    /// result. Read, merge and write happen atomically, so concurrent partial
    /// updates never drop each other's fields.
    fn update_preferences(
        &self,
        owner: Owner,
        update: &PreferencesUpdate,
    ) -> Result<NotificationPreferences>;
}
