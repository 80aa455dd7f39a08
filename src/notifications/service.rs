//! Notification service for creating, tracking and broadcasting notifications

use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use crate::live::LiveUpdateHub;

use super::error::NotificationError;
use super::models::{
    DisplayChannel, NewNotification, Notification, NotificationKind, NotificationQuery,
    NotificationStatistics, Owner, OwnerKind,
};
use super::preferences::{NotificationPreferences, PreferencesUpdate};
use super::store::{NotificationStore, PreferencesStore};

pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 200;

type ServiceResult<T> = Result<T, NotificationError>;

/// Paging settings applied to list requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for ListLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIST_LIMIT,
            max_limit: MAX_LIST_LIMIT,
        }
    }
}

impl ListLimits {
    /// Resolve the requested limit: missing means default, anything is capped at max.
    pub fn resolve(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .min(self.max_limit)
            .max(1)
    }
}

/// Service for notification business logic.
///
/// Writes go to the stores; newly created notifications are then handed to
/// the live update hub. Delivery is best effort and never fails a write.
pub struct NotificationService {
    notification_store: Arc<dyn NotificationStore>,
    preferences_store: Arc<dyn PreferencesStore>,
    hub: Arc<LiveUpdateHub>,
    list_limits: ListLimits,
    /// Serializes create + publish so per-owner hub order matches creation order.
    send_lock: Mutex<()>,
}

impl NotificationService {
    pub fn new(
        notification_store: Arc<dyn NotificationStore>,
        preferences_store: Arc<dyn PreferencesStore>,
        hub: Arc<LiveUpdateHub>,
    ) -> Self {
        Self {
            notification_store,
            preferences_store,
            hub,
            list_limits: ListLimits::default(),
            send_lock: Mutex::new(()),
        }
    }

    pub fn with_list_limits(mut self, list_limits: ListLimits) -> Self {
        self.list_limits = list_limits;
        self
    }

    pub fn hub(&self) -> &Arc<LiveUpdateHub> {
        &self.hub
    }

    /// Operations on user notifications, addressed by bare user id.
    pub fn users(&self) -> ScopedNotifications<'_> {
        ScopedNotifications {
            service: self,
            kind: OwnerKind::User,
        }
    }

    /// Operations on admin notifications, addressed by bare admin id.
    pub fn admins(&self) -> ScopedNotifications<'_> {
        ScopedNotifications {
            service: self,
            kind: OwnerKind::Admin,
        }
    }

    /// Create a notification and push it to the owner's live sessions.
    pub fn send(&self, owner: Owner, new: NewNotification) -> ServiceResult<Notification> {
        validate_owner(owner)?;
        validate_new_notification(&new)?;

        let notification = {
            let _ordering = self
                .send_lock
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let notification = self.notification_store.create_notification(owner, &new)?;
            self.hub.publish(owner, &notification);
            notification
        };

        debug!(
            "Created {} notification {} for {}",
            notification.kind.as_str(),
            notification.id,
            owner
        );
        Ok(notification)
    }

    pub fn success(
        &self,
        owner: Owner,
        title: &str,
        message: &str,
        action: Option<Value>,
        display: Option<DisplayChannel>,
    ) -> ServiceResult<Notification> {
        self.send_kind(owner, NotificationKind::Success, title, message, action, display)
    }

    pub fn info(
        &self,
        owner: Owner,
        title: &str,
        message: &str,
        action: Option<Value>,
        display: Option<DisplayChannel>,
    ) -> ServiceResult<Notification> {
        self.send_kind(owner, NotificationKind::Info, title, message, action, display)
    }

    pub fn warning(
        &self,
        owner: Owner,
        title: &str,
        message: &str,
        action: Option<Value>,
        display: Option<DisplayChannel>,
    ) -> ServiceResult<Notification> {
        self.send_kind(owner, NotificationKind::Warning, title, message, action, display)
    }

    pub fn error(
        &self,
        owner: Owner,
        title: &str,
        message: &str,
        action: Option<Value>,
        display: Option<DisplayChannel>,
    ) -> ServiceResult<Notification> {
        self.send_kind(owner, NotificationKind::Error, title, message, action, display)
    }

    pub fn security(
        &self,
        owner: Owner,
        title: &str,
        message: &str,
        action: Option<Value>,
        display: Option<DisplayChannel>,
    ) -> ServiceResult<Notification> {
        self.send_kind(owner, NotificationKind::Security, title, message, action, display)
    }

    fn send_kind(
        &self,
        owner: Owner,
        kind: NotificationKind,
        title: &str,
        message: &str,
        action: Option<Value>,
        display: Option<DisplayChannel>,
    ) -> ServiceResult<Notification> {
        let mut new = NewNotification::new(kind, title, message);
        if let Some(display) = display {
            new = new.with_display(display);
        }
        if let Some(action) = action {
            new = new.with_action(action);
        }
        self.send(owner, new)
    }

    pub fn get(&self, owner: Owner, notification_id: &str) -> ServiceResult<Notification> {
        validate_owner(owner)?;
        self.notification_store
            .get_notification(notification_id, owner)?
            .ok_or_else(|| not_found(notification_id))
    }

    /// Newest first. The limit is resolved against the configured paging limits.
    pub fn list(&self, owner: Owner, query: NotificationQuery) -> ServiceResult<Vec<Notification>> {
        validate_owner(owner)?;
        let query = NotificationQuery {
            limit: Some(self.list_limits.resolve(query.limit)),
            ..query
        };
        Ok(self.notification_store.get_notifications(owner, &query)?)
    }

    pub fn list_limits(&self) -> ListLimits {
        self.list_limits
    }

    pub fn mark_read(&self, owner: Owner, notification_id: &str) -> ServiceResult<Notification> {
        validate_owner(owner)?;
        self.notification_store
            .mark_notification_read(notification_id, owner)?
            .ok_or_else(|| not_found(notification_id))
    }

    /// Returns how many notifications changed. Zero is a valid outcome.
    pub fn mark_all_read(&self, owner: Owner) -> ServiceResult<usize> {
        validate_owner(owner)?;
        let changed = self.notification_store.mark_all_read(owner)?;
        debug!("Marked {} notifications read for {}", changed, owner);
        Ok(changed)
    }

    pub fn dismiss(&self, owner: Owner, notification_id: &str) -> ServiceResult<Notification> {
        validate_owner(owner)?;
        self.notification_store
            .dismiss_notification(notification_id, owner)?
            .ok_or_else(|| not_found(notification_id))
    }

    pub fn delete(&self, owner: Owner, notification_id: &str) -> ServiceResult<()> {
        validate_owner(owner)?;
        if self
            .notification_store
            .delete_notification(notification_id, owner)?
        {
            Ok(())
        } else {
            Err(not_found(notification_id))
        }
    }

    pub fn unread_count(&self, owner: Owner) -> ServiceResult<usize> {
        validate_owner(owner)?;
        Ok(self.notification_store.count_notifications(owner, true)?)
    }

    pub fn statistics(&self, owner: Owner) -> ServiceResult<NotificationStatistics> {
        validate_owner(owner)?;
        Ok(self.notification_store.get_statistics(owner)?)
    }

    /// Stored preferences, or the defaults when the owner never stored any.
    pub fn preferences(&self, owner: Owner) -> ServiceResult<NotificationPreferences> {
        validate_owner(owner)?;
        Ok(self
            .preferences_store
            .get_preferences(owner)?
            .unwrap_or_default())
    }

    /// Merge `update` over the current preferences and store the result.
    pub fn update_preferences(
        &self,
        owner: Owner,
        update: PreferencesUpdate,
    ) -> ServiceResult<NotificationPreferences> {
        validate_owner(owner)?;
        update.validate()?;
        Ok(self.preferences_store.update_preferences(owner, &update)?)
    }

    /// Delete every notification whose expiry has passed.
    pub fn purge_expired(&self) -> ServiceResult<usize> {
        let purged = self
            .notification_store
            .delete_expired(Utc::now().timestamp())?;
        if purged > 0 {
            info!("Purged {} expired notifications", purged);
        }
        Ok(purged)
    }
}

/// The service seen from one owner namespace.
#[derive(Clone, Copy)]
pub struct ScopedNotifications<'a> {
    service: &'a NotificationService,
    kind: OwnerKind,
}

impl ScopedNotifications<'_> {
    pub fn owner(&self, id: usize) -> Owner {
        Owner { kind: self.kind, id }
    }

    pub fn send(&self, id: usize, new: NewNotification) -> ServiceResult<Notification> {
        self.service.send(self.owner(id), new)
    }

    pub fn get(&self, id: usize, notification_id: &str) -> ServiceResult<Notification> {
        self.service.get(self.owner(id), notification_id)
    }

    pub fn list(&self, id: usize, query: NotificationQuery) -> ServiceResult<Vec<Notification>> {
        self.service.list(self.owner(id), query)
    }

    pub fn mark_read(&self, id: usize, notification_id: &str) -> ServiceResult<Notification> {
        self.service.mark_read(self.owner(id), notification_id)
    }

    pub fn mark_all_read(&self, id: usize) -> ServiceResult<usize> {
        self.service.mark_all_read(self.owner(id))
    }

    pub fn dismiss(&self, id: usize, notification_id: &str) -> ServiceResult<Notification> {
        self.service.dismiss(self.owner(id), notification_id)
    }

    pub fn delete(&self, id: usize, notification_id: &str) -> ServiceResult<()> {
        self.service.delete(self.owner(id), notification_id)
    }

    pub fn unread_count(&self, id: usize) -> ServiceResult<usize> {
        self.service.unread_count(self.owner(id))
    }

    pub fn statistics(&self, id: usize) -> ServiceResult<NotificationStatistics> {
        self.service.statistics(self.owner(id))
    }

    pub fn preferences(&self, id: usize) -> ServiceResult<NotificationPreferences> {
        self.service.preferences(self.owner(id))
    }

    pub fn update_preferences(
        &self,
        id: usize,
        update: PreferencesUpdate,
    ) -> ServiceResult<NotificationPreferences> {
        self.service.update_preferences(self.owner(id), update)
    }
}

fn not_found(notification_id: &str) -> NotificationError {
    NotificationError::NotFound(notification_id.to_string())
}

/// Owner ids are positive and must fit the storage's signed 64-bit integers.
fn validate_owner(owner: Owner) -> ServiceResult<()> {
    if owner.id == 0 || i64::try_from(owner.id).is_err() {
        return Err(NotificationError::Validation(format!(
            "Invalid {} id: {}",
            owner.kind.as_str(),
            owner.id
        )));
    }
    Ok(())
}

fn validate_new_notification(new: &NewNotification) -> ServiceResult<()> {
    if new.title.trim().is_empty() {
        return Err(NotificationError::Validation(
            "Notification title must not be empty".to_string(),
        ));
    }
    if let Some(expires_at) = new.expires_at {
        if expires_at <= Utc::now().timestamp() {
            return Err(NotificationError::Validation(
                "expires_at must be in the future".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::SqliteNotificationStore;

    fn create_service() -> NotificationService {
        let store = Arc::new(SqliteNotificationStore::in_memory().unwrap());
        NotificationService::new(
            store.clone(),
            store,
            Arc::new(LiveUpdateHub::default()),
        )
    }

    #[test]
    fn test_list_limits_resolve() {
        let limits = ListLimits::default();
        assert_eq!(limits.resolve(None), 50);
        assert_eq!(limits.resolve(Some(10)), 10);
        assert_eq!(limits.resolve(Some(10_000)), 200);
        assert_eq!(limits.resolve(Some(0)), 1);
    }

    #[test]
    fn test_send_applies_kind_and_display_override() {
        let service = create_service();
        let owner = Owner::user(1);

        let toast = service.success(owner, "Saved", "All good", None, None).unwrap();
        assert_eq!(toast.kind, NotificationKind::Success);
        assert_eq!(toast.display, DisplayChannel::Toast);

        let banner = service
            .security(
                owner,
                "New login",
                "From a new device",
                Some(serde_json::json!({"url": "/sessions"})),
                Some(DisplayChannel::Banner),
            )
            .unwrap();
        assert_eq!(banner.kind, NotificationKind::Security);
        assert_eq!(banner.display, DisplayChannel::Banner);
        assert_eq!(banner.action.unwrap()["url"], "/sessions");
    }

    #[test]
    fn test_send_validation() {
        let service = create_service();

        let err = service
            .info(Owner::user(0), "Title", "Message", None, None)
            .unwrap_err();
        assert!(matches!(err, NotificationError::Validation(_)));

        let err = service
            .info(Owner::user(1), "   ", "Message", None, None)
            .unwrap_err();
        assert!(matches!(err, NotificationError::Validation(_)));

        let expired = NewNotification::new(NotificationKind::Info, "Title", "Message")
            .with_expires_at(Utc::now().timestamp() - 10);
        let err = service.send(Owner::user(1), expired).unwrap_err();
        assert!(matches!(err, NotificationError::Validation(_)));

        assert_eq!(service.statistics(Owner::user(1)).unwrap().total, 0);
    }

    #[test]
    fn test_owner_ids_outside_storage_range_are_rejected() {
        let service = create_service();
        let too_large = Owner::user(i64::MAX as usize + 1);

        let err = service.info(too_large, "Title", "Message", None, None).unwrap_err();
        assert!(matches!(err, NotificationError::Validation(_)));
        assert!(matches!(
            service.unread_count(too_large),
            Err(NotificationError::Validation(_))
        ));
        assert!(matches!(
            service.update_preferences(Owner::admin(usize::MAX), PreferencesUpdate::default()),
            Err(NotificationError::Validation(_))
        ));
        assert!(matches!(
            service.mark_all_read(Owner::user(0)),
            Err(NotificationError::Validation(_))
        ));

        let largest = Owner::user(i64::MAX as usize);
        let created = service.info(largest, "Title", "Message", None, None).unwrap();
        assert_eq!(service.get(largest, &created.id).unwrap().owner, largest);
    }

    #[test]
    fn test_send_succeeds_with_idle_or_stopped_hub() {
        let service = create_service();
        service
            .warning(Owner::admin(1), "Idle hub", "Still stored", None, None)
            .unwrap();
        service.hub().stop();
        service
            .warning(Owner::admin(1), "Stopped hub", "Still stored", None, None)
            .unwrap();
        assert_eq!(service.unread_count(Owner::admin(1)).unwrap(), 2);
    }

    #[test]
    fn test_missing_records_are_not_found() {
        let service = create_service();
        let owner = Owner::user(1);
        assert!(matches!(
            service.get(owner, "missing"),
            Err(NotificationError::NotFound(_))
        ));
        assert!(matches!(
            service.mark_read(owner, "missing"),
            Err(NotificationError::NotFound(_))
        ));
        assert!(matches!(
            service.dismiss(owner, "missing"),
            Err(NotificationError::NotFound(_))
        ));
        assert!(matches!(
            service.delete(owner, "missing"),
            Err(NotificationError::NotFound(_))
        ));
    }

    #[test]
    fn test_scoped_views_address_separate_namespaces() {
        let service = create_service();
        let created = service
            .users()
            .send(7, NewNotification::new(NotificationKind::Info, "Hi", "User 7"))
            .unwrap();
        assert_eq!(created.owner, Owner::user(7));

        assert!(service.users().get(7, &created.id).is_ok());
        assert!(matches!(
            service.admins().get(7, &created.id),
            Err(NotificationError::NotFound(_))
        ));
        assert_eq!(service.admins().unread_count(7).unwrap(), 0);
    }

    #[test]
    fn test_list_respects_paging_limits() {
        let store = Arc::new(SqliteNotificationStore::in_memory().unwrap());
        let service = NotificationService::new(
            store.clone(),
            store,
            Arc::new(LiveUpdateHub::default()),
        )
        .with_list_limits(ListLimits {
            default_limit: 2,
            max_limit: 3,
        });
        let owner = Owner::user(1);
        for i in 0..5 {
            service
                .info(owner, &format!("n{}", i), "m", None, None)
                .unwrap();
        }

        assert_eq!(service.list(owner, NotificationQuery::default()).unwrap().len(), 2);
        let capped = NotificationQuery {
            limit: Some(100),
            ..Default::default()
        };
        assert_eq!(service.list(owner, capped).unwrap().len(), 3);
        let last_page = NotificationQuery {
            limit: Some(3),
            offset: 3,
            ..Default::default()
        };
        assert_eq!(service.list(owner, last_page).unwrap().len(), 2);
    }

    #[test]
    fn test_update_preferences_rejects_zero_duration() {
        let service = create_service();
        let update = PreferencesUpdate {
            toast_duration_warning: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            service.update_preferences(Owner::user(1), update),
            Err(NotificationError::Validation(_))
        ));
        assert!(service.preferences(Owner::user(1)).unwrap().updated_at.is_none());
    }
}
