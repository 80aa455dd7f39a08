use super::models::{
    DisplayChannel, NewNotification, Notification, NotificationKind, NotificationQuery,
    NotificationStatistics, Owner, OwnerKind,
};
use super::preferences::{NotificationPreferences, PreferencesUpdate};
use super::schema::{namespace, Namespace, ALL_NAMESPACES, NOTIFICATION_VERSIONED_SCHEMAS};
use super::store::{NotificationStore, PreferencesStore};
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Unix seconds computed by SQLite, used for timestamps set inside UPDATE statements.
const SQL_NOW: &str = "cast(strftime('%s','now') as int)";

/// JSON stored as TEXT.
struct JsonPayload(serde_json::Value);

impl FromSql for JsonPayload {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        serde_json::from_str(value.as_str()?)
            .map(JsonPayload)
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for NotificationKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for NotificationKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        NotificationKind::parse(s)
            .ok_or_else(|| FromSqlError::Other(format!("Unknown notification kind: {}", s).into()))
    }
}

impl ToSql for DisplayChannel {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for DisplayChannel {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        DisplayChannel::parse(s)
            .ok_or_else(|| FromSqlError::Other(format!("Unknown display channel: {}", s).into()))
    }
}

/// SQLite-backed store for notifications and preferences of both owner kinds.
#[derive(Clone)]
pub struct SqliteNotificationStore {
    conn: Arc<Mutex<Connection>>,
    /// Maximum number of notifications kept per owner, oldest are evicted first.
    retention_limit: Option<usize>,
}

impl SqliteNotificationStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let conn = Connection::open(path).context("Failed to open notification database")?;

        if is_new_db {
            info!("Creating new notification database at {:?}", path);
            Self::latest_schema()?.create(&conn)?;
        } else {
            let raw_version: i64 = conn
                .query_row("PRAGMA user_version;", [], |row| row.get(0))
                .context("Failed to read database version")?;
            let db_version = raw_version - BASE_DB_VERSION as i64;

            let schema = NOTIFICATION_VERSIONED_SCHEMAS
                .iter()
                .find(|s| s.version as i64 == db_version)
                .with_context(|| format!("Unknown notification database version {}", db_version))?;
            schema.validate(&conn).with_context(|| {
                format!(
                    "Notification database schema validation failed for version {}",
                    db_version
                )
            })?;
            debug!("Opened notification database version {}", db_version);
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            retention_limit: None,
        })
    }

    /// A fresh database that lives only as long as the store.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::latest_schema()?.create(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            retention_limit: None,
        })
    }

    /// Keep at most `limit` notifications per owner. `0` disables the limit.
    pub fn with_retention_limit(mut self, limit: usize) -> Self {
        self.retention_limit = if limit == 0 { None } else { Some(limit) };
        self
    }

    fn latest_schema() -> Result<&'static crate::sqlite_persistence::VersionedSchema> {
        NOTIFICATION_VERSIONED_SCHEMAS
            .last()
            .ok_or_else(|| anyhow!("No notification schema defined"))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Notification database lock poisoned"))
    }

    fn now() -> i64 {
        Utc::now().timestamp()
    }

    fn row_to_notification(
        row: &rusqlite::Row,
        kind: OwnerKind,
        ns: &Namespace,
    ) -> rusqlite::Result<Notification> {
        let owner_id: i64 = row.get(ns.owner_column)?;
        let action: Option<JsonPayload> = row.get("action_payload")?;

        Ok(Notification {
            id: row.get("id")?,
            owner: Owner {
                kind,
                id: owner_id as usize,
            },
            kind: row.get("kind")?,
            display: row.get("display")?,
            title: row.get("title")?,
            message: row.get("message")?,
            action: action.map(|payload| payload.0),
            read: row.get("read")?,
            read_at: row.get("read_at")?,
            dismissed: row.get("dismissed")?,
            created_at: row.get("created_at")?,
            expires_at: row.get("expires_at")?,
        })
    }

    fn row_to_preferences(row: &rusqlite::Row) -> rusqlite::Result<NotificationPreferences> {
        Ok(NotificationPreferences {
            enable_toast: row.get("enable_toast")?,
            enable_banner: row.get("enable_banner")?,
            enable_center: row.get("enable_center")?,
            enable_sound: row.get("enable_sound")?,
            toast_duration_success: row.get("toast_duration_success")?,
            toast_duration_info: row.get("toast_duration_info")?,
            toast_duration_warning: row.get("toast_duration_warning")?,
            updated_at: Some(row.get("updated_at")?),
        })
    }

    fn select_notification(
        conn: &Connection,
        notification_id: &str,
        owner: Owner,
    ) -> Result<Option<Notification>> {
        let ns = namespace(owner.kind);
        let notification = conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE id = ?1 AND {} = ?2",
                    ns.notifications_table, ns.owner_column
                ),
                params![notification_id, owner.id as i64],
                |row| Self::row_to_notification(row, owner.kind, ns),
            )
            .optional()?;
        Ok(notification)
    }

    /// Apply a flag update scoped to the owner and return the updated row.
    fn update_notification(
        &self,
        notification_id: &str,
        owner: Owner,
        set_clause: &str,
    ) -> Result<Option<Notification>> {
        let ns = namespace(owner.kind);
        let conn = self.lock()?;
        let changed = conn.execute(
            &format!(
                "UPDATE {} SET {} WHERE id = ?1 AND {} = ?2",
                ns.notifications_table, set_clause, ns.owner_column
            ),
            params![notification_id, owner.id as i64],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        Self::select_notification(&conn, notification_id, owner)
    }
}

impl NotificationStore for SqliteNotificationStore {
    fn create_notification(&self, owner: Owner, new: &NewNotification) -> Result<Notification> {
        let ns = namespace(owner.kind);
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = Self::now();
        let action = new
            .action
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize notification action")?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO {} (id, {}, kind, display, title, message, action_payload, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                ns.notifications_table, ns.owner_column
            ),
            params![
                id,
                owner.id as i64,
                new.kind,
                new.display,
                new.title,
                new.message,
                action,
                created_at,
                new.expires_at,
            ],
        )
        .with_context(|| format!("Failed to create notification for {}", owner))?;

        if let Some(limit) = self.retention_limit {
            let evicted = tx.execute(
                &format!(
                    "DELETE FROM {table} WHERE {owner_col} = ?1 AND id NOT IN (
                        SELECT id FROM {table} WHERE {owner_col} = ?1
                        ORDER BY created_at DESC, rowid DESC LIMIT ?2
                    )",
                    table = ns.notifications_table,
                    owner_col = ns.owner_column
                ),
                params![owner.id as i64, limit as i64],
            )?;
            if evicted > 0 {
                debug!("Evicted {} old notifications of {}", evicted, owner);
            }
        }
        tx.commit()?;

        Ok(Notification {
            id,
            owner,
            kind: new.kind,
            display: new.display,
            title: new.title.clone(),
            message: new.message.clone(),
            action: new.action.clone(),
            read: false,
            read_at: None,
            dismissed: false,
            created_at,
            expires_at: new.expires_at,
        })
    }

    fn get_notification(&self, notification_id: &str, owner: Owner) -> Result<Option<Notification>> {
        let conn = self.lock()?;
        Self::select_notification(&conn, notification_id, owner)
    }

    fn get_notifications(&self, owner: Owner, query: &NotificationQuery) -> Result<Vec<Notification>> {
        let ns = namespace(owner.kind);
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE {} = ?1 {} ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
            ns.notifications_table,
            ns.owner_column,
            if query.unread_only { "AND read = 0" } else { "" }
        ))?;
        // A negative LIMIT means no limit in SQLite
        let limit = query.limit.map(|l| l as i64).unwrap_or(-1);
        let notifications = stmt
            .query_map(params![owner.id as i64, limit, query.offset as i64], |row| {
                Self::row_to_notification(row, owner.kind, ns)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notifications)
    }

    fn mark_notification_read(
        &self,
        notification_id: &str,
        owner: Owner,
    ) -> Result<Option<Notification>> {
        self.update_notification(
            notification_id,
            owner,
            &format!("read = 1, read_at = COALESCE(read_at, {})", SQL_NOW),
        )
    }

    fn mark_all_read(&self, owner: Owner) -> Result<usize> {
        let ns = namespace(owner.kind);
        let conn = self.lock()?;
        let changed = conn.execute(
            &format!(
                "UPDATE {} SET read = 1, read_at = COALESCE(read_at, {}) WHERE {} = ?1 AND read = 0",
                ns.notifications_table, SQL_NOW, ns.owner_column
            ),
            params![owner.id as i64],
        )?;
        Ok(changed)
    }

    fn dismiss_notification(
        &self,
        notification_id: &str,
        owner: Owner,
    ) -> Result<Option<Notification>> {
        self.update_notification(notification_id, owner, "dismissed = 1")
    }

    fn delete_notification(&self, notification_id: &str, owner: Owner) -> Result<bool> {
        let ns = namespace(owner.kind);
        let conn = self.lock()?;
        let deleted = conn.execute(
            &format!(
                "DELETE FROM {} WHERE id = ?1 AND {} = ?2",
                ns.notifications_table, ns.owner_column
            ),
            params![notification_id, owner.id as i64],
        )?;
        Ok(deleted > 0)
    }

    fn count_notifications(&self, owner: Owner, unread_only: bool) -> Result<usize> {
        let ns = namespace(owner.kind);
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ?1 {}",
                ns.notifications_table,
                ns.owner_column,
                if unread_only { "AND read = 0" } else { "" }
            ),
            params![owner.id as i64],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn get_statistics(&self, owner: Owner) -> Result<NotificationStatistics> {
        let ns = namespace(owner.kind);
        let conn = self.lock()?;
        let (total, unread): (i64, i64) = conn.query_row(
            &format!(
                "SELECT COUNT(*), COALESCE(SUM(CASE WHEN read = 0 THEN 1 ELSE 0 END), 0)
                 FROM {} WHERE {} = ?1",
                ns.notifications_table, ns.owner_column
            ),
            params![owner.id as i64],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(NotificationStatistics::from_counts(
            total as usize,
            unread as usize,
        ))
    }

    fn delete_expired(&self, now: i64) -> Result<usize> {
        let conn = self.lock()?;
        let mut deleted = 0;
        for ns in ALL_NAMESPACES {
            deleted += conn.execute(
                &format!(
                    "DELETE FROM {} WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                    ns.notifications_table
                ),
                params![now],
            )?;
        }
        Ok(deleted)
    }
}

impl SqliteNotificationStore {
    fn select_preferences(
        conn: &Connection,
        owner: Owner,
    ) -> Result<Option<NotificationPreferences>> {
        let ns = namespace(owner.kind);
        let preferences = conn
            .query_row(
                &format!(
                    "SELECT * FROM {} WHERE {} = ?1",
                    ns.preferences_table, ns.owner_column
                ),
                params![owner.id as i64],
                Self::row_to_preferences,
            )
            .optional()?;
        Ok(preferences)
    }

    fn write_preferences(
        conn: &Connection,
        owner: Owner,
        preferences: &NotificationPreferences,
    ) -> Result<NotificationPreferences> {
        if preferences.toast_duration_success == 0
            || preferences.toast_duration_info == 0
            || preferences.toast_duration_warning == 0
        {
            bail!("Toast durations must be positive");
        }

        let ns = namespace(owner.kind);
        let updated_at = Self::now();
        conn.execute(
            &format!(
                "INSERT INTO {table} ({owner_col}, enable_toast, enable_banner, enable_center, enable_sound,
                    toast_duration_success, toast_duration_info, toast_duration_warning, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT({owner_col}) DO UPDATE SET
                    enable_toast = excluded.enable_toast,
                    enable_banner = excluded.enable_banner,
                    enable_center = excluded.enable_center,
                    enable_sound = excluded.enable_sound,
                    toast_duration_success = excluded.toast_duration_success,
                    toast_duration_info = excluded.toast_duration_info,
                    toast_duration_warning = excluded.toast_duration_warning,
                    updated_at = excluded.updated_at",
                table = ns.preferences_table,
                owner_col = ns.owner_column
            ),
            params![
                owner.id as i64,
                preferences.enable_toast,
                preferences.enable_banner,
                preferences.enable_center,
                preferences.enable_sound,
                preferences.toast_duration_success,
                preferences.toast_duration_info,
                preferences.toast_duration_warning,
                updated_at,
            ],
        )
        .with_context(|| format!("Failed to store preferences of {}", owner))?;

        Ok(NotificationPreferences {
            updated_at: Some(updated_at),
            ..preferences.clone()
        })
    }
}

impl PreferencesStore for SqliteNotificationStore {
    fn get_preferences(&self, owner: Owner) -> Result<Option<NotificationPreferences>> {
        let conn = self.lock()?;
        Self::select_preferences(&conn, owner)
    }

    fn upsert_preferences(
        &self,
        owner: Owner,
        preferences: &NotificationPreferences,
    ) -> Result<NotificationPreferences> {
        let conn = self.lock()?;
        Self::write_preferences(&conn, owner, preferences)
    }

    fn update_preferences(
        &self,
        owner: Owner,
        update: &PreferencesUpdate,
    ) -> Result<NotificationPreferences> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let current = Self::select_preferences(&tx, owner)?.unwrap_or_default();
        let merged = Self::write_preferences(&tx, owner, &update.apply_to(&current))?;
        tx.commit()?;
        Ok(merged)
    }
}
