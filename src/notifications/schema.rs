//! SQLite schema definitions for the notification database.
//!
//! Users and admins get their own pair of tables. The pairs are identical
//! except for the name of the owner column.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

use super::models::OwnerKind;

const KIND_CHECK: &str = "kind IN ('success', 'info', 'warning', 'error', 'security')";
const DISPLAY_CHECK: &str = "display IN ('toast', 'banner', 'center')";

// =============================================================================
// Version 1 - Notifications and preferences
// =============================================================================

const USER_NOTIFICATIONS_TABLE_V1: Table = Table {
    name: "user_notifications",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true), // UUID
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("kind", &SqlType::Text, non_null = true, check = Some(KIND_CHECK)),
        sqlite_column!(
            "display",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'toast'"),
            check = Some(DISPLAY_CHECK)
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("message", &SqlType::Text, non_null = true),
        sqlite_column!("action_payload", &SqlType::Text), // JSON
        sqlite_column!("read", &SqlType::Integer, non_null = true, default_value = Some("0")),
        sqlite_column!("read_at", &SqlType::Integer),
        sqlite_column!("dismissed", &SqlType::Integer, non_null = true, default_value = Some("0")),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("expires_at", &SqlType::Integer),
    ],
    indices: &[
        ("idx_user_notifications_user_created", "user_id, created_at DESC"),
        ("idx_user_notifications_expires_at", "expires_at"),
    ],
};

const ADMIN_NOTIFICATIONS_TABLE_V1: Table = Table {
    name: "admin_notifications",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true), // UUID
        sqlite_column!("admin_id", &SqlType::Integer, non_null = true),
        sqlite_column!("kind", &SqlType::Text, non_null = true, check = Some(KIND_CHECK)),
        sqlite_column!(
            "display",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'toast'"),
            check = Some(DISPLAY_CHECK)
        ),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("message", &SqlType::Text, non_null = true),
        sqlite_column!("action_payload", &SqlType::Text), // JSON
        sqlite_column!("read", &SqlType::Integer, non_null = true, default_value = Some("0")),
        sqlite_column!("read_at", &SqlType::Integer),
        sqlite_column!("dismissed", &SqlType::Integer, non_null = true, default_value = Some("0")),
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("expires_at", &SqlType::Integer),
    ],
    indices: &[
        ("idx_admin_notifications_admin_created", "admin_id, created_at DESC"),
        ("idx_admin_notifications_expires_at", "expires_at"),
    ],
};

const USER_PREFERENCES_TABLE_V1: Table = Table {
    name: "user_notification_preferences",
    columns: &[
        sqlite_column!("user_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("enable_toast", &SqlType::Integer, non_null = true, default_value = Some("1")),
        sqlite_column!("enable_banner", &SqlType::Integer, non_null = true, default_value = Some("1")),
        sqlite_column!("enable_center", &SqlType::Integer, non_null = true, default_value = Some("1")),
        sqlite_column!("enable_sound", &SqlType::Integer, non_null = true, default_value = Some("0")),
        sqlite_column!(
            "toast_duration_success",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("5"),
            check = Some("toast_duration_success > 0")
        ),
        sqlite_column!(
            "toast_duration_info",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("5"),
            check = Some("toast_duration_info > 0")
        ),
        sqlite_column!(
            "toast_duration_warning",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("10"),
            check = Some("toast_duration_warning > 0")
        ),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
};

const ADMIN_PREFERENCES_TABLE_V1: Table = Table {
    name: "admin_notification_preferences",
    columns: &[
        sqlite_column!("admin_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("enable_toast", &SqlType::Integer, non_null = true, default_value = Some("1")),
        sqlite_column!("enable_banner", &SqlType::Integer, non_null = true, default_value = Some("1")),
        sqlite_column!("enable_center", &SqlType::Integer, non_null = true, default_value = Some("1")),
        sqlite_column!("enable_sound", &SqlType::Integer, non_null = true, default_value = Some("0")),
        sqlite_column!(
            "toast_duration_success",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("5"),
            check = Some("toast_duration_success > 0")
        ),
        sqlite_column!(
            "toast_duration_info",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("5"),
            check = Some("toast_duration_info > 0")
        ),
        sqlite_column!(
            "toast_duration_warning",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("10"),
            check = Some("toast_duration_warning > 0")
        ),
        sqlite_column!("updated_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
};

// =============================================================================
// Versioned Schema Definition
// =============================================================================

/// All versioned schemas for the notification database.
///
/// Version 1: notifications and preferences, one pair of tables per owner kind
pub const NOTIFICATION_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[
        USER_NOTIFICATIONS_TABLE_V1,
        ADMIN_NOTIFICATIONS_TABLE_V1,
        USER_PREFERENCES_TABLE_V1,
        ADMIN_PREFERENCES_TABLE_V1,
    ],
}];

/// Table and column names backing one owner namespace.
pub(super) struct Namespace {
    pub notifications_table: &'static str,
    pub preferences_table: &'static str,
    pub owner_column: &'static str,
}

const USER_NAMESPACE: Namespace = Namespace {
    notifications_table: USER_NOTIFICATIONS_TABLE_V1.name,
    preferences_table: USER_PREFERENCES_TABLE_V1.name,
    owner_column: "user_id",
};

const ADMIN_NAMESPACE: Namespace = Namespace {
    notifications_table: ADMIN_NOTIFICATIONS_TABLE_V1.name,
    preferences_table: ADMIN_PREFERENCES_TABLE_V1.name,
    owner_column: "admin_id",
};

pub(super) fn namespace(kind: OwnerKind) -> &'static Namespace {
    match kind {
        OwnerKind::User => &USER_NAMESPACE,
        OwnerKind::Admin => &ADMIN_NAMESPACE,
    }
}

pub(super) const ALL_NAMESPACES: [&Namespace; 2] = [&USER_NAMESPACE, &ADMIN_NAMESPACE];
