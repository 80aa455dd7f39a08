//! Notification data models

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::NotificationError;

/// The namespace an actor lives in.
///
/// Users and admins have independent id spaces: user 7 and admin 7 are
/// different actors and never see each other's records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    User,
    Admin,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::User => "user",
            OwnerKind::Admin => "admin",
        }
    }
}

impl FromStr for OwnerKind {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(OwnerKind::User),
            "admin" => Ok(OwnerKind::Admin),
            _ => Err(NotificationError::Validation(format!(
                "Unknown owner kind: {}",
                s
            ))),
        }
    }
}

/// The actor a notification or preferences record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    pub kind: OwnerKind,
    pub id: usize,
}

impl Owner {
    pub fn user(id: usize) -> Self {
        Self {
            kind: OwnerKind::User,
            id,
        }
    }

    pub fn admin(id: usize) -> Self {
        Self {
            kind: OwnerKind::Admin,
            id,
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

/// Notification severity/category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    Error,
    Security,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 5] = [
        NotificationKind::Success,
        NotificationKind::Info,
        NotificationKind::Warning,
        NotificationKind::Error,
        NotificationKind::Security,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Success => "success",
            NotificationKind::Info => "info",
            NotificationKind::Warning => "warning",
            NotificationKind::Error => "error",
            NotificationKind::Security => "security",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }
}

impl FromStr for NotificationKind {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            NotificationError::Validation(format!("Unknown notification kind: {}", s))
        })
    }
}

/// Where a notification is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayChannel {
    #[default]
    Toast,
    Banner,
    Center,
}

impl DisplayChannel {
    pub const ALL: [DisplayChannel; 3] = [
        DisplayChannel::Toast,
        DisplayChannel::Banner,
        DisplayChannel::Center,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayChannel::Toast => "toast",
            DisplayChannel::Banner => "banner",
            DisplayChannel::Center => "center",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|display| display.as_str() == s)
    }
}

impl FromStr for DisplayChannel {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            NotificationError::Validation(format!("Unknown display channel: {}", s))
        })
    }
}

/// A stored notification.
///
/// `read` and `dismissed` are independent flags. Timestamps are unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub owner: Owner,
    pub kind: NotificationKind,
    pub display: DisplayChannel,
    pub title: String,
    pub message: String,
    pub action: Option<serde_json::Value>,
    pub read: bool,
    pub read_at: Option<i64>,
    pub dismissed: bool,
    pub created_at: i64,
    pub expires_at: Option<i64>,
}

/// Input for creating a notification.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub display: DisplayChannel,
    pub title: String,
    pub message: String,
    pub action: Option<serde_json::Value>,
    pub expires_at: Option<i64>,
}

impl NewNotification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            display: DisplayChannel::default(),
            title: title.into(),
            message: message.into(),
            action: None,
            expires_at: None,
        }
    }

    pub fn with_display(mut self, display: DisplayChannel) -> Self {
        self.display = display;
        self
    }

    pub fn with_action(mut self, action: serde_json::Value) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// Filter and paging options for listing notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationQuery {
    pub unread_only: bool,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl NotificationQuery {
    pub fn unread() -> Self {
        Self {
            unread_only: true,
            ..Default::default()
        }
    }
}

/// Derived counters over an owner's notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStatistics {
    pub total: usize,
    pub unread: usize,
    pub read: usize,
}

impl NotificationStatistics {
    /// Build statistics from the total and unread counters, `read` is derived.
    pub fn from_counts(total: usize, unread: usize) -> Self {
        Self {
            total,
            unread,
            read: total.saturating_sub(unread),
        }
    }
}
