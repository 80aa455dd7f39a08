mod file_config;

pub use file_config::{FileConfig, LiveConfig, NotificationsConfig};

use crate::live::DEFAULT_SUBSCRIBER_BUFFER;
use crate::notifications::{ListLimits, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use anyhow::{bail, Result};
use std::path::PathBuf;

pub const DEFAULT_MAX_NOTIFICATIONS_PER_OWNER: usize = 100;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub max_notifications_per_owner: usize,
    pub subscriber_buffer: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            max_notifications_per_owner: DEFAULT_MAX_NOTIFICATIONS_PER_OWNER,
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub notifications: NotificationSettings,
    pub live: LiveSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSettings {
    /// `0` disables the limit.
    pub max_per_owner: usize,
    pub list_limits: ListLimits,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            max_per_owner: DEFAULT_MAX_NOTIFICATIONS_PER_OWNER,
            list_limits: ListLimits::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSettings {
    pub subscriber_buffer: usize,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db or in config file")
            })?;

        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }

        let notifications_file = file.notifications.unwrap_or_default();
        let list_limits = ListLimits {
            default_limit: notifications_file
                .list_default_limit
                .unwrap_or(DEFAULT_LIST_LIMIT),
            max_limit: notifications_file.list_max_limit.unwrap_or(MAX_LIST_LIMIT),
        };
        if list_limits.default_limit == 0 {
            bail!("list_default_limit must be greater than 0");
        }
        if list_limits.max_limit < list_limits.default_limit {
            bail!(
                "list_max_limit ({}) must not be lower than list_default_limit ({})",
                list_limits.max_limit,
                list_limits.default_limit
            );
        }
        let notifications = NotificationSettings {
            max_per_owner: notifications_file
                .max_per_owner
                .unwrap_or(cli.max_notifications_per_owner),
            list_limits,
        };

        let subscriber_buffer = file
            .live
            .unwrap_or_default()
            .subscriber_buffer
            .unwrap_or(cli.subscriber_buffer);
        if subscriber_buffer == 0 {
            bail!("subscriber_buffer must be greater than 0");
        }

        Ok(Self {
            db_path,
            notifications,
            live: LiveSettings { subscriber_buffer },
        })
    }
}
