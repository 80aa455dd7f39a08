use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use notification_center::config::{AppConfig, CliConfig, FileConfig};
use notification_center::live::{LiveUpdateHub, DEFAULT_SUBSCRIBER_BUFFER};
use notification_center::notifications::{
    DisplayChannel, NewNotification, NotificationKind, NotificationListResponse,
    NotificationQuery, NotificationService, Owner, OwnerKind, PreferencesUpdate,
    SqliteNotificationStore, UnreadCountResponse,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(name = "notification-center", version, about = "Manage stored notifications")]
struct CliArgs {
    /// Path to the SQLite notification database file. Created if missing.
    #[clap(long = "db", value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Maximum notifications kept per owner, oldest are evicted. 0 disables the limit.
    #[clap(long, default_value_t = notification_center::config::DEFAULT_MAX_NOTIFICATIONS_PER_OWNER)]
    pub max_notifications_per_owner: usize,

    /// Pending live messages allowed per subscriber.
    #[clap(long, default_value_t = DEFAULT_SUBSCRIBER_BUFFER)]
    pub subscriber_buffer: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Copy)]
struct OwnerArgs {
    /// Namespace of the owner: user or admin.
    #[clap(long = "owner-kind", default_value = "user")]
    owner_kind: OwnerKind,

    /// Id of the owner.
    #[clap(long = "owner")]
    owner_id: usize,
}

impl From<OwnerArgs> for Owner {
    fn from(args: OwnerArgs) -> Self {
        Owner {
            kind: args.owner_kind,
            id: args.owner_id,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates a notification.
    Send {
        #[command(flatten)]
        owner: OwnerArgs,

        /// One of success, info, warning, error, security.
        #[clap(long = "type", default_value = "info")]
        notification_type: NotificationKind,

        /// One of toast, banner, center.
        #[clap(long, default_value = "toast")]
        display: DisplayChannel,

        #[clap(long)]
        title: String,

        #[clap(long, default_value = "")]
        message: String,

        /// Action payload as a JSON document.
        #[clap(long)]
        action: Option<String>,

        /// Unix timestamp after which the notification can be purged.
        #[clap(long)]
        expires_at: Option<i64>,
    },

    /// Lists notifications, newest first.
    List {
        #[command(flatten)]
        owner: OwnerArgs,

        #[clap(long)]
        unread_only: bool,

        #[clap(long)]
        limit: Option<usize>,

        #[clap(long, default_value_t = 0)]
        offset: usize,
    },

    /// Shows a single notification.
    Get {
        #[command(flatten)]
        owner: OwnerArgs,
        id: String,
    },

    /// Marks a notification as read.
    MarkRead {
        #[command(flatten)]
        owner: OwnerArgs,
        id: String,
    },

    /// Marks every notification of the owner as read.
    MarkAllRead {
        #[command(flatten)]
        owner: OwnerArgs,
    },

    /// Marks a notification as dismissed.
    Dismiss {
        #[command(flatten)]
        owner: OwnerArgs,
        id: String,
    },

    /// Permanently deletes a notification.
    Delete {
        #[command(flatten)]
        owner: OwnerArgs,
        id: String,
    },

    /// Shows the number of unread notifications.
    UnreadCount {
        #[command(flatten)]
        owner: OwnerArgs,
    },

    /// Shows total, unread and read counters.
    Stats {
        #[command(flatten)]
        owner: OwnerArgs,
    },

    /// Shows the display preferences.
    Prefs {
        #[command(flatten)]
        owner: OwnerArgs,
    },

    /// Updates the display preferences. Omitted fields keep their value.
    SetPrefs {
        #[command(flatten)]
        owner: OwnerArgs,

        #[clap(long)]
        enable_toast: Option<bool>,
        #[clap(long)]
        enable_banner: Option<bool>,
        #[clap(long)]
        enable_center: Option<bool>,
        #[clap(long)]
        enable_sound: Option<bool>,
        #[clap(long)]
        toast_duration_success: Option<u32>,
        #[clap(long)]
        toast_duration_info: Option<u32>,
        #[clap(long)]
        toast_duration_warning: Option<u32>,
    },

    /// Deletes every notification whose expiry has passed.
    PurgeExpired,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn execute(service: &NotificationService, command: Command) -> Result<()> {
    match command {
        Command::Send {
            owner,
            notification_type,
            display,
            title,
            message,
            action,
            expires_at,
        } => {
            let mut new = NewNotification::new(notification_type, title, message).with_display(display);
            if let Some(action) = action {
                let payload = serde_json::from_str(&action)
                    .with_context(|| format!("Invalid action payload: {}", action))?;
                new = new.with_action(payload);
            }
            if let Some(expires_at) = expires_at {
                new = new.with_expires_at(expires_at);
            }
            print_json(&service.send(owner.into(), new)?)
        }
        Command::List {
            owner,
            unread_only,
            limit,
            offset,
        } => {
            let query = NotificationQuery {
                unread_only,
                limit,
                offset,
            };
            let notifications = service.list(owner.into(), query)?;
            let limit = service.list_limits().resolve(limit);
            print_json(&NotificationListResponse::new(notifications, limit, &query))
        }
        Command::Get { owner, id } => print_json(&service.get(owner.into(), &id)?),
        Command::MarkRead { owner, id } => print_json(&service.mark_read(owner.into(), &id)?),
        Command::MarkAllRead { owner } => {
            let updated = service.mark_all_read(owner.into())?;
            print_json(&serde_json::json!({ "updated": updated }))
        }
        Command::Dismiss { owner, id } => print_json(&service.dismiss(owner.into(), &id)?),
        Command::Delete { owner, id } => {
            service.delete(owner.into(), &id)?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        Command::UnreadCount { owner } => print_json(&UnreadCountResponse {
            unread_count: service.unread_count(owner.into())?,
        }),
        Command::Stats { owner } => print_json(&service.statistics(owner.into())?),
        Command::Prefs { owner } => print_json(&service.preferences(owner.into())?),
        Command::SetPrefs {
            owner,
            enable_toast,
            enable_banner,
            enable_center,
            enable_sound,
            toast_duration_success,
            toast_duration_info,
            toast_duration_warning,
        } => {
            let update = PreferencesUpdate {
                enable_toast,
                enable_banner,
                enable_center,
                enable_sound,
                toast_duration_success,
                toast_duration_info,
                toast_duration_warning,
            };
            print_json(&service.update_preferences(owner.into(), update)?)
        }
        Command::PurgeExpired => {
            let purged = service.purge_expired()?;
            print_json(&serde_json::json!({ "purged": purged }))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let cli_config = CliConfig {
        db_path: cli_args.db_path.clone(),
        max_notifications_per_owner: cli_args.max_notifications_per_owner,
        subscriber_buffer: cli_args.subscriber_buffer,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;
    debug!("Resolved config: {:?}", config);

    let store = Arc::new(
        SqliteNotificationStore::new(&config.db_path)?
            .with_retention_limit(config.notifications.max_per_owner),
    );
    let hub = Arc::new(LiveUpdateHub::new(config.live.subscriber_buffer));
    hub.start()?;

    let service = NotificationService::new(store.clone(), store, hub.clone())
        .with_list_limits(config.notifications.list_limits);

    let result = execute(&service, cli_args.command);
    hub.stop();
    result
}
