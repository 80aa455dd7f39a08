//! Per-actor notification display preferences.

use serde::{Deserialize, Serialize};

use super::error::NotificationError;

pub const DEFAULT_TOAST_DURATION_SUCCESS: u32 = 5;
pub const DEFAULT_TOAST_DURATION_INFO: u32 = 5;
pub const DEFAULT_TOAST_DURATION_WARNING: u32 = 10;

/// Display preferences of a single owner.
///
/// Toast durations are in seconds. `updated_at` is `None` until the owner
/// stores preferences for the first time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub enable_toast: bool,
    pub enable_banner: bool,
    pub enable_center: bool,
    pub enable_sound: bool,
    pub toast_duration_success: u32,
    pub toast_duration_info: u32,
    pub toast_duration_warning: u32,
    pub updated_at: Option<i64>,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            enable_toast: true,
            enable_banner: true,
            enable_center: true,
            enable_sound: false,
            toast_duration_success: DEFAULT_TOAST_DURATION_SUCCESS,
            toast_duration_info: DEFAULT_TOAST_DURATION_INFO,
            toast_duration_warning: DEFAULT_TOAST_DURATION_WARNING,
            updated_at: None,
        }
    }
}

/// A partial preferences update. Omitted fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesUpdate {
    pub enable_toast: Option<bool>,
    pub enable_banner: Option<bool>,
    pub enable_center: Option<bool>,
    pub enable_sound: Option<bool>,
    pub toast_duration_success: Option<u32>,
    pub toast_duration_info: Option<u32>,
    pub toast_duration_warning: Option<u32>,
}

impl PreferencesUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Rejects zero durations, every duration must be a positive number of seconds.
    pub fn validate(&self) -> Result<(), NotificationError> {
        let durations = [
            ("toast_duration_success", self.toast_duration_success),
            ("toast_duration_info", self.toast_duration_info),
            ("toast_duration_warning", self.toast_duration_warning),
        ];
        for (name, value) in durations {
            if value == Some(0) {
                return Err(NotificationError::Validation(format!(
                    "{} must be a positive number of seconds",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Merge the provided fields over `current`.
    pub fn apply_to(&self, current: &NotificationPreferences) -> NotificationPreferences {
        NotificationPreferences {
            enable_toast: self.enable_toast.unwrap_or(current.enable_toast),
            enable_banner: self.enable_banner.unwrap_or(current.enable_banner),
            enable_center: self.enable_center.unwrap_or(current.enable_center),
            enable_sound: self.enable_sound.unwrap_or(current.enable_sound),
            toast_duration_success: self
                .toast_duration_success
                .unwrap_or(current.toast_duration_success),
            toast_duration_info: self
                .toast_duration_info
                .unwrap_or(current.toast_duration_info),
            toast_duration_warning: self
                .toast_duration_warning
                .unwrap_or(current.toast_duration_warning),
            updated_at: current.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let prefs = NotificationPreferences::default();
        assert!(prefs.enable_toast);
        assert!(prefs.enable_banner);
        assert!(prefs.enable_center);
        assert!(!prefs.enable_sound);
        assert_eq!(prefs.toast_duration_success, 5);
        assert_eq!(prefs.toast_duration_info, 5);
        assert_eq!(prefs.toast_duration_warning, 10);
        assert!(prefs.updated_at.is_none());
    }

    #[test]
    fn test_apply_keeps_omitted_fields() {
        let current = NotificationPreferences {
            enable_sound: true,
            toast_duration_warning: 20,
            ..Default::default()
        };
        let update = PreferencesUpdate {
            enable_toast: Some(false),
            toast_duration_success: Some(3),
            ..Default::default()
        };

        let merged = update.apply_to(&current);
        assert!(!merged.enable_toast);
        assert_eq!(merged.toast_duration_success, 3);
        assert!(merged.enable_sound);
        assert_eq!(merged.toast_duration_warning, 20);
        assert!(merged.enable_banner);
        assert_eq!(merged.toast_duration_info, 5);
    }

    #[test]
    fn test_zero_duration_is_rejected() {
        let update = PreferencesUpdate {
            toast_duration_info: Some(0),
            ..Default::default()
        };
        let err = update.validate().unwrap_err();
        assert!(err.to_string().contains("toast_duration_info"));
    }

    #[test]
    fn test_partial_update_deserialization() {
        let update: PreferencesUpdate =
            serde_json::from_str(r#"{"enable_toast":false,"toast_duration_success":3}"#).unwrap();
        assert_eq!(update.enable_toast, Some(false));
        assert_eq!(update.toast_duration_success, Some(3));
        assert!(update.enable_banner.is_none());
        assert!(!update.is_empty());
        assert!(PreferencesUpdate::default().is_empty());
    }
}
