//! Configuration schema definitions
//!
//! Settings shared by the push responder, its host adapters and the CLI.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    /// Notification content and click routing
    #[serde(default)]
    pub notification: NotificationConfig,

    /// Messaging project settings
    #[serde(default)]
    pub firebase: FirebaseConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ConfigSchema {
    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let schema: Self = toml::from_str(content)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.notification.validate()
    }
}

/// How push messages are turned into notifications and where clicks land
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Title used when a message carries none
    #[serde(default = "default_fallback_title")]
    pub fallback_title: String,

    /// Notification icon
    #[serde(default = "default_icon")]
    pub icon: String,

    /// Monochrome badge shown in the status bar
    #[serde(default = "default_icon")]
    pub badge: String,

    /// Path opened when no application window exists
    #[serde(default = "default_root_path")]
    pub launch_path: String,

    /// Fragment an existing window URL must contain to be focused
    #[serde(default = "default_root_path")]
    pub window_match: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            fallback_title: default_fallback_title(),
            icon: default_icon(),
            badge: default_icon(),
            launch_path: default_root_path(),
            window_match: default_root_path(),
        }
    }
}

impl NotificationConfig {
    /// Check the values a host needs to display and route notifications
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("notification.fallback_title", &self.fallback_title),
            ("notification.icon", &self.icon),
            ("notification.badge", &self.badge),
            ("notification.launch_path", &self.launch_path),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::config_invalid(field, "must not be empty")
                    .with_suggestion(format!("Remove `{}` to use the default", field)));
            }
        }

        let launch = self.launch_path.as_str();
        if !(launch.starts_with('/') || launch.starts_with("https://") || launch.starts_with("http://")) {
            return Err(Error::config_invalid(
                "notification.launch_path",
                format!("`{}` is neither a root-relative path nor an http(s) URL", launch),
            )
            .with_suggestion("Use a path such as \"/\" or \"/inbox\""));
        }

        Ok(())
    }
}

fn default_fallback_title() -> String {
    "Thông báo mới".to_string()
}

fn default_icon() -> String {
    "/icons/Icon-192.png".to_string()
}

fn default_root_path() -> String {
    "/".to_string()
}

/// Web messaging project settings handed to the messaging SDK
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FirebaseConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messaging_sender_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_domain: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_bucket: Option<String>,
}

impl FirebaseConfig {
    /// True when enough is set for the SDK to register for push
    pub fn is_configured(&self) -> bool {
        self.project_id.is_some() && self.messaging_sender_id.is_some() && self.app_id.is_some()
    }

    /// Options object in the shape `firebase.initializeApp` takes
    pub fn app_options(&self) -> FirebaseAppOptions<'_> {
        FirebaseAppOptions {
            api_key: self.api_key.as_deref(),
            auth_domain: self.auth_domain.as_deref(),
            project_id: self.project_id.as_deref(),
            storage_bucket: self.storage_bucket.as_deref(),
            messaging_sender_id: self.messaging_sender_id.as_deref(),
            app_id: self.app_id.as_deref(),
        }
    }
}

/// Wire view of [`FirebaseConfig`] with the SDK's camelCase keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseAppOptions<'a> {
    /// Browser API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<&'a str>,
    /// Auth domain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_domain: Option<&'a str>,
    /// Project id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<&'a str>,
    /// Storage bucket
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_bucket: Option<&'a str>,
    /// Sender id push subscriptions are bound to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messaging_sender_id: Option<&'a str>,
    /// Web app id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<&'a str>,
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_defaults() {
        let config = NotificationConfig::default();
        assert_eq!(config.fallback_title, "Thông báo mới");
        assert_eq!(config.icon, "/icons/Icon-192.png");
        assert_eq!(config.badge, "/icons/Icon-192.png");
        assert_eq!(config.launch_path, "/");
        assert_eq!(config.window_match, "/");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let schema: ConfigSchema = toml::from_str(
            r#"
            [notification]
            fallback_title = "New alert"
            "#,
        )
        .unwrap();

        assert_eq!(schema.notification.fallback_title, "New alert");
        assert_eq!(schema.notification.icon, "/icons/Icon-192.png");
        assert_eq!(schema.logging.level, "info");
    }

    #[test]
    fn test_empty_icon_rejected() {
        let config = NotificationConfig {
            icon: "  ".to_string(),
            ..NotificationConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigValidationError);
        assert!(err.message.contains("notification.icon"));
    }

    #[test]
    fn test_launch_path_must_be_rooted() {
        let mut config = NotificationConfig {
            launch_path: "inbox".to_string(),
            ..NotificationConfig::default()
        };
        assert!(config.validate().is_err());

        config.launch_path = "https://sos-prj.web.app/".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_firebase_configured() {
        let mut firebase = FirebaseConfig::default();
        assert!(!firebase.is_configured());

        firebase.project_id = Some("sos-prj".to_string());
        firebase.messaging_sender_id = Some("678872102873".to_string());
        firebase.app_id = Some("1:678872102873:web:app".to_string());
        assert!(firebase.is_configured());
    }

    #[test]
    fn test_firebase_app_options_use_sdk_keys() {
        let schema = ConfigSchema::from_toml(
            r#"
            [firebase]
            api_key = "AIza-test"
            project_id = "sos-prj"
            messaging_sender_id = "678872102873"
            app_id = "1:678872102873:web:app"
            "#,
        )
        .unwrap();

        let json = serde_json::to_value(schema.firebase.app_options()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "apiKey": "AIza-test",
                "projectId": "sos-prj",
                "messagingSenderId": "678872102873",
                "appId": "1:678872102873:web:app",
            })
        );
    }

    #[test]
    fn test_firebase_app_options_empty_by_default() {
        let json = serde_json::to_value(FirebaseConfig::default().app_options()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
