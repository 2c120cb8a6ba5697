//! Push payloads and the notifications built from them

use serde::{Deserialize, Serialize};
use sos_core::config::NotificationConfig;
use sos_core::{Error, Result};
use std::collections::BTreeMap;

/// Application-defined key/value payload carried by a push message
pub type NotificationData = BTreeMap<String, String>;

/// A push message delivered while the app has no focused window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundPushMessage {
    /// Display part of the payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<PushNotificationFields>,

    /// Application payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<NotificationData>,

    /// Sender id reported by the transport
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Transport message id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    /// Collapse key set by the sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapse_key: Option<String>,
}

/// `notification` object of a push payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotificationFields {
    /// Title chosen by the sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Body text chosen by the sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl InboundPushMessage {
    /// Parse a JSON push payload
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            Error::payload(format!("Malformed push payload: {}", e)).with_source(e)
        })
    }

    /// Title sent with the message, if any non-empty one was
    pub fn title(&self) -> Option<&str> {
        self.notification
            .as_ref()
            .and_then(|n| n.title.as_deref())
            .filter(|t| !t.is_empty())
    }

    /// Body sent with the message, if any non-empty one was
    pub fn body(&self) -> Option<&str> {
        self.notification
            .as_ref()
            .and_then(|n| n.body.as_deref())
            .filter(|b| !b.is_empty())
    }
}

/// Options object passed alongside the title when showing a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationOptions {
    /// Body text, empty when the message had none
    pub body: String,
    /// Icon URL
    pub icon: String,
    /// Monochrome badge URL
    pub badge: String,
    /// Payload handed back on click
    pub data: NotificationData,
}

/// A notification ready to be shown by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayedNotification {
    /// Title line
    pub title: String,
    /// Everything shown besides the title
    pub options: NotificationOptions,
}

impl DisplayedNotification {
    /// Build the notification for one push message
    ///
    /// Missing or empty title and body fall back to the configured title and
    /// an empty body; missing data becomes an empty map.
    pub fn from_message(message: &InboundPushMessage, config: &NotificationConfig) -> Self {
        Self {
            title: message
                .title()
                .map_or_else(|| config.fallback_title.clone(), str::to_string),
            options: NotificationOptions {
                body: message.body().unwrap_or_default().to_string(),
                icon: config.icon.clone(),
                badge: config.badge.clone(),
                data: message.data.clone().unwrap_or_default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sos_core::ErrorCode;

    fn config() -> NotificationConfig {
        NotificationConfig::default()
    }

    #[test]
    fn test_parse_full_payload() {
        let message = InboundPushMessage::from_json(
            r#"{
                "notification": {"title": "SOS", "body": "Help requested nearby"},
                "data": {"requestId": "42"},
                "from": "678872102873",
                "messageId": "0:1700000000",
                "collapseKey": "sos"
            }"#,
        )
        .unwrap();

        assert_eq!(message.title(), Some("SOS"));
        assert_eq!(message.body(), Some("Help requested nearby"));
        assert_eq!(message.message_id.as_deref(), Some("0:1700000000"));
        assert_eq!(message.collapse_key.as_deref(), Some("sos"));
    }

    #[test]
    fn test_parse_ignores_unknown_fields() {
        let message =
            InboundPushMessage::from_json(r#"{"fcmOptions": {"link": "/"}, "priority": "high"}"#)
                .unwrap();
        assert_eq!(message, InboundPushMessage::default());
    }

    #[test]
    fn test_parse_rejects_non_string_data() {
        let err = InboundPushMessage::from_json(r#"{"data": {"count": 3}}"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPayload);
        assert!(err.suggestion.is_some());
    }

    #[test]
    fn test_missing_notification_uses_fallback_title() {
        let shown = DisplayedNotification::from_message(&InboundPushMessage::default(), &config());
        assert_eq!(shown.title, "Thông báo mới");
        assert_eq!(shown.options.body, "");
        assert!(shown.options.data.is_empty());
        assert_eq!(shown.options.icon, "/icons/Icon-192.png");
        assert_eq!(shown.options.badge, "/icons/Icon-192.png");
    }

    #[test]
    fn test_empty_title_falls_back() {
        let message = InboundPushMessage::from_json(r#"{"notification": {"title": ""}}"#).unwrap();
        let shown = DisplayedNotification::from_message(&message, &config());
        assert_eq!(shown.title, "Thông báo mới");
    }

    #[test]
    fn test_data_copied_exactly() {
        let message = InboundPushMessage::from_json(r#"{"data": {"k": "v"}}"#).unwrap();
        let shown = DisplayedNotification::from_message(&message, &config());

        let expected: NotificationData = [("k".to_string(), "v".to_string())].into();
        assert_eq!(shown.options.data, expected);
    }

    #[test]
    fn test_configured_icons_used() {
        let config = NotificationConfig {
            icon: "/icons/sos-512.png".to_string(),
            badge: "/icons/badge.png".to_string(),
            ..config()
        };
        let shown = DisplayedNotification::from_message(&InboundPushMessage::default(), &config);
        assert_eq!(shown.options.icon, "/icons/sos-512.png");
        assert_eq!(shown.options.badge, "/icons/badge.png");
    }

    proptest! {
        #[test]
        fn prop_absent_notification_gives_fallback(
            data in proptest::option::of(proptest::collection::btree_map(".*", ".*", 0..8))
        ) {
            let message = InboundPushMessage { data, ..InboundPushMessage::default() };
            let shown = DisplayedNotification::from_message(&message, &config());
            prop_assert_eq!(shown.title, "Thông báo mới");
            prop_assert_eq!(shown.options.body, "");
        }

        #[test]
        fn prop_absent_body_gives_empty_body(title in proptest::option::of(".*")) {
            let message = InboundPushMessage {
                notification: Some(PushNotificationFields { title, body: None }),
                ..InboundPushMessage::default()
            };
            let shown = DisplayedNotification::from_message(&message, &config());
            prop_assert_eq!(shown.options.body, "");
        }

        #[test]
        fn prop_title_and_body_pass_through(title in ".+", body in ".+") {
            let message = InboundPushMessage {
                notification: Some(PushNotificationFields {
                    title: Some(title.clone()),
                    body: Some(body.clone()),
                }),
                ..InboundPushMessage::default()
            };
            let shown = DisplayedNotification::from_message(&message, &config());
            prop_assert_eq!(shown.title, title);
            prop_assert_eq!(shown.options.body, body);
        }

        #[test]
        fn prop_data_is_copied_or_empty(
            data in proptest::option::of(proptest::collection::btree_map(".*", ".*", 0..8))
        ) {
            let message = InboundPushMessage { data: data.clone(), ..InboundPushMessage::default() };
            let shown = DisplayedNotification::from_message(&message, &config());
            prop_assert_eq!(shown.options.data, data.unwrap_or_default());
        }
    }
}
