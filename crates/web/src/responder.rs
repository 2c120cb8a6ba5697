//! Background push and notification click handling

use crate::gateway::{ClientWindow, GatewayError, NotificationClickEvent, PlatformGateway, WindowQuery};
use crate::message::{DisplayedNotification, InboundPushMessage};
use sos_core::config::NotificationConfig;
use tracing::{debug, info, instrument, warn};

/// Reacts to push messages and notification clicks delivered by a host
///
/// Stateless between events: every call reads only its arguments, the
/// configuration, and whatever the gateway reports.
pub struct NotificationResponder<G> {
    gateway: G,
    config: NotificationConfig,
}

impl<G: PlatformGateway> NotificationResponder<G> {
    /// Create a responder driving `gateway`
    pub fn new(gateway: G, config: NotificationConfig) -> Self {
        Self { gateway, config }
    }

    /// Gateway the responder was built with
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Active notification settings
    pub fn config(&self) -> &NotificationConfig {
        &self.config
    }

    /// Show one notification for a push message received in the background
    #[instrument(skip_all, fields(message_id = message.message_id.as_deref().unwrap_or("-")))]
    pub fn handle_background_message(&self, message: &InboundPushMessage) {
        let notification = DisplayedNotification::from_message(message, &self.config);
        debug!(
            title = %notification.title,
            data_keys = notification.options.data.len(),
            "Received background message"
        );
        self.gateway.show_notification(&notification);
    }

    /// Dismiss the clicked notification, then focus or open the app
    ///
    /// The notification is closed before any window is looked at. The first
    /// enumerated window whose URL contains the match fragment and that can
    /// take focus is focused; otherwise a new window is opened at the launch
    /// path when the platform allows it. Platform failures are returned
    /// unchanged. Hosts must keep the worker alive until the future settles.
    #[instrument(skip_all, fields(action = event.action.as_deref().unwrap_or("-")))]
    pub async fn handle_notification_click(
        &self,
        event: &NotificationClickEvent<G::Notification>,
    ) -> Result<(), GatewayError> {
        self.gateway.close_notification(&event.notification);

        let windows = self.gateway.enumerate_windows(&WindowQuery::all_windows()).await?;
        debug!(windows = windows.len(), "Enumerated client windows");

        if let Some(window) = windows
            .iter()
            .find(|w| w.url().contains(self.config.window_match.as_str()) && w.can_focus())
        {
            info!(url = window.url(), "Focusing existing window");
            return self.gateway.focus_window(window).await;
        }

        if self.gateway.can_open_window() {
            info!(url = %self.config.launch_path, "Opening new window");
            self.gateway.open_window(&self.config.launch_path).await?;
        } else {
            warn!("No window to focus and the platform cannot open one");
        }

        Ok(())
    }
}
