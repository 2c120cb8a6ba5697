//! Platform capabilities the responder is driven through
//!
//! The responder never touches host globals. Every effect it produces goes
//! through a [`PlatformGateway`]: the service-worker adapter in the browser,
//! [`crate::simulated::SimulatedGateway`] in tests and on the command line.

use crate::message::DisplayedNotification;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures reported by a platform while handling a click
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Listing the open windows failed
    #[error("window enumeration failed: {0}")]
    Enumerate(String),

    /// Focusing an existing window failed
    #[error("focusing window {url} failed: {reason}")]
    Focus {
        /// URL of the window that could not be focused
        url: String,
        /// Platform reason
        reason: String,
    },

    /// Opening a new window failed
    #[error("opening {url} failed: {reason}")]
    Open {
        /// URL that could not be opened
        url: String,
        /// Platform reason
        reason: String,
    },

    /// A capability the host should provide is missing
    #[error("platform capability unavailable: {0}")]
    Unavailable(String),
}

impl From<GatewayError> for sos_core::Error {
    fn from(err: GatewayError) -> Self {
        let converted = match &err {
            GatewayError::Unavailable(_) => {
                sos_core::Error::new(sos_core::ErrorCode::PlatformUnavailable, err.to_string())
            }
            _ => sos_core::Error::platform(err.to_string()),
        };
        converted.with_source(err)
    }
}

/// Kind of client the enumeration asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    /// Browser windows and tabs
    Window,
    /// Dedicated workers
    Worker,
    /// Every client kind
    All,
}

/// Parameters of a client enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowQuery {
    /// Client kind to list
    #[serde(rename = "type")]
    pub client_type: ClientType,
    /// Also list clients this worker does not control
    pub include_uncontrolled: bool,
}

impl WindowQuery {
    /// Every window of the origin, including ones this worker does not control
    pub fn all_windows() -> Self {
        Self {
            client_type: ClientType::Window,
            include_uncontrolled: true,
        }
    }
}

/// A window handle returned by enumeration
pub trait ClientWindow {
    /// Current URL of the window
    fn url(&self) -> &str;

    /// Whether the platform lets this window be focused
    fn can_focus(&self) -> bool;
}

/// Click delivered by the host for a notification it displayed earlier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationClickEvent<N> {
    /// Host handle of the clicked notification
    pub notification: N,
    /// Action button id, `None` for a click on the notification body
    pub action: Option<String>,
}

impl<N> NotificationClickEvent<N> {
    /// Click on the notification body
    pub fn new(notification: N) -> Self {
        Self {
            notification,
            action: None,
        }
    }
}

/// Host operations used by [`crate::NotificationResponder`]
///
/// Showing and closing notifications are fire and forget: a host that fails
/// to display one reports it through its own diagnostics. The window
/// operations are asynchronous and return their failures to the caller.
#[allow(async_fn_in_trait)]
pub trait PlatformGateway {
    /// Handle of a displayed notification
    type Notification;

    /// Handle of an open application window
    type Window: ClientWindow;

    /// Ask the platform to display a notification now
    fn show_notification(&self, notification: &DisplayedNotification);

    /// Dismiss a displayed notification
    fn close_notification(&self, notification: &Self::Notification);

    /// List open clients matching `query`, in platform order
    async fn enumerate_windows(&self, query: &WindowQuery) -> Result<Vec<Self::Window>, GatewayError>;

    /// Bring an existing window to the front
    async fn focus_window(&self, window: &Self::Window) -> Result<(), GatewayError>;

    /// Whether new windows can be opened from here
    fn can_open_window(&self) -> bool {
        true
    }

    /// Open a new window at `url`
    async fn open_window(&self, url: &str) -> Result<(), GatewayError>;
}
