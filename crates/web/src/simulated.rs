//! In-process platform that records what the responder asks for
//!
//! Used by the test suites and by `sos-push` to replay payloads and clicks
//! without a browser. Effects are kept in the order they were issued.

use crate::gateway::{ClientWindow, GatewayError, PlatformGateway, WindowQuery};
use crate::message::DisplayedNotification;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

/// Id the simulated platform uses for notification handles
pub type SimulatedNotificationId = u32;

/// One request issued to the simulated platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    /// A notification was shown
    Shown {
        /// What was shown
        notification: DisplayedNotification,
    },
    /// A notification was dismissed
    Closed {
        /// Handle of the dismissed notification
        notification: SimulatedNotificationId,
    },
    /// Open windows were listed
    Enumerated {
        /// Query used for the listing
        query: WindowQuery,
    },
    /// A window was brought to the front
    Focused {
        /// Id of the focused window
        window: String,
    },
    /// A new window was opened
    Opened {
        /// URL the window was opened at
        url: String,
    },
}

/// An open window of the simulated platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedWindow {
    /// Identifier reported in [`Effect::Focused`]
    pub id: String,
    /// Current URL
    pub url: String,
    /// Whether focusing is allowed, `true` when omitted
    #[serde(default = "default_focusable")]
    pub focusable: bool,
}

fn default_focusable() -> bool {
    true
}

impl SimulatedWindow {
    /// A focusable window at `url`
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            focusable: true,
        }
    }

    /// Same window without a focus capability
    #[must_use]
    pub fn unfocusable(mut self) -> Self {
        self.focusable = false;
        self
    }
}

impl ClientWindow for SimulatedWindow {
    fn url(&self) -> &str {
        &self.url
    }

    fn can_focus(&self) -> bool {
        self.focusable
    }
}

/// Recording [`PlatformGateway`]
#[derive(Debug)]
pub struct SimulatedGateway {
    windows: Vec<SimulatedWindow>,
    effects: Mutex<Vec<Effect>>,
    open_supported: bool,
    enumerate_error: Option<String>,
    focus_error: Option<String>,
    open_error: Option<String>,
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedGateway {
    /// A platform with no open windows
    pub fn new() -> Self {
        Self::with_windows(Vec::new())
    }

    /// A platform whose enumeration returns `windows` in this order
    pub fn with_windows(windows: Vec<SimulatedWindow>) -> Self {
        Self {
            windows,
            effects: Mutex::new(Vec::new()),
            open_supported: true,
            enumerate_error: None,
            focus_error: None,
            open_error: None,
        }
    }

    /// Drop the open-window capability
    #[must_use]
    pub fn without_open_window(mut self) -> Self {
        self.open_supported = false;
        self
    }

    /// Make window enumeration fail with `reason`
    #[must_use]
    pub fn failing_enumeration(mut self, reason: impl Into<String>) -> Self {
        self.enumerate_error = Some(reason.into());
        self
    }

    /// Make focusing fail with `reason`
    #[must_use]
    pub fn failing_focus(mut self, reason: impl Into<String>) -> Self {
        self.focus_error = Some(reason.into());
        self
    }

    /// Make opening windows fail with `reason`
    #[must_use]
    pub fn failing_open(mut self, reason: impl Into<String>) -> Self {
        self.open_error = Some(reason.into());
        self
    }

    /// Everything requested so far, in issue order
    pub fn effects(&self) -> Vec<Effect> {
        self.log().to_vec()
    }

    /// Notifications shown so far
    pub fn shown(&self) -> Vec<DisplayedNotification> {
        self.log()
            .iter()
            .filter_map(|effect| match effect {
                Effect::Shown { notification } => Some(notification.clone()),
                _ => None,
            })
            .collect()
    }

    fn log(&self) -> MutexGuard<'_, Vec<Effect>> {
        self.effects.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, effect: Effect) {
        self.log().push(effect);
    }
}

impl PlatformGateway for SimulatedGateway {
    type Notification = SimulatedNotificationId;
    type Window = SimulatedWindow;

    fn show_notification(&self, notification: &DisplayedNotification) {
        self.record(Effect::Shown {
            notification: notification.clone(),
        });
    }

    fn close_notification(&self, notification: &SimulatedNotificationId) {
        self.record(Effect::Closed {
            notification: *notification,
        });
    }

    async fn enumerate_windows(&self, query: &WindowQuery) -> Result<Vec<SimulatedWindow>, GatewayError> {
        self.record(Effect::Enumerated { query: *query });
        match &self.enumerate_error {
            Some(reason) => Err(GatewayError::Enumerate(reason.clone())),
            None => Ok(self.windows.clone()),
        }
    }

    async fn focus_window(&self, window: &SimulatedWindow) -> Result<(), GatewayError> {
        self.record(Effect::Focused {
            window: window.id.clone(),
        });
        match &self.focus_error {
            Some(reason) => Err(GatewayError::Focus {
                url: window.url.clone(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn can_open_window(&self) -> bool {
        self.open_supported
    }

    async fn open_window(&self, url: &str) -> Result<(), GatewayError> {
        self.record(Effect::Opened {
            url: url.to_string(),
        });
        match &self.open_error {
            Some(reason) => Err(GatewayError::Open {
                url: url.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}
