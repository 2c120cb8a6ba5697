//! Web push notification handling for the SOS app
//!
//! This crate provides:
//! - Push payload parsing and notification construction
//! - The [`NotificationResponder`] for background messages and clicks
//! - The [`PlatformGateway`] seam every host effect goes through
//! - A recording gateway for tests and the command line
//! - WASM bindings for the service worker (feature `wasm`)
//!
//! # Example
//!
//! ```
//! use sos_core::config::NotificationConfig;
//! use sos_web::simulated::SimulatedGateway;
//! use sos_web::{InboundPushMessage, NotificationResponder};
//!
//! let responder = NotificationResponder::new(SimulatedGateway::new(), NotificationConfig::default());
//! responder.handle_background_message(&InboundPushMessage::default());
//!
//! assert_eq!(responder.gateway().shown()[0].title, "Thông báo mới");
//! ```

#![warn(missing_docs)]

pub mod gateway;
pub mod message;
mod responder;
pub mod simulated;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use gateway::{ClientWindow, GatewayError, NotificationClickEvent, PlatformGateway, WindowQuery};
pub use message::{DisplayedNotification, InboundPushMessage, NotificationData, NotificationOptions};
pub use responder::NotificationResponder;
