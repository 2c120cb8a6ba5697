//! WASM bindings for the service worker
//!
//! [`ServiceWorkerGateway`] drives the worker's global scope
//! (`registration.showNotification`, `clients.matchAll`, `client.focus`,
//! `clients.openWindow`). The messaging SDK hands background payloads to
//! `handleBackgroundMessage`; `installClickListener` registers the
//! `notificationclick` listener and keeps the worker alive with
//! `event.waitUntil` until the click has been handled. Log lines go to the
//! worker console.
//!
//! ```js
//! importScripts('https://www.gstatic.com/firebasejs/10.12.0/firebase-app-compat.js');
//! importScripts('https://www.gstatic.com/firebasejs/10.12.0/firebase-messaging-compat.js');
//! importScripts('./sos_web.js');
//! wasm_bindgen('./sos_web_bg.wasm')
//!   .then(() => fetch('./sos-push.toml'))
//!   .then((res) => res.text())
//!   .then((toml) => {
//!     wasm_bindgen.configure(toml);
//!     firebase.initializeApp(wasm_bindgen.firebaseConfig());
//!     wasm_bindgen.installClickListener();
//!     firebase.messaging().onBackgroundMessage((payload) => wasm_bindgen.handleBackgroundMessage(payload));
//!   });
//! ```

use crate::gateway::{ClientWindow, GatewayError, NotificationClickEvent, PlatformGateway, WindowQuery};
use crate::message::{DisplayedNotification, InboundPushMessage};
use crate::NotificationResponder;
use js_sys::{Array, Function, Promise, Reflect};
use serde::Serialize;
use sos_core::config::{ConfigSchema, LoggingConfig};
use std::cell::RefCell;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use web_sys::console;

thread_local! {
    static CONFIG: RefCell<ConfigSchema> = RefCell::new(ConfigSchema::default());
    static LOG_FILTER: RefCell<Option<reload::Handle<EnvFilter, Registry>>> = const { RefCell::new(None) };
}

/// Buffers one formatted event and hands it to `console.log` when dropped
#[derive(Default)]
struct ConsoleWriter {
    buffer: Vec<u8>,
}

impl std::io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let line = String::from_utf8_lossy(&self.buffer);
        let line = line.trim_end();
        if !line.is_empty() {
            console::log_1(&JsValue::from_str(line));
        }
    }
}

/// Install the console subscriber, or swap its level filter if installed
fn init_logging(level: &str) {
    let reloaded = LOG_FILTER.with(|handle| {
        handle
            .borrow()
            .as_ref()
            .map(|handle| handle.reload(EnvFilter::new(level)))
    });
    match reloaded {
        Some(Ok(())) => return,
        Some(Err(e)) => {
            console::error_1(&JsValue::from_str(&format!("Log level not applied: {}", e)));
            return;
        }
        None => {}
    }

    let (filter, handle) = reload::Layer::new(EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(ConsoleWriter::default)
            .with_ansi(false)
            .with_target(false)
            .without_time(),
    );

    // Another subscriber may already own the worker; keep it.
    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        LOG_FILTER.with(|slot| *slot.borrow_mut() = Some(handle));
    }
}

/// Route log lines to the worker console as soon as the module loads
#[wasm_bindgen(start)]
pub fn start() {
    init_logging(&LoggingConfig::default().level);
}

fn get(target: &JsValue, key: &str) -> Result<JsValue, JsValue> {
    Reflect::get(target, &JsValue::from_str(key))
}

fn call(target: &JsValue, method: &str, args: &Array) -> Result<JsValue, JsValue> {
    let function: Function = get(target, method)?.dyn_into()?;
    Reflect::apply(&function, target, args)
}

async fn call_async(target: &JsValue, method: &str, args: &Array) -> Result<JsValue, JsValue> {
    let promise: Promise = call(target, method, args)?.dyn_into()?;
    JsFuture::from(promise).await
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let json = serde_json::to_string(value)
        .map_err(|e| JsValue::from_str(&format!("JSON serialize error: {}", e)))?;
    js_sys::JSON::parse(&json)
}

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

/// Hand a failure to the host console, the worker's own diagnostics channel
fn report_to_host(context: &str, err: &JsValue) {
    console::error_2(&JsValue::from_str(context), err);
}

/// Window client returned by `clients.matchAll`
pub struct WorkerClient {
    handle: JsValue,
    url: String,
    focusable: bool,
}

impl WorkerClient {
    fn from_js(handle: JsValue) -> Self {
        let url = get(&handle, "url")
            .ok()
            .and_then(|v| v.as_string())
            .unwrap_or_default();
        let focusable = Reflect::has(&handle, &JsValue::from_str("focus")).unwrap_or(false);
        Self { handle, url, focusable }
    }
}

impl ClientWindow for WorkerClient {
    fn url(&self) -> &str {
        &self.url
    }

    fn can_focus(&self) -> bool {
        self.focusable
    }
}

/// [`PlatformGateway`] over a service worker global scope
pub struct ServiceWorkerGateway {
    scope: JsValue,
}

impl ServiceWorkerGateway {
    /// Gateway bound to the current global scope
    pub fn from_global() -> Self {
        Self {
            scope: js_sys::global().into(),
        }
    }

    fn property(&self, name: &str) -> Result<JsValue, GatewayError> {
        match get(&self.scope, name) {
            Ok(value) if !value.is_undefined() && !value.is_null() => Ok(value),
            _ => Err(GatewayError::Unavailable(name.to_string())),
        }
    }
}

impl PlatformGateway for ServiceWorkerGateway {
    type Notification = JsValue;
    type Window = WorkerClient;

    fn show_notification(&self, notification: &DisplayedNotification) {
        let shown = self
            .property("registration")
            .map_err(|e| JsValue::from_str(&e.to_string()))
            .and_then(|registration| {
                let options = to_js(&notification.options)?;
                let args = Array::of2(&JsValue::from_str(&notification.title), &options);
                call(&registration, "showNotification", &args)
            });

        // The returned promise is left to the host; a rejection surfaces as
        // an unhandled rejection in the worker console.
        if let Err(err) = shown {
            report_to_host("showNotification failed", &err);
        }
    }

    fn close_notification(&self, notification: &JsValue) {
        if let Err(err) = call(notification, "close", &Array::new()) {
            report_to_host("notification.close failed", &err);
        }
    }

    async fn enumerate_windows(&self, query: &WindowQuery) -> Result<Vec<WorkerClient>, GatewayError> {
        let clients = self.property("clients")?;
        let options = to_js(query).map_err(|e| GatewayError::Enumerate(describe(&e)))?;
        let list = call_async(&clients, "matchAll", &Array::of1(&options))
            .await
            .map_err(|e| GatewayError::Enumerate(describe(&e)))?;

        Ok(Array::from(&list).iter().map(WorkerClient::from_js).collect())
    }

    async fn focus_window(&self, window: &WorkerClient) -> Result<(), GatewayError> {
        call_async(&window.handle, "focus", &Array::new())
            .await
            .map(|_| ())
            .map_err(|e| GatewayError::Focus {
                url: window.url.clone(),
                reason: describe(&e),
            })
    }

    fn can_open_window(&self) -> bool {
        self.property("clients")
            .ok()
            .and_then(|clients| get(&clients, "openWindow").ok())
            .is_some_and(|open| open.is_function())
    }

    async fn open_window(&self, url: &str) -> Result<(), GatewayError> {
        let clients = self.property("clients")?;
        call_async(&clients, "openWindow", &Array::of1(&JsValue::from_str(url)))
            .await
            .map(|_| ())
            .map_err(|e| GatewayError::Open {
                url: url.to_string(),
                reason: describe(&e),
            })
    }
}

fn responder() -> NotificationResponder<ServiceWorkerGateway> {
    let config = CONFIG.with(|c| c.borrow().notification.clone());
    NotificationResponder::new(ServiceWorkerGateway::from_global(), config)
}

/// Replace the worker settings with those of a TOML document.
///
/// # Arguments
/// * `config_toml` - Contents of a `sos-push.toml` file
#[wasm_bindgen]
pub fn configure(config_toml: &str) -> Result<(), JsValue> {
    let schema = ConfigSchema::from_toml(config_toml)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    init_logging(&schema.logging.level);
    if !schema.firebase.is_configured() {
        tracing::warn!("Firebase messaging is not fully configured");
    }
    CONFIG.with(|c| *c.borrow_mut() = schema);
    Ok(())
}

/// Options for `firebase.initializeApp` from the `[firebase]` settings.
///
/// # Returns
/// Object with `apiKey`, `authDomain`, `projectId`, `storageBucket`,
/// `messagingSenderId` and `appId`; unset keys are left out.
#[wasm_bindgen(js_name = firebaseConfig)]
pub fn firebase_config() -> Result<JsValue, JsValue> {
    CONFIG.with(|c| to_js(&c.borrow().firebase.app_options()))
}

/// Show a notification for a payload received in the background.
///
/// # Arguments
/// * `payload` - Message object passed to `onBackgroundMessage`
#[wasm_bindgen(js_name = handleBackgroundMessage)]
pub fn handle_background_message(payload: JsValue) -> Result<(), JsValue> {
    let json: String = js_sys::JSON::stringify(&payload)?.into();
    tracing::info!(payload = %json, "Received background message");
    let message = InboundPushMessage::from_json(&json)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    responder().handle_background_message(&message);
    Ok(())
}

/// Handle a `notificationclick` event.
///
/// # Returns
/// Promise settling once the window has been focused or opened; pass it to
/// `event.waitUntil`.
#[wasm_bindgen(js_name = handleNotificationClick)]
pub fn handle_notification_click(event: JsValue) -> Result<Promise, JsValue> {
    let notification = get(&event, "notification")?;
    let action = get(&event, "action")?.as_string().filter(|a| !a.is_empty());
    tracing::info!(action = ?action, "Notification clicked");
    let responder = responder();

    Ok(future_to_promise(async move {
        let event = NotificationClickEvent { notification, action };
        responder
            .handle_notification_click(&event)
            .await
            .map(|()| JsValue::UNDEFINED)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }))
}

/// Register the `notificationclick` listener on the worker scope.
#[wasm_bindgen(js_name = installClickListener)]
pub fn install_click_listener() -> Result<(), JsValue> {
    let scope: JsValue = js_sys::global().into();

    let listener = Closure::<dyn FnMut(JsValue)>::new(|event: JsValue| {
        let pending = handle_notification_click(event.clone())
            .and_then(|promise| call(&event, "waitUntil", &Array::of1(&promise)));
        if let Err(err) = pending {
            report_to_host("notificationclick failed", &err);
        }
    });

    let args = Array::of2(&JsValue::from_str("notificationclick"), listener.as_ref());
    call(&scope, "addEventListener", &args)?;
    listener.forget();

    Ok(())
}
