//! SOS push CLI
//!
//! Replays push payloads and notification clicks against the responder on a
//! simulated platform and prints what the service worker would do.

use anyhow::Result;
use clap::{Parser, Subcommand};
use sos_cli::output::{format_count, format_optional, set_color_enabled, Status};
use sos_core::config::Config;
use sos_core::error::{exit_codes, Error, ResultExt};
use sos_telemetry::{counters, metrics, TelemetryConfig};
use sos_web::simulated::{Effect, SimulatedGateway, SimulatedWindow};
use sos_web::{DisplayedNotification, InboundPushMessage, NotificationClickEvent, NotificationResponder};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sos-push")]
#[command(about = "Replay push payloads and notification clicks against the SOS responder")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase output verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the notification a background push payload produces
    Message {
        /// JSON payload file, `-` for stdin
        input: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Click a notification and report which window is focused or opened
    Click {
        /// JSON list of open windows: [{"id", "url", "focusable"}]
        #[arg(long)]
        windows: Option<PathBuf>,
        /// Action button that was clicked
        #[arg(long)]
        action: Option<String>,
        /// Simulate a platform that cannot open windows
        #[arg(long)]
        no_open_window: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        set_color_enabled(false);
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            Status::error(&e.to_string());
            std::process::exit(e.exit_code());
        }
    };

    sos_telemetry::init_with_config(
        TelemetryConfig::from_verbosity(&config.schema.logging.level, cli.verbose, cli.quiet)
            .with_ansi(!cli.no_color),
    )?;

    let output = OutputMode::new(cli.quiet);
    let exit_code = match cli.command {
        Commands::Message { input, json } => run_message(&input, output.json(json), &config),
        Commands::Click {
            windows,
            action,
            no_open_window,
            json,
        } => tokio::runtime::Builder::new_current_thread()
            .build()?
            .block_on(run_click(windows.as_deref(), action, no_open_window, output.json(json), &config)),
        Commands::Config { json } => run_config(&config, output.json(json)),
    };

    tracing::debug!(metrics = %metrics().export_json(), "Run finished");
    std::process::exit(exit_code);
}

/// How a command reports its result on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
    Quiet,
}

impl OutputMode {
    fn new(quiet: bool) -> Self {
        if quiet { Self::Quiet } else { Self::Human }
    }

    /// `--json` asks for machine output and wins over `--quiet`
    fn json(self, json: bool) -> Self {
        if json { Self::Json } else { self }
    }
}

/// Read a file, or stdin when the path is `-`
fn read_input(path: &Path) -> sos_core::Result<String> {
    if path == Path::new("-") {
        return std::io::read_to_string(std::io::stdin())
            .map_err(Error::from)
            .context("Reading payload from stdin");
    }
    if !path.exists() {
        return Err(Error::file_not_found(path));
    }
    std::fs::read_to_string(path)
        .map_err(Error::from)
        .context(format!("Reading {}", path.display()))
}

fn fail(err: &Error) -> i32 {
    Status::error(&err.to_string());
    err.exit_code()
}

fn print_json(value: &impl serde::Serialize) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(out) => {
            println!("{}", out);
            exit_codes::SUCCESS
        }
        Err(e) => fail(&Error::from(e)),
    }
}

/// Run the background message path for one payload
fn show_message(payload: &str, config: &Config) -> sos_core::Result<DisplayedNotification> {
    let message = InboundPushMessage::from_json(payload)?;

    let responder = NotificationResponder::new(SimulatedGateway::new(), config.schema.notification.clone());
    responder.handle_background_message(&message);

    let shown = responder.gateway().shown();
    metrics().increment_by(counters::NOTIFICATIONS_SHOWN, shown.len() as u64);

    shown
        .into_iter()
        .next()
        .ok_or_else(|| Error::new(sos_core::ErrorCode::Internal, "No notification was shown"))
}

fn run_message(input: &Path, output: OutputMode, config: &Config) -> i32 {
    let notification = match read_input(input).and_then(|payload| show_message(&payload, config)) {
        Ok(notification) => notification,
        Err(e) => return fail(&e),
    };

    match output {
        OutputMode::Quiet => {}
        OutputMode::Json => return print_json(&notification),
        OutputMode::Human => {
            Status::header("Notification");
            Status::field("title", &notification.title);
            Status::field("body", &format_optional(Some(&notification.options.body)));
            Status::field("icon", &notification.options.icon);
            Status::field("badge", &notification.options.badge);
            if notification.options.data.is_empty() {
                Status::field("data", &format_optional(None));
            } else {
                for (key, value) in &notification.options.data {
                    Status::field(&format!("data.{}", key), value);
                }
            }
        }
    }

    exit_codes::SUCCESS
}

/// Parse the `--windows` list, empty when no file is given
fn load_windows(path: Option<&Path>) -> sos_core::Result<Vec<SimulatedWindow>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let raw = read_input(path)?;
    serde_json::from_str::<Vec<SimulatedWindow>>(&raw)
        .map_err(Error::from)
        .with_suggestion("Windows look like [{\"id\": \"tab-1\", \"url\": \"https://example.com/\"}]")
}

/// Effects of one replayed click and how it ended
struct ClickOutcome {
    effects: Vec<Effect>,
    result: sos_core::Result<()>,
}

impl ClickOutcome {
    fn report(&self) -> serde_json::Value {
        serde_json::json!({
            "effects": self.effects,
            "error": self.result.as_ref().err().map(Error::to_report),
        })
    }
}

async fn replay_click(
    windows: Vec<SimulatedWindow>,
    action: Option<String>,
    no_open_window: bool,
    config: &Config,
) -> ClickOutcome {
    let mut gateway = SimulatedGateway::with_windows(windows);
    if no_open_window {
        gateway = gateway.without_open_window();
    }
    let responder = NotificationResponder::new(gateway, config.schema.notification.clone());

    let event = NotificationClickEvent {
        notification: 1,
        action,
    };
    let result = responder
        .handle_notification_click(&event)
        .await
        .map_err(|e| Error::from(e).with_context("While handling notification click"));
    let effects = responder.gateway().effects();

    for effect in &effects {
        match effect {
            Effect::Focused { .. } => metrics().increment(counters::CLICKS_FOCUSED),
            Effect::Opened { .. } => metrics().increment(counters::CLICKS_OPENED),
            _ => {}
        }
    }
    if result.is_err() {
        metrics().increment(counters::CLICKS_FAILED);
    }

    ClickOutcome { effects, result }
}

async fn run_click(
    windows: Option<&Path>,
    action: Option<String>,
    no_open_window: bool,
    output: OutputMode,
    config: &Config,
) -> i32 {
    let windows = match load_windows(windows) {
        Ok(windows) => windows,
        Err(e) => return fail(&e),
    };

    let outcome = replay_click(windows, action, no_open_window, config).await;

    match output {
        OutputMode::Quiet => {}
        OutputMode::Json => println!("{}", outcome.report()),
        OutputMode::Human => {
            Status::header("Notification click");
            for (i, effect) in outcome.effects.iter().enumerate() {
                Status::step(i + 1, outcome.effects.len(), &describe_effect(effect));
            }
        }
    }

    match &outcome.result {
        Ok(()) => {
            if output == OutputMode::Human {
                Status::success(&format!(
                    "Handled with {}",
                    format_count(outcome.effects.len(), "effect", "effects")
                ));
            }
            exit_codes::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn describe_effect(effect: &Effect) -> String {
    match effect {
        Effect::Shown { notification } => format!("show notification \"{}\"", notification.title),
        Effect::Closed { notification } => format!("close notification #{}", notification),
        Effect::Enumerated { query } => format!(
            "enumerate windows (include uncontrolled: {})",
            query.include_uncontrolled
        ),
        Effect::Focused { window } => format!("focus window {}", window),
        Effect::Opened { url } => format!("open window at {}", url),
    }
}

fn run_config(config: &Config, output: OutputMode) -> i32 {
    match output {
        OutputMode::Quiet => return exit_codes::SUCCESS,
        OutputMode::Json => return print_json(&config.schema),
        OutputMode::Human => {}
    }

    let source = config
        .path
        .as_ref()
        .map_or_else(|| "defaults".to_string(), |p| p.display().to_string());
    Status::info(&format!("Configuration from {}", source));

    let notification = &config.schema.notification;
    Status::header("Notification");
    Status::field("fallback title", &notification.fallback_title);
    Status::field("icon", &notification.icon);
    Status::field("badge", &notification.badge);
    Status::field("launch path", &notification.launch_path);
    Status::field("window match", &notification.window_match);

    let firebase = &config.schema.firebase;
    Status::header("Firebase");
    Status::field("project", &format_optional(firebase.project_id.as_deref()));
    Status::field("sender id", &format_optional(firebase.messaging_sender_id.as_deref()));
    Status::field("app id", &format_optional(firebase.app_id.as_deref()));
    if !firebase.is_configured() {
        Status::warning("Firebase messaging is not fully configured (project_id, messaging_sender_id, app_id)");
    }

    exit_codes::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use sos_web::GatewayError;
    use std::io::Write;
    use tokio_test::block_on;

    fn effect_names(report: &serde_json::Value) -> Vec<&str> {
        report["effects"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["effect"].as_str().unwrap())
            .collect()
    }

    #[test]
    fn test_cli_parses_click() {
        let cli = Cli::try_parse_from(["sos-push", "click", "--windows", "w.json", "--json"]).unwrap();
        match cli.command {
            Commands::Click { windows, json, no_open_window, .. } => {
                assert_eq!(windows, Some(PathBuf::from("w.json")));
                assert!(json);
                assert!(!no_open_window);
            }
            _ => panic!("expected click"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["sos-push", "message", "-", "-q", "--no-color"]).unwrap();
        assert!(cli.quiet);
        assert!(cli.no_color);
    }

    #[test]
    fn test_output_mode() {
        assert_eq!(OutputMode::new(false).json(false), OutputMode::Human);
        assert_eq!(OutputMode::new(true).json(false), OutputMode::Quiet);
        assert_eq!(OutputMode::new(true).json(true), OutputMode::Json);
        assert_eq!(OutputMode::new(false).json(true), OutputMode::Json);
    }

    #[test]
    fn test_read_input_missing_file() {
        let err = read_input(Path::new("/nonexistent/payload.json")).unwrap_err();
        assert_eq!(err.code, sos_core::ErrorCode::FileNotFound);
    }

    #[test]
    fn test_show_message_empty_payload() {
        let notification = show_message("{}", &Config::default()).unwrap();

        assert_eq!(
            serde_json::to_value(&notification).unwrap(),
            serde_json::json!({
                "title": "Thông báo mới",
                "options": {
                    "body": "",
                    "icon": "/icons/Icon-192.png",
                    "badge": "/icons/Icon-192.png",
                    "data": {},
                },
            })
        );
    }

    #[test]
    fn test_show_message_keeps_sender_fields() {
        let notification = show_message(
            r#"{"notification": {"title": "SOS", "body": "Help nearby"}, "data": {"k": "v"}}"#,
            &Config::default(),
        )
        .unwrap();

        assert_eq!(notification.title, "SOS");
        assert_eq!(notification.options.body, "Help nearby");
        assert_eq!(notification.options.data.get("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn test_message_command_exit_codes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"notification": {{"title": "SOS"}}}}"#).unwrap();
        assert_eq!(run_message(file.path(), OutputMode::Quiet, &Config::default()), exit_codes::SUCCESS);

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "not json").unwrap();
        assert_eq!(run_message(bad.path(), OutputMode::Quiet, &Config::default()), exit_codes::PAYLOAD_ERROR);
    }

    #[test]
    fn test_click_focuses_matching_window() {
        let windows = vec![SimulatedWindow::new("tab-1", "https://sos-prj.web.app/dashboard")];
        let outcome = block_on(replay_click(windows, None, false, &Config::default()));
        let report = outcome.report();

        assert_eq!(effect_names(&report), vec!["closed", "enumerated", "focused"]);
        assert_eq!(report["effects"][2]["window"], "tab-1");
        assert!(report["error"].is_null());
    }

    #[test]
    fn test_click_without_windows_opens_root() {
        let outcome = block_on(replay_click(Vec::new(), None, false, &Config::default()));
        let report = outcome.report();

        assert_eq!(effect_names(&report), vec!["closed", "enumerated", "opened"]);
        assert_eq!(report["effects"][2]["url"], "/");
    }

    #[test]
    fn test_click_without_open_window_capability() {
        let outcome = block_on(replay_click(Vec::new(), None, true, &Config::default()));

        assert!(outcome.result.is_ok());
        assert_eq!(effect_names(&outcome.report()), vec!["closed", "enumerated"]);
    }

    #[test]
    fn test_click_skips_unfocusable_window() {
        let windows = vec![SimulatedWindow::new("tab-1", "https://sos-prj.web.app/").unfocusable()];
        let mut config = Config::default();
        config.schema.notification.launch_path = "https://sos-prj.web.app/".to_string();

        let outcome = block_on(replay_click(windows, None, false, &config));
        assert!(outcome.result.is_ok());
        assert_eq!(effect_names(&outcome.report()), vec!["closed", "enumerated", "opened"]);
    }

    #[test]
    fn test_click_failure_in_report() {
        let outcome = ClickOutcome {
            effects: vec![Effect::Closed { notification: 1 }],
            result: Err(Error::from(GatewayError::Enumerate("clients gone".to_string()))),
        };
        let report = outcome.report();

        assert_eq!(effect_names(&report), vec!["closed"]);
        assert_eq!(report["error"]["code_str"], "E5000");
        assert!(report["error"]["message"].as_str().unwrap().contains("clients gone"));
    }

    #[test]
    fn test_click_command_exit_codes() {
        let code = block_on(run_click(None, None, false, OutputMode::Quiet, &Config::default()));
        assert_eq!(code, exit_codes::SUCCESS);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"id": "tab-1"}}"#).unwrap();
        let code = block_on(run_click(Some(file.path()), None, false, OutputMode::Quiet, &Config::default()));
        assert_eq!(code, exit_codes::PAYLOAD_ERROR);
    }

    #[test]
    fn test_load_windows() {
        assert!(load_windows(None).unwrap().is_empty());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": "tab-1", "url": "https://example.com/home", "focusable": false}}]"#).unwrap();
        let windows = load_windows(Some(file.path())).unwrap();
        assert_eq!(windows, vec![SimulatedWindow::new("tab-1", "https://example.com/home").unfocusable()]);
    }

    #[test]
    fn test_config_command_quiet() {
        assert_eq!(run_config(&Config::default(), OutputMode::Quiet), exit_codes::SUCCESS);
    }

    #[test]
    fn test_describe_effect() {
        assert_eq!(describe_effect(&Effect::Opened { url: "/".to_string() }), "open window at /");
        assert_eq!(describe_effect(&Effect::Closed { notification: 1 }), "close notification #1");
    }
}
