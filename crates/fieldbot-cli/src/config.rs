//! Robot configuration, read once at startup from a `.toml` or `.json` file.
//!
//! Every field has a default.  Older JSON settings files written with
//! upper-case keys (`ARDUINO_DEV`, `ACTIONS`, …) are accepted as-is.

use std::path::Path;
use std::time::Duration;

use fieldbot_runtime::{ActionTable, Backoff, LoopConfig, RetryPolicy};
use fieldbot_types::FieldError;
use serde::{Deserialize, Serialize};

/// How the delay between controller reads grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

/// `[retry]` table: bound on polling the controller for its status line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total reads per command, first one included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
    #[serde(default)]
    pub backoff: BackoffKind,
    /// Cap for exponential backoff.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_retry_delay_ms(),
            backoff: BackoffKind::default(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Everything the robot needs to start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// WebSocket URL of the decision service.
    #[serde(default = "default_decision_url", alias = "ZMQ_ADDR")]
    pub decision_url: String,

    /// Deadline for each decision-service reply, in milliseconds.
    #[serde(default = "default_reply_timeout_ms", alias = "ZMQ_TIMEOUT")]
    pub reply_timeout_ms: u64,

    /// Serial device of the actuation controller.
    #[serde(default = "default_serial_device", alias = "ARDUINO_DEV")]
    pub serial_device: String,

    #[serde(default = "default_serial_baud", alias = "ARDUINO_BAUD")]
    pub serial_baud: u32,

    /// Per-read serial timeout in seconds (fractions allowed).
    #[serde(default = "default_serial_timeout_secs", alias = "ARDUINO_TIMEOUT")]
    pub serial_timeout_secs: f64,

    #[serde(default, alias = "CAMERA_INDEX")]
    pub camera_index: i32,

    /// Buffered frames discarded before each capture.
    #[serde(default = "default_flush_count", alias = "FLUSH_COUNT")]
    pub flush_count: usize,

    /// Log at `debug` instead of `info`.
    #[serde(default, alias = "VERBOSE")]
    pub verbose: bool,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Action identifier → controller payload.
    #[serde(default, alias = "ACTIONS")]
    pub actions: ActionTable,
}

/// Longest reply wait accepted from a configuration file (one hour).
const MAX_REPLY_TIMEOUT_MS: u64 = 60 * 60 * 1000;
/// Most frames a capture may discard before the one it keeps.
const MAX_FLUSH_COUNT: usize = 10_000;

fn default_decision_url() -> String {
    "ws://127.0.0.1:1980".to_string()
}
fn default_reply_timeout_ms() -> u64 {
    1000
}
fn default_serial_device() -> String {
    "/dev/ttyACM0".to_string()
}
fn default_serial_baud() -> u32 {
    9600
}
fn default_serial_timeout_secs() -> f64 {
    0.1
}
fn default_flush_count() -> usize {
    30
}
fn default_max_attempts() -> u32 {
    5
}
fn default_retry_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    4000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            decision_url: default_decision_url(),
            reply_timeout_ms: default_reply_timeout_ms(),
            serial_device: default_serial_device(),
            serial_baud: default_serial_baud(),
            serial_timeout_secs: default_serial_timeout_secs(),
            camera_index: 0,
            flush_count: default_flush_count(),
            verbose: false,
            retry: RetryConfig::default(),
            actions: ActionTable::new(),
        }
    }
}

impl Config {
    /// Reject settings the loop cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), FieldError> {
        // The WebSocket client is built without TLS.
        if !self.decision_url.starts_with("ws://") {
            return Err(FieldError::Config(format!(
                "decision_url must be a ws:// URL, got {:?}",
                self.decision_url
            )));
        }
        if self.reply_timeout_ms == 0 {
            return Err(FieldError::Config("reply_timeout_ms must be greater than zero".to_string()));
        }
        if self.reply_timeout_ms > MAX_REPLY_TIMEOUT_MS {
            return Err(FieldError::Config(format!(
                "reply_timeout_ms must be at most {MAX_REPLY_TIMEOUT_MS}, got {}",
                self.reply_timeout_ms
            )));
        }
        if self.flush_count > MAX_FLUSH_COUNT {
            return Err(FieldError::Config(format!(
                "flush_count must be at most {MAX_FLUSH_COUNT}, got {}",
                self.flush_count
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(FieldError::Config("retry.max_attempts must be at least 1".to_string()));
        }
        if self.actions.is_empty() {
            return Err(FieldError::Config("the action table is empty".to_string()));
        }
        self.serial_timeout()?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`FieldError::Config`] for a negative or non-finite value.
    pub fn serial_timeout(&self) -> Result<Duration, FieldError> {
        Duration::try_from_secs_f64(self.serial_timeout_secs).map_err(|e| {
            FieldError::Config(format!(
                "serial_timeout_secs = {}: {e}",
                self.serial_timeout_secs
            ))
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            retry_delay: Duration::from_millis(self.retry.delay_ms),
            backoff: match self.retry.backoff {
                BackoffKind::Fixed => Backoff::Fixed,
                BackoffKind::Exponential => Backoff::Exponential {
                    max_delay: Duration::from_millis(self.retry.max_delay_ms),
                },
            },
        }
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            reply_timeout: Duration::from_millis(self.reply_timeout_ms),
            flush_count: self.flush_count,
            retry: self.retry_policy(),
        }
    }

    pub fn action_table(&self) -> ActionTable {
        self.actions.clone()
    }
}

/// Load, apply `FIELDBOT_*` overrides, and validate.
///
/// Files ending in `.json` are parsed as JSON; anything else as TOML.
///
/// # Errors
///
/// Returns [`FieldError::Config`] if the file cannot be read or parsed, or
/// fails validation.
pub fn load_from(path: &Path) -> Result<Config, FieldError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| FieldError::Config(format!("failed to read {}: {e}", path.display())))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let mut cfg = parse(&raw, is_json)?;
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

pub(crate) fn parse(raw: &str, is_json: bool) -> Result<Config, FieldError> {
    if is_json {
        serde_json::from_str(raw).map_err(|e| FieldError::Config(format!("invalid JSON config: {e}")))
    } else {
        toml::from_str(raw).map_err(|e| FieldError::Config(format!("invalid TOML config: {e}")))
    }
}

/// Apply `FIELDBOT_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `FIELDBOT_DECISION_URL` | `decision_url` |
/// | `FIELDBOT_SERIAL_DEVICE` | `serial_device` |
/// | `FIELDBOT_REPLY_TIMEOUT_MS` | `reply_timeout_ms` |
/// | `FIELDBOT_VERBOSE` | `verbose` (`1`, `true` or `yes`) |
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides_from(cfg, |key| std::env::var(key).ok());
}

/// Same as [`apply_env_overrides`] with an injectable lookup, so tests do
/// not have to mutate the process environment.
pub(crate) fn apply_overrides_from(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("FIELDBOT_DECISION_URL") {
        cfg.decision_url = v;
    }
    if let Some(v) = lookup("FIELDBOT_SERIAL_DEVICE") {
        cfg.serial_device = v;
    }
    if let Some(v) = lookup("FIELDBOT_REPLY_TIMEOUT_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.reply_timeout_ms = ms;
    }
    if let Some(v) = lookup("FIELDBOT_VERBOSE") {
        cfg.verbose = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldbot_types::{ActionId, Literal};
    use std::collections::HashMap;
    use std::io::Write;

    const TOML_CONFIG: &str = r#"
decision_url = "ws://10.0.0.2:1980"
reply_timeout_ms = 2500
serial_device = "/dev/ttyUSB1"
serial_baud = 115200
flush_count = 10

[retry]
max_attempts = 8
delay_ms = 100
backoff = "exponential"
max_delay_ms = 800

[actions]
advance = { left = 100, right = 100 }
stop = "S"
"#;

    const LEGACY_JSON: &str = r#"{
        "ZMQ_ADDR": "ws://192.168.0.10:1980",
        "ZMQ_TIMEOUT": 5000,
        "ARDUINO_DEV": "/dev/ttyACM1",
        "ARDUINO_BAUD": 9600,
        "ARDUINO_TIMEOUT": 0.5,
        "CAMERA_INDEX": 1,
        "VERBOSE": true,
        "ACTIONS": {"forward": {"left": 120, "right": 120}, "turn": "L"}
    }"#;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("temp file");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.flush_count, 30);
        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.retry_policy(), RetryPolicy::default());
        // An empty action table is not runnable.
        assert!(matches!(cfg.validate(), Err(FieldError::Config(_))));
    }

    #[test]
    fn loads_toml_file() {
        let file = write_temp(".toml", TOML_CONFIG);
        let cfg = load_from(file.path()).expect("load");
        assert_eq!(cfg.decision_url, "ws://10.0.0.2:1980");
        assert_eq!(cfg.serial_baud, 115200);

        let lc = cfg.loop_config();
        assert_eq!(lc.reply_timeout, Duration::from_millis(2500));
        assert_eq!(lc.flush_count, 10);
        assert_eq!(lc.retry.max_attempts, 8);
        assert_eq!(
            lc.retry.backoff,
            Backoff::Exponential {
                max_delay: Duration::from_millis(800)
            }
        );

        let actions = cfg.action_table();
        let advance = actions.get(&ActionId::from("advance")).expect("advance");
        assert_eq!(advance.to_wire(), "{'left': 100, 'right': 100}");
        assert_eq!(actions["stop"].payload(), &Literal::Str("S".into()));
    }

    #[test]
    fn loads_legacy_json_keys() {
        let file = write_temp(".json", LEGACY_JSON);
        let cfg = load_from(file.path()).expect("load");
        assert_eq!(cfg.decision_url, "ws://192.168.0.10:1980");
        assert_eq!(cfg.reply_timeout_ms, 5000);
        assert_eq!(cfg.serial_device, "/dev/ttyACM1");
        assert_eq!(cfg.serial_timeout().unwrap(), Duration::from_millis(500));
        assert_eq!(cfg.camera_index, 1);
        assert!(cfg.verbose);
        assert_eq!(cfg.flush_count, 30);
        assert_eq!(cfg.actions["forward"].to_wire(), "{'left': 120, 'right': 120}");
        assert_eq!(cfg.actions["turn"].to_wire(), "'L'");
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let err = load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, FieldError::Config(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn malformed_file_is_config_error() {
        let file = write_temp(".json", "{ not json");
        assert!(matches!(load_from(file.path()), Err(FieldError::Config(_))));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut base = parse(TOML_CONFIG, false).unwrap();
        assert!(base.validate().is_ok());

        base.retry.max_attempts = 0;
        assert!(base.validate().is_err());
        base.retry.max_attempts = 1;

        base.reply_timeout_ms = 0;
        assert!(base.validate().is_err());
        base.reply_timeout_ms = u64::MAX;
        let err = base.validate().unwrap_err();
        assert!(err.to_string().contains("reply_timeout_ms"));
        base.reply_timeout_ms = MAX_REPLY_TIMEOUT_MS;
        assert!(base.validate().is_ok());
        base.reply_timeout_ms = 10;

        base.flush_count = usize::MAX;
        let err = base.validate().unwrap_err();
        assert!(err.to_string().contains("flush_count"));
        base.flush_count = 0;
        assert!(base.validate().is_ok());

        base.serial_timeout_secs = -1.0;
        assert!(base.validate().is_err());
        base.serial_timeout_secs = 0.0;

        base.decision_url = "tcp://10.0.0.2:1980".to_string();
        let err = base.validate().unwrap_err();
        assert!(err.to_string().contains("ws://"));
    }

    #[test]
    fn overrides_replace_fields() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("FIELDBOT_DECISION_URL", "ws://override:9000"),
            ("FIELDBOT_SERIAL_DEVICE", "/dev/ttyS3"),
            ("FIELDBOT_REPLY_TIMEOUT_MS", "250"),
            ("FIELDBOT_VERBOSE", "TRUE"),
        ]);
        let mut cfg = Config::default();
        apply_overrides_from(&mut cfg, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.decision_url, "ws://override:9000");
        assert_eq!(cfg.serial_device, "/dev/ttyS3");
        assert_eq!(cfg.reply_timeout_ms, 250);
        assert!(cfg.verbose);
    }

    #[test]
    fn overrides_ignore_unparseable_timeout() {
        let mut cfg = Config::default();
        apply_overrides_from(&mut cfg, |k| {
            (k == "FIELDBOT_REPLY_TIMEOUT_MS").then(|| "soon".to_string())
        });
        assert_eq!(cfg.reply_timeout_ms, 1000);
    }

    #[test]
    fn env_override_applies_on_load() {
        // SAFETY: no other test in this crate reads or writes this env-var.
        unsafe { std::env::set_var("FIELDBOT_VERBOSE", "yes") };
        let file = write_temp(".toml", TOML_CONFIG);
        let cfg = load_from(file.path()).expect("load");
        unsafe { std::env::remove_var("FIELDBOT_VERBOSE") };
        assert!(cfg.verbose);
    }
}
