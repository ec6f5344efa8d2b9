//! Loader for the verification runner's configuration.
//!
//! Configuration comes from an optional `calcheck.yaml` merged with
//! `CALCHECK`-prefixed environment variables; `${VAR}` placeholders inside
//! values are expanded before the merged tree is materialised into typed
//! structs. Every field carries a default, so an empty configuration is
//! valid and runs the checklist with the built-in defaults.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

const ENV_EXPANSION_DEPTH_LIMIT: usize = 8;

/// Top-level configuration for a verification run.
#[derive(Debug, Clone, Deserialize)]
pub struct CalcheckConfig {
    pub version: Option<String>,
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub waits: WaitConfig,
    #[serde(default)]
    pub screenshot: ScreenshotConfig,
}

impl Default for CalcheckConfig {
    fn default() -> Self {
        Self {
            version: None,
            target: TargetConfig::default(),
            browser: BrowserConfig::default(),
            waits: WaitConfig::default(),
            screenshot: ScreenshotConfig::default(),
        }
    }
}

/// The application under verification.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_target_url")]
    pub url: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: default_target_url(),
        }
    }
}

/// Browser session parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// WebDriver endpoint (chromedriver).
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: default_headless(),
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

/// Bounded wait windows used by the checklist.
#[derive(Debug, Clone, Deserialize)]
pub struct WaitConfig {
    /// Upper bound for each text-marker wait, in seconds.
    #[serde(default = "default_marker_secs")]
    pub marker_secs: u64,
    /// Upper bound for the selection-confirmation wait, in milliseconds.
    #[serde(default = "default_selection_ms")]
    pub selection_ms: u64,
    /// Poll interval for condition waits, in milliseconds.
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            marker_secs: default_marker_secs(),
            selection_ms: default_selection_ms(),
            poll_ms: default_poll_ms(),
        }
    }
}

/// Where the screenshot artifact is written.
#[derive(Debug, Clone, Deserialize)]
pub struct ScreenshotConfig {
    #[serde(default = "default_screenshot_path")]
    pub path: String,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            path: default_screenshot_path(),
        }
    }
}

fn default_target_url() -> String {
    "http://localhost:3000".into()
}
fn default_webdriver_url() -> String {
    "http://localhost:9515".into()
}
fn default_headless() -> bool {
    true
}
fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    720
}
fn default_marker_secs() -> u64 {
    30
}
fn default_selection_ms() -> u64 {
    2000
}
fn default_poll_ms() -> u64 {
    100
}
fn default_screenshot_path() -> String {
    "verification/calendar_verification.png".into()
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..ENV_EXPANSION_DEPTH_LIMIT {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct CalcheckConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for CalcheckConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CalcheckConfigLoader {
    /// Start with sensible defaults: `CALCHECK`-prefixed env overrides, no file.
    ///
    /// ```
    /// use calcheck_config::CalcheckConfigLoader;
    ///
    /// let config = CalcheckConfigLoader::new().load().expect("valid config");
    ///
    /// assert_eq!(config.target.url, "http://localhost:3000");
    /// assert!(config.browser.headless);
    /// assert_eq!(config.screenshot.path, "verification/calendar_verification.png");
    /// ```
    pub fn new() -> Self {
        // try_parsing lets numeric/bool fields be overridden from the
        // environment, e.g. CALCHECK__BROWSER__HEADLESS=false.
        let builder = Config::builder().add_source(
            Environment::with_prefix("CALCHECK")
                .try_parsing(true)
                .separator("__"),
        );
        Self { builder }
    }

    /// Attach a config file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self.builder.add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Allow tests to merge inline YAML snippets.
    ///
    /// ```
    /// use calcheck_config::CalcheckConfigLoader;
    ///
    /// let cfg = CalcheckConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// version: "1"
    /// target:
    ///   url: "http://127.0.0.1:8080"
    /// waits:
    ///   selection_ms: 750
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.version.as_deref(), Some("1"));
    /// assert_eq!(cfg.target.url, "http://127.0.0.1:8080");
    /// assert_eq!(cfg.waits.selection_ms, 750);
    /// assert_eq!(cfg.waits.poll_ms, 100);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into typed config.
    ///
    /// `${VAR}` placeholders are expanded recursively (bounded depth, so
    /// cyclic definitions terminate) before the typed structs are built.
    pub fn load(self) -> Result<CalcheckConfig, ConfigError> {
        let cfg = self.builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: CalcheckConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use temp_env;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("TARGET_HOST", Some("cal.internal"), || {
            let mut v = json!("http://${TARGET_HOST}:3000");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("http://cal.internal:3000"));
        });
    }

    #[test]
    fn expands_inside_nested_objects() {
        temp_env::with_vars(
            [("SHOT_DIR", Some("verification")), ("SHOT_NAME", Some("cal"))],
            || {
                let mut v = json!({
                    "screenshot": { "path": "${SHOT_DIR}/${SHOT_NAME}.png" },
                    "waits": { "poll_ms": 100 }
                });
                expand_env_in_value(&mut v);
                assert_eq!(
                    v,
                    json!({
                        "screenshot": { "path": "verification/cal.png" },
                        "waits": { "poll_ms": 100 }
                    })
                );
            },
        );
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("PORT", Some("3000")),
                ("HOST", Some("localhost:${PORT}")),
                ("URL", Some("http://${HOST}")),
            ],
            || {
                let mut v = json!("${URL}/calendar");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("http://localhost:3000/calendar"));
            },
        );
    }

    #[test]
    fn stops_on_cycles_and_terminates() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("url=${A}");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("url="));
            // The cycle leaves an unresolved placeholder behind.
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("path-${CALCHECK_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("path-${CALCHECK_DOES_NOT_EXIST}"));
    }

    #[test]
    fn defaults_cover_every_field() {
        let cfg = CalcheckConfig::default();
        assert_eq!(cfg.target.url, "http://localhost:3000");
        assert_eq!(cfg.browser.webdriver_url, "http://localhost:9515");
        assert!(cfg.browser.headless);
        assert_eq!((cfg.browser.window_width, cfg.browser.window_height), (1280, 720));
        assert_eq!(cfg.waits.marker_secs, 30);
        assert_eq!(cfg.waits.selection_ms, 2000);
        assert_eq!(cfg.waits.poll_ms, 100);
        assert_eq!(cfg.screenshot.path, "verification/calendar_verification.png");
    }
}
