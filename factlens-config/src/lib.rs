//! Loader for workspace configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are attached, and `FACTLENS__`-prefixed
//! environment variables are applied last so they always win
//! (`FACTLENS__CAPTIONS__ATTEMPT_TIMEOUT_SECS=5`). String values may reference
//! other environment variables with `${VAR}`; expansion is recursive up to a
//! fixed depth. Every section is optional and falls back to defaults, so an empty
//! document is a valid configuration.
use config::{Config, ConfigError, Environment, File};
use factlens_common::LogFormat;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const DEFAULT_ENV_PREFIX: &str = "FACTLENS";

#[derive(Debug, Default, Deserialize)]
pub struct FactlensConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub captions: CaptionsConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Caption cascade tuning.
#[derive(Debug, Deserialize)]
pub struct CaptionsConfig {
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
    #[serde(default = "default_min_transcript_chars")]
    pub min_transcript_chars: usize,
    #[serde(default = "default_timedtext_endpoint")]
    pub timedtext_endpoint: String,
    #[serde(default = "default_watch_page_url")]
    pub watch_page_url: String,
    #[serde(default = "default_true")]
    pub use_watch_page: bool,
    /// Replaces the built-in probe order when present.
    #[serde(default)]
    pub probe_matrix: Option<Vec<ProbeSpec>>,
}

impl Default for CaptionsConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_secs: default_attempt_timeout_secs(),
            min_transcript_chars: default_min_transcript_chars(),
            timedtext_endpoint: default_timedtext_endpoint(),
            watch_page_url: default_watch_page_url(),
            use_watch_page: true,
            probe_matrix: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeSpec {
    pub language: String,
    pub kind: ProbeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Manual,
    #[serde(alias = "asr", alias = "auto-generated")]
    Auto,
}

/// YouTube Data API settings for the title/description fallback.
#[derive(Debug, Deserialize)]
pub struct MetadataConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_metadata_endpoint")]
    pub endpoint: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_metadata_endpoint(),
        }
    }
}

impl MetadataConfig {
    /// The API key, unless it is blank or still an unexpanded `${VAR}` placeholder.
    ///
    /// ```
    /// use factlens_config::MetadataConfig;
    ///
    /// let mut cfg = MetadataConfig::default();
    /// cfg.api_key = Some("${YOUTUBE_API_KEY}".into());
    /// assert_eq!(cfg.resolved_api_key(), None);
    /// cfg.api_key = Some("AIza-test".into());
    /// assert_eq!(cfg.resolved_api_key(), Some("AIza-test"));
    /// ```
    pub fn resolved_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && !k.contains("${"))
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub emit_stderr: bool,
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            emit_stderr: false,
            filter: default_log_filter(),
            dir: None,
        }
    }
}

fn default_attempt_timeout_secs() -> u64 {
    8
}
fn default_min_transcript_chars() -> usize {
    50
}
fn default_timedtext_endpoint() -> String {
    "https://www.youtube.com/api/timedtext".into()
}
fn default_watch_page_url() -> String {
    "https://www.youtube.com/watch".into()
}
fn default_metadata_endpoint() -> String {
    "https://www.googleapis.com/youtube/v3/".into()
}
fn default_log_filter() -> String {
    "info".into()
}
fn default_true() -> bool {
    true
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
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

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct FactlensConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env_prefix: String,
}

impl Default for FactlensConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl FactlensConfigLoader {
    /// Start with no file sources; `FACTLENS__` env overrides are applied at load time.
    ///
    /// ```
    /// use factlens_config::FactlensConfigLoader;
    ///
    /// let config = FactlensConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.captions.min_transcript_chars, 50);
    /// assert!(config.captions.probe_matrix.is_none());
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Use a different environment prefix (mainly for tests running in parallel).
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Like [`with_file`](Self::with_file) but a missing file is not an error, so
    /// deployments can rely purely on environment variables.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use factlens_config::{FactlensConfigLoader, ProbeKind};
    ///
    /// let cfg = FactlensConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// captions:
    ///   attempt_timeout_secs: 3
    ///   probe_matrix:
    ///     - { language: "en", kind: "manual" }
    ///     - { language: "de", kind: "asr" }
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.captions.attempt_timeout_secs, 3);
    /// let matrix = cfg.captions.probe_matrix.unwrap();
    /// assert_eq!(matrix[1].kind, ProbeKind::Auto);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    pub fn load(self) -> Result<FactlensConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        // Convert to serde_json::Value first
        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: FactlensConfig =
            serde_json::from_value(v).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("CITY", Some("Winston")), ("STATE", Some("NC"))], || {
            let mut v = json!([
                "hello-$CITY",
                { "loc": "${CITY}-${STATE}" },
                42,
                true,
                null
            ]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!(["hello-Winston", { "loc": "Winston-NC" }, 42, true, null])
            );
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("BAZ", Some("qux")),
                ("BAR", Some("mid-${BAZ}")),
                ("FOO", Some("start-${BAR}-end")),
            ],
            || {
                let mut v = json!("X=${FOO}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles_and_leaves_value_reasonable() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${FACTLENS_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${FACTLENS_DOES_NOT_EXIST}"));
    }

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = FactlensConfigLoader::new()
            .with_env_prefix("FACTLENS_UNIT_EMPTY")
            .load()
            .unwrap();
        assert_eq!(cfg.captions.attempt_timeout_secs, 8);
        assert!(cfg.captions.use_watch_page);
        assert_eq!(cfg.logging.filter, "info");
        assert_eq!(cfg.logging.format, LogFormat::Text);
        assert_eq!(cfg.metadata.resolved_api_key(), None);
    }

    #[test]
    fn blank_api_key_is_unset() {
        let cfg = MetadataConfig {
            api_key: Some("   ".into()),
            ..MetadataConfig::default()
        };
        assert_eq!(cfg.resolved_api_key(), None);
    }
}
