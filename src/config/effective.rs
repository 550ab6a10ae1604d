//! Effective configuration with provenance
//!
//! [`EffectiveConfig`] is the merged JSON value plus where each layer came
//! from; [`HookConfig`] is its typed, validated form.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sparkhook_connections::{ConnectionFile, StoreError};
use sparkhook_logscan::PatternSet;

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use crate::process::RunnerConfig;

/// Environment variable naming an alternative host config file
pub const CONFIG_ENV_VAR: &str = "SPARKHOOK_CONFIG";

/// Longest allowed overall timeout (one day)
const MAX_TIMEOUT_SECONDS: u64 = 86_400;

/// Longest allowed termination grace period
const MAX_GRACE_SECONDS: u64 = 300;

/// Keys whose values are hidden when the config is displayed
const SECRET_KEYS: &[&str] = &["password", "token", "secret", "credential", "api_key"];

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Host,
    Cli,
}

/// A contributing config source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Merged configuration with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// The merged configuration object
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

impl EffectiveConfig {
    /// Build effective config from layers
    pub fn build(
        host_config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![BuiltinDefaults::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
        }];

        if let Some(path) = host_config_path {
            if path.exists() {
                layers.push(Self::load_toml_file(path)?);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::Host,
                    path: Some(path.to_string_lossy().to_string()),
                });
            }
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
            });
        }

        Ok(Self {
            created_at: Utc::now(),
            config: merge_layers(layers),
            sources,
        })
    }

    /// `$SPARKHOOK_CONFIG`, else `~/.config/sparkhook/config.toml`
    pub fn default_host_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join(".config/sparkhook/config.toml"))
    }

    fn load_toml_file(path: &Path) -> Result<Value, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let toml_value: toml::Value = toml::from_str(&contents).map_err(|e| {
            ConfigError::ParseError(format!("{}: TOML parse error: {}", path.display(), e))
        })?;

        Ok(Self::toml_to_json(toml_value))
    }

    fn toml_to_json(toml: toml::Value) -> Value {
        match toml {
            toml::Value::String(s) => Value::String(s),
            toml::Value::Integer(i) => Value::Number(i.into()),
            toml::Value::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Self::toml_to_json).collect())
            }
            toml::Value::Table(table) => Value::Object(
                table
                    .into_iter()
                    .map(|(k, v)| (k, Self::toml_to_json(v)))
                    .collect(),
            ),
        }
    }

    /// Deserialize and validate the merged value.
    pub fn hook_config(&self) -> Result<HookConfig, ConfigError> {
        let config: HookConfig = serde_json::from_value(self.config.clone())
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Copy of the merged value with secret-looking values replaced, plus
    /// the dotted paths that were redacted.
    pub fn redacted(&self) -> (Value, Vec<String>) {
        let mut value = self.config.clone();
        let mut redactions = Vec::new();
        redact_recursive(&mut value, String::new(), &mut redactions);
        (value, redactions)
    }

    /// Get a config value by dot-separated path
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }
}

fn redact_recursive(value: &mut Value, path: String, redactions: &mut Vec<String>) {
    if let Value::Object(map) = value {
        for (key, val) in map.iter_mut() {
            let current_path = if path.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", path, key)
            };

            let key_lower = key.to_lowercase();
            let is_secret = SECRET_KEYS.iter().any(|s| key_lower.contains(s));

            if is_secret && !val.is_object() && !val.is_array() {
                *val = Value::String("[REDACTED]".to_string());
                redactions.push(current_path);
            } else {
                redact_recursive(val, current_path, redactions);
            }
        }
    }
}

/// Typed configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookConfig {
    /// Connection for jobs that name none
    pub default_conn_id: String,

    /// Connections file; `None` means `~/.config/sparkhook/connections.toml`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections_path: Option<String>,

    pub scanner: ScannerConfig,

    pub process: ProcessConfig,
}

/// `[scanner]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScannerConfig {
    /// Marker patterns, each with one capture group holding the id
    pub patterns: Vec<String>,
}

/// `[process]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessConfig {
    /// Overall launcher timeout, 0 = none
    pub timeout_seconds: u64,

    /// SIGTERM to SIGKILL grace
    pub termination_grace_seconds: u64,

    /// Extra environment for the launcher (e.g. HADOOP_CONF_DIR)
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Launcher working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
}

impl HookConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.process.timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(ConfigError::ValidationError(format!(
                "process.timeout_seconds must be at most {}",
                MAX_TIMEOUT_SECONDS
            )));
        }

        let grace = self.process.termination_grace_seconds;
        if grace == 0 || grace > MAX_GRACE_SECONDS {
            return Err(ConfigError::ValidationError(format!(
                "process.termination_grace_seconds must be in (0, {}]",
                MAX_GRACE_SECONDS
            )));
        }

        self.pattern_set()?;
        Ok(())
    }

    /// Compile the scanner patterns.
    pub fn pattern_set(&self) -> Result<PatternSet, ConfigError> {
        PatternSet::new(&self.scanner.patterns)
            .map_err(|e| ConfigError::ValidationError(format!("scanner.patterns: {}", e)))
    }

    /// Process runner settings.
    pub fn runner_config(&self) -> RunnerConfig {
        let timeout = match self.process.timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        RunnerConfig {
            timeout,
            termination_grace: Duration::from_secs(self.process.termination_grace_seconds),
            env: self.process.env.clone(),
            working_dir: self.process.working_dir.as_deref().map(expand_home),
            ..RunnerConfig::default()
        }
    }

    /// Configured connections file with `~/` expanded.
    pub fn connections_path(&self) -> Option<PathBuf> {
        self.connections_path.as_deref().map(expand_home)
    }

    /// Load the connection store, seeded with `spark_default`.
    ///
    /// An explicitly named file (argument or `connections_path`) must exist;
    /// a missing file at the default location yields just the defaults.
    pub fn load_connections(&self, path: Option<&Path>) -> Result<ConnectionFile, StoreError> {
        let explicit = path.map(Path::to_path_buf).or_else(|| self.connections_path());
        let file = match explicit {
            Some(path) => ConnectionFile::load(&path)?,
            None => match ConnectionFile::load_default() {
                Ok(file) => file,
                Err(StoreError::NotFound(_)) => ConnectionFile::default(),
                Err(e) => return Err(e),
            },
        };
        Ok(file.with_defaults())
    }
}

impl Default for HookConfig {
    fn default() -> Self {
        let defaults = BuiltinDefaults::default();
        Self {
            default_conn_id: defaults.default_conn_id,
            connections_path: None,
            scanner: ScannerConfig {
                patterns: defaults.scanner_patterns,
            },
            process: ProcessConfig {
                timeout_seconds: defaults.timeout_seconds,
                termination_grace_seconds: defaults.termination_grace_seconds,
                env: BTreeMap::new(),
                working_dir: None,
            },
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_only() {
        let effective = EffectiveConfig::build(None, None).unwrap();
        let config = effective.hook_config().unwrap();

        assert_eq!(config, HookConfig::default());
        assert_eq!(effective.sources.len(), 1);
        assert_eq!(effective.sources[0].origin, ConfigOrigin::Builtin);
    }

    #[test]
    fn test_host_file_layer() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "default_conn_id = \"spark_yarn_cluster\"").unwrap();
        writeln!(temp, "connections_path = \"/etc/sparkhook/connections.toml\"").unwrap();
        writeln!(temp, "[process]").unwrap();
        writeln!(temp, "timeout_seconds = 3600").unwrap();
        writeln!(temp, "[process.env]").unwrap();
        writeln!(temp, "HADOOP_CONF_DIR = \"/etc/hadoop/conf\"").unwrap();

        let effective = EffectiveConfig::build(Some(temp.path()), None).unwrap();
        let config = effective.hook_config().unwrap();

        assert_eq!(config.default_conn_id, "spark_yarn_cluster");
        assert_eq!(
            config.connections_path(),
            Some(PathBuf::from("/etc/sparkhook/connections.toml"))
        );
        assert_eq!(config.process.timeout_seconds, 3600);
        // untouched default survives the merge
        assert_eq!(config.process.termination_grace_seconds, 10);
        assert_eq!(
            config.process.env.get("HADOOP_CONF_DIR").map(String::as_str),
            Some("/etc/hadoop/conf")
        );
        assert_eq!(effective.sources.len(), 2);
        assert_eq!(effective.sources[1].origin, ConfigOrigin::Host);
    }

    #[test]
    fn test_missing_host_file_skipped() {
        let effective =
            EffectiveConfig::build(Some(Path::new("/nonexistent/sparkhook.toml")), None).unwrap();
        assert_eq!(effective.sources.len(), 1);
    }

    #[test]
    fn test_cli_overrides_host() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[process]").unwrap();
        writeln!(temp, "timeout_seconds = 3600").unwrap();

        let cli = serde_json::json!({"process": {"timeout_seconds": 60}});
        let config = EffectiveConfig::build(Some(temp.path()), Some(cli))
            .unwrap()
            .hook_config()
            .unwrap();

        assert_eq!(config.process.timeout_seconds, 60);
    }

    #[test]
    fn test_invalid_toml() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[process").unwrap();

        let result = EffectiveConfig::build(Some(temp.path()), None);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let cli = serde_json::json!({"proccess": {"timeout_seconds": 60}});
        let result = EffectiveConfig::build(None, Some(cli)).unwrap().hook_config();
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validation_grace() {
        let cli = serde_json::json!({"process": {"termination_grace_seconds": 0}});
        let result = EffectiveConfig::build(None, Some(cli)).unwrap().hook_config();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("termination_grace_seconds"));
    }

    #[test]
    fn test_validation_timeout() {
        let cli = serde_json::json!({"process": {"timeout_seconds": 100_000}});
        let result = EffectiveConfig::build(None, Some(cli)).unwrap().hook_config();
        assert!(result.unwrap_err().to_string().contains("timeout_seconds"));
    }

    #[test]
    fn test_validation_patterns() {
        let cli = serde_json::json!({"scanner": {"patterns": ["no capture group"]}});
        let result = EffectiveConfig::build(None, Some(cli)).unwrap().hook_config();
        assert!(result.unwrap_err().to_string().contains("scanner.patterns"));

        let cli = serde_json::json!({"scanner": {"patterns": []}});
        let result = EffectiveConfig::build(None, Some(cli)).unwrap().hook_config();
        assert!(result.is_err());
    }

    #[test]
    fn test_runner_config() {
        let cli = serde_json::json!({"process": {"timeout_seconds": 90, "termination_grace_seconds": 5}});
        let runner = EffectiveConfig::build(None, Some(cli))
            .unwrap()
            .hook_config()
            .unwrap()
            .runner_config();

        assert_eq!(runner.timeout, Some(Duration::from_secs(90)));
        assert_eq!(runner.termination_grace, Duration::from_secs(5));

        let runner = HookConfig::default().runner_config();
        assert_eq!(runner.timeout, None);
    }

    #[test]
    fn test_load_connections_explicit() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[[connection]]").unwrap();
        writeln!(temp, "conn_id = \"spark_k8s\"").unwrap();
        writeln!(temp, "host = \"k8s://https://k8s-master\"").unwrap();

        let store = HookConfig::default()
            .load_connections(Some(temp.path()))
            .unwrap();
        assert!(store.get("spark_k8s").is_some());
        assert!(store.get("spark_default").is_some());

        let missing = HookConfig::default().load_connections(Some(Path::new("/nonexistent/c.toml")));
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_env_secret_redaction() {
        let cli = serde_json::json!({
            "process": {"env": {"AWS_SECRET_ACCESS_KEY": "abc", "HADOOP_CONF_DIR": "/etc/hadoop"}}
        });
        let effective = EffectiveConfig::build(None, Some(cli)).unwrap();
        let (value, redactions) = effective.redacted();

        assert_eq!(value["process"]["env"]["AWS_SECRET_ACCESS_KEY"], "[REDACTED]");
        assert_eq!(value["process"]["env"]["HADOOP_CONF_DIR"], "/etc/hadoop");
        assert_eq!(redactions, vec!["process.env.AWS_SECRET_ACCESS_KEY"]);
        // the merged value itself is untouched
        assert_eq!(
            effective.get("process.env.AWS_SECRET_ACCESS_KEY"),
            Some(&Value::String("abc".to_string()))
        );
    }
}
