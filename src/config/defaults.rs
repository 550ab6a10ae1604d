//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};
use sparkhook_connections::DEFAULT_CONN_ID;
use sparkhook_logscan::DEFAULT_PATTERNS;

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Connection for jobs that name none (default: "spark_default")
    pub default_conn_id: String,

    /// Application id marker patterns
    pub scanner_patterns: Vec<String>,

    /// Overall launcher timeout in seconds, 0 = none (default: 0)
    pub timeout_seconds: u64,

    /// SIGTERM to SIGKILL grace in seconds (default: 10)
    pub termination_grace_seconds: u64,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            default_conn_id: DEFAULT_CONN_ID.to_string(),
            scanner_patterns: DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect(),
            timeout_seconds: 0,
            termination_grace_seconds: 10,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "default_conn_id": self.default_conn_id,
            "scanner": {
                "patterns": self.scanner_patterns
            },
            "process": {
                "timeout_seconds": self.timeout_seconds,
                "termination_grace_seconds": self.termination_grace_seconds,
                "env": {}
            }
        })
    }
}
