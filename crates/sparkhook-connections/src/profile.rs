//! Connection profile record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Id of the built-in connection seeded into every store.
pub const DEFAULT_CONN_ID: &str = "spark_default";

/// Host value that means "the YARN cluster from the local Hadoop config".
pub const YARN_HOST: &str = "yarn";

/// Queue used for the plain `yarn` master when the profile names none.
pub const DEFAULT_QUEUE: &str = "root.default";

/// `extra` key holding the scheduler queue.
pub const EXTRA_QUEUE: &str = "queue";

/// `extra` key holding the deploy mode (`client` or `cluster`).
pub const EXTRA_DEPLOY_MODE: &str = "deploy-mode";

/// `extra` key holding a Spark installation directory.
pub const EXTRA_SPARK_HOME: &str = "spark-home";

/// A named set of cluster coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Unique identifier (must be unique across a store)
    pub conn_id: String,

    /// Protocol-qualified master, e.g. `yarn://yarn-master` or `mesos://host`
    pub host: String,

    /// Optional master port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Free-form metadata (`queue`, `deploy-mode`, `spark-home`, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl ConnectionProfile {
    /// Create a profile with no port and no metadata.
    pub fn new(conn_id: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            conn_id: conn_id.into(),
            host: host.into(),
            port: None,
            extra: BTreeMap::new(),
        }
    }

    /// Set the master port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Add one metadata entry.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Look up a metadata value.
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }

    /// The stock `spark_default` profile: plain YARN on the default queue.
    pub fn spark_default() -> Self {
        Self::new(DEFAULT_CONN_ID, YARN_HOST).with_extra(EXTRA_QUEUE, DEFAULT_QUEUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_helpers() {
        let profile = ConnectionProfile::new("etl", "yarn://yarn-master")
            .with_port(8032)
            .with_extra("queue", "root.etl");

        assert_eq!(profile.port, Some(8032));
        assert_eq!(profile.extra("queue"), Some("root.etl"));
        assert_eq!(profile.extra("deploy-mode"), None);
    }

    #[test]
    fn test_spark_default() {
        let profile = ConnectionProfile::spark_default();
        assert_eq!(profile.conn_id, "spark_default");
        assert_eq!(profile.host, "yarn");
        assert_eq!(profile.port, None);
        assert_eq!(profile.extra(EXTRA_QUEUE), Some("root.default"));
    }
}
