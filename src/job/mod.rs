//! Job specification
//!
//! A [`JobSpec`] names the application to run plus every option that ends
//! up on the `spark-submit` command line. It can be built in code or loaded
//! from a TOML job file:
//!
//! ```toml
//! application = "test_application.py"
//! conn_id = "spark_yarn_cluster"
//! executor_cores = 4
//! executor_memory = "22g"
//! verbose = true
//!
//! [conf]
//! "parquet.compression" = "SNAPPY"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a job file.
#[derive(Debug, Error)]
pub enum JobFileError {
    #[error("failed to read job file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse job file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("job file must set a non-empty 'application'")]
    MissingApplication,
}

/// Everything needed to build one `spark-submit` invocation.
///
/// Optional fields left as `None` (or empty, for the comma-joined lists)
/// contribute nothing to the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobSpec {
    /// Application jar or script, passed as the trailing positional argument
    pub application: String,

    /// Connection to submit through. `None` uses the configured default;
    /// `Some("")` means plain `yarn`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conn_id: Option<String>,

    /// Arbitrary Spark properties, one `--conf key=value` each
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub conf: BTreeMap<String, String>,

    /// Comma-separated files placed in each executor's working directory
    #[serde(skip_serializing_if = "String::is_empty")]
    pub files: String,

    /// Comma-separated .zip, .egg or .py files for the Python path
    #[serde(skip_serializing_if = "String::is_empty")]
    pub py_files: String,

    /// Comma-separated jars for the driver and executor classpaths
    #[serde(skip_serializing_if = "String::is_empty")]
    pub jars: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub executor_cores: Option<u32>,

    /// e.g. `22g`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executor_memory: Option<String>,

    /// e.g. `3g`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_memory: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_executors: Option<u32>,

    /// Standalone and Mesos only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_executor_cores: Option<u32>,

    /// Main class for Java/Scala applications
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_class: Option<String>,

    /// Application name shown in the cluster UI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Kerberos principal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,

    /// Path to the keytab for `principal`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keytab: Option<String>,

    pub verbose: bool,
}

impl JobSpec {
    /// A job that runs `application` with no extra options.
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            ..Self::default()
        }
    }

    /// Load a job from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, JobFileError> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse a job from a TOML string.
    pub fn parse(s: &str) -> Result<Self, JobFileError> {
        let job: JobSpec = toml::from_str(s)?;
        if job.application.trim().is_empty() {
            return Err(JobFileError::MissingApplication);
        }
        Ok(job)
    }

    pub fn with_conn_id(mut self, conn_id: impl Into<String>) -> Self {
        self.conn_id = Some(conn_id.into());
        self
    }

    pub fn with_conf(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.conf.insert(key.into(), value.into());
        self
    }
}
