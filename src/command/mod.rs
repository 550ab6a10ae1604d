//! spark-submit command construction
//!
//! Emission order:
//!
//! | # | tokens | when |
//! |---|--------|------|
//! | 1 | `{spark_home}/bin/spark-submit` or `spark-submit` | always |
//! | 2 | `--master {master}` | always |
//! | 3 | `--queue {queue}` | queue resolved |
//! | 4 | `--deploy-mode {mode}` | deploy mode resolved |
//! | 5 | `--conf {key}={value}` | per `conf` entry, key order |
//! | 6 | `--files`, `--py-files`, `--jars` | non-empty |
//! | 7 | `--executor-cores`, `--executor-memory`, `--driver-memory`, `--num-executors`, `--total-executor-cores`, `--class`, `--name`, `--principal`, `--keytab` | set |
//! | 8 | `--verbose` | `verbose` |
//! | 9 | application | always, last |

use std::fmt;

use serde::Serialize;

use crate::job::JobSpec;
use crate::resolver::ResolvedCoordinates;

/// Launcher binary name.
pub const SPARK_SUBMIT: &str = "spark-submit";

/// Ordered argv for one launcher invocation. The first token is the program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SubmissionCommand {
    tokens: Vec<String>,
}

impl SubmissionCommand {
    /// Wrap an argv that was built elsewhere. The first token is the program.
    pub fn from_tokens(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    pub fn program(&self) -> &str {
        self.tokens.first().map(String::as_str).unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        self.tokens.get(1..).unwrap_or_default()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<String> {
        self.tokens
    }

    /// Tokens joined with single spaces, without quoting.
    pub fn to_command_line(&self) -> String {
        self.tokens.join(" ")
    }
}

impl fmt::Display for SubmissionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_command_line())
    }
}

/// Path of the launcher for the given Spark installation.
pub fn launcher_path(spark_home: Option<&str>) -> String {
    match spark_home {
        Some(home) => format!("{}/bin/{}", home.trim_end_matches('/'), SPARK_SUBMIT),
        None => SPARK_SUBMIT.to_string(),
    }
}

/// Build the full argv for `job` against `coords`.
pub fn build_command(job: &JobSpec, coords: &ResolvedCoordinates) -> SubmissionCommand {
    let mut tokens = vec![launcher_path(coords.spark_home.as_deref())];

    push_flag(&mut tokens, "--master", &coords.master);
    if let Some(ref queue) = coords.queue {
        push_flag(&mut tokens, "--queue", queue);
    }
    if let Some(ref mode) = coords.deploy_mode {
        push_flag(&mut tokens, "--deploy-mode", mode);
    }

    for (key, value) in &job.conf {
        push_flag(&mut tokens, "--conf", &format!("{}={}", key, value));
    }

    for (flag, list) in [
        ("--files", &job.files),
        ("--py-files", &job.py_files),
        ("--jars", &job.jars),
    ] {
        if !list.is_empty() {
            push_flag(&mut tokens, flag, list);
        }
    }

    let options = [
        ("--executor-cores", job.executor_cores.map(|n| n.to_string())),
        ("--executor-memory", job.executor_memory.clone()),
        ("--driver-memory", job.driver_memory.clone()),
        ("--num-executors", job.num_executors.map(|n| n.to_string())),
        ("--total-executor-cores", job.total_executor_cores.map(|n| n.to_string())),
        ("--class", job.java_class.clone()),
        ("--name", job.name.clone()),
        ("--principal", job.principal.clone()),
        ("--keytab", job.keytab.clone()),
    ];
    for (flag, value) in options {
        if let Some(value) = value {
            push_flag(&mut tokens, flag, &value);
        }
    }

    if job.verbose {
        tokens.push("--verbose".to_string());
    }

    tokens.push(job.application.clone());

    SubmissionCommand { tokens }
}

fn push_flag(tokens: &mut Vec<String>, flag: &str, value: &str) {
    tokens.push(flag.to_string());
    tokens.push(value.to_string());
}
