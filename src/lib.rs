//! Sparkhook - Spark job submission
//!
//! Resolves a named connection into cluster coordinates, builds the
//! `spark-submit` command line for a job, runs it while relaying its output,
//! and captures the cluster-assigned application id from that output.

pub mod command;
pub mod config;
pub mod driver;
pub mod error;
pub mod job;
pub mod logging;
pub mod process;
pub mod resolver;
pub mod signal;

pub use command::{build_command, SubmissionCommand};
pub use config::{EffectiveConfig, HookConfig};
pub use driver::{SubmissionDriver, SubmissionResult};
pub use error::{SubmitError, SubmitResult};
pub use job::{JobFileError, JobSpec};
pub use process::{ProcessOutcome, ProcessRunner, RunnerConfig, SystemRunner};
pub use resolver::{ConnectionResolver, ResolvedCoordinates};

pub use sparkhook_connections::{
    ConnectionFile, ConnectionProfile, ConnectionStore, InMemoryConnections, StoreError,
};
pub use sparkhook_logscan::{LogScanner, PatternSet, ScanState};
