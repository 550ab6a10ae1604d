//! Connection resolution
//!
//! Turns a connection id into the coordinates `spark-submit` needs:
//! master, queue, deploy mode and an optional Spark installation directory.

use serde::{Deserialize, Serialize};
use sparkhook_connections::{
    ConnectionProfile, ConnectionStore, DEFAULT_QUEUE, EXTRA_DEPLOY_MODE, EXTRA_QUEUE,
    EXTRA_SPARK_HOME, YARN_HOST,
};
use tracing::debug;

use crate::error::{SubmitError, SubmitResult};

/// Coordinates derived from a connection profile for one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCoordinates {
    pub master: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spark_home: Option<String>,
}

impl ResolvedCoordinates {
    /// Plain `yarn` master with nothing else set.
    pub fn yarn() -> Self {
        Self {
            master: YARN_HOST.to_string(),
            queue: None,
            deploy_mode: None,
            spark_home: None,
        }
    }

    /// Derive coordinates from a profile.
    ///
    /// A `yarn` host keeps only the queue (defaulting to `root.default`).
    /// Any other host becomes the master, suffixed with `:port` when set,
    /// and the `queue`, `deploy-mode` and `spark-home` extras pass through.
    pub fn from_profile(profile: &ConnectionProfile) -> Self {
        if profile.host == YARN_HOST {
            return Self {
                queue: Some(
                    profile
                        .extra(EXTRA_QUEUE)
                        .unwrap_or(DEFAULT_QUEUE)
                        .to_string(),
                ),
                ..Self::yarn()
            };
        }

        let master = match profile.port {
            Some(port) => format!("{}:{}", profile.host, port),
            None => profile.host.clone(),
        };

        Self {
            master,
            queue: profile.extra(EXTRA_QUEUE).map(str::to_string),
            deploy_mode: profile.extra(EXTRA_DEPLOY_MODE).map(str::to_string),
            spark_home: profile.extra(EXTRA_SPARK_HOME).map(str::to_string),
        }
    }
}

/// Resolves connection ids against an injected store.
#[derive(Debug, Clone)]
pub struct ConnectionResolver<S> {
    store: S,
}

impl<S: ConnectionStore> ConnectionResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Resolve `conn_id`.
    ///
    /// An empty id means plain `yarn`. A non-empty id the store does not know
    /// fails with [`SubmitError::ConnectionNotFound`].
    pub fn resolve(&self, conn_id: &str) -> SubmitResult<ResolvedCoordinates> {
        if conn_id.is_empty() {
            debug!("no connection id given, using plain yarn master");
            return Ok(ResolvedCoordinates::yarn());
        }

        let profile = self
            .store
            .get_connection(conn_id)
            .ok_or_else(|| SubmitError::ConnectionNotFound(conn_id.to_string()))?;

        let coords = ResolvedCoordinates::from_profile(&profile);
        debug!(
            conn_id,
            master = %coords.master,
            queue = ?coords.queue,
            deploy_mode = ?coords.deploy_mode,
            spark_home = ?coords.spark_home,
            "resolved connection"
        );
        Ok(coords)
    }
}
