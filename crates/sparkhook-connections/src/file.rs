//! TOML-backed connection store
//!
//! Parses and validates the connections file at
//! `~/.config/sparkhook/connections.toml`:
//!
//! ```toml
//! schema_version = 1
//!
//! [[connection]]
//! conn_id = "spark_yarn_cluster"
//! host = "yarn://yarn-master"
//!
//! [connection.extra]
//! queue = "root.etl"
//! deploy-mode = "cluster"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{ConnectionProfile, ConnectionStore, DEFAULT_CONN_ID};

/// Connections file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionFile {
    /// Schema version for forward compatibility
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Declared connection profiles
    #[serde(default, rename = "connection")]
    pub connections: Vec<ConnectionProfile>,
}

fn default_schema_version() -> u32 {
    1
}

/// Errors that can occur when loading or validating a connections file
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to read connections file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Duplicate connection id: '{0}'")]
    DuplicateConnId(String),

    #[error("Connection '{conn_id}': missing required field '{field}'")]
    MissingField { conn_id: String, field: String },

    #[error("Connection '{conn_id}': invalid value for '{field}': {reason}")]
    InvalidValue {
        conn_id: String,
        field: String,
        reason: String,
    },

    #[error("Connections file not found: {0}")]
    NotFound(PathBuf),
}

impl ConnectionFile {
    /// Load connections from the default location (~/.config/sparkhook/connections.toml)
    pub fn load_default() -> Result<Self, StoreError> {
        let path = Self::default_path()?;
        Self::load(&path)
    }

    /// Get the default connections file path
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let home = std::env::var("HOME").map_err(|_| {
            StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "HOME environment variable not set",
            ))
        })?;
        Ok(PathBuf::from(home).join(".config/sparkhook/connections.toml"))
    }

    /// Load connections from a specific path
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse connections from a TOML string
    pub fn parse(content: &str) -> Result<Self, StoreError> {
        let file: ConnectionFile = toml::from_str(content)?;
        file.validate()?;
        Ok(file)
    }

    /// Add the stock `spark_default` profile unless the file declares its own.
    pub fn with_defaults(mut self) -> Self {
        if self.get(DEFAULT_CONN_ID).is_none() {
            self.connections.push(ConnectionProfile::spark_default());
        }
        self
    }

    fn validate(&self) -> Result<(), StoreError> {
        let mut seen = HashSet::new();
        for profile in &self.connections {
            if !seen.insert(&profile.conn_id) {
                return Err(StoreError::DuplicateConnId(profile.conn_id.clone()));
            }
        }

        for profile in &self.connections {
            validate_profile(profile)?;
        }

        Ok(())
    }

    /// Get a profile by id
    pub fn get(&self, conn_id: &str) -> Option<&ConnectionProfile> {
        self.connections.iter().find(|c| c.conn_id == conn_id)
    }

    /// Profiles sorted by id
    pub fn sorted(&self) -> Vec<&ConnectionProfile> {
        let mut profiles: Vec<_> = self.connections.iter().collect();
        profiles.sort_by(|a, b| a.conn_id.cmp(&b.conn_id));
        profiles
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }
}

fn validate_profile(profile: &ConnectionProfile) -> Result<(), StoreError> {
    if profile.conn_id.is_empty() {
        return Err(StoreError::MissingField {
            conn_id: "(unnamed)".to_string(),
            field: "conn_id".to_string(),
        });
    }

    if profile.host.is_empty() {
        return Err(StoreError::MissingField {
            conn_id: profile.conn_id.clone(),
            field: "host".to_string(),
        });
    }

    if profile.port == Some(0) {
        return Err(StoreError::InvalidValue {
            conn_id: profile.conn_id.clone(),
            field: "port".to_string(),
            reason: "port cannot be 0".to_string(),
        });
    }

    if !profile
        .conn_id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StoreError::InvalidValue {
            conn_id: profile.conn_id.clone(),
            field: "conn_id".to_string(),
            reason: "conn_id must contain only alphanumeric characters, dashes, and underscores"
                .to_string(),
        });
    }

    Ok(())
}

impl ConnectionStore for ConnectionFile {
    fn get_connection(&self, conn_id: &str) -> Option<ConnectionProfile> {
        self.get(conn_id).cloned()
    }
}

impl Default for ConnectionFile {
    fn default() -> Self {
        Self {
            schema_version: 1,
            connections: Vec::new(),
        }
    }
}
