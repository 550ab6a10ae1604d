//! Named Spark connection profiles.
//!
//! A connection profile names a cluster master (host and optional port) plus a
//! free-form `extra` map carrying submission hints such as `queue`,
//! `deploy-mode` and `spark-home`. Profiles are read-only once loaded and are
//! looked up by id through the [`ConnectionStore`] trait.

mod file;
mod memory;
mod profile;

pub use file::{ConnectionFile, StoreError};
pub use memory::InMemoryConnections;
pub use profile::{
    ConnectionProfile, DEFAULT_CONN_ID, DEFAULT_QUEUE, EXTRA_DEPLOY_MODE, EXTRA_QUEUE,
    EXTRA_SPARK_HOME, YARN_HOST,
};

/// Read-only lookup of connection profiles by id.
pub trait ConnectionStore {
    /// Return the profile registered under `conn_id`, if any.
    fn get_connection(&self, conn_id: &str) -> Option<ConnectionProfile>;
}

impl<T: ConnectionStore + ?Sized> ConnectionStore for &T {
    fn get_connection(&self, conn_id: &str) -> Option<ConnectionProfile> {
        (**self).get_connection(conn_id)
    }
}

impl<T: ConnectionStore + ?Sized> ConnectionStore for Box<T> {
    fn get_connection(&self, conn_id: &str) -> Option<ConnectionProfile> {
        (**self).get_connection(conn_id)
    }
}

impl<T: ConnectionStore + ?Sized> ConnectionStore for std::sync::Arc<T> {
    fn get_connection(&self, conn_id: &str) -> Option<ConnectionProfile> {
        (**self).get_connection(conn_id)
    }
}
