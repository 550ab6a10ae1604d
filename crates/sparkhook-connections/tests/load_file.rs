//! Loading connection files from disk.

use std::fs;

use sparkhook_connections::{ConnectionFile, ConnectionStore, StoreError};

#[test]
fn test_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("connections.toml");
    fs::write(
        &path,
        r#"
[[connection]]
conn_id = "spark_home_set"
host = "yarn://yarn-master"

[connection.extra]
spark-home = "/opt/myspark"
"#,
    )
    .unwrap();

    let file = ConnectionFile::load(&path).unwrap();
    let profile = file.get_connection("spark_home_set").unwrap();
    assert_eq!(profile.extra("spark-home"), Some("/opt/myspark"));
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let result = ConnectionFile::load(&path);
    assert!(matches!(result, Err(StoreError::NotFound(p)) if p == path));
}

#[test]
fn test_load_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("connections.toml");
    fs::write(&path, "[[connection]\nconn_id = ").unwrap();

    assert!(matches!(
        ConnectionFile::load(&path),
        Err(StoreError::Parse(_))
    ));
}
