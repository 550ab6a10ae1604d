//! CLI tests
//!
//! Run the built `sparkhook` binary with an isolated HOME so no user config
//! or connections file leaks in.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const CONNECTIONS: &str = r#"
schema_version = 1

[[connection]]
conn_id = "spark_yarn_cluster"
host = "yarn://yarn-master"

[connection.extra]
queue = "root.etl"
deploy-mode = "cluster"
"#;

fn sparkhook(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sparkhook"))
        .args(args)
        .env("HOME", home)
        .env_remove("SPARKHOOK_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("connections.toml"), CONNECTIONS).unwrap();
    fs::write(
        dir.path().join("job.toml"),
        "application = \"test_application.py\"\nexecutor_cores = 4\n",
    )
    .unwrap();
    dir
}

fn path_str(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).to_string_lossy().to_string()
}

#[test]
fn test_command_uses_default_connection() {
    let dir = workspace();
    let out = sparkhook(dir.path(), &["command", &path_str(&dir, "job.toml")]);

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).trim(),
        "spark-submit --master yarn --queue root.default --executor-cores 4 test_application.py"
    );
}

#[test]
fn test_command_json_with_conn_id() {
    let dir = workspace();
    let out = sparkhook(
        dir.path(),
        &[
            "command",
            &path_str(&dir, "job.toml"),
            "--conn-id",
            "spark_yarn_cluster",
            "--connections",
            &path_str(&dir, "connections.toml"),
            "--json",
        ],
    );

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let argv: Vec<String> = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(argv[0], "spark-submit");
    assert_eq!(&argv[1..3], &["--master", "yarn://yarn-master"]);
    assert!(argv.contains(&"--deploy-mode".to_string()));
}

#[test]
fn test_resolve_json() {
    let dir = workspace();
    let out = sparkhook(
        dir.path(),
        &[
            "resolve",
            "spark_yarn_cluster",
            "--connections",
            &path_str(&dir, "connections.toml"),
            "--json",
        ],
    );

    assert!(out.status.success());
    let coords: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(coords["master"], "yarn://yarn-master");
    assert_eq!(coords["queue"], "root.etl");
    assert_eq!(coords["deploy_mode"], "cluster");
    assert!(coords.get("spark_home").is_none());
}

#[test]
fn test_resolve_unknown_connection_fails() {
    let dir = workspace();
    let out = sparkhook(dir.path(), &["resolve", "missing"]);

    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("connection not found: 'missing'"));
}

#[test]
fn test_connections_list_includes_seeded_default() {
    let dir = workspace();
    let out = sparkhook(
        dir.path(),
        &[
            "connections",
            "list",
            "--connections",
            &path_str(&dir, "connections.toml"),
            "--json",
        ],
    );

    assert!(out.status.success());
    let profiles: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let ids: Vec<&str> = profiles
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["conn_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["spark_default", "spark_yarn_cluster"]);
}

#[test]
fn test_config_file_sets_default_connection() {
    let dir = workspace();
    let config = dir.path().join("config.toml");
    fs::write(
        &config,
        format!(
            "default_conn_id = \"spark_yarn_cluster\"\nconnections_path = \"{}\"\n",
            path_str(&dir, "connections.toml")
        ),
    )
    .unwrap();

    let out = sparkhook(
        dir.path(),
        &[
            "--config",
            &config.to_string_lossy(),
            "command",
            &path_str(&dir, "job.toml"),
        ],
    );

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("--queue root.etl"));
}

#[test]
fn test_missing_config_file_fails() {
    let dir = workspace();
    let out = sparkhook(
        dir.path(),
        &["--config", "/nonexistent/sparkhook.toml", "config"],
    );
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn test_config_show_redacts_secrets() {
    let dir = workspace();
    let config = dir.path().join("config.toml");
    fs::write(&config, "[process.env]\nAWS_SECRET_ACCESS_KEY = \"hunter2\"\n").unwrap();

    let out = sparkhook(
        dir.path(),
        &["--config", &config.to_string_lossy(), "config", "--json"],
    );

    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(!stdout.contains("hunter2"));
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(
        value["config"]["process"]["env"]["AWS_SECRET_ACCESS_KEY"],
        "[REDACTED]"
    );
    assert_eq!(value["sources"][1]["origin"], "host");
}

#[cfg(unix)]
#[test]
fn test_submit_mirrors_launcher_exit_code() {
    use std::os::unix::fs::PermissionsExt;

    let dir = workspace();
    let bin = dir.path().join("spark/bin");
    fs::create_dir_all(&bin).unwrap();
    let launcher = bin.join("spark-submit");
    fs::write(
        &launcher,
        "#!/bin/sh\necho 'INFO Client: Submitting application application_1_0007 to ResourceManager' 1>&2\nexit 4\n",
    )
    .unwrap();
    fs::set_permissions(&launcher, fs::Permissions::from_mode(0o755)).unwrap();

    let connections = dir.path().join("local.toml");
    fs::write(
        &connections,
        format!(
            "[[connection]]\nconn_id = \"local\"\nhost = \"local[2]\"\n[connection.extra]\nspark-home = \"{}\"\n",
            path_str(&dir, "spark")
        ),
    )
    .unwrap();

    let out = sparkhook(
        dir.path(),
        &[
            "submit",
            &path_str(&dir, "job.toml"),
            "--conn-id",
            "local",
            "--connections",
            &connections.to_string_lossy(),
            "--json",
        ],
    );

    assert_eq!(out.status.code(), Some(4));
    let result: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(result["application_id"], "application_1_0007");
    assert_eq!(result["exit_code"], 4);
    // launcher output is relayed through the log on stderr
    assert!(String::from_utf8_lossy(&out.stderr).contains("Submitting application"));
}
