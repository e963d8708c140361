//! Loading cubeweave.toml from disk.

use std::fs;

use cubeweave::config::{QueryOptions, Settings, SettingsError};
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("cubeweave.toml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_from_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[query]
use_dot_notation = true

[logging]
level = "trace"
"#,
    );

    let settings = Settings::from_file(&path).unwrap();
    assert_eq!(settings.logging.level, "trace");
    assert_eq!(settings.query_options(), QueryOptions::dot_notation());
}

#[test]
fn test_partial_file_keeps_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[logging]\nlevel = \"info\"\n");

    let settings = Settings::from_file(&path).unwrap();
    assert_eq!(settings.logging.level, "info");
    assert_eq!(settings.query_options(), QueryOptions::default());
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    match Settings::from_file(&path) {
        Err(SettingsError::FileNotFound(p)) => assert_eq!(p, path),
        other => panic!("expected FileNotFound, got {:?}", other),
    }
}

#[test]
fn test_malformed_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[query\nuse_dot_notation = yes");

    let err = Settings::from_file(&path).unwrap_err();
    assert!(matches!(err, SettingsError::ParseError(_)));
    assert!(err.to_string().starts_with("Failed to parse config file"));
}

#[test]
fn test_invalid_level_in_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[logging]\nlevel = \"verbose\"\n");

    let err = Settings::from_file(&path).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid configuration: unknown log level 'verbose', expected one of: trace, debug, info, warn, error"
    );
}
