//! Configuration loading and root folder resolution
//!
//! Tests that manipulate GDLO_ROOT_FOLDER or GDLO_CONFIG are marked with
//! #[serial] so they never run in parallel.

use gdlo_common::config::{
    default_root_folder, prepare_root_folder, resolve_config_path, TomlConfig, CONFIG_ENV_VAR,
    DATABASE_FILE, ROOT_FOLDER_ENV_VAR,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_missing_config_file_yields_defaults() {
    let temp = TempDir::new().unwrap();
    let config = TomlConfig::load(&temp.path().join("absent.toml")).unwrap();

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.server.game_version, 21);
    assert_eq!(config.server.binary_version, 35);
    assert_eq!(config.update.batch_size, 100);
    assert_eq!(config.discovery.interval.period_secs, 600.0);
    assert_eq!(config.discovery.interval.random_secs, 120.0);
    assert_eq!(config.update.next_page.period_secs, 5.0);
    assert!(config.discovery.max_pages.is_none());
    assert!(config.notify.webhook_url.is_none());
    assert_eq!(config.api.port, 5000);
}

#[test]
fn test_partial_config_keeps_other_defaults() {
    let config = TomlConfig::from_toml_str(
        r#"
        [update]
        period_secs = 120
        random_secs = 10
        batch_size = 50

        [update.next_page]
        period_secs = 1
        "#,
    )
    .unwrap();

    assert_eq!(config.update.interval.period_secs, 120.0);
    assert_eq!(config.update.interval.random_secs, 10.0);
    assert_eq!(config.update.batch_size, 50);
    assert_eq!(config.update.next_page.period_secs, 1.0);
    assert_eq!(config.update.next_page.random_secs, 0.0);
    assert_eq!(config.discovery.interval.period_secs, 600.0);
    assert_eq!(config.server.secret, "Wmfd2893gb7");
}

#[test]
fn test_full_config_file_loads() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        root_folder = "/srv/gdlo"
        initial_load = "/srv/gdlo/ids.json"

        [logging]
        level = "debug"

        [server]
        url = "http://localhost:9000/levels.php"
        timeout_secs = 5

        [discovery]
        period_secs = 60
        max_pages = 3

        [notify]
        webhook_url = "http://localhost:9000/hook"

        [api]
        host = "0.0.0.0"
        port = 8080
        "#,
    )
    .unwrap();

    let config = TomlConfig::load(&path).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/gdlo")));
    assert_eq!(config.initial_load, Some(PathBuf::from("/srv/gdlo/ids.json")));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.server.url, "http://localhost:9000/levels.php");
    assert_eq!(config.server.timeout().as_secs(), 5);
    assert_eq!(config.discovery.interval.period_secs, 60.0);
    assert_eq!(config.discovery.max_pages, Some(3));
    assert_eq!(
        config.notify.webhook_url.as_deref(),
        Some("http://localhost:9000/hook")
    );
    assert_eq!(config.api.host, "0.0.0.0");
    assert_eq!(config.api.port, 8080);
}

#[test]
fn test_malformed_config_is_an_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "[update\nbatch_size = ").unwrap();

    assert!(TomlConfig::load(&path).is_err());
}

#[test]
#[serial]
fn test_root_folder_cli_wins() {
    env::set_var(ROOT_FOLDER_ENV_VAR, "/tmp/gdlo-env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/gdlo-toml")),
        ..TomlConfig::default()
    };

    let resolved = config.resolve_root_folder(Some(Path::new("/tmp/gdlo-cli")));
    assert_eq!(resolved, PathBuf::from("/tmp/gdlo-cli"));

    env::remove_var(ROOT_FOLDER_ENV_VAR);
}

#[test]
#[serial]
fn test_root_folder_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV_VAR, "/tmp/gdlo-env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/gdlo-toml")),
        ..TomlConfig::default()
    };

    assert_eq!(config.resolve_root_folder(None), PathBuf::from("/tmp/gdlo-env"));

    env::remove_var(ROOT_FOLDER_ENV_VAR);
}

#[test]
#[serial]
fn test_root_folder_falls_back_to_toml_then_default() {
    env::remove_var(ROOT_FOLDER_ENV_VAR);

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/gdlo-toml")),
        ..TomlConfig::default()
    };
    assert_eq!(config.resolve_root_folder(None), PathBuf::from("/tmp/gdlo-toml"));

    let config = TomlConfig::default();
    assert_eq!(config.resolve_root_folder(None), default_root_folder());
}

#[test]
#[serial]
fn test_config_path_env_override() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/gdlo-test/config.toml");
    assert_eq!(
        resolve_config_path(None),
        PathBuf::from("/tmp/gdlo-test/config.toml")
    );
    assert_eq!(
        resolve_config_path(Some(Path::new("/etc/gdlo.toml"))),
        PathBuf::from("/etc/gdlo.toml")
    );
    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_prepare_root_folder_creates_directory() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("nested").join("root");

    let db_path = prepare_root_folder(&root).unwrap();
    assert!(root.is_dir());
    assert_eq!(db_path, root.join(DATABASE_FILE));
}
