//! Integration tests for locating and loading the configuration file.

use discedit::config::{Config, ConfigError};
use discedit::constants::CONFIG_PATH_ENV;
use discedit::fs_utils::Workspace;
use serial_test::serial;
use tempfile::TempDir;

#[test]
#[serial]
fn test_environment_overrides_config_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("forums.toml");

    std::env::set_var(CONFIG_PATH_ENV, &path);
    let resolved = Config::default_path();
    std::env::remove_var(CONFIG_PATH_ENV);

    assert_eq!(resolved.unwrap(), path);
}

#[test]
#[serial]
fn test_default_path_is_in_home() {
    std::env::remove_var(CONFIG_PATH_ENV);
    if let Some(home) = dirs::home_dir() {
        assert_eq!(Config::default_path().unwrap(), home.join(".discedit"));
    }
}

#[test]
fn test_load_file_and_place_session_files_beside_it() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".discedit");
    std::fs::write(
        &path,
        r#"
[forums."https://forum.example.com/"]
username = "alice"
key = "secret"
"#,
    )
    .unwrap();

    let config = Config::load(&path).expect("config should load");
    let (url, credentials) = config.forum("").unwrap();
    assert_eq!(url, "https://forum.example.com");
    assert_eq!(credentials.username, "alice");

    let workspace = Workspace::beside(config.path());
    assert_eq!(workspace.backup_file(), dir.path().join(".discedit.last.md"));
    assert!(workspace.temp_file().starts_with(dir.path()));
}

#[test]
fn test_unparsable_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".discedit");
    std::fs::write(&path, "forums = [").unwrap();

    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}
