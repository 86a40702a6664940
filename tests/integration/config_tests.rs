//! Configuration layering: defaults, TOML file, environment, CLI flags.

use clap::Parser;
use ddet::cli::Cli;
use ddet::config::{Config, ConfigError};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::tempdir;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clear all DDET_* environment variables to avoid interference.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("DDET_") {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn test_config_load_from_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let toml_content = r#"
database = "/var/cache/ddet/records.db"
io_threads = 8
filter_slots = 20000
progress = false
"#;
    fs::write(&config_path, toml_content).unwrap();

    let config = Config::load(Some(&config_path)).unwrap();

    assert_eq!(
        config.database,
        Some(PathBuf::from("/var/cache/ddet/records.db"))
    );
    assert_eq!(config.io_threads, 8);
    assert_eq!(config.filter_slots, 20000);
    assert_eq!(config.slots_per_entry, 2);
    assert!(!config.progress);
    assert!(config.validate().is_ok());
}

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "io_threads = 8\nslots_per_entry = 3\n").unwrap();

    std::env::set_var("DDET_IO_THREADS", "16");
    let config = Config::load(Some(&config_path));
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.io_threads, 16);
    assert_eq!(config.slots_per_entry, 3);
}

#[test]
fn test_cli_overrides_env() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "filter_slots = 1000\n").unwrap();

    std::env::set_var("DDET_FILTER_SLOTS", "2000");
    let config = Config::load(Some(&config_path));
    clear_env();

    let mut config = config.unwrap();
    let cli = Cli::try_parse_from(["ddet", "/x", "--filter-slots", "3000"]).unwrap();
    config.merge_cli(&cli);
    assert_eq!(config.filter_slots, 3000);
}

#[test]
fn test_missing_explicit_file_is_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let missing = temp_dir.path().join("nope.toml");

    let err = Config::load(Some(&missing)).unwrap_err();
    assert!(matches!(err, ConfigError::MissingFile(p) if p == missing));
}

#[test]
fn test_wrong_type_is_load_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "io_threads = \"many\"\n").unwrap();

    let err = Config::load(Some(&config_path)).unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}

#[test]
fn test_out_of_range_file_value_fails_validation() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "slots_per_entry = 12\n").unwrap();

    let config = Config::load(Some(&config_path)).unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_quiet_disables_progress() {
    let mut config = Config::default();
    let cli = Cli::try_parse_from(["ddet", "-q", "/x"]).unwrap();
    config.merge_cli(&cli);
    assert!(!config.progress);
}
