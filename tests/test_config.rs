use std::fs;
use std::path::Path;

use platform_game::config::*;

use pretty_assertions::assert_eq;

#[test]
fn missing_file_means_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = GameConfig::load_from(&dir.path().join("absent.json")).unwrap();
    assert_eq!(config, GameConfig::default());
    assert_eq!(config.tick_rate_hz, 30);
    assert_eq!(config.start_level, 0);
}

#[test]
fn partial_file_keeps_other_defaults() {
    let config = GameConfig::from_json(Path::new("cfg.json"), r#"{ "tick_rate_hz": 60 }"#).unwrap();
    assert_eq!(
        config,
        GameConfig {
            tick_rate_hz: 60,
            ..GameConfig::default()
        }
    );
}

#[test]
fn wrong_type_reports_field() {
    match GameConfig::from_json(Path::new("cfg.json"), r#"{ "start_level": "two" }"#) {
        Err(ConfigError::Parse { field, .. }) => assert_eq!(field, "start_level"),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn unknown_field_is_rejected() {
    assert!(matches!(
        GameConfig::from_json(Path::new("cfg.json"), r#"{ "tickrate": 30 }"#),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn tick_rate_is_bounded() {
    for bad in [0, MAX_TICK_RATE_HZ + 1] {
        let text = format!(r#"{{ "tick_rate_hz": {bad} }}"#);
        assert!(matches!(
            GameConfig::from_json(Path::new("cfg.json"), &text),
            Err(ConfigError::TickRate(rate)) if rate == bad
        ));
    }
}

#[test]
fn file_on_disk_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("platform_game.json");
    fs::write(&path, r#"{ "start_level": 2, "log_file": "/tmp/game.log" }"#).unwrap();

    let config = GameConfig::load_from(&path).unwrap();
    assert_eq!(config.start_level, 2);
    assert_eq!(config.log_file.as_deref(), Some(Path::new("/tmp/game.log")));
}

#[test]
fn builtin_catalog_without_levels_dir() {
    let catalog = GameConfig::default().catalog().unwrap();
    assert_eq!(catalog.len(), 3);
}

#[test]
fn levels_dir_errors_surface() {
    let dir = tempfile::tempdir().unwrap();
    let config = GameConfig {
        levels_dir: Some(dir.path().to_path_buf()),
        ..GameConfig::default()
    };
    assert!(matches!(config.catalog(), Err(ConfigError::Levels(_))));
}
