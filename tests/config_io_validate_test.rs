use ned_co2::config::{Config, Granularity};
use std::fs;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("ned_co2.yaml");

    let mut cfg = Config::default();
    cfg.api.api_key = "abc123".to_string();
    cfg.window.point = 7;
    cfg.window.granularity = Granularity::QuarterHour;
    cfg.logging.file = path.with_extension("log").to_string_lossy().to_string();

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.api.api_key, "abc123");
    assert_eq!(loaded.window, cfg.window);
    assert_eq!(loaded.logging.file, cfg.logging.file);
    assert!(loaded.validate().is_ok());
}

#[test]
fn config_validation_errors() {
    let valid = || {
        let mut cfg = Config::default();
        cfg.api.api_key = "k".into();
        cfg
    };

    // Missing API key
    assert!(Config::default().validate().is_err());

    let mut cfg = valid();
    cfg.api.base_url.clear();
    assert!(cfg.validate().is_err());

    cfg = valid();
    cfg.api.request_timeout_secs = Some(0);
    assert!(cfg.validate().is_err());

    cfg = valid();
    cfg.web.port = 0;
    assert!(cfg.validate().is_err());

    cfg = valid();
    cfg.window.window_days = 3;
    assert!(cfg.validate().is_ok());
}

#[test]
fn unknown_granularity_is_rejected_on_load() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"window:\n  granularity: 3\n").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    assert!(format!("{}", err).contains("Serialization error"));
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"bad: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::from_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(format!("{}", err).contains("I/O error"));
}
