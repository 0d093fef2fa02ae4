use pretty_assertions::assert_eq;
use revmatch_core::config::{load_gear_profile, ConfigError};
use std::fs;
use tempfile::TempDir;

const GEARBOX: &str = "\
# Five-speed, teeth counts as input,output
final_drive = 15,61
gear_ratio = 11,37
gear_ratio = 22,41
gear_ratio = 28,37
gear_ratio = 34,35
gear_ratio = 39,32

min_rpm = 1200
max_rpm = 6800
wheel_circumference = 74.38402
tyre_brand = whatever
";

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("gearbox.cfg");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let profile = load_gear_profile(write_config(&dir, GEARBOX)).unwrap();

    assert_eq!(profile.gear_count(), 5);
    assert_eq!(profile.min_rpm(), 1200);
    assert_eq!(profile.max_rpm(), 6800);
    assert!((profile.final_drive() - 61.0 / 15.0).abs() < 1e-12);
    assert!((profile.ratio(5).unwrap() - 32.0 / 39.0).abs() < 1e-12);
    assert_eq!(profile.ratio(6), None);
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = load_gear_profile(dir.path().join("nope.cfg")).unwrap_err();
    match err {
        ConfigError::Io { path, .. } => assert!(path.ends_with("nope.cfg")),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_ratios_must_decrease() {
    let dir = TempDir::new().unwrap();
    let content = GEARBOX.replace("gear_ratio = 22,41", "gear_ratio = 10,41");
    let err = load_gear_profile(write_config(&dir, &content)).unwrap_err();
    assert!(matches!(err, ConfigError::Invariant(_)), "{}", err);
}

#[test]
fn test_single_ratio_rejected() {
    let dir = TempDir::new().unwrap();
    let content = "final_drive = 4.1\n\
                   gear_ratio = 3.5\n\
                   min_rpm = 800\n\
                   max_rpm = 7000\n\
                   wheel_circumference = 79\n";
    let err = load_gear_profile(write_config(&dir, content)).unwrap_err();
    assert!(matches!(err, ConfigError::Invariant(_)));
}

#[test]
fn test_rpm_bounds_ordered() {
    let dir = TempDir::new().unwrap();
    let content = GEARBOX.replace("max_rpm = 6800", "max_rpm = 1000");
    let err = load_gear_profile(write_config(&dir, &content)).unwrap_err();
    assert!(err.to_string().contains("min_rpm"));
}

#[test]
fn test_missing_lists_every_field() {
    let dir = TempDir::new().unwrap();
    let err = load_gear_profile(write_config(&dir, "# empty\n")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Missing: final_drive, gear_ratio, min_rpm, max_rpm, wheel_circumference"
    );
}

#[test]
fn test_latin1_comment_tolerated() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gearbox.cfg");
    let mut bytes = b"# r\xe9glage\n".to_vec();
    bytes.extend_from_slice(GEARBOX.as_bytes());
    fs::write(&path, bytes).unwrap();

    assert_eq!(load_gear_profile(&path).unwrap().gear_count(), 5);
}
