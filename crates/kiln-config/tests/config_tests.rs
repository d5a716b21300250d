//! Configuration loading and precedence tests

use kiln_config::{ConfigLoader, GlobalConfig};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn create_config_file(dir: &Path, content: &str) -> PathBuf {
    let config_path = dir.join("config.toml");
    fs::write(&config_path, content).unwrap();
    config_path
}

// ============================================================================
// Loading
// ============================================================================

#[test]
#[serial]
fn test_empty_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "");

    let config = ConfigLoader::new().load_from_file(&path).unwrap();
    assert_eq!(config, GlobalConfig::default());
}

#[test]
#[serial]
fn test_sdk_section_round_trips_through_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(
        temp_dir.path(),
        r#"
[sdk]
core_project = "/sdk/quark.gyp"
includes = ["/sdk/include"]

[sdk.libraries]
ios = ["/sdk/ios/libquark.a"]
"#,
    );

    let config = ConfigLoader::new().with_config_path(&path).load().unwrap();
    assert_eq!(
        config.sdk.core_project.as_deref(),
        Some(Path::new("/sdk/quark.gyp"))
    );
    assert_eq!(config.libraries_for("ios").len(), 1);
    assert!(config.libraries_for("android").is_empty());
}

#[test]
#[serial]
fn test_invalid_port_in_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "[server]\nport = 0\n");

    assert!(ConfigLoader::new().load_from_file(&path).is_err());
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
#[serial]
fn test_env_overrides_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(
        temp_dir.path(),
        r#"
[toolchain]
generator = "gyp-from-file"

[server]
port = 2000
"#,
    );

    env::set_var("KILN_GENERATOR", "gyp-from-env");
    env::set_var("KILN_PORT", "3000");
    let config = ConfigLoader::new().load_from_file(&path);
    env::remove_var("KILN_GENERATOR");
    env::remove_var("KILN_PORT");

    let config = config.unwrap();
    assert_eq!(config.toolchain.generator, "gyp-from-env");
    assert_eq!(config.server.port, 3000);
}

#[test]
#[serial]
fn test_builder_path_wins_over_kiln_config() {
    let temp_dir = TempDir::new().unwrap();
    let a = temp_dir.path().join("a.toml");
    let b = temp_dir.path().join("b.toml");
    fs::write(&a, "[server]\nport = 1111\n").unwrap();
    fs::write(&b, "[server]\nport = 2222\n").unwrap();

    env::set_var("KILN_CONFIG", &b);
    let config = ConfigLoader::new().with_config_path(&a).load();
    env::remove_var("KILN_CONFIG");

    assert_eq!(config.unwrap().server.port, 1111);
}

#[rstest]
#[case("true", Some(true))]
#[case("1", Some(true))]
#[case("YES", Some(true))]
#[case("false", Some(false))]
#[case("off", Some(false))]
#[serial]
fn test_minify_env_values(#[case] value: &str, #[case] expected: Option<bool>) {
    let temp_dir = TempDir::new().unwrap();
    let path = create_config_file(temp_dir.path(), "");

    env::set_var("KILN_MINIFY", value);
    let config = ConfigLoader::new().load_from_file(&path);
    env::remove_var("KILN_MINIFY");

    assert_eq!(config.unwrap().build.minify, expected);
}
