use std::io::Write;

use anyhow::Result;
use contextual::{Config, LayerRuntime, UnknownLayerPolicy};
use serial_test::serial;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

#[test]
#[serial]
fn test_load_from_file() -> Result<()> {
    let file = write_config(
        r#"
[cache]
enabled = false
max_entries = 64

[activation]
unknown_layer = "ignore"

[logging]
filter = "contextual=trace"
json = true
"#,
    )?;

    let config = Config::load_from(file.path())?;
    assert!(!config.cache.enabled);
    assert_eq!(config.cache.max_entries, 64);
    assert_eq!(config.cache.ttl_seconds, 300);
    assert_eq!(config.activation.unknown_layer, UnknownLayerPolicy::Ignore);
    assert_eq!(config.logging.filter, "contextual=trace");
    assert!(config.logging.json);

    Ok(())
}

#[test]
#[serial]
fn test_environment_overrides_file() -> Result<()> {
    let file = write_config("[cache]\nmax_entries = 64\n")?;

    unsafe {
        std::env::set_var("CONTEXTUAL__CACHE__MAX_ENTRIES", "128");
    }
    let config = Config::load_from(file.path());
    unsafe {
        std::env::remove_var("CONTEXTUAL__CACHE__MAX_ENTRIES");
    }

    assert_eq!(config?.cache.max_entries, 128);
    Ok(())
}

#[test]
#[serial]
fn test_missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load_from(&dir.path().join("absent.toml")).is_err());
}

#[test]
fn test_rendered_config_parses_back() -> Result<()> {
    let mut config = Config::default();
    config.cache.ttl_seconds = 5;
    config.activation.unknown_layer = UnknownLayerPolicy::Ignore;

    let text = config.to_toml_string()?;
    assert_eq!(Config::from_toml_str(&text)?, config);

    Ok(())
}

#[test]
fn test_runtime_uses_configured_policy() -> Result<()> {
    let config = Config::from_toml_str("[activation]\nunknown_layer = \"ignore\"\n")?;
    let runtime = LayerRuntime::with_config(config);

    assert_eq!(runtime.config().activation.unknown_layer, UnknownLayerPolicy::Ignore);
    assert!(runtime.activate("anything").is_ok());

    Ok(())
}
