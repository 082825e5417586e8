use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

static FILE_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn temp_config(contents: &str) -> PathBuf {
    let id = FILE_COUNTER.fetch_add(1, Ordering::SeqCst);
    let path = std::env::temp_dir().join(format!(
        "kira_spotdecon_config_{}_{}.json",
        std::process::id(),
        id
    ));
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_defaults_are_valid() {
    let config = DecompConfig::default_v1();
    assert!(config.validate().is_ok());
    assert_eq!(config.mode, FitMode::Doublet);
    assert_eq!(config.classify.doublet_margin, 25.0);
    assert_eq!(config.classify.confidence_margin, 10.0);
    assert_eq!(config.fit.max_iter, 50);
}

#[test]
fn test_partial_json_overlays_defaults() {
    let path = temp_config(r#"{"mode": "full", "classify": {"umi_min": 50}}"#);
    let config = DecompConfig::from_json_file(&path).unwrap();
    assert_eq!(config.mode, FitMode::Full);
    assert_eq!(config.classify.umi_min, 50.0);
    assert_eq!(config.classify.umi_max, 20_000_000.0);
    assert_eq!(config.likelihood, LikelihoodParams::default());
}

#[test]
fn test_invalid_values_rejected() {
    let path = temp_config(r#"{"likelihood": {"sigma": -1.0}}"#);
    assert!(matches!(
        DecompConfig::from_json_file(&path),
        Err(ConfigError::Invalid(_))
    ));

    let path = temp_config("{not json");
    assert!(matches!(
        DecompConfig::from_json_file(&path),
        Err(ConfigError::Parse { .. })
    ));

    let mut config = DecompConfig::default_v1();
    config.classify.umi_max = 10.0;
    assert!(config.validate().is_err());
}
