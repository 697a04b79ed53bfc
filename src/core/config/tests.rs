use super::data::Config;
use super::io::ConfigError;
use crate::core::message::HistoryLimit;
use crate::core::model::GenerationParams;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(config, Config::default());
}

#[test]
fn test_config_persistence_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.history_limit = -1;
    config.local_model.load_timeout_secs = Some(90);
    config.messages.login_required = "Sign in first".to_string();
    config
        .save_to_path(&config_path)
        .expect("Failed to save config");

    let loaded = Config::load_from_path(&config_path).expect("Failed to load config");
    assert_eq!(loaded, config);

    let mut config = loaded;
    config.local_model.load_timeout_secs = None;
    config
        .save_to_path(&config_path)
        .expect("Failed to save modified config");
    let loaded = Config::load_from_path(&config_path).expect("Failed to load modified config");
    assert_eq!(loaded.local_model.load_timeout_secs, None);
    assert_eq!(loaded.messages.login_required, "Sign in first");
}

#[test]
fn partial_config_falls_back_to_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        r#"
history_limit = 4

[messages]
loading_message = "warming up"

[parameters.top_p]
min = 0.5
max = 0.9
step = 0.1
"#,
    )
    .unwrap();

    let config = Config::load_from_path(&config_path).expect("Failed to load config");
    let defaults = Config::default();

    assert_eq!(config.history_limit(), HistoryLimit::Last(4));
    assert_eq!(config.messages.loading_message, "warming up");
    assert_eq!(config.messages.model_ready, defaults.messages.model_ready);
    assert_eq!(config.parameters.top_p.max, 0.9);
    assert_eq!(config.parameters.max_tokens, defaults.parameters.max_tokens);
    assert_eq!(config.local_model, defaults.local_model);
}

#[test]
fn invalid_toml_reports_parse_error_with_path() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "history_limit = \"lots\"").unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("config.toml"));
}

#[test]
fn history_limit_sentinel_is_unlimited() {
    let config = Config {
        history_limit: -1,
        ..Default::default()
    };
    assert_eq!(config.history_limit(), HistoryLimit::Unlimited);
}

#[test]
fn default_params_pass_default_ranges() {
    let config = Config::default();
    let params = config.default_params();
    assert!(config.parameters.validate(&params).is_ok());
}

#[test]
fn out_of_range_params_are_named_in_error() {
    let config = Config::default();

    let err = config
        .parameters
        .validate(&GenerationParams {
            max_tokens: 0,
            ..config.default_params()
        })
        .unwrap_err();
    assert_eq!(err.name, "max_tokens");

    let err = config
        .parameters
        .validate(&GenerationParams {
            top_p: 1.5,
            ..config.default_params()
        })
        .unwrap_err();
    assert_eq!(err.to_string(), "top_p must be between 0.1 and 1 (got 1.5)");

    let err = config
        .parameters
        .validate(&GenerationParams {
            temperature: f32::NAN,
            ..config.default_params()
        })
        .unwrap_err();
    assert_eq!(err.name, "temperature");
}

#[test]
fn personas_path_resolution() {
    let dir = Path::new("/etc/agora");

    let config = Config::default();
    assert_eq!(
        config.resolve_personas_path(dir),
        dir.join("personas.toml")
    );

    let config = Config {
        personas_path: Some("cast/philosophers.toml".into()),
        ..Default::default()
    };
    assert_eq!(
        config.resolve_personas_path(dir),
        dir.join("cast/philosophers.toml")
    );

    let config = Config {
        personas_path: Some("/srv/personas.toml".into()),
        ..Default::default()
    };
    assert_eq!(
        config.resolve_personas_path(dir),
        Path::new("/srv/personas.toml")
    );
}
