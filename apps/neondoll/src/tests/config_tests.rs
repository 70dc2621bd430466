use std::{
    collections::HashMap,
    env, fs,
    sync::atomic::{AtomicUsize, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

use super::*;

fn temp_config(contents: &str) -> std::path::PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = env::temp_dir().join(format!("neondoll_config_test_{suffix}_{n}"));
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("neondoll.toml");
    fs::write(&path, contents).expect("write config");
    path
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_target_pollinations() {
    let settings = Settings::default();
    assert_eq!(settings.backend, BackendKind::Pollinations);
    settings.validate().expect("defaults are valid");

    let generator = settings.generator_settings();
    assert_eq!(generator.base_url, "https://image.pollinations.ai");
    assert_eq!(generator.model, "flux");
    assert_eq!(generator.request_timeout, Duration::from_secs(120));

    let options = settings.studio_options();
    assert_eq!(options.placeholder.as_str(), DEFAULT_PLACEHOLDER_IMAGE);
    assert_eq!(options.history_capacity, HISTORY_CAPACITY);
}

#[test]
fn file_values_override_defaults() {
    let path = temp_config(
        r#"
backend = "gemini"
api_key = "file-key"
model = "custom-model"
width = 512
timeout_secs = 30
history_capacity = 3
"#,
    );

    let mut settings = Settings::default();
    let raw = fs::read_to_string(&path).expect("read");
    apply_file(&mut settings, toml::from_str(&raw).expect("parse"));

    assert_eq!(settings.backend, BackendKind::Gemini);
    assert_eq!(settings.api_key.as_deref(), Some("file-key"));
    assert_eq!(settings.width, 512);
    assert_eq!(settings.height, 1024);
    assert_eq!(settings.history_capacity, 3);
    settings.validate().expect("valid");

    let generator = settings.generator_settings();
    assert_eq!(generator.model, "custom-model");
    assert_eq!(generator.base_url, "https://generativelanguage.googleapis.com");
    assert_eq!(generator.request_timeout, Duration::from_secs(30));

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let path = env::temp_dir().join("neondoll_config_test_missing/never.toml");
    let settings = load_settings(&path).expect("missing file is fine");
    assert_eq!(settings.width, Settings::default().width);
}

#[test]
fn malformed_file_is_reported() {
    let path = temp_config("backend = \"dalle\"\n");
    let err = load_settings(&path).expect_err("unknown backend");
    assert!(format!("{err:#}").contains("failed to parse config file"));

    let path_unknown = temp_config("colour = \"pink\"\n");
    assert!(load_settings(&path_unknown).is_err());

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
    fs::remove_dir_all(path_unknown.parent().expect("parent")).expect("cleanup");
}

#[test]
fn env_overrides_with_app_aliases_winning() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        env_from(&[
            ("NEONDOLL_BACKEND", "pollinations"),
            ("APP__BACKEND", "gemini"),
            ("GEMINI_API_KEY", "env-key"),
            ("NEONDOLL_BASE_URL", "http://127.0.0.1:9000"),
            ("NEONDOLL_TIMEOUT_SECS", "5"),
        ]),
    )
    .expect("apply env");

    assert_eq!(settings.backend, BackendKind::Gemini);
    assert_eq!(settings.api_key.as_deref(), Some("env-key"));
    assert_eq!(settings.base_url.as_deref(), Some("http://127.0.0.1:9000"));
    assert_eq!(settings.timeout_secs, 5);
    assert_eq!(
        settings.generator_settings().base_url,
        "http://127.0.0.1:9000"
    );
}

#[test]
fn invalid_env_values_are_errors() {
    let mut settings = Settings::default();
    assert!(apply_env(&mut settings, env_from(&[("NEONDOLL_BACKEND", "dalle")])).is_err());
    assert!(apply_env(&mut settings, env_from(&[("NEONDOLL_TIMEOUT_SECS", "soon")])).is_err());
}

#[test]
fn gemini_without_key_is_rejected() {
    let settings = Settings {
        backend: BackendKind::Gemini,
        api_key: Some("   ".into()),
        ..Settings::default()
    };
    let err = settings.validate().expect_err("missing key");
    assert!(err.to_string().contains("API key"));
}

#[test]
fn zero_sizes_are_rejected() {
    let settings = Settings {
        history_capacity: 0,
        ..Settings::default()
    };
    assert!(settings.validate().is_err());

    let settings = Settings {
        width: 0,
        ..Settings::default()
    };
    assert!(settings.validate().is_err());
}
