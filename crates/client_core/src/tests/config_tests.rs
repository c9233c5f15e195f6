use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_settings_file(contents: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("github_user_settings_test_{suffix}"));
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join(SETTINGS_FILE);
    fs::write(&path, contents).expect("write settings");
    path
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn missing_file_and_empty_env_yield_defaults() {
    let settings = ClientSettings::load_from(
        Path::new("/nonexistent/github_user.toml"),
        env_from(&[]),
    )
    .expect("defaults");
    assert_eq!(settings, ClientSettings::default());
    assert_eq!(settings.default_per_page, 15);
}

#[test]
fn file_values_are_overridden_by_env() {
    let path = temp_settings_file(
        "api_base_url = \"http://127.0.0.1:9000\"\ndefault_per_page = 30\ndiscard_stale_responses = true\n",
    );
    let settings = ClientSettings::load_from(
        &path,
        env_from(&[
            ("GITHUB_USER_DEFAULT_PER_PAGE", "50"),
            ("GITHUB_TOKEN", "secret"),
        ]),
    )
    .expect("load");
    assert_eq!(settings.api_base_url, "http://127.0.0.1:9000");
    assert_eq!(settings.default_per_page, 50);
    assert!(settings.discard_stale_responses);
    assert_eq!(settings.access_token.as_deref(), Some("secret"));

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn app_alias_wins_over_plain_name() {
    let settings = ClientSettings::load_from(
        Path::new("/nonexistent/github_user.toml"),
        env_from(&[
            ("GITHUB_API_URL", "http://plain.example"),
            ("APP__API_BASE_URL", "http://alias.example"),
        ]),
    )
    .expect("load");
    assert_eq!(settings.api_base_url, "http://alias.example");
}

#[test]
fn blank_token_is_treated_as_absent() {
    let settings = ClientSettings::load_from(
        Path::new("/nonexistent/github_user.toml"),
        env_from(&[("GITHUB_TOKEN", "  ")]),
    )
    .expect("load");
    assert!(settings.access_token.is_none());
}

#[test]
fn rejects_zero_page_size_and_bad_flags() {
    let err = ClientSettings::load_from(
        Path::new("/nonexistent/github_user.toml"),
        env_from(&[("GITHUB_USER_DEFAULT_PER_PAGE", "0")]),
    )
    .expect_err("zero page size");
    assert!(matches!(
        err,
        SettingsError::InvalidValue {
            key: "default_per_page",
            ..
        }
    ));

    let err = ClientSettings::load_from(
        Path::new("/nonexistent/github_user.toml"),
        env_from(&[("GITHUB_USER_DISCARD_STALE", "maybe")]),
    )
    .expect_err("bad flag");
    assert!(matches!(
        err,
        SettingsError::InvalidValue {
            key: "discard_stale_responses",
            ..
        }
    ));
}

#[test]
fn rejects_page_size_above_api_limit() {
    let path = temp_settings_file("default_per_page = 101\n");
    let err = ClientSettings::load_from(&path, env_from(&[])).expect_err("oversized page");
    assert!(matches!(
        err,
        SettingsError::InvalidValue {
            key: "default_per_page",
            ref value,
        } if value == "101"
    ));
    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn rejects_unknown_keys_in_file() {
    let path = temp_settings_file("bind_addr = \"127.0.0.1:8443\"\n");
    let err = ClientSettings::load_from(&path, env_from(&[])).expect_err("unknown key");
    assert!(matches!(err, SettingsError::Parse { .. }));
    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn rejects_unparseable_base_url() {
    let err = ClientSettings::load_from(
        Path::new("/nonexistent/github_user.toml"),
        env_from(&[("GITHUB_API_URL", "not a url")]),
    )
    .expect_err("bad url");
    assert!(matches!(
        err,
        SettingsError::InvalidValue {
            key: "api_base_url",
            ..
        }
    ));
}
