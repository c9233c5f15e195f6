use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use shared::protocol::{DEFAULT_PER_PAGE, MAX_PER_PAGE};
use thiserror::Error;
use url::Url;

pub const SETTINGS_FILE: &str = "github_user.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub access_token: Option<String>,
    pub user_agent: String,
    pub default_per_page: u32,
    pub discard_stale_responses: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".into(),
            access_token: None,
            user_agent: "github-user-client".into(),
            default_per_page: DEFAULT_PER_PAGE,
            discard_stale_responses: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse settings file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    api_base_url: Option<String>,
    access_token: Option<String>,
    user_agent: Option<String>,
    default_per_page: Option<u32>,
    discard_stale_responses: Option<bool>,
}

impl ClientSettings {
    /// Defaults, then `github_user.toml` in the working directory, then the environment.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
    }

    pub fn load_from(
        path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        let mut settings = Self::default();

        match fs::read_to_string(path) {
            Ok(raw) => {
                let file_cfg: FileSettings =
                    toml::from_str(&raw).map_err(|source| SettingsError::Parse {
                        path: path.to_path_buf(),
                        source,
                    })?;
                settings.apply_file(file_cfg);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }

        settings.apply_env(env)?;
        settings.validate()?;
        Ok(settings)
    }

    fn apply_file(&mut self, file_cfg: FileSettings) {
        if let Some(v) = file_cfg.api_base_url {
            self.api_base_url = v;
        }
        if let Some(v) = file_cfg.access_token {
            self.access_token = Some(v);
        }
        if let Some(v) = file_cfg.user_agent {
            self.user_agent = v;
        }
        if let Some(v) = file_cfg.default_per_page {
            self.default_per_page = v;
        }
        if let Some(v) = file_cfg.discard_stale_responses {
            self.discard_stale_responses = v;
        }
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), SettingsError> {
        // APP__ aliases win over the plain names.
        let lookup = |plain: &str, alias: &str| env(alias).or_else(|| env(plain));

        if let Some(v) = lookup("GITHUB_API_URL", "APP__API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = lookup("GITHUB_TOKEN", "APP__ACCESS_TOKEN") {
            self.access_token = Some(v);
        }
        if let Some(v) = lookup("GITHUB_USER_AGENT", "APP__USER_AGENT") {
            self.user_agent = v;
        }
        if let Some(v) = lookup("GITHUB_USER_DEFAULT_PER_PAGE", "APP__DEFAULT_PER_PAGE") {
            self.default_per_page = v.trim().parse().map_err(|_| SettingsError::InvalidValue {
                key: "default_per_page",
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup("GITHUB_USER_DISCARD_STALE", "APP__DISCARD_STALE_RESPONSES") {
            self.discard_stale_responses = parse_flag(&v).ok_or(SettingsError::InvalidValue {
                key: "discard_stale_responses",
                value: v.clone(),
            })?;
        }

        self.access_token = self.access_token.take().filter(|t| !t.trim().is_empty());
        Ok(())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if !(1..=MAX_PER_PAGE).contains(&self.default_per_page) {
            return Err(SettingsError::InvalidValue {
                key: "default_per_page",
                value: self.default_per_page.to_string(),
            });
        }
        let base = Url::parse(&self.api_base_url).map_err(|_| SettingsError::InvalidValue {
            key: "api_base_url",
            value: self.api_base_url.clone(),
        })?;
        if base.cannot_be_a_base() {
            return Err(SettingsError::InvalidValue {
                key: "api_base_url",
                value: self.api_base_url.clone(),
            });
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
