use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use vibe_llm::ScorerConfig;

use crate::aggregator::{DEFAULT_FEED_CAPACITY, DEFAULT_WINDOW_CAPACITY};
use crate::ingest::DEFAULT_MAX_CONTENT_CHARS;

pub const SETTINGS_DIRECTORY_NAME: &str = "vibecheck";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const DATABASE_FILE_NAME: &str = "arena.db";
pub const ENV_PREFIX: &str = "VIBECHECK_";
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorerSettings {
    #[serde(default = "default_provider_id")]
    pub provider_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,
}

impl Default for ScorerSettings {
    fn default() -> Self {
        Self {
            provider_id: default_provider_id(),
            api_key: String::new(),
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl ScorerSettings {
    pub fn to_scorer_config(&self) -> ScorerConfig {
        ScorerConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            ..ScorerConfig::new(
                &self.provider_id,
                &self.api_key,
                &self.endpoint,
                &self.model,
            )
        }
    }

    fn normalized(mut self) -> Self {
        self.provider_id = non_blank_or(self.provider_id, default_provider_id);
        self.api_key = self.api_key.trim().to_string();
        self.endpoint = non_blank_or(self.endpoint, default_endpoint);
        self.model = non_blank_or(self.model, default_model);
        self.timeout_secs = self.timeout_secs.max(1);
        self.max_tokens = self.max_tokens.max(1);
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            self.temperature = default_temperature();
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaSettings {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Messages averaged into the vibe (W).
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
    /// Messages kept for display (F).
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
    #[serde(default)]
    pub scorer: ScorerSettings,
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            window_capacity: default_window_capacity(),
            feed_capacity: default_feed_capacity(),
            max_content_chars: default_max_content_chars(),
            scorer: ScorerSettings::default(),
        }
    }
}

impl ArenaSettings {
    pub fn normalized(mut self) -> Self {
        self.database_path = non_blank_or(self.database_path, default_database_path);
        self.window_capacity = self.window_capacity.max(1);
        self.feed_capacity = self.feed_capacity.max(1);
        self.max_content_chars = self.max_content_chars.max(1);
        self.scorer = self.scorer.normalized();
        self
    }
}

pub struct SettingsStore;

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".vibecheck"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn load() -> ArenaSettings {
        Self::load_from(&Self::default_config_path())
    }

    /// Defaults, then the JSON file, then `VIBECHECK_*` variables
    /// (`__` separates nested keys, e.g. `VIBECHECK_SCORER__MODEL`).
    pub fn load_from(path: &Path) -> ArenaSettings {
        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults", path);
        }

        let figment = Figment::from(Serialized::defaults(ArenaSettings::default()))
            .merge(Json::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut settings = match figment.extract::<ArenaSettings>() {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults",
                    path,
                    error
                );
                ArenaSettings::default()
            }
        };

        if settings.scorer.api_key.trim().is_empty()
            && let Ok(api_key) = std::env::var(OPENROUTER_API_KEY_ENV)
        {
            settings.scorer.api_key = api_key;
        }

        settings.normalized()
    }

    pub fn persist(path: &Path, settings: &ArenaSettings) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: path.to_path_buf(),
        })?;

        tracing::info!("saved settings to {:?}", path);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

fn non_blank_or(value: String, default: fn() -> String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default()
    } else {
        trimmed.to_string()
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
        .unwrap_or_else(|| PathBuf::from(".vibecheck"))
        .join(DATABASE_FILE_NAME)
        .display()
        .to_string()
}

fn default_window_capacity() -> usize {
    DEFAULT_WINDOW_CAPACITY
}

fn default_feed_capacity() -> usize {
    DEFAULT_FEED_CAPACITY
}

fn default_max_content_chars() -> usize {
    DEFAULT_MAX_CONTENT_CHARS
}

fn default_provider_id() -> String {
    ScorerConfig::default().provider_id
}

fn default_endpoint() -> String {
    ScorerConfig::default().endpoint
}

fn default_model() -> String {
    ScorerConfig::default().model
}

fn default_timeout_secs() -> u64 {
    ScorerConfig::default().timeout.as_secs()
}

fn default_temperature() -> f64 {
    ScorerConfig::default().temperature
}

fn default_max_tokens() -> u64 {
    ScorerConfig::default().max_tokens
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_jail| {
            let settings = SettingsStore::load_from(Path::new("absent.json"));
            assert_eq!(settings.window_capacity, 15);
            assert_eq!(settings.feed_capacity, 20);
            assert_eq!(settings.scorer.provider_id, "openrouter");
            Ok(())
        });
    }

    #[test]
    fn file_values_are_merged_over_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "settings.json",
                r#"{ "window_capacity": 3, "scorer": { "model": "tiny-model" } }"#,
            )?;

            let settings = SettingsStore::load_from(Path::new("settings.json"));
            assert_eq!(settings.window_capacity, 3);
            assert_eq!(settings.feed_capacity, 20);
            assert_eq!(settings.scorer.model, "tiny-model");
            assert_eq!(settings.scorer.timeout_secs, 10);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_the_file() {
        Jail::expect_with(|jail| {
            jail.create_file("settings.json", r#"{ "feed_capacity": 30 }"#)?;
            jail.set_env("VIBECHECK_FEED_CAPACITY", "7");
            jail.set_env("VIBECHECK_SCORER__API_KEY", "from-prefixed-env");

            let settings = SettingsStore::load_from(Path::new("settings.json"));
            assert_eq!(settings.feed_capacity, 7);
            assert_eq!(settings.scorer.api_key, "from-prefixed-env");
            Ok(())
        });
    }

    #[test]
    fn openrouter_key_fills_a_blank_api_key() {
        Jail::expect_with(|jail| {
            jail.set_env(OPENROUTER_API_KEY_ENV, "from-openrouter-env");

            let settings = SettingsStore::load_from(Path::new("absent.json"));
            assert_eq!(settings.scorer.api_key, "from-openrouter-env");
            Ok(())
        });
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("settings.json", r#"{ "window_capacity": "lots" }"#)?;

            let settings = SettingsStore::load_from(Path::new("settings.json"));
            assert_eq!(settings.window_capacity, 15);
            Ok(())
        });
    }

    #[test]
    fn normalization_repairs_degenerate_values() {
        let settings = ArenaSettings {
            database_path: "  ".to_string(),
            window_capacity: 0,
            feed_capacity: 0,
            max_content_chars: 0,
            scorer: ScorerSettings {
                provider_id: " ".to_string(),
                api_key: " key ".to_string(),
                timeout_secs: 0,
                temperature: f64::NAN,
                ..ScorerSettings::default()
            },
        }
        .normalized();

        assert_eq!(settings.window_capacity, 1);
        assert_eq!(settings.feed_capacity, 1);
        assert_eq!(settings.max_content_chars, 1);
        assert!(settings.database_path.ends_with(DATABASE_FILE_NAME));
        assert_eq!(settings.scorer.provider_id, "openrouter");
        assert_eq!(settings.scorer.api_key, "key");
        assert_eq!(settings.scorer.timeout_secs, 1);
        assert_eq!(settings.scorer.temperature, 0.1);
    }

    #[test]
    fn persist_then_load_round_trips() {
        Jail::expect_with(|_jail| {
            let path = Path::new("nested/settings.json");
            let settings = ArenaSettings {
                database_path: "arena-test.db".to_string(),
                window_capacity: 4,
                scorer: ScorerSettings {
                    api_key: "persisted-key".to_string(),
                    ..ScorerSettings::default()
                },
                ..ArenaSettings::default()
            };

            SettingsStore::persist(path, &settings).expect("persist succeeds");
            assert!(!path.with_extension("json.tmp").exists());
            assert_eq!(SettingsStore::load_from(path), settings.normalized());
            Ok(())
        });
    }

    #[test]
    fn scorer_settings_map_onto_scorer_config() {
        let settings = ScorerSettings {
            api_key: "key".to_string(),
            timeout_secs: 3,
            ..ScorerSettings::default()
        };

        let config = settings.to_scorer_config();
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.api_key, "key");
        assert_eq!(config.max_tokens, 8);
    }
}
