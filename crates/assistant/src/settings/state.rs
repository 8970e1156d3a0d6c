use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use mentor_llm::{DEFAULT_ENDPOINT, ProviderConfig};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use crate::chat::{Complexity, PanelConfig, Tool};

pub const SETTINGS_DIRECTORY_NAME: &str = "mentor";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const ENV_PREFIX: &str = "MENTOR_";
pub const API_TOKEN_ENV: &str = "REPLICATE_API_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantSettings {
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub default_tool: Tool,
    #[serde(default)]
    pub default_complexity: Complexity,
    #[serde(default = "default_panel_open")]
    pub panel_open_on_start: bool,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            endpoint: default_endpoint(),
            default_tool: Tool::default(),
            default_complexity: Complexity::default(),
            panel_open_on_start: default_panel_open(),
        }
    }
}

impl AssistantSettings {
    pub fn has_api_token(&self) -> bool {
        !self.api_token.trim().is_empty()
    }

    /// `None` until a token is configured; the controller cannot be built without one.
    pub fn provider_config(&self) -> Option<ProviderConfig> {
        if !self.has_api_token() {
            return None;
        }

        Some(ProviderConfig::new(&self.api_token, &self.endpoint))
    }

    pub fn panel_config(&self) -> PanelConfig {
        PanelConfig {
            tool: self.default_tool,
            complexity: self.default_complexity,
            panel_open: self.panel_open_on_start,
        }
    }

    pub fn normalized(mut self) -> Self {
        self.api_token = self.api_token.trim().to_string();
        self.endpoint = match self.endpoint.trim().trim_end_matches('/') {
            "" => default_endpoint(),
            endpoint => endpoint.to_string(),
        };
        self
    }
}

/// Whether process environment variables are layered over the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvOverrides {
    Apply,
    Ignore,
}

pub struct SettingsStore {
    settings: Arc<ArcSwap<AssistantSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".mentor"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn open(config_path: PathBuf, env: EnvOverrides) -> Self {
        let settings = Self::load_layers(&config_path, env);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn new(config_path: PathBuf) -> Self {
        Self::open(config_path, EnvOverrides::Apply)
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> Arc<AssistantSettings> {
        self.settings.load_full()
    }

    pub fn update(&self, settings: AssistantSettings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    fn load_layers(path: &Path, env: EnvOverrides) -> AssistantSettings {
        if !path.exists() {
            tracing::info!(path = ?path, "settings file not found, using defaults");
        }

        // A missing file contributes nothing, so env overrides still apply.
        let mut figment = Figment::from(Serialized::defaults(AssistantSettings::default()))
            .merge(Json::file(path));
        if env == EnvOverrides::Apply {
            figment = figment
                .merge(
                    Env::raw()
                        .only(&[API_TOKEN_ENV])
                        .map(|_| "api_token".into()),
                )
                .merge(Env::prefixed(ENV_PREFIX));
        }

        match figment.extract::<AssistantSettings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    path = ?path,
                    error = %error,
                    "failed to parse settings, using defaults"
                );
                AssistantSettings::default()
            }
        }
    }

    fn persist(&self, settings: &AssistantSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = self.config_path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.config_path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: self.config_path.clone(),
        })?;

        tracing::info!(path = ?self.config_path, "saved settings");
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

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_panel_open() -> bool {
    true
}
