pub mod state;

pub use state::{
    API_TOKEN_ENV, AssistantSettings, ENV_PREFIX, EnvOverrides, SETTINGS_DIRECTORY_NAME,
    SETTINGS_FILE_NAME, SettingsError, SettingsStore,
};
