#![deny(unsafe_code)]

pub mod chat;
pub mod formatter;
pub mod prompt;
pub mod settings;
pub mod telemetry;

use mentor_llm::{ProviderConfig, ProviderResult};

pub use chat::{
    ApplyOutcome, Complexity, ControllerError, Message, PanelConfig, Role, SidebarController,
    SidebarSnapshot, Tool,
};
pub use settings::{AssistantSettings, SettingsStore};

/// Builds a controller talking to the hosted model described by `config`.
pub fn connect(config: ProviderConfig, panel: PanelConfig) -> ProviderResult<SidebarController> {
    let client = mentor_llm::create_client(config)?;
    Ok(SidebarController::new(client, panel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentor_llm::{DEFAULT_ENDPOINT, ProviderError};

    #[test]
    fn connect_requires_an_api_token() {
        let result = connect(ProviderConfig::new("  ", DEFAULT_ENDPOINT), PanelConfig::default());

        assert!(matches!(result, Err(ProviderError::MissingApiToken { .. })));
    }

    #[tokio::test]
    async fn connected_controller_starts_idle() {
        let controller = connect(
            ProviderConfig::new("r8_token", DEFAULT_ENDPOINT),
            PanelConfig {
                tool: Tool::Quiz,
                ..PanelConfig::default()
            },
        )
        .expect("client built");

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.tool, Tool::Quiz);
        assert!(!snapshot.is_generating);
        assert!(snapshot.messages.is_empty());
    }
}
