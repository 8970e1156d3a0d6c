use super::model::GenerationParameters;

/// Fully assembled payload for one generation call.
///
/// Built fresh per call and never mutated afterwards, so fields are read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    system_prompt: String,
    user_prompt: String,
    parameters: GenerationParameters,
}

impl GenerationRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            parameters: GenerationParameters::FIXED,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn user_prompt(&self) -> &str {
        &self.user_prompt
    }

    pub fn parameters(&self) -> &GenerationParameters {
        &self.parameters
    }
}
