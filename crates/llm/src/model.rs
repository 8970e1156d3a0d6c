use serde::Serialize;

/// The only model the assistant talks to.
pub const MODEL_ID: &str = "meta/meta-llama-3-8b-instruct";

pub const DEFAULT_ENDPOINT: &str = "https://api.replicate.com/v1";

/// End-of-turn markers for the Llama 3 chat format. Generation stops server-side.
pub const STOP_SEQUENCES: &[&str] = &["<|end_of_text|>", "<|eot_id|>"];

/// Llama 3 instruct template; the provider substitutes `{system_prompt}` and `{prompt}`.
pub const PROMPT_TEMPLATE: &str = "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\n{system_prompt}<|eot_id|><|start_header_id|>user<|end_header_id|>\n\n{prompt}<|eot_id|><|start_header_id|>assistant<|end_header_id|>\n\n";

/// Sampling controls and token budget shared by every request.
///
/// These are system-wide constants. Complexity tiers only change the prompt text,
/// never these values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationParameters {
    pub top_p: f64,
    /// `0` disables top-k filtering.
    pub top_k: u32,
    pub temperature: f64,
    pub presence_penalty: f64,
    pub length_penalty: f64,
    pub max_new_tokens: u32,
    pub max_tokens: u32,
    pub stop_sequences: &'static [&'static str],
}

impl GenerationParameters {
    pub const FIXED: Self = Self {
        top_p: 0.95,
        top_k: 0,
        temperature: 0.7,
        presence_penalty: 0.0,
        length_penalty: 1.0,
        max_new_tokens: 512,
        max_tokens: 512,
        stop_sequences: STOP_SEQUENCES,
    };

    /// Stop markers in the comma separated form the predictions API expects.
    pub fn joined_stop_sequences(&self) -> String {
        self.stop_sequences.join(",")
    }
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self::FIXED
    }
}
