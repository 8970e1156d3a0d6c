use std::collections::VecDeque;
use std::sync::Mutex;

use futures::StreamExt;

use super::model::MODEL_ID;
use super::provider::{BoxFuture, ProviderError, ProviderResult, TokenSource, TokenStream};
use super::request::GenerationRequest;

pub const SCRIPTED_PROVIDER_ID: &str = "scripted";

/// One canned reply for [`ScriptedSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Script {
    Tokens(Vec<String>),
    FailOpen(String),
    FailAfter { tokens: Vec<String>, message: String },
}

impl Script {
    pub fn tokens<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::Tokens(tokens.into_iter().map(Into::into).collect())
    }

    pub fn fail_open(message: impl Into<String>) -> Self {
        Self::FailOpen(message.into())
    }

    pub fn fail_after<I, T>(tokens: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::FailAfter {
            tokens: tokens.into_iter().map(Into::into).collect(),
            message: message.into(),
        }
    }
}

/// In-memory token source that replays scripted replies in order and records requests.
///
/// Running out of scripts is reported as a failed open, so an unexpected extra call
/// shows up as a generation failure rather than a hang.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedSource {
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, script: Script) {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.push_back(script);
        }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|requests| requests.len()).unwrap_or(0)
    }

    fn next_script(&self) -> Option<Script> {
        self.scripts.lock().ok().and_then(|mut scripts| scripts.pop_front())
    }
}

fn scripted_failure(stage: &'static str, message: String) -> ProviderError {
    ProviderError::ModelReported { stage, message }
}

impl TokenSource for ScriptedSource {
    fn id(&self) -> &str {
        SCRIPTED_PROVIDER_ID
    }

    fn model_id(&self) -> &str {
        MODEL_ID
    }

    fn open_stream<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, ProviderResult<TokenStream>> {
        Box::pin(async move {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request.clone());
            }

            let items = match self.next_script() {
                Some(Script::Tokens(tokens)) => tokens.into_iter().map(Ok).collect::<Vec<_>>(),
                Some(Script::FailOpen(message)) => {
                    return Err(scripted_failure("scripted-open", message));
                }
                Some(Script::FailAfter { tokens, message }) => tokens
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(scripted_failure(
                        "scripted-stream",
                        message,
                    ))))
                    .collect(),
                None => {
                    return Err(scripted_failure(
                        "scripted-open",
                        "no scripted reply left".to_string(),
                    ));
                }
            };

            Ok(futures::stream::iter(items).boxed())
        })
    }
}
