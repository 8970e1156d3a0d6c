use std::sync::Arc;

use futures::StreamExt;
use snafu::{ResultExt, Snafu};

use super::provider::{ProviderError, TokenSource};
use super::request::GenerationRequest;

/// Any transport, authentication or model error raised while generating.
///
/// The contract does not distinguish causes; `source` keeps the detail for logs.
#[derive(Debug, Snafu)]
#[snafu(display("generation with `{model_id}` failed on `{stage}`: {source}"))]
pub struct GenerationFailure {
    pub stage: &'static str,
    pub model_id: String,
    pub source: ProviderError,
}

/// Collects one token stream into the complete response text.
///
/// All-or-nothing: fragments are concatenated in arrival order, and the first error
/// discards everything received so far.
#[derive(Clone)]
pub struct GenerationClient {
    source: Arc<dyn TokenSource>,
}

impl GenerationClient {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self { source }
    }

    pub fn provider_id(&self) -> &str {
        self.source.id()
    }

    pub fn model_id(&self) -> &str {
        self.source.model_id()
    }

    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationFailure> {
        let model_id = self.source.model_id();
        let mut stream = self
            .source
            .open_stream(request)
            .await
            .inspect_err(|error| {
                tracing::error!(
                    provider_id = %self.source.id(),
                    model_id = %model_id,
                    error = %error,
                    "failed to open token stream"
                );
            })
            .context(GenerationFailureSnafu {
                stage: "open-stream",
                model_id,
            })?;

        let mut output = String::new();
        let mut fragment_count = 0_usize;
        while let Some(fragment) = stream.next().await {
            let fragment = fragment
                .inspect_err(|error| {
                    tracing::warn!(
                        model_id = %model_id,
                        fragment_count,
                        error = %error,
                        "token stream failed; discarding partial output"
                    );
                })
                .context(GenerationFailureSnafu {
                    stage: "consume-stream",
                    model_id,
                })?;
            output.push_str(&fragment);
            fragment_count += 1;
        }

        tracing::debug!(
            model_id = %model_id,
            fragment_count,
            output_len = output.len(),
            "token stream consumed"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{Script, ScriptedSource};

    fn request() -> GenerationRequest {
        GenerationRequest::new("system", "user")
    }

    #[tokio::test]
    async fn concatenates_fragments_in_arrival_order() {
        let source = Arc::new(ScriptedSource::new([Script::tokens([
            "Gravity ", "is ", "is ", "a pull.",
        ])]));
        let client = GenerationClient::new(source.clone());

        let output = client.generate(&request()).await.expect("generation succeeds");

        // Repeated fragments are kept; no dedup.
        assert_eq!(output, "Gravity is is a pull.");
        assert_eq!(source.requests(), vec![request()]);
    }

    #[tokio::test]
    async fn failure_mid_stream_returns_no_partial_text() {
        let source = Arc::new(ScriptedSource::new([Script::fail_after(
            ["partial ", "answer"],
            "connection reset",
        )]));
        let client = GenerationClient::new(source);

        let failure = client
            .generate(&request())
            .await
            .expect_err("generation fails");

        assert_eq!(failure.stage, "consume-stream");
        assert!(failure.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn failure_to_open_is_reported() {
        let source = Arc::new(ScriptedSource::new([Script::fail_open("unauthorized")]));
        let client = GenerationClient::new(source);

        let failure = client
            .generate(&request())
            .await
            .expect_err("generation fails");

        assert_eq!(failure.stage, "open-stream");
        assert_eq!(failure.model_id, crate::MODEL_ID);
    }

    #[tokio::test]
    async fn empty_stream_is_empty_text() {
        let source = Arc::new(ScriptedSource::new([Script::tokens(Vec::<String>::new())]));
        let client = GenerationClient::new(source);

        assert_eq!(client.generate(&request()).await.expect("succeeds"), "");
    }
}
