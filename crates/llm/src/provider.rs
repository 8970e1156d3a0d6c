use std::future::Future;
use std::pin::Pin;

use futures::stream::BoxStream;
use snafu::Snafu;

use super::request::GenerationRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_token: String,
    pub endpoint: String,
}

impl ProviderConfig {
    pub fn new(api_token: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into().trim().to_string(),
            endpoint: endpoint.into().trim().trim_end_matches('/').to_string(),
        }
    }
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Lazy, finite, non-restartable sequence of text fragments in arrival order.
///
/// The first `Err` item is terminal; sources stop yielding after it.
pub type TokenStream = BoxStream<'static, ProviderResult<String>>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ProviderError {
    #[snafu(display("missing API token for provider '{provider_id}'"))]
    MissingApiToken {
        stage: &'static str,
        provider_id: String,
    },
    #[snafu(display("http client failed on `{stage}`, {source}"))]
    HttpClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("prediction endpoint returned status {status}: {body}"))]
    PredictionStatus {
        stage: &'static str,
        status: u16,
        body: String,
    },
    #[snafu(display("failed to parse prediction payload on `{stage}`, {source}"))]
    PredictionPayload {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("prediction '{prediction_id}' did not expose a stream URL"))]
    MissingStreamUrl {
        stage: &'static str,
        prediction_id: String,
    },
    #[snafu(display("token stream transport failed on `{stage}`, {source}"))]
    StreamTransport {
        stage: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[snafu(display("model reported an error: {message}"))]
    ModelReported {
        stage: &'static str,
        message: String,
    },
    #[snafu(display("token stream ended before a terminal event"))]
    StreamInterrupted { stage: &'static str },
}

impl ProviderError {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::MissingApiToken { stage, .. }
            | Self::HttpClient { stage, .. }
            | Self::PredictionStatus { stage, .. }
            | Self::PredictionPayload { stage, .. }
            | Self::MissingStreamUrl { stage, .. }
            | Self::StreamTransport { stage, .. }
            | Self::ModelReported { stage, .. }
            | Self::StreamInterrupted { stage } => stage,
        }
    }
}

/// Substitutable origin of token streams.
///
/// The network adapter implements this for production; tests plug in a scripted source.
pub trait TokenSource: Send + Sync {
    fn id(&self) -> &str;
    fn model_id(&self) -> &str;
    fn open_stream<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, ProviderResult<TokenStream>>;
}
