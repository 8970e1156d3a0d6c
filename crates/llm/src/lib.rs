use std::sync::Arc;

mod client;
mod model;
mod provider;
mod replicate;
mod request;
#[cfg(any(test, feature = "testing"))]
mod scripted;
mod sse;

pub use client::GenerationClient;
pub use client::GenerationFailure;
pub use model::{
    DEFAULT_ENDPOINT, GenerationParameters, MODEL_ID, PROMPT_TEMPLATE, STOP_SEQUENCES,
};
pub use provider::{
    BoxFuture, ProviderConfig, ProviderError, ProviderResult, TokenSource, TokenStream,
};
pub use replicate::{REPLICATE_PROVIDER_ID, ReplicateSource};
pub use request::GenerationRequest;
#[cfg(any(test, feature = "testing"))]
pub use scripted::{SCRIPTED_PROVIDER_ID, Script, ScriptedSource};

pub fn create_source(config: ProviderConfig) -> ProviderResult<Arc<dyn TokenSource>> {
    Ok(Arc::new(ReplicateSource::new(config)?))
}

pub fn create_client(config: ProviderConfig) -> ProviderResult<GenerationClient> {
    create_source(config).map(GenerationClient::new)
}
