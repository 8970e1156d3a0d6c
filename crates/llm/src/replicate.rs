use std::collections::VecDeque;

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt, ensure};

use super::model::{MODEL_ID, PROMPT_TEMPLATE};
use super::provider::{
    BoxFuture, HttpClientSnafu, MissingApiTokenSnafu, MissingStreamUrlSnafu,
    PredictionPayloadSnafu, PredictionStatusSnafu, ProviderConfig, ProviderError,
    ProviderResult, StreamInterruptedSnafu, TokenSource, TokenStream,
};
use super::request::GenerationRequest;
use super::sse::{SseDecoder, SseEvent};

pub const REPLICATE_PROVIDER_ID: &str = "replicate";

#[derive(Debug, Serialize)]
struct PredictionBody<'a> {
    stream: bool,
    input: PredictionInput<'a>,
}

#[derive(Debug, Serialize)]
struct PredictionInput<'a> {
    top_k: u32,
    top_p: f64,
    prompt: &'a str,
    system_prompt: &'a str,
    max_tokens: u32,
    max_new_tokens: u32,
    temperature: f64,
    length_penalty: f64,
    presence_penalty: f64,
    stop_sequences: String,
    prompt_template: &'static str,
    log_performance_metrics: bool,
}

#[derive(Debug, Deserialize)]
struct PredictionCreated {
    id: String,
    #[serde(default)]
    urls: PredictionUrls,
}

#[derive(Debug, Default, Deserialize)]
struct PredictionUrls {
    stream: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamStatusPayload {
    reason: Option<String>,
    detail: Option<String>,
}

/// Streaming adapter for the Replicate predictions API.
pub struct ReplicateSource {
    config: ProviderConfig,
    http: reqwest::Client,
}

impl ReplicateSource {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        ensure!(
            !config.api_token.is_empty(),
            MissingApiTokenSnafu {
                stage: "replicate-source-new",
                provider_id: REPLICATE_PROVIDER_ID,
            }
        );

        let http = reqwest::Client::builder()
            .user_agent(concat!("mentor/", env!("CARGO_PKG_VERSION")))
            .build()
            .context(HttpClientSnafu {
                stage: "build-client",
            })?;

        Ok(Self { config, http })
    }

    fn predictions_url(&self) -> String {
        format!("{}/models/{MODEL_ID}/predictions", self.config.endpoint)
    }

    fn prediction_body(request: &GenerationRequest) -> PredictionBody<'_> {
        let parameters = request.parameters();
        PredictionBody {
            stream: true,
            input: PredictionInput {
                top_k: parameters.top_k,
                top_p: parameters.top_p,
                prompt: request.user_prompt(),
                system_prompt: request.system_prompt(),
                max_tokens: parameters.max_tokens,
                max_new_tokens: parameters.max_new_tokens,
                temperature: parameters.temperature,
                length_penalty: parameters.length_penalty,
                presence_penalty: parameters.presence_penalty,
                stop_sequences: parameters.joined_stop_sequences(),
                prompt_template: PROMPT_TEMPLATE,
                log_performance_metrics: false,
            },
        }
    }

    async fn create_prediction(&self, request: &GenerationRequest) -> ProviderResult<String> {
        let response = self
            .http
            .post(self.predictions_url())
            .bearer_auth(&self.config.api_token)
            .json(&Self::prediction_body(request))
            .send()
            .await
            .context(HttpClientSnafu {
                stage: "send-prediction-request",
            })?;

        let status = response.status();
        let payload = response.text().await.context(HttpClientSnafu {
            stage: "read-prediction-response",
        })?;

        if !status.is_success() {
            return PredictionStatusSnafu {
                stage: "prediction-http-status",
                status: status.as_u16(),
                body: payload,
            }
            .fail();
        }

        let created: PredictionCreated =
            serde_json::from_str(&payload).context(PredictionPayloadSnafu {
                stage: "parse-prediction-response",
            })?;

        tracing::debug!(prediction_id = %created.id, "prediction created");

        created.urls.stream.context(MissingStreamUrlSnafu {
            stage: "read-stream-url",
            prediction_id: created.id,
        })
    }

    async fn open_event_stream(&self, stream_url: &str) -> ProviderResult<TokenStream> {
        let response = self
            .http
            .get(stream_url)
            .bearer_auth(&self.config.api_token)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await
            .context(HttpClientSnafu {
                stage: "open-event-stream",
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return PredictionStatusSnafu {
                stage: "event-stream-http-status",
                status: status.as_u16(),
                body,
            }
            .fail();
        }

        Ok(decode_token_stream(response.bytes_stream()))
    }
}

impl TokenSource for ReplicateSource {
    fn id(&self) -> &str {
        REPLICATE_PROVIDER_ID
    }

    fn model_id(&self) -> &str {
        MODEL_ID
    }

    fn open_stream<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, ProviderResult<TokenStream>> {
        Box::pin(async move {
            let stream_url = self.create_prediction(request).await?;
            self.open_event_stream(&stream_url).await
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamEventKind {
    Output,
    Done,
    Error,
    Other,
}

impl StreamEventKind {
    fn of(event: &SseEvent) -> Self {
        match event.event.as_str() {
            "output" => Self::Output,
            "done" => Self::Done,
            "error" => Self::Error,
            _ => Self::Other,
        }
    }
}

struct DecodeState<S> {
    chunks: S,
    decoder: SseDecoder,
    pending: VecDeque<SseEvent>,
    exhausted: bool,
    finished: bool,
}

/// Turns raw event-stream bytes into the token fragments of one prediction.
///
/// `output` events become fragments, `done` ends the sequence, and everything else that
/// terminates the stream (an `error` event, a failed `done`, transport failure, or EOF
/// before `done`) yields exactly one `Err` and then ends.
pub(crate) fn decode_token_stream<S, B, E>(chunks: S) -> TokenStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let state = DecodeState {
        chunks: Box::pin(chunks),
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        exhausted: false,
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }

            if let Some(event) = state.pending.pop_front() {
                match StreamEventKind::of(&event) {
                    StreamEventKind::Output => return Some((Ok(event.data), state)),
                    StreamEventKind::Done => {
                        state.finished = true;
                        return terminal_status(&event.data).map(|error| (Err(error), state));
                    }
                    StreamEventKind::Error => {
                        state.finished = true;
                        let error = ProviderError::ModelReported {
                            stage: "stream-error-event",
                            message: error_message(&event.data),
                        };
                        return Some((Err(error), state));
                    }
                    StreamEventKind::Other => continue,
                }
            }

            if state.exhausted {
                state.finished = true;
                let error = StreamInterruptedSnafu {
                    stage: "stream-eof",
                }
                .build();
                return Some((Err(error), state));
            }

            match state.chunks.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(chunk.as_ref());
                    state.pending.extend(events);
                }
                Some(Err(source)) => {
                    tracing::warn!(error = %source, "token stream transport failed");
                    state.finished = true;
                    let error = ProviderError::StreamTransport {
                        stage: "read-stream-chunk",
                        source: Box::new(source),
                    };
                    return Some((Err(error), state));
                }
                None => {
                    state.exhausted = true;
                    let events = state.decoder.finish();
                    state.pending.extend(events);
                }
            }
        }
    })
    .boxed()
}

/// A `done` event may still report that the prediction was canceled or failed.
fn terminal_status(data: &str) -> Option<ProviderError> {
    let payload = serde_json::from_str::<StreamStatusPayload>(data).unwrap_or_default();
    match payload.reason.as_deref() {
        Some(reason @ ("error" | "canceled")) => Some(ProviderError::ModelReported {
            stage: "stream-done-event",
            message: payload
                .detail
                .unwrap_or_else(|| format!("prediction ended with reason '{reason}'")),
        }),
        _ => None,
    }
}

fn error_message(data: &str) -> String {
    serde_json::from_str::<StreamStatusPayload>(data)
        .ok()
        .and_then(|payload| payload.detail)
        .unwrap_or_else(|| data.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GenerationParameters;

    fn chunks(
        parts: &[&str],
    ) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> + Send + use<> {
        let parts = parts
            .iter()
            .map(|part| Ok(part.as_bytes().to_vec()))
            .collect::<Vec<_>>();
        futures::stream::iter(parts)
    }

    async fn collect(stream: TokenStream) -> Vec<Result<String, String>> {
        stream
            .map(|item| item.map_err(|error| error.to_string()))
            .collect()
            .await
    }

    #[test]
    fn rejects_blank_api_token() {
        let result = ReplicateSource::new(ProviderConfig::new("  ", "https://example.test"));

        assert!(matches!(
            result,
            Err(ProviderError::MissingApiToken {
                stage: "replicate-source-new",
                ..
            })
        ));
    }

    #[test]
    fn prediction_body_carries_fixed_parameters() {
        let request = GenerationRequest::new("system", "user");
        let body = serde_json::to_value(ReplicateSource::prediction_body(&request))
            .expect("body serializes");

        assert_eq!(body["stream"], true);
        let input = &body["input"];
        assert_eq!(input["prompt"], "user");
        assert_eq!(input["system_prompt"], "system");
        assert_eq!(input["top_k"], 0);
        assert_eq!(input["top_p"], GenerationParameters::FIXED.top_p);
        assert_eq!(input["temperature"], GenerationParameters::FIXED.temperature);
        assert_eq!(input["max_new_tokens"], 512);
        assert_eq!(input["stop_sequences"], "<|end_of_text|>,<|eot_id|>");
        assert_eq!(input["prompt_template"], PROMPT_TEMPLATE);
        assert_eq!(input["log_performance_metrics"], false);
    }

    #[test]
    fn predictions_url_targets_fixed_model() {
        let source = ReplicateSource::new(ProviderConfig::new("token", "https://api.test/v1/"))
            .expect("source builds");

        assert_eq!(
            source.predictions_url(),
            "https://api.test/v1/models/meta/meta-llama-3-8b-instruct/predictions"
        );
    }

    #[tokio::test]
    async fn output_events_become_fragments_in_order() {
        let stream = decode_token_stream(chunks(&[
            "event: output\ndata: Hello\n\n",
            "event: output\ndata: , wor",
            "ld\n\nevent: done\ndata: {}\n\n",
        ]));

        assert_eq!(
            collect(stream).await,
            vec![Ok("Hello".to_string()), Ok(", world".to_string())]
        );
    }

    #[tokio::test]
    async fn error_event_terminates_with_model_message() {
        let stream = decode_token_stream(chunks(&[
            "event: output\ndata: partial\n\n",
            "event: error\ndata: {\"detail\":\"out of capacity\"}\n\n",
            "event: output\ndata: ignored\n\n",
        ]));

        let items = collect(stream).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Ok("partial".to_string()));
        assert_eq!(
            items[1],
            Err("model reported an error: out of capacity".to_string())
        );
    }

    #[tokio::test]
    async fn canceled_done_event_is_a_failure() {
        let stream = decode_token_stream(chunks(&[
            "event: done\ndata: {\"reason\":\"canceled\"}\n\n",
        ]));

        let items = collect(stream).await;
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }

    #[tokio::test]
    async fn eof_without_done_is_interrupted() {
        let stream = decode_token_stream(chunks(&["event: output\ndata: cut\n\n"]));

        let items = collect(stream).await;
        assert_eq!(items[0], Ok("cut".to_string()));
        assert_eq!(
            items[1],
            Err("token stream ended before a terminal event".to_string())
        );
    }

    #[tokio::test]
    async fn transport_error_is_terminal() {
        let parts: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"event: output\ndata: a\n\n".to_vec()),
            Err(std::io::Error::other("reset by peer")),
            Ok(b"event: output\ndata: b\n\n".to_vec()),
        ];

        let items = collect(decode_token_stream(futures::stream::iter(parts))).await;
        assert_eq!(items.len(), 2);
        assert!(items[1].as_ref().is_err_and(|message| message.contains("reset by peer")));
    }
}
