//! OpenAI-compatible completion adapter.
//!
//! Speaks the chat completions protocol to OpenAI itself or to any
//! endpoint that mirrors it (Azure-style deployments take the `custom`
//! connection type). Uses browser `fetch()` via gloo-net; streaming reads
//! the response body through a `ReadableStreamDefaultReader` and feeds an
//! [`SseDecoder`].

use std::pin::Pin;
use async_trait::async_trait;
use futures::channel::mpsc::{self, UnboundedSender};
use futures::Stream;
use gloo_net::http::{Request, RequestBuilder, Response};
use js_sys::{Reflect, Uint8Array};
use serde::Deserialize;
use serde_json::{json, Value};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, ReadableStreamDefaultReader};

use chat_core::ports::*;
use chat_types::{
    ChatError, Result,
    config::Connection,
    message::{ChatMessage, Role},
};
use super::sse::SseDecoder;

/// Completion client. Holds no credentials: every request carries its
/// own [`Connection`].
#[derive(Debug, Default, Clone)]
pub struct OpenAiCompatClient;

impl OpenAiCompatClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait(?Send)]
impl CompletionPort for OpenAiCompatClient {
    async fn complete(&self, req: CompletionRequest) -> Result<CompletionResponse> {
        let body = build_request_body(&req, false);
        let response = authorize(Request::post(&req.connection.completions_url()), &req.connection)
            .json(&body)
            .map_err(|e| ChatError::Serialization(e.to_string()))?
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        if !response.ok() {
            return Err(error_from_response(response).await);
        }

        let data: ApiResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Serialization(e.to_string()))?;

        let choice = data.choices.into_iter().next().ok_or_else(|| ChatError::Upstream {
            status: 200,
            message: "No choices in response".to_string(),
        })?;

        let usage = data.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(CompletionResponse {
            message: parse_api_message(choice.message),
            usage,
        })
    }

    fn stream_complete(
        &self,
        req: CompletionRequest,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Stream<Item = CompletionEvent>>> {
        let (tx, rx) = mpsc::unbounded();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = pump_stream(req, &cancel, &tx).await {
                // An aborted fetch surfaces as a network error; the consumer
                // already knows it cancelled.
                if !cancel.is_cancelled() {
                    log::warn!("Completion stream failed: {}", e);
                    let _ = tx.unbounded_send(CompletionEvent::Error(e));
                }
            }
        });
        Box::pin(rx)
    }

    async fn list_models(&self, connection: &Connection) -> Result<Vec<String>> {
        let response = authorize(Request::get(&connection.models_url()), connection)
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        if !response.ok() {
            return Err(error_from_response(response).await);
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| ChatError::Serialization(e.to_string()))?;

        let mut models: Vec<String> = data["data"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m["id"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        models.sort();

        Ok(models)
    }
}

/// Drive one streaming request, forwarding decoded events to `tx` until the
/// stream ends, the token fires, or the receiver goes away.
async fn pump_stream(
    req: CompletionRequest,
    cancel: &CancellationToken,
    tx: &UnboundedSender<CompletionEvent>,
) -> Result<()> {
    let controller = AbortController::new().map_err(js_error)?;
    let signal = controller.signal();

    // The request scope ends with this function; only a turn cancel aborts.
    let request_scope = cancel.child_token();
    let watcher = request_scope.clone();
    let turn = cancel.clone();
    wasm_bindgen_futures::spawn_local(async move {
        watcher.cancelled().await;
        if turn.is_cancelled() {
            log::debug!("Aborting completion request");
            controller.abort();
        }
    });
    let _request_scope = request_scope.drop_guard();

    let body = build_request_body(&req, true);
    log::debug!(
        "POST {} (model {}, {} messages)",
        req.connection.completions_url(),
        req.model,
        req.messages.len()
    );

    let response = authorize(Request::post(&req.connection.completions_url()), &req.connection)
        .abort_signal(Some(&signal))
        .json(&body)
        .map_err(|e| ChatError::Serialization(e.to_string()))?
        .send()
        .await
        .map_err(|e| ChatError::Network(e.to_string()))?;

    if !response.ok() {
        return Err(error_from_response(response).await);
    }

    let stream = response
        .body()
        .ok_or_else(|| ChatError::Network("Response has no body".to_string()))?;
    let reader: ReadableStreamDefaultReader = stream.get_reader().unchecked_into();
    let mut decoder = SseDecoder::new(response.status());

    loop {
        if cancel.is_cancelled() || tx.is_closed() {
            let _ = reader.cancel();
            return Ok(());
        }

        let chunk = JsFuture::from(reader.read())
            .await
            .map_err(|e| ChatError::Network(format!("{:?}", e)))?;
        let done = Reflect::get(&chunk, &JsValue::from_str("done"))
            .map_err(js_error)?
            .as_bool()
            .unwrap_or(true);

        let events = if done {
            decoder.finish()
        } else {
            let value = Reflect::get(&chunk, &JsValue::from_str("value")).map_err(js_error)?;
            decoder.feed(&Uint8Array::new(&value).to_vec())
        };

        for event in events {
            let terminal = matches!(event, CompletionEvent::Done | CompletionEvent::Error(_));
            if tx.unbounded_send(event).is_err() || terminal {
                let _ = reader.cancel();
                return Ok(());
            }
        }

        // Body closed without a terminal event; dropping `tx` ends the
        // consumer's stream.
        if done {
            return Ok(());
        }
    }
}

/// Apply the connection's credential and query parameters.
fn authorize(builder: RequestBuilder, connection: &Connection) -> RequestBuilder {
    let mut builder = builder.header("Content-Type", "application/json");
    if let Some(token) = connection.bearer_token() {
        builder = builder.header("Authorization", &format!("Bearer {}", token));
    }
    if let Some(key) = connection.api_key_header() {
        builder = builder.header("api-key", key);
    }
    if let Some(version) = connection.version_query() {
        builder = builder.query([("api-version", version)]);
    }
    builder
}

fn build_request_body(req: &CompletionRequest, stream: bool) -> Value {
    let messages: Vec<Value> = req
        .messages
        .iter()
        .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
        .collect();

    json!({
        "model": req.model,
        "messages": messages,
        "stream": stream,
    })
}

async fn error_from_response(response: Response) -> ChatError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    let message = upstream_message(&body).unwrap_or_else(|| format!("HTTP {}: {}", status, body));
    classify_status(status, message)
}

/// Map a non-success HTTP status to the error taxonomy.
pub(crate) fn classify_status(status: u16, message: String) -> ChatError {
    match status {
        401 | 403 => ChatError::Auth(message),
        _ => ChatError::Upstream { status, message },
    }
}

/// Pull `error.message` out of an OpenAI-style error body.
pub(crate) fn upstream_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
        .filter(|message| !message.trim().is_empty())
}

fn js_error(value: JsValue) -> ChatError {
    ChatError::JsInterop(format!("{:?}", value))
}

// ─── API response types ──────────────────────────────────────

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

fn parse_api_message(api: ApiMessage) -> ChatMessage {
    let role = match api.role.as_str() {
        "system" => Role::System,
        "user" => Role::User,
        _ => Role::Assistant,
    };
    ChatMessage {
        role,
        content: api.content.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_types::settings::{ApiAuth, ApiType};

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-3.5-turbo".to_string(),
            messages: vec![
                ChatMessage::system("Be brief."),
                ChatMessage::user("Hello"),
            ],
            connection: Connection {
                api_key: "sk-test".to_string(),
                api_type: ApiType::OpenAi,
                api_auth: ApiAuth::BearerToken,
                api_base: "https://api.openai.com/v1".to_string(),
                api_version: "2023-03-15-preview".to_string(),
            },
        }
    }

    #[test]
    fn test_request_body_shape() {
        let body = build_request_body(&request(), true);
        assert_eq!(
            body,
            json!({
                "model": "gpt-3.5-turbo",
                "messages": [
                    { "role": "system", "content": "Be brief." },
                    { "role": "user", "content": "Hello" },
                ],
                "stream": true,
            })
        );
        assert_eq!(build_request_body(&request(), false)["stream"], json!(false));
    }

    #[test]
    fn test_upstream_message_extraction() {
        let body = r#"{"error":{"message":"Rate limit reached","type":"requests"}}"#;
        assert_eq!(upstream_message(body).as_deref(), Some("Rate limit reached"));
        assert_eq!(upstream_message("<html>bad gateway</html>"), None);
        assert_eq!(upstream_message(r#"{"error":{"message":"  "}}"#), None);
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(
            classify_status(401, "Incorrect API key".into()),
            ChatError::Auth("Incorrect API key".into())
        );
        assert!(matches!(classify_status(403, "no".into()), ChatError::Auth(_)));
        assert_eq!(
            classify_status(429, "slow down".into()),
            ChatError::Upstream { status: 429, message: "slow down".into() }
        );
    }

    #[test]
    fn test_parse_api_message_roles() {
        let msg = parse_api_message(ApiMessage { role: "assistant".into(), content: Some("Hi".into()) });
        assert_eq!(msg, ChatMessage::assistant("Hi"));
        let msg = parse_api_message(ApiMessage { role: "tool".into(), content: None });
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.content.is_empty());
    }
}
