//! OpenAI-compatible chat-completions client. Also serves Ollama through its `/v1` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use clarity_core::config::LlmConfig;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::llm::{
    ChatMessage, LlmClient, LlmError, Planner, PlannerStep, Role, ToolDeclaration, ToolInvocation,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2, base_delay_ms: 500, max_delay_ms: 8_000 }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

pub struct OpenAiChatClient {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    description_model: String,
    retry_policy: RetryPolicy,
}

impl OpenAiChatClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| LlmError::InvalidRequest(format!("http client: {error}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.effective_base_url()),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            description_model: config.effective_description_model().to_owned(),
            retry_policy: RetryPolicy { max_retries: config.max_retries, ..RetryPolicy::default() },
        })
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post_with_retry(&self, payload: &Value) -> Result<Value, LlmError> {
        let mut attempt = 0;
        loop {
            match self.post_once(payload).await {
                Ok(body) => return Ok(body),
                Err(error) if error.is_retryable() && attempt < self.retry_policy.max_retries => {
                    let delay = self.retry_policy.backoff(attempt);
                    warn!(
                        event_name = "llm.request.retry",
                        attempt,
                        max_retries = self.retry_policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "llm request failed; retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn post_once(&self, payload: &Value) -> Result<Value, LlmError> {
        let mut request = self.client.post(&self.endpoint).json(payload);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|error| {
            if error.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Network(error.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, body));
        }

        response.json::<Value>().await.map_err(|error| LlmError::Parse(error.to_string()))
    }
}

#[async_trait]
impl Planner for OpenAiChatClient {
    async fn next_step(
        &self,
        transcript: &[ChatMessage],
        tools: &[ToolDeclaration],
    ) -> Result<PlannerStep, LlmError> {
        let payload = chat_payload(&self.model, transcript, tools);
        let body = self.post_with_retry(&payload).await?;
        let step = parse_planner_step(&body)?;

        debug!(
            event_name = "llm.planner.step",
            model = %self.model,
            tool_calls = match &step {
                PlannerStep::FinalAnswer(_) => 0,
                PlannerStep::ToolInvocations(invocations) => invocations.len(),
            },
            "planner step received"
        );
        Ok(step)
    }
}

#[async_trait]
impl LlmClient for OpenAiChatClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let transcript = [ChatMessage::system(system), ChatMessage::user(prompt)];
        let mut payload = chat_payload(&self.description_model, &transcript, &[]);
        if let Value::Object(fields) = &mut payload {
            fields.insert("temperature".to_owned(), json!(0.7));
        }

        let body = self.post_with_retry(&payload).await?;
        match parse_planner_step(&body)? {
            PlannerStep::FinalAnswer(text) => Ok(text),
            PlannerStep::ToolInvocations(_) => {
                Err(LlmError::Parse("completion unexpectedly requested tool calls".to_owned()))
            }
        }
    }
}

fn error_for_status(status: StatusCode, body: String) -> LlmError {
    match status.as_u16() {
        401 | 403 => LlmError::AuthenticationFailed(body),
        429 => LlmError::RateLimited,
        code if code >= 500 => LlmError::ProviderUnavailable(format!("{status}: {body}")),
        _ => LlmError::InvalidRequest(format!("{status}: {body}")),
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

/// Chat-completions request body. Tools are offered with `tool_choice: auto` when present.
pub fn chat_payload(model: &str, transcript: &[ChatMessage], tools: &[ToolDeclaration]) -> Value {
    let messages = transcript.iter().map(wire_message).collect::<Vec<_>>();
    let mut payload = Map::new();
    payload.insert("model".to_owned(), json!(model));
    payload.insert("messages".to_owned(), Value::Array(messages));

    if !tools.is_empty() {
        let declarations = tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    }
                })
            })
            .collect::<Vec<_>>();
        payload.insert("tools".to_owned(), Value::Array(declarations));
        payload.insert("tool_choice".to_owned(), json!("auto"));
    }

    Value::Object(payload)
}

fn wire_message(message: &ChatMessage) -> Value {
    let mut wire = Map::new();
    wire.insert("role".to_owned(), json!(role_name(message.role)));
    wire.insert(
        "content".to_owned(),
        message.content.as_ref().map(|text| json!(text)).unwrap_or(Value::Null),
    );

    if !message.tool_invocations.is_empty() {
        let calls = message
            .tool_invocations
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": {"name": call.name, "arguments": call.arguments},
                })
            })
            .collect::<Vec<_>>();
        wire.insert("tool_calls".to_owned(), Value::Array(calls));
    }
    if let Some(tool_call_id) = &message.tool_call_id {
        wire.insert("tool_call_id".to_owned(), json!(tool_call_id));
    }

    Value::Object(wire)
}

/// Reads the first choice of a chat-completions response.
pub fn parse_planner_step(body: &Value) -> Result<PlannerStep, LlmError> {
    let message = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| LlmError::Parse("no message in first choice".to_owned()))?;

    let calls = message.get("tool_calls").and_then(Value::as_array).cloned().unwrap_or_default();
    if !calls.is_empty() {
        let invocations = calls.iter().map(parse_tool_call).collect::<Result<Vec<_>, _>>()?;
        return Ok(PlannerStep::ToolInvocations(invocations));
    }

    let content = message.get("content").and_then(Value::as_str).unwrap_or_default();
    Ok(PlannerStep::FinalAnswer(content.to_owned()))
}

fn parse_tool_call(call: &Value) -> Result<ToolInvocation, LlmError> {
    let id = call
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| LlmError::Parse("tool call without id".to_owned()))?;
    let function = call
        .get("function")
        .ok_or_else(|| LlmError::Parse(format!("tool call `{id}` without function")))?;
    let name = function
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| LlmError::Parse(format!("tool call `{id}` without name")))?;
    let arguments = function.get("arguments").and_then(Value::as_str).unwrap_or("{}");

    Ok(ToolInvocation { id: id.to_owned(), name: name.to_owned(), arguments: arguments.to_owned() })
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;

    use super::{chat_payload, error_for_status, parse_planner_step, RetryPolicy};
    use crate::llm::{ChatMessage, LlmError, PlannerStep, ToolDeclaration, ToolInvocation};

    #[test]
    fn payload_offers_tools_and_replays_tool_results() {
        let transcript = vec![
            ChatMessage::system("be helpful"),
            ChatMessage::user("analyze 701Hr000001L82yIAC"),
            ChatMessage::assistant_tool_calls(vec![ToolInvocation {
                id: "call_1".to_owned(),
                name: "get_campaign_data".to_owned(),
                arguments: "{\"campaign_id\":\"701Hr000001L82yIAC\"}".to_owned(),
            }]),
            ChatMessage::tool_result("call_1", "{\"success\":true}"),
        ];
        let tools = [ToolDeclaration {
            name: "get_campaign_data",
            description: "fetch",
            parameters: json!({"type": "object"}),
        }];

        let payload = chat_payload("gpt-4o", &transcript, &tools);

        assert_eq!(payload["model"], "gpt-4o");
        assert_eq!(payload["tool_choice"], "auto");
        assert_eq!(payload["tools"][0]["function"]["name"], "get_campaign_data");
        assert_eq!(payload["messages"][2]["content"], json!(null));
        assert_eq!(payload["messages"][2]["tool_calls"][0]["id"], "call_1");
        assert_eq!(payload["messages"][3]["role"], "tool");
        assert_eq!(payload["messages"][3]["tool_call_id"], "call_1");
    }

    #[test]
    fn payload_without_tools_omits_tool_choice() {
        let payload = chat_payload("gpt-4o-mini", &[ChatMessage::user("hi")], &[]);
        assert!(payload.get("tools").is_none());
        assert!(payload.get("tool_choice").is_none());
    }

    #[test]
    fn parses_tool_call_response() {
        let body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "enrich_campaign_context", "arguments": "{}"}
                    }]
                }
            }]
        });

        assert_eq!(
            parse_planner_step(&body),
            Ok(PlannerStep::ToolInvocations(vec![ToolInvocation {
                id: "call_9".to_owned(),
                name: "enrich_campaign_context".to_owned(),
                arguments: "{}".to_owned(),
            }]))
        );
    }

    #[test]
    fn parses_final_answer_and_rejects_empty_choices() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "done"}}]});
        assert_eq!(parse_planner_step(&body), Ok(PlannerStep::FinalAnswer("done".to_owned())));

        assert!(matches!(parse_planner_step(&json!({"choices": []})), Err(LlmError::Parse(_))));
    }

    #[test]
    fn maps_http_status_to_error_kind() {
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, "bad key".to_owned()),
            LlmError::AuthenticationFailed(_)
        ));
        assert_eq!(
            error_for_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            LlmError::RateLimited
        );
        assert!(error_for_status(StatusCode::BAD_GATEWAY, String::new()).is_retryable());
        assert!(!error_for_status(StatusCode::BAD_REQUEST, String::new()).is_retryable());
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy { max_retries: 5, base_delay_ms: 100, max_delay_ms: 350 };
        assert_eq!(policy.backoff(0).as_millis(), 100);
        assert_eq!(policy.backoff(1).as_millis(), 200);
        assert_eq!(policy.backoff(2).as_millis(), 350);
    }
}
