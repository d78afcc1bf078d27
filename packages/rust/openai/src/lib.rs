//! OpenAI chat-completions client implementing
//! [`GenerationService`](shopscribe_shared::GenerationService).
//!
//! One request per [`CompletionRequest`]: a single user message, a
//! completion budget, and optionally a strict `json_schema` response
//! format. The reply text is returned as-is (trimmed); interpreting it is
//! the caller's job.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use shopscribe_shared::{
    CompletionRequest, GenerationService, OpenAiConfig, Result, RunConfig, ShopscribeError,
};

/// User-Agent string for generation requests.
const USER_AGENT: &str = concat!("Shopscribe/", env!("CARGO_PKG_VERSION"));

/// Name under which the article schema is registered with the service.
const SCHEMA_NAME: &str = "blog_article";

/// Connection and model settings.
#[derive(Clone)]
pub struct OpenAiOptions {
    /// API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    /// Send the request schema as a strict `response_format`.
    pub structured_output: bool,
}

impl std::fmt::Debug for OpenAiOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiOptions")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("structured_output", &self.structured_output)
            .finish()
    }
}

impl OpenAiOptions {
    pub fn from_config(run: &RunConfig, openai: &OpenAiConfig) -> Self {
        Self {
            base_url: openai.base_url.trim_end_matches('/').to_string(),
            api_key: run.openai_api_key.clone(),
            model: openai.model.clone(),
            timeout: Duration::from_secs(openai.timeout_secs),
            structured_output: openai.structured_output,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'static str,
    strict: bool,
    schema: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Chat-completions client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    options: OpenAiOptions,
    client: Client,
}

impl OpenAiClient {
    pub fn new(options: OpenAiOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(options.timeout)
            .build()
            .map_err(|e| ShopscribeError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { options, client })
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        let response_format = request
            .schema
            .as_ref()
            .filter(|_| self.options.structured_output)
            .map(|schema| ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: SCHEMA_NAME,
                    strict: true,
                    schema,
                },
            });

        ChatRequest {
            model: &self.options.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            max_completion_tokens: request.max_tokens,
            response_format,
        }
    }
}

#[async_trait]
impl GenerationService for OpenAiClient {
    #[instrument(skip_all, fields(max_tokens = request.max_tokens, schema = request.schema.is_some()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.options.base_url);
        debug!(model = %self.options.model, prompt_chars = request.prompt.len(), "requesting completion");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.options.api_key)
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| ShopscribeError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ShopscribeError::Network(format!("{url}: failed to read body: {e}")))?;
        if !status.is_success() {
            return Err(ShopscribeError::Http {
                status: status.as_u16(),
                url,
                body: text,
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| ShopscribeError::parse(format!("{url}: unexpected response shape: {e}")))?;

        if let Some(usage) = &parsed.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "completion usage"
            );
        }

        // An empty or missing message is not an error: the caller falls
        // back to local defaults.
        let choice = parsed.choices.into_iter().next();
        if let Some(reason) = choice.as_ref().and_then(|c| c.finish_reason.as_deref()) {
            debug!(finish_reason = reason, "completion finished");
        }
        Ok(choice
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .unwrap_or_default())
    }
}
