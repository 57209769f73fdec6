use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::{
    dates::{DateRange, format_date_for_display},
    error::{ReflectError, Result},
    types::{LlmOptions, LlmProvider},
};

const TEMPERATURE: f32 = 0.7;
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 4096;

pub const CONTRIBUTIONS_SUMMARY_PROMPT: &str = include_str!("../prompts/contributions-summary.md");
pub const BRAG_DOCUMENT_PROMPT: &str = include_str!("../prompts/brag-document.md");

/// A chat-style completion endpoint.
#[async_trait]
pub trait LlmClient {
    /// Sends `instructions` as the system prompt and `input` as the user
    /// message, returning the generated text.
    async fn complete(&self, instructions: &str, input: &str) -> Result<String>;
}

/// Condenses the contributions report.
pub async fn generate_contributions_summary<C>(client: &C, contributions: &str) -> Result<String>
where
    C: LlmClient + Sync + ?Sized,
{
    client
        .complete(CONTRIBUTIONS_SUMMARY_PROMPT, contributions)
        .await
}

/// Turns the summary into a brag document for the given period.
pub async fn generate_brag_document<C>(
    client: &C,
    summary: &str,
    date_range: &DateRange,
) -> Result<String>
where
    C: LlmClient + Sync + ?Sized,
{
    client
        .complete(BRAG_DOCUMENT_PROMPT, &brag_input(summary, date_range))
        .await
}

pub fn brag_input(summary: &str, date_range: &DateRange) -> String {
    format!(
        "Time Period: From {} to {}\n\n{}",
        format_date_for_display(date_range.start()),
        format_date_for_display(date_range.end()),
        summary
    )
}

/// Reads the API key for `provider`, failing before any request is made.
pub fn get_api_key(provider: LlmProvider) -> Result<String> {
    std::env::var(provider.api_key_var())
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or(ReflectError::MissingCredential(provider.api_key_var()))
}

/// Builds the client for the configured provider, honouring the
/// provider's base-URL override variable.
pub fn create_client(
    options: &LlmOptions,
    api_key: String,
    debug: bool,
) -> Result<Box<dyn LlmClient + Send + Sync>> {
    let base_url = std::env::var(options.provider.base_url_var())
        .ok()
        .filter(|url| !url.trim().is_empty());
    let base_url = parse_base_url(
        base_url
            .as_deref()
            .unwrap_or(options.provider.default_base_url()),
    )?;

    let http = reqwest::Client::new();
    let model = options.model().to_string();

    Ok(match options.provider {
        LlmProvider::OpenAi => Box::new(OpenAiClient {
            http,
            endpoint: join_endpoint(&base_url, "responses")?,
            api_key,
            model,
            debug,
        }),
        LlmProvider::Anthropic => Box::new(AnthropicClient {
            http,
            endpoint: join_endpoint(&base_url, "v1/messages")?,
            api_key,
            model,
            debug,
        }),
    })
}

/// Parses a base URL, adding the trailing slash `Url::join` needs to keep
/// the last path segment.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized)
        .map_err(|e| ReflectError::Upstream(format!("Invalid LLM base URL '{raw}': {e}")))
}

fn join_endpoint(base: &Url, path: &str) -> Result<Url> {
    base.join(path)
        .map_err(|e| ReflectError::Upstream(format!("Invalid LLM endpoint '{path}': {e}")))
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

async fn send_json(
    provider: &str,
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
) -> Result<String> {
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| ReflectError::Upstream(format!("{provider} API error: {e}")))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ReflectError::Upstream(format!("{provider} API error: {e}")))?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorEnvelope>(&text)
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| format!("HTTP {status}"));
        return Err(ReflectError::Upstream(format!("{provider} API error: {message}")));
    }

    Ok(text)
}

/// OpenAI Responses API client.
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
    debug: bool,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiResponse {
    pub model: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub output: Vec<OpenAiOutputItem>,
    pub usage: Option<OpenAiUsage>,
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiOutputItem {
    #[serde(default)]
    pub content: Vec<OpenAiContent>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl OpenAiResponse {
    /// Concatenated `output_text` parts, or a placeholder when there are none.
    pub fn output_text(&self) -> String {
        let text: String = self
            .output
            .iter()
            .flat_map(|item| &item.content)
            .filter(|content| content.kind == "output_text")
            .filter_map(|content| content.text.as_deref())
            .collect();

        if text.is_empty() {
            "Empty response from OpenAI".to_string()
        } else {
            text
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, instructions: &str, input: &str) -> Result<String> {
        info!("Sending request to OpenAI ({})", self.model);
        let body = serde_json::json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "instructions": instructions,
            "input": input,
        });
        let request = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key);

        let text = send_json("OpenAI", request, &body).await?;
        let response: OpenAiResponse = serde_json::from_str(&text)
            .map_err(|e| ReflectError::Upstream(format!("Unexpected OpenAI response: {e}")))?;

        if let Some(error) = response.error.as_ref().filter(|error| !error.is_null()) {
            let message = error
                .get("message")
                .and_then(|message| message.as_str())
                .unwrap_or("Unknown error");
            return Err(ReflectError::Upstream(format!("OpenAI API error: {message}")));
        }

        if self.debug {
            if let Some(usage) = &response.usage {
                debug!(
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    total_tokens = usage.total_tokens,
                    model = response.model.as_deref().unwrap_or("-"),
                    status = response.status.as_deref().unwrap_or("-"),
                    "OpenAI usage"
                );
            }
        }

        Ok(response.output_text())
    }
}

/// Anthropic Messages API client.
pub struct AnthropicClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
    debug: bool,
}

#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    pub model: Option<String>,
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub content: Vec<AnthropicContent>,
    pub usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
pub struct AnthropicContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnthropicUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl AnthropicResponse {
    /// Text of the first content block, or a placeholder when it is not text.
    pub fn output_text(&self) -> String {
        match self.content.first() {
            Some(AnthropicContent {
                kind,
                text: Some(text),
            }) if kind == "text" => text.clone(),
            _ => "Empty response from Anthropic".to_string(),
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, instructions: &str, input: &str) -> Result<String> {
        info!("Sending request to Anthropic ({})", self.model);
        let body = serde_json::json!({
            "model": self.model,
            "system": instructions,
            "messages": [{ "role": "user", "content": input }],
            "temperature": TEMPERATURE,
            "max_tokens": ANTHROPIC_MAX_TOKENS,
        });
        let request = self
            .http
            .post(self.endpoint.clone())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);

        let text = send_json("Anthropic", request, &body).await?;
        let response: AnthropicResponse = serde_json::from_str(&text)
            .map_err(|e| ReflectError::Upstream(format!("Unexpected Anthropic response: {e}")))?;

        if self.debug {
            if let Some(usage) = &response.usage {
                debug!(
                    input_tokens = usage.input_tokens,
                    output_tokens = usage.output_tokens,
                    total_tokens = usage.input_tokens + usage.output_tokens,
                    model = response.model.as_deref().unwrap_or("-"),
                    stop_reason = response.stop_reason.as_deref().unwrap_or("-"),
                    "Anthropic usage"
                );
            }
        }

        Ok(response.output_text())
    }
}
