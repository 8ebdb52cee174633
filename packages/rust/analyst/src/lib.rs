//! Structured news analysis through an OpenAI-compatible chat completions API.
//!
//! The analyst sends the research output together with a strict JSON schema
//! (`response_format: json_schema`) and validates whatever comes back before
//! it can become an [`AnalysisReport`]. Refusals, truncated completions,
//! unparseable JSON, and schema violations all fail with
//! [`NewsdeskError::StructuredOutput`]; nothing unvalidated leaves this crate.

mod prompt;

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use newsdesk_shared::{
    AnalysisReport, Article, ERROR_BODY_EXCERPT, HttpConfig, LlmConfig, NewsdeskError,
    RawAnalysis, Result, Topic, excerpt,
};

pub use prompt::{SCHEMA_NAME, response_schema};

/// User-Agent string for generation requests.
const USER_AGENT: &str = concat!("Newsdesk/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Runtime analyst options, merged from config + resolved API key.
#[derive(Debug, Clone)]
pub struct AnalystOptions {
    /// API base URL, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on article text included in the prompt.
    pub max_context_chars: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl AnalystOptions {
    /// Build options from the `[llm]` and `[http]` config sections.
    pub fn from_config(llm: &LlmConfig, http: &HttpConfig, api_key: String) -> Self {
        Self {
            base_url: llm.base_url.clone(),
            api_key,
            model: llm.model.clone(),
            temperature: llm.temperature,
            max_context_chars: llm.max_context_chars,
            timeout_secs: http.timeout_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseFormat {
    JsonSchema { json_schema: JsonSchemaSpec },
}

#[derive(Debug, Serialize)]
struct JsonSchemaSpec {
    name: &'static str,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Chat completions client producing validated analysis reports.
#[derive(Debug, Clone)]
pub struct ChatAnalyst {
    client: Client,
    opts: AnalystOptions,
}

impl ChatAnalyst {
    /// Build a client with the configured timeout.
    pub fn new(opts: AnalystOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| NewsdeskError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, opts })
    }

    /// Analyze `articles` about `topic` into a schema-conforming report.
    #[instrument(skip_all, fields(topic = %topic, articles = articles.len(), model = %self.opts.model))]
    pub async fn analyze(&self, topic: &Topic, articles: &[Article]) -> Result<AnalysisReport> {
        if articles.is_empty() {
            return Err(NewsdeskError::degraded_input(topic.as_str()));
        }

        let url = format!(
            "{}/chat/completions",
            self.opts.base_url.trim_end_matches('/')
        );
        let request = ChatRequest {
            model: &self.opts.model,
            temperature: self.opts.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt::SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt::user_prompt(topic, articles, self.opts.max_context_chars),
                },
            ],
            response_format: ResponseFormat::JsonSchema {
                json_schema: JsonSchemaSpec {
                    name: SCHEMA_NAME,
                    strict: true,
                    schema: response_schema(),
                },
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.opts.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| NewsdeskError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NewsdeskError::Generation(format!(
                "{url}: HTTP {status}: {}",
                excerpt(&body, ERROR_BODY_EXCERPT)
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            NewsdeskError::Generation(format!("{url}: invalid response body: {e}"))
        })?;

        let usage = parsed.usage.unwrap_or_default();
        debug!(
            tokens_in = usage.prompt_tokens,
            tokens_out = usage.completion_tokens,
            "completion received"
        );

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            NewsdeskError::structured_output("completion contained no choices")
        })?;

        if let Some(refusal) = choice.message.refusal.filter(|r| !r.trim().is_empty()) {
            warn!(%refusal, "model refused to produce an analysis");
            return Err(NewsdeskError::structured_output(format!(
                "model refused: {refusal}"
            )));
        }

        if choice.finish_reason.as_deref() == Some("length") {
            return Err(NewsdeskError::structured_output(
                "completion was cut off before the JSON object closed",
            ));
        }

        let content = choice
            .message
            .content
            .ok_or_else(|| NewsdeskError::structured_output("completion has no content"))?;

        let report = parse_report(topic, &content)?;
        info!(
            findings = report.key_findings().len(),
            sentiment = %report.overall_sentiment(),
            "analysis complete"
        );
        Ok(report)
    }
}

/// Decode and validate raw generator output for `topic`.
///
/// A surrounding Markdown code fence is tolerated; anything else that is not
/// exactly the schema is rejected.
pub fn parse_report(topic: &Topic, content: &str) -> Result<AnalysisReport> {
    let json = strip_code_fence(content);
    let raw: RawAnalysis = serde_json::from_str(json).map_err(|e| {
        NewsdeskError::structured_output(format!("output is not a valid analysis object: {e}"))
    })?;
    AnalysisReport::validate(topic, raw)
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}
