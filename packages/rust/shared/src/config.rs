//! Application configuration for Newsdesk.
//!
//! User config lives at `~/.newsdesk/newsdesk.toml`.
//! CLI flags override environment variables, which override config file
//! values, which override defaults. Secrets never live in the file: it only
//! names the environment variables that hold them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NewsdeskError, Result};
use crate::types::Topic;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "newsdesk.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".newsdesk";

/// Environment variable holding a comma-separated topic list.
pub const TOPICS_ENV_VAR: &str = "TOPICS_TO_RESEARCH";

/// Topics researched when nothing else is configured.
pub const DEFAULT_TOPICS: [&str; 3] = [
    "NVIDIA stock performance",
    "Latest advancements in autonomous driving",
    "Market trends in renewable energy",
];

// ---------------------------------------------------------------------------
// Config structs (matching newsdesk.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Topics to research on each run. Empty means "use the defaults".
    #[serde(default)]
    pub topics: Vec<String>,

    /// Search provider settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Text-generation provider settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Report delivery settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// HTTP client settings shared by all providers.
    #[serde(default)]
    pub http: HttpConfig,
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Name of the env var holding the search API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Search API base URL.
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Maximum number of results requested per topic.
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Provider search depth: "basic" or "advanced".
    #[serde(default = "default_search_depth")]
    pub search_depth: String,

    /// Articles with less cleaned text than this are considered unusable.
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            base_url: default_search_base_url(),
            max_results: default_max_results(),
            search_depth: default_search_depth(),
            min_content_chars: default_min_content_chars(),
        }
    }
}

fn default_search_key_env() -> String {
    "TAVILY_API_KEY".into()
}
fn default_search_base_url() -> String {
    "https://api.tavily.com".into()
}
fn default_max_results() -> u32 {
    5
}
fn default_search_depth() -> String {
    "basic".into()
}
fn default_min_content_chars() -> usize {
    40
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,

    /// OpenAI-compatible API base URL.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model used for analysis.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,

    /// Upper bound on article text sent to the model.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_llm_key_env(),
            base_url: default_llm_base_url(),
            model: default_model(),
            temperature: 0.0,
            max_context_chars: default_max_context_chars(),
        }
    }
}

fn default_llm_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_max_context_chars() -> usize {
    24_000
}

/// Where finished reports are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// HTML email through the Resend API.
    #[default]
    Email,
    /// JSON `{"text": ...}` POST to an incoming chat webhook.
    Webhook,
    /// Print to stdout.
    Console,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Webhook => "webhook",
            Self::Console => "console",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChannelKind {
    type Err = NewsdeskError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "webhook" => Ok(Self::Webhook),
            "console" => Ok(Self::Console),
            other => Err(NewsdeskError::config(format!(
                "unknown delivery channel '{other}': expected 'email', 'webhook', or 'console'"
            ))),
        }
    }
}

/// `[delivery]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Channel used when the CLI does not override it.
    #[serde(default)]
    pub channel: ChannelKind,

    /// Subject line prefix; the topic is appended.
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,

    /// Name of the env var holding the Resend API key.
    #[serde(default = "default_resend_key_env")]
    pub resend_api_key_env: String,

    /// Resend API base URL.
    #[serde(default = "default_resend_base_url")]
    pub resend_base_url: String,

    /// Name of the env var holding the sender address.
    #[serde(default = "default_sender_env")]
    pub sender_env: String,

    /// Name of the env var holding the recipient address(es), comma-separated.
    #[serde(default = "default_recipient_env")]
    pub recipient_env: String,

    /// Name of the env var holding the chat webhook URL.
    #[serde(default = "default_webhook_url_env")]
    pub webhook_url_env: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            channel: ChannelKind::default(),
            subject_prefix: default_subject_prefix(),
            resend_api_key_env: default_resend_key_env(),
            resend_base_url: default_resend_base_url(),
            sender_env: default_sender_env(),
            recipient_env: default_recipient_env(),
            webhook_url_env: default_webhook_url_env(),
        }
    }
}

fn default_subject_prefix() -> String {
    "Daily AI BI Report".into()
}
fn default_resend_key_env() -> String {
    "RESEND_API_KEY".into()
}
fn default_resend_base_url() -> String {
    "https://api.resend.com".into()
}
fn default_sender_env() -> String {
    "EMAIL_SENDER_ADDRESS".into()
}
fn default_recipient_env() -> String {
    "EMAIL_RECIPIENT_ADDRESS".into()
}
fn default_webhook_url_env() -> String {
    "NEWSDESK_WEBHOOK_URL".into()
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.newsdesk/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| NewsdeskError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.newsdesk/newsdesk.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| NewsdeskError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| NewsdeskError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| NewsdeskError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| NewsdeskError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| NewsdeskError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

/// Parse a comma-separated topic list. Blank items and repeats are dropped.
pub fn parse_topics(list: &str) -> Vec<Topic> {
    collect_topics(list.split(','))
}

/// Build topics from individual items. Blank items and repeats are dropped.
fn collect_topics<I, S>(items: I) -> Vec<Topic>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut topics: Vec<Topic> = Vec::new();
    for item in items {
        if let Ok(topic) = Topic::new(item) {
            if !topics.contains(&topic) {
                topics.push(topic);
            }
        }
    }
    topics
}

/// Pick the topic list for this run.
///
/// Precedence: CLI flag, then the `TOPICS_TO_RESEARCH` value, then the
/// config file, then [`DEFAULT_TOPICS`]. A source that parses to no topics
/// is skipped.
pub fn resolve_topics(
    cli_flag: Option<&str>,
    env_value: Option<&str>,
    config: &AppConfig,
) -> Vec<Topic> {
    for source in [cli_flag, env_value].into_iter().flatten() {
        let topics = parse_topics(source);
        if !topics.is_empty() {
            return topics;
        }
    }

    // File entries are already a list; commas inside them belong to the topic.
    let from_file = collect_topics(&config.topics);
    if !from_file.is_empty() {
        return from_file;
    }

    tracing::info!(env = TOPICS_ENV_VAR, "no topics configured, using defaults");
    DEFAULT_TOPICS
        .iter()
        .filter_map(|t| Topic::new(t).ok())
        .collect()
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Read a non-empty secret from the named environment variable.
pub fn read_secret(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(NewsdeskError::config(format!(
            "environment variable {var_name} is not set"
        ))),
    }
}

/// Check every env var the run needs for `channel` before any network call.
///
/// All missing variables are reported in one error.
pub fn validate_credentials(config: &AppConfig, channel: ChannelKind) -> Result<()> {
    let mut required = vec![
        config.search.api_key_env.as_str(),
        config.llm.api_key_env.as_str(),
    ];

    match channel {
        ChannelKind::Email => {
            required.push(&config.delivery.resend_api_key_env);
            required.push(&config.delivery.sender_env);
            required.push(&config.delivery.recipient_env);
        }
        ChannelKind::Webhook => required.push(&config.delivery.webhook_url_env),
        ChannelKind::Console => {}
    }

    let missing: Vec<&str> = required
        .into_iter()
        .filter(|name| read_secret(name).is_err())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(NewsdeskError::config(format!(
            "missing credentials for channel '{channel}'. Set: {}",
            missing.join(", ")
        )))
    }
}
