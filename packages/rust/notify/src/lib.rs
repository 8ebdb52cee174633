//! Report writing and delivery.
//!
//! Renders a validated [`AnalysisReport`](newsdesk_shared::AnalysisReport) and
//! publishes it to one channel:
//! - [`ResendNotifier`]: HTML email through the Resend API
//! - [`WebhookNotifier`]: `{"text": ...}` POST to a chat incoming webhook
//! - [`ConsoleNotifier`]: stdout, for dry runs
//!
//! Delivery is attempted once. Failures are reported, never retried.

mod render;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use url::Url;

use newsdesk_shared::{
    ChannelKind, DeliveryConfig, ERROR_BODY_EXCERPT, HttpConfig, NewsdeskError, Result, excerpt,
    read_secret,
};

pub use render::{RenderedReport, render_report};

/// User-Agent string for delivery requests.
const USER_AGENT: &str = concat!("Newsdesk/", env!("CARGO_PKG_VERSION"));

/// Confirmation that a report was accepted by its channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub channel: ChannelKind,
    /// Provider message id, when the channel returns one.
    pub message_id: Option<String>,
}

fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| NewsdeskError::Network(format!("failed to build HTTP client: {e}")))
}

// ---------------------------------------------------------------------------
// Email (Resend)
// ---------------------------------------------------------------------------

/// Resend email settings.
#[derive(Debug, Clone)]
pub struct ResendOptions {
    pub base_url: String,
    pub api_key: String,
    pub from: String,
    pub to: Vec<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}

/// Sends reports as HTML email through the Resend API.
#[derive(Debug, Clone)]
pub struct ResendNotifier {
    client: Client,
    opts: ResendOptions,
}

impl ResendNotifier {
    pub fn new(opts: ResendOptions) -> Result<Self> {
        if opts.to.is_empty() {
            return Err(NewsdeskError::validation("no email recipients configured"));
        }
        for address in std::iter::once(&opts.from).chain(opts.to.iter()) {
            if !looks_like_address(address) {
                return Err(NewsdeskError::validation(format!(
                    "'{address}' is not a valid email address"
                )));
            }
        }

        Ok(Self {
            client: build_client(opts.timeout_secs)?,
            opts,
        })
    }

    #[instrument(skip_all, fields(subject = %report.subject, recipients = self.opts.to.len()))]
    pub async fn deliver(&self, report: &RenderedReport) -> Result<DeliveryReceipt> {
        let url = format!("{}/emails", self.opts.base_url.trim_end_matches('/'));
        let request = SendEmailRequest {
            from: &self.opts.from,
            to: &self.opts.to,
            subject: &report.subject,
            html: &report.html,
            text: &report.text,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.opts.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| NewsdeskError::Delivery(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NewsdeskError::Delivery(format!(
                "{url}: HTTP {status}: {}",
                excerpt(&body, ERROR_BODY_EXCERPT)
            )));
        }

        let sent: SendEmailResponse = response
            .json()
            .await
            .map_err(|e| NewsdeskError::Delivery(format!("{url}: invalid response body: {e}")))?;

        info!(message_id = %sent.id, "email report sent");
        Ok(DeliveryReceipt {
            channel: ChannelKind::Email,
            message_id: Some(sent.id),
        })
    }
}

fn looks_like_address(address: &str) -> bool {
    // Accept both `a@b.c` and `Name <a@b.c>`.
    let bare = match (address.find('<'), address.rfind('>')) {
        (Some(open), Some(close)) if open < close => &address[open + 1..close],
        _ => address,
    };
    match bare.trim().split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Chat webhook
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Posts reports to an incoming chat webhook (Slack-compatible payload).
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: Url,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| NewsdeskError::validation(format!("invalid webhook URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(NewsdeskError::validation(format!(
                "webhook URL must be http(s), got '{}'",
                url.scheme()
            )));
        }

        Ok(Self {
            client: build_client(timeout_secs)?,
            url,
        })
    }

    #[instrument(skip_all, fields(subject = %report.subject, host = self.url.host_str().unwrap_or("")))]
    pub async fn deliver(&self, report: &RenderedReport) -> Result<DeliveryReceipt> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&WebhookPayload { text: &report.text })
            .send()
            .await
            .map_err(|e| NewsdeskError::Delivery(format!("webhook: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NewsdeskError::Delivery(format!(
                "webhook: HTTP {status}: {}",
                excerpt(&body, ERROR_BODY_EXCERPT)
            )));
        }

        info!("webhook report posted");
        Ok(DeliveryReceipt {
            channel: ChannelKind::Webhook,
            message_id: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// Destination for console output, e.g. a writer that pauses a live spinner.
pub type ConsoleSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Prints reports to stdout, or to a caller-supplied sink.
#[derive(Clone, Default)]
pub struct ConsoleNotifier {
    sink: Option<ConsoleSink>,
}

impl std::fmt::Debug for ConsoleNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleNotifier")
            .field("sink", &self.sink.as_ref().map(|_| "custom"))
            .finish()
    }
}

impl ConsoleNotifier {
    pub fn with_sink(sink: ConsoleSink) -> Self {
        Self { sink: Some(sink) }
    }

    pub async fn deliver(&self, report: &RenderedReport) -> Result<DeliveryReceipt> {
        let block = format!("\n=== {} ===\n\n{}", report.subject, report.text);
        match &self.sink {
            Some(sink) => sink(&block),
            None => println!("{block}"),
        }
        Ok(DeliveryReceipt {
            channel: ChannelKind::Console,
            message_id: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Channel dispatch
// ---------------------------------------------------------------------------

/// The configured delivery channel.
#[derive(Debug, Clone)]
pub enum Notifier {
    Email(ResendNotifier),
    Webhook(WebhookNotifier),
    Console(ConsoleNotifier),
}

impl Notifier {
    /// Build the notifier for `kind`, reading credentials from the env vars
    /// named in `delivery`.
    pub fn from_config(kind: ChannelKind, delivery: &DeliveryConfig, http: &HttpConfig) -> Result<Self> {
        match kind {
            ChannelKind::Email => {
                let opts = ResendOptions {
                    base_url: delivery.resend_base_url.clone(),
                    api_key: read_secret(&delivery.resend_api_key_env)?,
                    from: read_secret(&delivery.sender_env)?,
                    to: split_recipients(&read_secret(&delivery.recipient_env)?),
                    timeout_secs: http.timeout_secs,
                };
                Ok(Self::Email(ResendNotifier::new(opts)?))
            }
            ChannelKind::Webhook => {
                let url = read_secret(&delivery.webhook_url_env)?;
                Ok(Self::Webhook(WebhookNotifier::new(&url, http.timeout_secs)?))
            }
            ChannelKind::Console => Ok(Self::Console(ConsoleNotifier::default())),
        }
    }

    pub fn kind(&self) -> ChannelKind {
        match self {
            Self::Email(_) => ChannelKind::Email,
            Self::Webhook(_) => ChannelKind::Webhook,
            Self::Console(_) => ChannelKind::Console,
        }
    }

    /// Deliver one rendered report. Exactly one attempt is made.
    pub async fn deliver(&self, report: &RenderedReport) -> Result<DeliveryReceipt> {
        match self {
            Self::Email(n) => n.deliver(report).await,
            Self::Webhook(n) => n.deliver(report).await,
            Self::Console(n) => n.deliver(report).await,
        }
    }
}

/// Split a comma-separated recipient list.
pub fn split_recipients(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rendered() -> RenderedReport {
        RenderedReport {
            subject: "Daily AI BI Report: Topic A".into(),
            html: "<h1>Business Intelligence Report: Topic A</h1>".into(),
            text: "*Business Intelligence Report: Topic A*".into(),
        }
    }

    fn resend(server: &MockServer) -> ResendNotifier {
        ResendNotifier::new(ResendOptions {
            base_url: server.uri(),
            api_key: "re_test".into(),
            from: "Newsdesk <reports@example.com>".into(),
            to: vec!["team@example.com".into()],
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn address_validation() {
        assert!(looks_like_address("a@b.io"));
        assert!(looks_like_address("Reports <reports@example.com>"));
        assert!(!looks_like_address("not-an-address"));
        assert!(!looks_like_address("@example.com"));
        assert!(!looks_like_address("a@localhost"));
    }

    #[test]
    fn recipients_are_split_and_trimmed() {
        assert_eq!(
            split_recipients(" a@x.io, ,b@y.io "),
            ["a@x.io", "b@y.io"]
        );
    }

    #[test]
    fn resend_rejects_bad_configuration() {
        let opts = ResendOptions {
            base_url: "https://api.resend.com".into(),
            api_key: "k".into(),
            from: "reports@example.com".into(),
            to: vec![],
            timeout_secs: 5,
        };
        assert!(ResendNotifier::new(opts.clone()).is_err());

        let opts = ResendOptions {
            to: vec!["nobody".into()],
            ..opts
        };
        assert!(ResendNotifier::new(opts).is_err());
    }

    #[test]
    fn webhook_rejects_non_http_urls() {
        assert!(WebhookNotifier::new("ftp://hooks.example.com/x", 5).is_err());
        assert!(WebhookNotifier::new("not a url", 5).is_err());
    }

    #[tokio::test]
    async fn resend_delivery_returns_message_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re_test"))
            .and(body_partial_json(serde_json::json!({
                "subject": "Daily AI BI Report: Topic A",
                "to": ["team@example.com"],
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "email-123" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let receipt = resend(&server).deliver(&rendered()).await.unwrap();
        assert_eq!(receipt.channel, ChannelKind::Email);
        assert_eq!(receipt.message_id.as_deref(), Some("email-123"));
    }

    #[tokio::test]
    async fn resend_failure_is_delivery_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid from address"))
            .expect(1)
            .mount(&server)
            .await;

        let err = resend(&server).deliver(&rendered()).await.unwrap_err();
        match err {
            NewsdeskError::Delivery(msg) => assert!(msg.contains("422")),
            other => panic!("expected Delivery error, got {other}"),
        }
    }

    #[tokio::test]
    async fn webhook_posts_text_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/hooks/newsdesk"))
            .and(body_partial_json(serde_json::json!({
                "text": "*Business Intelligence Report: Topic A*"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = Notifier::Webhook(
            WebhookNotifier::new(&format!("{}/hooks/newsdesk", server.uri()), 5).unwrap(),
        );
        let receipt = notifier.deliver(&rendered()).await.unwrap();
        assert_eq!(receipt.channel, ChannelKind::Webhook);
        assert_eq!(notifier.kind(), ChannelKind::Webhook);
    }

    #[tokio::test]
    async fn console_delivery_always_succeeds() {
        let receipt = Notifier::Console(ConsoleNotifier::default())
            .deliver(&rendered())
            .await
            .unwrap();
        assert_eq!(receipt.channel, ChannelKind::Console);
        assert!(receipt.message_id.is_none());
    }

    #[tokio::test]
    async fn console_delivery_writes_to_sink() {
        let captured = Arc::new(std::sync::Mutex::new(String::new()));
        let buffer = Arc::clone(&captured);
        let notifier = ConsoleNotifier::with_sink(Arc::new(move |block: &str| {
            buffer.lock().unwrap().push_str(block);
        }));

        notifier.deliver(&rendered()).await.unwrap();

        let out = captured.lock().unwrap();
        assert!(out.contains("=== Daily AI BI Report: Topic A ==="));
        assert!(out.contains("*Business Intelligence Report: Topic A*"));
    }

    #[test]
    fn console_needs_no_credentials() {
        let notifier = Notifier::from_config(
            ChannelKind::Console,
            &DeliveryConfig::default(),
            &HttpConfig::default(),
        )
        .unwrap();
        assert_eq!(notifier.kind(), ChannelKind::Console);
    }
}
