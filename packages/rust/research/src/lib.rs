//! News research: web search for a topic and article text cleanup.
//!
//! The research stage asks a search provider (Tavily) for recent news about a
//! topic. The provider does its own content extraction; we clean what comes
//! back, drop duplicates and snippets too short to analyze, and refuse to
//! hand an empty article set downstream.

mod cleanup;

use std::collections::HashSet;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use newsdesk_shared::{
    Article, ERROR_BODY_EXCERPT, HttpConfig, NewsdeskError, Result, SearchConfig, Topic, excerpt,
};

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("Newsdesk/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Runtime search options, merged from config + resolved API key.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// API base URL (no trailing `/search`).
    pub base_url: String,
    /// Bearer token for the provider.
    pub api_key: String,
    /// Maximum results requested per topic.
    pub max_results: u32,
    /// "basic" or "advanced".
    pub search_depth: String,
    /// Minimum cleaned content length for an article to count as usable.
    pub min_content_chars: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl SearchOptions {
    /// Build options from the `[search]` and `[http]` config sections.
    pub fn from_config(search: &SearchConfig, http: &HttpConfig, api_key: String) -> Self {
        Self {
            base_url: search.base_url.clone(),
            api_key,
            max_results: search.max_results,
            search_depth: search.search_depth.clone(),
            min_content_chars: search.min_content_chars,
            timeout_secs: http.timeout_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: String,
    max_results: u32,
    search_depth: &'a str,
    topic: &'static str,
    include_answer: bool,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// One raw result as returned by the provider, before cleanup.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Search query sent to the provider for a topic.
pub fn search_query(topic: &Topic) -> String {
    format!("latest news and top stories about {topic}")
}

/// HTTP client for the Tavily search API.
#[derive(Debug, Clone)]
pub struct TavilyClient {
    client: Client,
    opts: SearchOptions,
}

impl TavilyClient {
    /// Build a client with the configured timeout.
    pub fn new(opts: SearchOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| NewsdeskError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, opts })
    }

    /// Search for recent news about `topic` and return the usable articles.
    ///
    /// Fails with [`NewsdeskError::DegradedInput`] when nothing usable comes back.
    #[instrument(skip_all, fields(topic = %topic))]
    pub async fn search(&self, topic: &Topic) -> Result<Vec<Article>> {
        let url = format!("{}/search", self.opts.base_url.trim_end_matches('/'));
        let request = SearchRequest {
            query: search_query(topic),
            max_results: self.opts.max_results,
            search_depth: &self.opts.search_depth,
            topic: "news",
            include_answer: false,
            include_raw_content: false,
        };

        debug!(%url, query = %request.query, "sending search request");

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
            return Err(NewsdeskError::Search(format!(
                "{url}: HTTP {status}: {}",
                excerpt(&body, ERROR_BODY_EXCERPT)
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| NewsdeskError::Search(format!("{url}: invalid response body: {e}")))?;

        let returned = parsed.results.len();
        let articles = usable_articles(topic, parsed.results, self.opts.min_content_chars)?;

        info!(returned, usable = articles.len(), "research complete");
        Ok(articles)
    }
}

/// Clean raw hits, drop duplicates and short snippets, and reject empty sets.
pub fn usable_articles(
    topic: &Topic,
    hits: Vec<SearchHit>,
    min_content_chars: usize,
) -> Result<Vec<Article>> {
    let mut seen_urls = HashSet::new();
    let mut articles = Vec::new();

    for hit in hits {
        if !seen_urls.insert(hit.url.clone()) {
            debug!(url = %hit.url, "dropping duplicate result");
            continue;
        }

        let content = cleanup::run_pipeline(hit.content.as_deref().unwrap_or_default());
        let chars = content.chars().count();
        if chars < min_content_chars {
            debug!(url = %hit.url, chars, min_content_chars, "dropping result with too little content");
            continue;
        }

        let title = cleanup::run_pipeline(&hit.title);
        articles.push(Article {
            title: if title.is_empty() { hit.url.clone() } else { title },
            url: hit.url,
            content,
        });
    }

    if articles.is_empty() {
        warn!(topic = %topic, "search returned no usable content");
        return Err(NewsdeskError::degraded_input(topic.as_str()));
    }

    Ok(articles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn topic(name: &str) -> Topic {
        Topic::new(name).unwrap()
    }

    fn options(server: &MockServer) -> SearchOptions {
        SearchOptions::from_config(
            &SearchConfig {
                base_url: server.uri(),
                ..SearchConfig::default()
            },
            &HttpConfig::default(),
            "test-key".into(),
        )
    }

    fn hit(url: &str, content: &str) -> SearchHit {
        SearchHit {
            title: format!("Title for {url}"),
            url: url.into(),
            content: Some(content.into()),
        }
    }

    #[test]
    fn query_mentions_topic() {
        assert_eq!(
            search_query(&topic("Topic A")),
            "latest news and top stories about Topic A"
        );
    }

    #[test]
    fn usable_articles_filters_and_dedupes() {
        let long = "A sufficiently long article body about the topic at hand.";
        let hits = vec![
            hit("https://a.example/1", long),
            hit("https://a.example/1", long),
            hit("https://b.example/2", "too short"),
            SearchHit {
                title: String::new(),
                url: "https://c.example/3".into(),
                content: Some(format!("<p>{long}</p>")),
            },
        ];

        let articles = usable_articles(&topic("Topic A"), hits, 40).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].url, "https://a.example/1");
        assert_eq!(articles[1].content, long);
        // Missing title falls back to the URL
        assert_eq!(articles[1].title, "https://c.example/3");
    }

    #[test]
    fn content_length_is_measured_in_chars() {
        // 10 chars, 20 bytes
        let hits = vec![
            hit("https://a.example/1", "éééééééééé"),
            hit("https://b.example/2", "ééééééééé"),
        ];
        let articles = usable_articles(&topic("Topic A"), hits, 10).unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].url, "https://a.example/1");
    }

    #[test]
    fn empty_results_are_degraded_input() {
        let err = usable_articles(&topic("Topic B"), vec![], 40).unwrap_err();
        match err {
            NewsdeskError::DegradedInput { topic } => assert_eq!(topic, "Topic B"),
            other => panic!("expected DegradedInput, got {other}"),
        }
    }

    #[test]
    fn all_unscrapable_results_are_degraded_input() {
        let hits = vec![
            SearchHit {
                title: "x".into(),
                url: "https://a.example".into(),
                content: None,
            },
            hit("https://b.example", "<div>   </div>"),
        ];
        let err = usable_articles(&topic("Topic B"), hits, 1).unwrap_err();
        assert!(matches!(err, NewsdeskError::DegradedInput { .. }));
    }

    #[tokio::test]
    async fn search_with_mock_server() {
        let server = MockServer::start().await;
        let fixture = std::fs::read_to_string("../../../fixtures/search/tavily-response.json")
            .expect("read search fixture");

        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "query": "latest news and top stories about NVIDIA stock performance",
                "max_results": 5,
                "topic": "news",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture))
            .expect(1)
            .mount(&server)
            .await;

        let client = TavilyClient::new(options(&server)).unwrap();
        let articles = client
            .search(&topic("NVIDIA stock performance"))
            .await
            .unwrap();

        // duplicate URL and the paywall stub are dropped
        assert_eq!(articles.len(), 2);
        assert_eq!(
            articles[0].content,
            "NVIDIA reported quarterly revenue above expectations, driven by data-center demand."
        );
        assert_eq!(articles[1].url, "https://markets.example.org/nvidia-supply");
    }

    #[tokio::test]
    async fn search_with_no_results_is_degraded() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "results": [] })),
            )
            .mount(&server)
            .await;

        let client = TavilyClient::new(options(&server)).unwrap();
        let err = client.search(&topic("Topic B")).await.unwrap_err();
        assert!(matches!(err, NewsdeskError::DegradedInput { .. }));
    }

    #[tokio::test]
    async fn search_http_error_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let client = TavilyClient::new(options(&server)).unwrap();
        let err = client.search(&topic("Topic A")).await.unwrap_err();
        match err {
            NewsdeskError::Search(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("invalid api key"));
            }
            other => panic!("expected Search error, got {other}"),
        }
    }
}
