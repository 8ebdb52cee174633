//! Prompt construction and the JSON schema sent with every analysis request.

use newsdesk_shared::{Article, SENTIMENT_VALUES, Topic};

/// Marker appended when article context is cut to fit the window.
const TRUNCATION_MARKER: &str = "\n\n[... content truncated for LLM context window ...]";

/// Name under which the schema is registered in `response_format`.
pub const SCHEMA_NAME: &str = "analysis_report";

pub(crate) const SYSTEM_PROMPT: &str = "You are a business intelligence analyst. \
Read the news articles you are given and produce a concise structured analysis. \
Base every finding on the articles; do not invent facts. \
List the most important findings first.";

/// JSON schema for the analysis payload (strict mode compatible).
pub fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "key_findings": {
                "type": "array",
                "description": "Most important findings, most significant first.",
                "items": { "type": "string" }
            },
            "overall_sentiment": {
                "type": "string",
                "description": "Overall sentiment of the coverage.",
                "enum": SENTIMENT_VALUES
            },
            "potential_impact": {
                "type": "string",
                "description": "Potential business impact of these developments."
            }
        },
        "required": ["key_findings", "overall_sentiment", "potential_impact"],
        "additionalProperties": false
    })
}

/// Build the user message for `topic` from the research output.
pub(crate) fn user_prompt(topic: &Topic, articles: &[Article], max_context_chars: usize) -> String {
    let mut context = String::new();
    for (i, article) in articles.iter().enumerate() {
        context.push_str(&format!(
            "### {}. {}\nSource: {}\n\n{}\n\n",
            i + 1,
            article.title,
            article.url,
            article.content
        ));
    }

    format!(
        "Analyze the following news content about '{topic}' and generate a structured \
         analysis report.\n\n{}",
        truncate_content(context.trim_end(), max_context_chars)
    )
}

/// Truncate content to at most `max_chars` characters, on a char boundary.
pub(crate) fn truncate_content(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        None => content.to_string(),
        Some((idx, _)) => format!("{}{TRUNCATION_MARKER}", &content[..idx]),
    }
}
