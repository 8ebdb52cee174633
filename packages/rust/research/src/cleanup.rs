//! Cleanup passes applied to article text returned by the search provider.
//!
//! Each pass is a function `&str -> String` applied in sequence. Providers
//! already extract article text, but snippets still carry stray markup,
//! entities, truncation markers, and ragged whitespace.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

/// Run the full cleanup pipeline on one article's content.
pub(crate) fn run_pipeline(text: &str) -> String {
    let mut result = text.to_string();

    result = strip_html(&result);
    result = strip_truncation_markers(&result);
    result = normalize_whitespace(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Strip leftover HTML
// ---------------------------------------------------------------------------

/// Drop tags and decode entities, keeping block boundaries as spaces.
fn strip_html(text: &str) -> String {
    static TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<[a-zA-Z/!][^>]*>").expect("valid regex"));
    static BLOCK_END_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)<br\s*/?>|</(p|div|li|tr|td|h[1-6]|blockquote|section|article)>")
            .expect("valid regex")
    });

    if !TAG_RE.is_match(text) && !text.contains('&') {
        return text.to_string();
    }

    let spaced = BLOCK_END_RE.replace_all(text, " ");
    let fragment = Html::parse_fragment(&spaced);

    fragment.root_element().text().collect::<String>()
}

// ---------------------------------------------------------------------------
// Pass 2: Remove truncation markers
// ---------------------------------------------------------------------------

/// Remove `[...]` / `[…]` markers that search snippets insert.
fn strip_truncation_markers(text: &str) -> String {
    static MARKER_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[\s*(\.{3}|…)\s*\]").expect("valid regex"));

    MARKER_RE.replace_all(text, " ").to_string()
}

// ---------------------------------------------------------------------------
// Pass 3: Normalize whitespace
// ---------------------------------------------------------------------------

/// Collapse every whitespace run (including non-breaking spaces) to one space.
fn normalize_whitespace(text: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    WS_RE.replace_all(text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let text = "Chip exports rose 4% in September.";
        assert_eq!(run_pipeline(text), text);
    }

    #[test]
    fn html_is_stripped_and_entities_decoded() {
        let text = "<p>Revenue   grew&nbsp;12%</p><p>Margins held &amp; improved.</p>";
        assert_eq!(run_pipeline(text), "Revenue grew 12% Margins held & improved.");
    }

    #[test]
    fn inline_tags_do_not_split_words() {
        assert_eq!(run_pipeline("<b>NV</b>IDIA shares"), "NVIDIA shares");
    }

    #[test]
    fn truncation_markers_removed() {
        let text = "Opening paragraph [...] closing paragraph […]";
        assert_eq!(run_pipeline(text), "Opening paragraph closing paragraph");
    }

    #[test]
    fn comparison_operators_are_not_tags() {
        let text = "Growth was < 5% while costs were > 3%.";
        assert_eq!(run_pipeline(text), text);
    }
}
