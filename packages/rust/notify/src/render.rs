//! Report rendering: HTML for email, Markdown-flavored text for chat and console.

use chrono::{DateTime, Utc};

use newsdesk_shared::AnalysisReport;

/// A report ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedReport {
    /// Subject line, e.g. `Daily AI BI Report: NVIDIA stock performance`.
    pub subject: String,
    /// HTML body for email.
    pub html: String,
    /// Plain-text / Markdown body for chat and console.
    pub text: String,
}

/// Render `report` into subject, HTML, and text bodies.
pub fn render_report(
    report: &AnalysisReport,
    subject_prefix: &str,
    generated_at: DateTime<Utc>,
) -> RenderedReport {
    let topic = report.topic().as_str();
    let stamp = generated_at.format("%Y-%m-%d %H:%M UTC").to_string();

    RenderedReport {
        subject: format!("{subject_prefix}: {topic}"),
        html: render_html(report, &stamp),
        text: render_text(report, &stamp),
    }
}

fn render_html(report: &AnalysisReport, stamp: &str) -> String {
    let findings: String = report
        .key_findings()
        .iter()
        .map(|f| format!("<li>{}</li>", escape_html(f)))
        .collect();

    format!(
        "<h1>Business Intelligence Report: {topic}</h1>\n\
         <h2>Overall Sentiment Analysis</h2>\n\
         <p><b>Sentiment:</b> {sentiment}</p>\n\
         <h2>Key Findings</h2>\n\
         <ol>{findings}</ol>\n\
         <h2>Potential Impact</h2>\n\
         <p>{impact}</p>\n\
         <hr>\n\
         <p><small>Generated {stamp}</small></p>\n",
        topic = escape_html(report.topic().as_str()),
        sentiment = capitalize(report.overall_sentiment().as_str()),
        impact = escape_html(report.potential_impact()),
    )
}

fn render_text(report: &AnalysisReport, stamp: &str) -> String {
    let mut out = format!(
        "*Business Intelligence Report: {}*\n\n*Sentiment:* {}\n\n*Key Findings*\n",
        report.topic(),
        capitalize(report.overall_sentiment().as_str())
    );
    for (i, finding) in report.key_findings().iter().enumerate() {
        out.push_str(&format!("{}. {finding}\n", i + 1));
    }
    out.push_str(&format!(
        "\n*Potential Impact*\n{}\n\n_Generated {stamp}_\n",
        report.potential_impact()
    ));
    out
}

/// Escape the five HTML-significant characters.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use newsdesk_shared::{RawAnalysis, Topic};

    fn report(topic: &str, findings: &[&str]) -> AnalysisReport {
        AnalysisReport::validate(
            &Topic::new(topic).unwrap(),
            RawAnalysis {
                key_findings: findings.iter().map(|s| s.to_string()).collect(),
                overall_sentiment: "neutral".into(),
                potential_impact: "Margins may compress.".into(),
            },
        )
        .unwrap()
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 7, 30, 0).unwrap()
    }

    #[test]
    fn subject_uses_prefix_and_topic() {
        let rendered = render_report(&report("Topic A", &["x"]), "Daily AI BI Report", at());
        assert_eq!(rendered.subject, "Daily AI BI Report: Topic A");
    }

    #[test]
    fn html_contains_sections_in_order() {
        let rendered = render_report(&report("Topic A", &["first", "second"]), "R", at());
        let html = &rendered.html;

        assert!(html.contains("<h1>Business Intelligence Report: Topic A</h1>"));
        assert!(html.contains("<b>Sentiment:</b> Neutral"));
        assert!(html.contains("<ol><li>first</li><li>second</li></ol>"));
        assert!(html.contains("<p>Margins may compress.</p>"));
        assert!(html.contains("Generated 2026-10-19 07:30 UTC"));
    }

    #[test]
    fn html_escapes_model_text() {
        let rendered = render_report(
            &report("AT&T <earnings>", &["<script>alert(1)</script>"]),
            "R",
            at(),
        );
        assert!(rendered.html.contains("AT&amp;T &lt;earnings&gt;"));
        assert!(!rendered.html.contains("<script>"));
        // subject and text bodies are not HTML
        assert_eq!(rendered.subject, "R: AT&T <earnings>");
    }

    #[test]
    fn text_numbers_findings() {
        let rendered = render_report(&report("Topic A", &["first", "second"]), "R", at());
        assert!(rendered.text.contains("Report: Topic A"));
        assert!(rendered.text.contains("1. first\n2. second\n"));
        assert!(rendered.text.contains("*Sentiment:* Neutral"));
    }
}
