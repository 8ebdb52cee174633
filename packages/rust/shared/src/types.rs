//! Core domain types for a Newsdesk run.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{NewsdeskError, Result};

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one batch run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// A subject to research. Always trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Build a topic from user input, rejecting blank strings.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(NewsdeskError::validation("topic must not be blank"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// One cleaned news article returned by the research stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Headline as reported by the search provider.
    pub title: String,
    /// Source URL.
    pub url: String,
    /// Extracted article text (HTML stripped, whitespace normalized).
    pub content: String,
}

// ---------------------------------------------------------------------------
// Sentiment
// ---------------------------------------------------------------------------

/// Accepted values for `overall_sentiment`, in schema order.
pub const SENTIMENT_VALUES: [&str; 4] = ["positive", "negative", "neutral", "mixed"];

/// Overall sentiment of the news coverage for a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Mixed => "mixed",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Sentiment {
    type Err = NewsdeskError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            "neutral" => Ok(Self::Neutral),
            "mixed" => Ok(Self::Mixed),
            other => Err(NewsdeskError::structured_output(format!(
                "overall_sentiment '{other}' is not one of {}",
                SENTIMENT_VALUES.join(", ")
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisReport
// ---------------------------------------------------------------------------

/// Unvalidated analysis exactly as decoded from the generator's JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawAnalysis {
    pub key_findings: Vec<String>,
    pub overall_sentiment: String,
    pub potential_impact: String,
}

/// Validated, immutable analysis of one topic's news coverage.
///
/// The only way to obtain one is [`AnalysisReport::validate`], so every
/// instance satisfies the schema: at least one non-blank finding, a known
/// sentiment, and non-blank impact text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    topic: Topic,
    key_findings: Vec<String>,
    overall_sentiment: Sentiment,
    potential_impact: String,
}

impl AnalysisReport {
    /// Check a raw generator payload against the schema and bind it to `topic`.
    pub fn validate(topic: &Topic, raw: RawAnalysis) -> Result<Self> {
        if raw.key_findings.is_empty() {
            return Err(NewsdeskError::structured_output(
                "key_findings must contain at least one entry",
            ));
        }

        let mut key_findings = Vec::with_capacity(raw.key_findings.len());
        for (i, finding) in raw.key_findings.into_iter().enumerate() {
            let finding = finding.trim();
            if finding.is_empty() {
                return Err(NewsdeskError::structured_output(format!(
                    "key_findings[{i}] is blank"
                )));
            }
            key_findings.push(finding.to_string());
        }

        let overall_sentiment: Sentiment = raw.overall_sentiment.parse()?;

        let potential_impact = raw.potential_impact.trim();
        if potential_impact.is_empty() {
            return Err(NewsdeskError::structured_output(
                "potential_impact must not be blank",
            ));
        }

        Ok(Self {
            topic: topic.clone(),
            key_findings,
            overall_sentiment,
            potential_impact: potential_impact.to_string(),
        })
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Findings in the order the analyst produced them.
    pub fn key_findings(&self) -> &[String] {
        &self.key_findings
    }

    pub fn overall_sentiment(&self) -> Sentiment {
        self.overall_sentiment
    }

    pub fn potential_impact(&self) -> &str {
        &self.potential_impact
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(findings: &[&str], sentiment: &str, impact: &str) -> RawAnalysis {
        RawAnalysis {
            key_findings: findings.iter().map(|s| s.to_string()).collect(),
            overall_sentiment: sentiment.into(),
            potential_impact: impact.into(),
        }
    }

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn topic_is_trimmed_and_non_blank() {
        assert_eq!(Topic::new("  Topic A ").unwrap().as_str(), "Topic A");
        assert!(Topic::new("   ").is_err());
    }

    #[test]
    fn sentiment_parses_case_insensitively() {
        assert_eq!(" Neutral ".parse::<Sentiment>().unwrap(), Sentiment::Neutral);
        assert_eq!("MIXED".parse::<Sentiment>().unwrap(), Sentiment::Mixed);
        let err = "bullish".parse::<Sentiment>().unwrap_err();
        assert!(matches!(err, NewsdeskError::StructuredOutput { .. }));
    }

    #[test]
    fn valid_report_keeps_finding_order() {
        let topic = Topic::new("Topic A").unwrap();
        let report = AnalysisReport::validate(
            &topic,
            raw(&["first", " second "], "neutral", "Moderate impact."),
        )
        .unwrap();

        assert_eq!(report.topic().as_str(), "Topic A");
        assert_eq!(report.key_findings(), &["first", "second"]);
        assert_eq!(report.overall_sentiment(), Sentiment::Neutral);
        assert_eq!(report.potential_impact(), "Moderate impact.");
    }

    #[test]
    fn report_rejects_schema_violations() {
        let topic = Topic::new("Topic A").unwrap();

        let cases = [
            raw(&[], "neutral", "impact"),
            raw(&["ok", "  "], "neutral", "impact"),
            raw(&["ok"], "optimistic", "impact"),
            raw(&["ok"], "positive", "   "),
        ];

        for case in cases {
            let err = AnalysisReport::validate(&topic, case).unwrap_err();
            assert!(matches!(err, NewsdeskError::StructuredOutput { .. }), "{err}");
        }
    }

    #[test]
    fn raw_analysis_rejects_unknown_fields() {
        let json = r#"{"key_findings":["a"],"overall_sentiment":"neutral","potential_impact":"x","extra":1}"#;
        assert!(serde_json::from_str::<RawAnalysis>(json).is_err());
    }

    #[test]
    fn analysis_fixture_validates() {
        let fixture = std::fs::read_to_string("../../../fixtures/json/analysis.fixture.json")
            .expect("read fixture");
        let parsed: RawAnalysis = serde_json::from_str(&fixture).expect("deserialize fixture");
        let topic = Topic::new("NVIDIA stock performance").unwrap();
        let report = AnalysisReport::validate(&topic, parsed).expect("fixture is valid");
        assert_eq!(report.key_findings().len(), 3);
        assert_eq!(report.overall_sentiment(), Sentiment::Positive);
    }
}
