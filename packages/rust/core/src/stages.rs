//! Stage seams of the pipeline.
//!
//! Each external capability sits behind a trait so the pipeline can be driven
//! by the live HTTP clients or by in-memory fakes.

use std::future::Future;

use chrono::Utc;

use newsdesk_analyst::ChatAnalyst;
use newsdesk_notify::{DeliveryReceipt, Notifier, RenderedReport, render_report};
use newsdesk_research::TavilyClient;
use newsdesk_shared::{AnalysisReport, Article, Result, Topic};

/// Finds article texts for a topic.
pub trait Researcher: Send + Sync {
    /// Return at least one usable article, or fail with `DegradedInput`.
    fn research(&self, topic: &Topic) -> impl Future<Output = Result<Vec<Article>>> + Send;
}

/// Turns article texts into a validated analysis.
pub trait Analyst: Send + Sync {
    fn analyze(
        &self,
        topic: &Topic,
        articles: &[Article],
    ) -> impl Future<Output = Result<AnalysisReport>> + Send;
}

/// Publishes a rendered report to a channel.
pub trait Deliverer: Send + Sync {
    fn deliver(
        &self,
        report: &RenderedReport,
    ) -> impl Future<Output = Result<DeliveryReceipt>> + Send;
}

impl Researcher for TavilyClient {
    async fn research(&self, topic: &Topic) -> Result<Vec<Article>> {
        self.search(topic).await
    }
}

impl Analyst for ChatAnalyst {
    async fn analyze(&self, topic: &Topic, articles: &[Article]) -> Result<AnalysisReport> {
        ChatAnalyst::analyze(self, topic, articles).await
    }
}

impl Deliverer for Notifier {
    async fn deliver(&self, report: &RenderedReport) -> Result<DeliveryReceipt> {
        Notifier::deliver(self, report).await
    }
}

/// Renders reports with a fixed subject prefix.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    subject_prefix: String,
}

impl ReportWriter {
    pub fn new(subject_prefix: impl Into<String>) -> Self {
        Self {
            subject_prefix: subject_prefix.into(),
        }
    }

    pub fn write(&self, report: &AnalysisReport) -> RenderedReport {
        render_report(report, &self.subject_prefix, Utc::now())
    }
}
