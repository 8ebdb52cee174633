//! End-to-end run: topics → research → analysis → report → delivery.
//!
//! Topics are processed one after another. A failure in any stage ends that
//! topic's run and is recorded in its [`TopicOutcome`]; the batch always moves
//! on to the next topic.

use std::time::{Duration, Instant};

use tracing::{error, info, instrument, warn};

use newsdesk_analyst::{AnalystOptions, ChatAnalyst};
use newsdesk_notify::{DeliveryReceipt, Notifier};
use newsdesk_research::{SearchOptions, TavilyClient};
use newsdesk_shared::{
    AppConfig, ChannelKind, NewsdeskError, Result, RunId, Sentiment, Topic, read_secret,
};

use crate::stages::{Analyst, Deliverer, ReportWriter, Researcher};

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// The stage a topic is in (or failed in).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Researching,
    Analyzing,
    Writing,
    Delivering,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Researching => "researching",
            Self::Analyzing => "analyzing",
            Self::Writing => "writing",
            Self::Delivering => "delivering",
        })
    }
}

/// Result of running one topic through the pipeline.
#[derive(Debug)]
pub enum TopicOutcome {
    /// The report was accepted by the delivery channel.
    Delivered {
        topic: Topic,
        receipt: DeliveryReceipt,
        article_count: usize,
        sentiment: Sentiment,
    },
    /// The topic stopped at `stage`.
    Failed {
        topic: Topic,
        stage: Stage,
        error: NewsdeskError,
    },
}

impl TopicOutcome {
    pub fn topic(&self) -> &Topic {
        match self {
            Self::Delivered { topic, .. } | Self::Failed { topic, .. } => topic,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    /// True when research found nothing usable for this topic.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            Self::Failed {
                error: NewsdeskError::DegradedInput { .. },
                ..
            }
        )
    }
}

/// Aggregate result of a batch run.
#[derive(Debug)]
pub struct RunSummary {
    pub run_id: RunId,
    /// One outcome per topic, in processing order.
    pub outcomes: Vec<TopicOutcome>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn delivered_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_delivered()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.delivered_count()
    }

    /// Topics for which a degraded-input condition was recorded.
    pub fn degraded_topics(&self) -> Vec<&Topic> {
        self.outcomes
            .iter()
            .filter(|o| o.is_degraded())
            .map(TopicOutcome::topic)
            .collect()
    }

    /// True when every topic was delivered.
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called once before the first topic.
    fn run_started(&self, run_id: &RunId, topic_count: usize);
    /// Called when a topic enters the pipeline (`index` is 1-based).
    fn topic_started(&self, topic: &Topic, index: usize, total: usize);
    /// Called when a topic enters a new stage.
    fn stage(&self, topic: &Topic, stage: Stage);
    /// Called when a topic is delivered or fails.
    fn topic_finished(&self, outcome: &TopicOutcome);
    /// Called when the batch completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn run_started(&self, _run_id: &RunId, _topic_count: usize) {}
    fn topic_started(&self, _topic: &Topic, _index: usize, _total: usize) {}
    fn stage(&self, _topic: &Topic, _stage: Stage) {}
    fn topic_finished(&self, _outcome: &TopicOutcome) {}
    fn done(&self, _summary: &RunSummary) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The three-stage pipeline, generic over its external capabilities.
pub struct Pipeline<R, A, D> {
    researcher: R,
    analyst: A,
    writer: ReportWriter,
    deliverer: D,
}

/// Pipeline wired to the live search, generation, and delivery clients.
pub type LivePipeline = Pipeline<TavilyClient, ChatAnalyst, Notifier>;

impl LivePipeline {
    /// Build the live pipeline from config, reading secrets from the environment.
    pub fn from_config(config: &AppConfig, channel: ChannelKind) -> Result<Self> {
        let notifier = Notifier::from_config(channel, &config.delivery, &config.http)?;
        Self::with_notifier(config, notifier)
    }

    /// Like [`LivePipeline::from_config`], with a caller-built notifier.
    pub fn with_notifier(config: &AppConfig, notifier: Notifier) -> Result<Self> {
        let search = SearchOptions::from_config(
            &config.search,
            &config.http,
            read_secret(&config.search.api_key_env)?,
        );
        let analyst = AnalystOptions::from_config(
            &config.llm,
            &config.http,
            read_secret(&config.llm.api_key_env)?,
        );

        Ok(Pipeline::new(
            TavilyClient::new(search)?,
            ChatAnalyst::new(analyst)?,
            ReportWriter::new(config.delivery.subject_prefix.clone()),
            notifier,
        ))
    }
}

impl<R, A, D> Pipeline<R, A, D>
where
    R: Researcher,
    A: Analyst,
    D: Deliverer,
{
    pub fn new(researcher: R, analyst: A, writer: ReportWriter, deliverer: D) -> Self {
        Self {
            researcher,
            analyst,
            writer,
            deliverer,
        }
    }

    /// Run every topic in order. A failed topic never stops the batch.
    #[instrument(skip_all, fields(run_id = tracing::field::Empty, topics = topics.len()))]
    pub async fn run_batch(
        &self,
        topics: &[Topic],
        progress: &dyn ProgressReporter,
    ) -> RunSummary {
        let start = Instant::now();
        let run_id = RunId::new();
        tracing::Span::current().record("run_id", tracing::field::display(&run_id));

        info!(%run_id, "starting run");
        progress.run_started(&run_id, topics.len());

        let mut outcomes = Vec::with_capacity(topics.len());
        for (i, topic) in topics.iter().enumerate() {
            progress.topic_started(topic, i + 1, topics.len());
            let outcome = self.run_topic(topic, progress).await;
            progress.topic_finished(&outcome);
            outcomes.push(outcome);
        }

        let summary = RunSummary {
            run_id,
            outcomes,
            elapsed: start.elapsed(),
        };

        info!(
            delivered = summary.delivered_count(),
            failed = summary.failed_count(),
            elapsed_ms = summary.elapsed.as_millis(),
            "run complete"
        );
        progress.done(&summary);

        summary
    }

    /// Run one topic through Researching → Analyzing → Writing → Delivering.
    #[instrument(skip_all, fields(topic = %topic))]
    pub async fn run_topic(&self, topic: &Topic, progress: &dyn ProgressReporter) -> TopicOutcome {
        let failed = |stage: Stage, error: NewsdeskError| {
            match &error {
                NewsdeskError::DegradedInput { .. } => {
                    warn!(%stage, error = %error, "topic degraded, skipping analysis")
                }
                _ => error!(%stage, error = %error, "topic failed"),
            }
            TopicOutcome::Failed {
                topic: topic.clone(),
                stage,
                error,
            }
        };

        progress.stage(topic, Stage::Researching);
        let articles = match self.researcher.research(topic).await {
            Ok(articles) if articles.is_empty() => {
                return failed(
                    Stage::Researching,
                    NewsdeskError::degraded_input(topic.as_str()),
                );
            }
            Ok(articles) => articles,
            Err(e) => return failed(Stage::Researching, e),
        };

        progress.stage(topic, Stage::Analyzing);
        let report = match self.analyst.analyze(topic, &articles).await {
            Ok(report) => report,
            Err(e) => return failed(Stage::Analyzing, e),
        };

        progress.stage(topic, Stage::Writing);
        let rendered = self.writer.write(&report);

        progress.stage(topic, Stage::Delivering);
        match self.deliverer.deliver(&rendered).await {
            Ok(receipt) => {
                info!(
                    channel = %receipt.channel,
                    message_id = receipt.message_id.as_deref().unwrap_or("-"),
                    "report delivered"
                );
                TopicOutcome::Delivered {
                    topic: topic.clone(),
                    receipt,
                    article_count: articles.len(),
                    sentiment: report.overall_sentiment(),
                }
            }
            Err(e) => failed(Stage::Delivering, e),
        }
    }
}
