//! Pipeline orchestration for newsdesk.
//!
//! Ties research, analysis, rendering, and delivery into a per-topic run
//! with topic-level failure isolation (see [`pipeline::Pipeline::run_batch`]).

pub mod pipeline;
pub mod stages;

pub use pipeline::{
    LivePipeline, Pipeline, ProgressReporter, RunSummary, SilentProgress, Stage, TopicOutcome,
};
pub use stages::{Analyst, Deliverer, ReportWriter, Researcher};
