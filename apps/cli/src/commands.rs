//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use newsdesk_core::{
    LivePipeline, ProgressReporter, RunSummary, Stage, TopicOutcome,
};
use newsdesk_notify::{ConsoleNotifier, Notifier};
use newsdesk_shared::{
    AppConfig, ChannelKind, RunId, TOPICS_ENV_VAR, Topic, init_config, load_config,
    load_config_from, resolve_topics, validate_credentials,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// newsdesk: research topics, analyze the news, deliver a report.
#[derive(Parser)]
#[command(
    name = "newsdesk",
    version,
    about = "Research news topics and deliver AI-written business-intelligence reports.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Research, analyze, and deliver a report for each topic.
    Run {
        /// Comma-separated topics (overrides TOPICS_TO_RESEARCH and the config file).
        #[arg(short, long)]
        topics: Option<String>,

        /// Delivery channel: email, webhook, or console.
        #[arg(short, long)]
        channel: Option<ChannelKind>,

        /// Print reports to the console instead of sending them.
        #[arg(long)]
        dry_run: bool,

        /// Config file to use instead of ~/.newsdesk/newsdesk.toml.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration and the topics a run would use.
    Show {
        /// Config file to show instead of ~/.newsdesk/newsdesk.toml.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "newsdesk=info",
        1 => "newsdesk=debug",
        _ => "newsdesk=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            topics,
            channel,
            dry_run,
            config,
        } => cmd_run(topics.as_deref(), channel, dry_run, config.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show { config } => cmd_config_show(config.as_deref()),
        },
    }
}

async fn cmd_run(
    topics_flag: Option<&str>,
    channel: Option<ChannelKind>,
    dry_run: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = load_config_at(config_path)?;

    let channel = if dry_run {
        ChannelKind::Console
    } else {
        channel.unwrap_or(config.delivery.channel)
    };

    // Fail on missing credentials before any topic is attempted.
    validate_credentials(&config, channel)?;

    let topics = topics_for_run(topics_flag, &config);
    if topics.is_empty() {
        return Err(eyre!("no topics to research"));
    }

    let reporter = CliProgress::new();
    let notifier = match Notifier::from_config(channel, &config.delivery, &config.http)? {
        Notifier::Console(_) => Notifier::Console(reporter.console_notifier()),
        other => other,
    };
    let pipeline = LivePipeline::with_notifier(&config, notifier)?;

    info!(topics = topics.len(), %channel, dry_run, "starting newsdesk run");

    let summary = pipeline.run_batch(&topics, &reporter).await;

    print_summary(&summary);

    if summary.is_success() {
        Ok(())
    } else {
        Err(eyre!(
            "{} of {} topics failed",
            summary.failed_count(),
            summary.outcomes.len()
        ))
    }
}

fn load_config_at(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

/// Topics a run would use, honoring flag > env > file > defaults.
fn topics_for_run(topics_flag: Option<&str>, config: &AppConfig) -> Vec<Topic> {
    let topics_env = std::env::var(TOPICS_ENV_VAR).ok();
    resolve_topics(topics_flag, topics_env.as_deref(), config)
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("  Run:        {}", summary.run_id);
    println!("  Delivered:  {}", summary.delivered_count());
    println!("  Failed:     {}", summary.failed_count());
    println!("  Time:       {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    let width = summary
        .outcomes
        .iter()
        .map(|o| o.topic().as_str().chars().count())
        .max()
        .unwrap_or(0);

    for outcome in &summary.outcomes {
        let topic = outcome.topic().as_str();
        match outcome {
            TopicOutcome::Delivered {
                receipt,
                article_count,
                sentiment,
                ..
            } => println!(
                "  {topic:<width$}  delivered  {} via {} ({article_count} articles, {sentiment})",
                receipt.message_id.as_deref().unwrap_or("-"),
                receipt.channel,
            ),
            TopicOutcome::Failed { stage, error, .. } => println!(
                "  {topic:<width$}  failed     while {stage}: [{}] {error}",
                error.kind(),
            ),
        }
    }
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        // The template is a constant; fall back to the default style if it is rejected.
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    /// Console notifier that pauses the spinner while a report is printed.
    fn console_notifier(&self) -> ConsoleNotifier {
        let spinner = self.spinner.clone();
        ConsoleNotifier::with_sink(Arc::new(move |block: &str| {
            spinner.suspend(|| println!("{block}"));
        }))
    }
}

impl ProgressReporter for CliProgress {
    fn run_started(&self, run_id: &RunId, topic_count: usize) {
        self.spinner
            .set_message(format!("Run {run_id}: {topic_count} topics"));
    }

    fn topic_started(&self, topic: &Topic, index: usize, total: usize) {
        self.spinner.set_message(format!("[{index}/{total}] {topic}"));
    }

    fn stage(&self, topic: &Topic, stage: Stage) {
        let label = match stage {
            Stage::Researching => "Researching",
            Stage::Analyzing => "Analyzing",
            Stage::Writing => "Writing report",
            Stage::Delivering => "Delivering",
        };
        self.spinner.set_message(format!("{label}: {topic}"));
    }

    fn topic_finished(&self, outcome: &TopicOutcome) {
        let line = match outcome {
            TopicOutcome::Delivered { topic, .. } => format!("  ✓ {topic}"),
            TopicOutcome::Failed { topic, stage, .. } => {
                format!("  ✗ {topic} (failed while {stage})")
            }
        };
        self.spinner.println(line);
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_config_at(config_path)?;
    let topics = topics_for_run(None, &config);
    println!("{}", render_config(&config, &topics)?);
    Ok(())
}

fn render_config(config: &AppConfig, topics: &[Topic]) -> Result<String> {
    let mut out = toml::to_string_pretty(config)?;
    out.push_str("\n# Topics for the next run:\n");
    for topic in topics {
        out.push_str(&format!("#   - {topic}\n"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_show_accepts_config_path() {
        let cli = Cli::try_parse_from(["newsdesk", "config", "show", "--config", "alt.toml"])
            .expect("parse");
        match cli.command {
            Command::Config {
                action: ConfigAction::Show { config },
            } => assert_eq!(config, Some(PathBuf::from("alt.toml"))),
            _ => panic!("expected config show"),
        }
    }

    #[test]
    fn config_show_lists_resolved_topics() {
        let config = AppConfig {
            topics: vec!["Mergers, acquisitions in biotech".into()],
            ..AppConfig::default()
        };
        let topics = resolve_topics(None, None, &config);

        let out = render_config(&config, &topics).unwrap();
        assert!(out.contains("[search]"));
        assert!(out.contains("#   - Mergers, acquisitions in biotech\n"));
    }

    #[test]
    fn config_file_loads_from_explicit_path() {
        let path = std::env::temp_dir().join(format!("newsdesk-cli-{}.toml", RunId::new()));
        std::fs::write(&path, "topics = [\"Chip exports\"]\n").unwrap();

        let config = load_config_at(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.topics, ["Chip exports"]);
    }
}
