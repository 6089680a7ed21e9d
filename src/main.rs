use std::{path::PathBuf, process::ExitCode};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{
    calendar::CalendarSync,
    github::{GitHub, RestClient},
    labels::{LabelSyncTask, LabelSyncer, SyncSummary},
    limits::{LimitChecker, LimitStatus, LimitSummary, LimitTask},
    org::{OrgWalker, RepoFilter},
    pacing::Pacer,
    settings::{load_labels, Settings},
};

mod calendar;
mod github;
mod harness;
mod labels;
mod limits;
mod org;
mod pacing;
mod settings;

pub type Result<T> = anyhow::Result<T>;

/// Organization-wide GitHub housekeeping.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// GitHub token used for every API call
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Organization whose repositories are managed
    #[arg(long, global = true, env = "GITHUB_ORGANIZATION", default_value = "ForYouPage-Org")]
    org: String,

    /// Directory holding settings.json and labels.json
    #[arg(long, global = true, env = "ORGKEEPER_CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Log intended changes without sending them
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check issue limits in every repository and file warning issues
    Limits,
    /// Sync the configured label set to every repository
    Labels,
    /// Sync labels to one repository and report the result
    TryLabels {
        #[arg(default_value = harness::DEFAULT_REPO)]
        repo: String,
    },
}

fn walker<'a>(gh: &'a dyn GitHub, settings: &Settings) -> OrgWalker<'a> {
    OrgWalker::new(
        gh,
        RepoFilter::new(settings.repository_filters.clone()),
        Pacer::new(&settings.pacing),
    )
}

async fn run(cli: &Cli, token: &str) -> Result<()> {
    let gh = RestClient::new(token, &cli.org)?;

    match &cli.command {
        Command::Limits => {
            let settings = Settings::new(&cli.config_dir)?;
            info!("Starting organization-wide issue management for {}", cli.org);

            let checker = LimitChecker::new(
                &gh,
                settings.issue_limits.clone(),
                settings.warning_issue.clone(),
                cli.dry_run,
            );
            let calendar = settings
                .calendar_sync
                .enabled
                .then(|| CalendarSync::new(&gh));
            let task = LimitTask::new(checker, calendar);

            let results = walker(&gh, &settings)
                .walk(&task)
                .await
                .context("Failed to manage repositories")?;

            for r in &results {
                if let LimitStatus::Failed { error } = &r.status {
                    error!("{}: {}", r.repo, error);
                }
            }

            let summary = LimitSummary::of(&results);
            info!(
                "Summary: {} repositories have warnings ({} checked, {} failed)",
                summary.warned, summary.checked, summary.failed
            );
        }
        Command::Labels => {
            let settings = Settings::new(&cli.config_dir)?;
            let labels = load_labels(&cli.config_dir)?;
            info!("Starting organization-wide label sync for {}", cli.org);

            let task = LabelSyncTask::new(LabelSyncer::new(&gh, labels, cli.dry_run));
            let outcomes = walker(&gh, &settings)
                .walk(&task)
                .await
                .context("Failed to sync")?;

            let summary = SyncSummary::of(&outcomes);
            info!(
                "Sync complete: {} succeeded, {} failed",
                summary.succeeded, summary.failed
            );
        }
        Command::TryLabels { repo } => {
            let labels = load_labels(&cli.config_dir)?;
            let syncer = LabelSyncer::new(&gh, labels, cli.dry_run);

            harness::try_labels(&gh, &syncer, repo)
                .await
                .context("Test failed")?;
            println!();
            println!("Test completed successfully!");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let Some(token) = cli.token.as_deref().filter(|t| !t.is_empty()) else {
        error!("GITHUB_TOKEN environment variable is required");
        return ExitCode::FAILURE;
    };

    match run(&cli, token).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
