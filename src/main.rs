use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use org_file_adder::batch::{BatchOutcome, run};
use org_file_adder::config::{
    DEFAULT_REPO_PATTERN, DEFAULT_TOPIC_BRANCH, FileAdditionRequest, RepoSelector,
};
use org_file_adder::github::{OrgClient, RetryPolicy, build_octocrab};
use org_file_adder::staging::stage_paths;

/// Add files to the repositories of a GitHub organization, one pull request each.
#[derive(Parser)]
#[command(name = "org-file-adder")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Local files to add
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// GitHub organization
    #[arg(short, long)]
    organization: String,

    /// Regular expression repository names must fully match
    #[arg(short = 'r', long, default_value = DEFAULT_REPO_PATTERN)]
    repo_regex: String,

    /// Comma-separated repository names; cannot be combined with --repo-regex
    #[arg(short = 'l', long, value_delimiter = ',')]
    repo_list: Vec<String>,

    /// Base branch for the pull requests (default: each repository's default branch)
    #[arg(short, long)]
    base_branch: Option<String>,

    /// Topic branch created in each repository
    #[arg(short, long, default_value = DEFAULT_TOPIC_BRANCH)]
    topic_branch: String,

    /// Pull request title (default: derived from the file names)
    #[arg(short = 'm', long)]
    pr_message: Option<String>,

    /// Path within each repository where the files are placed
    #[arg(short, long, default_value = "")]
    path: String,

    /// Update files that already exist instead of failing
    #[arg(short, long)]
    update_existing: bool,

    /// GitHub personal access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: String,

    /// GitHub API base URI, for GitHub Enterprise
    #[arg(long, env = "GITHUB_API_URL")]
    api_url: Option<String>,

    /// Fail immediately on rate limits and transient errors
    #[arg(long)]
    no_retry: bool,
}

impl Cli {
    fn request(&self) -> Result<FileAdditionRequest> {
        let repo_list = (!self.repo_list.is_empty()).then(|| self.repo_list.clone());
        let selector = RepoSelector::from_options(repo_list, Some(&self.repo_regex))?;
        let request = FileAdditionRequest::new(selector)
            .with_destination(self.path.clone())
            .with_base_branch(self.base_branch.clone())
            .with_topic_branch(self.topic_branch.clone())
            .with_message(self.pr_message.clone())
            .with_update_existing(self.update_existing);
        request.validate()?;
        Ok(request)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    /// Finish rolling back the current repository, then stop.
    Cancel,
    /// Exit immediately, even mid-retry.
    Abort,
}

fn on_interrupt(cancel: &CancellationToken) -> Interrupt {
    if cancel.is_cancelled() {
        warn!("Interrupted again; exiting without cleanup");
        return Interrupt::Abort;
    }
    warn!("Interrupted; cleaning up the current repository and stopping (Ctrl-C again to force)");
    cancel.cancel();
    Interrupt::Cancel
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,org_file_adder=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Nothing touches the network until the configuration and files are good.
    let request = cli.request().context("invalid configuration")?;
    let content = stage_paths(&cli.files, &request.destination).context("failed to stage files")?;

    let octocrab = build_octocrab(cli.token.clone(), cli.api_url.as_deref())
        .context("failed to build GitHub client")?;
    let policy = if cli.no_retry {
        RetryPolicy::NoRetry
    } else {
        RetryPolicy::RetryTransient
    };
    let org = OrgClient::new(octocrab, cli.organization.clone()).with_retry_policy(policy);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if on_interrupt(&cancel) == Interrupt::Abort {
                    std::process::exit(130);
                }
            }
        });
    }

    info!(org = %cli.organization, files = content.len(), "Starting run");
    let result = run(&org, &request, &content, &cancel, |target| org.repo(&target.name)).await?;

    Ok(match result.outcome() {
        BatchOutcome::Success => ExitCode::SUCCESS,
        BatchOutcome::TotalFailure | BatchOutcome::PartialSuccess { .. } => ExitCode::FAILURE,
    })
}
