//! PigPenOS - issue-comment driven patch governance CLI
//!
//! The `pigpen` command turns one issue comment into a plan and, when asked to
//! implement, into a gated pull request.
//!
//! ## Commands
//!
//! - `run`: the full governance pipeline for one triggering comment
//! - `plan`: print the plan comment without touching GitHub or git
//! - `scan`: list the paths a patch file touches and flag protected ones
//!
//! Every flag falls back to the environment variable a workflow provides.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn, Level};

use pigpen_core::gateway::{HttpPatchService, PatchServiceConfig};
use pigpen_core::messages;
use pigpen_core::obs::RunSpan;
use pigpen_core::pipeline::{plan_for, GovernancePipeline, RunOutcome};
use pigpen_core::protected::{scan_patch, ProtectedPrefixSet};
use pigpen_core::telemetry::init_tracing;
use pigpen_core::tracker::github::DEFAULT_API_BASE;
use pigpen_core::tracker::{GitHubConfig, GitHubTracker};
use pigpen_core::workspace::{GitWorkspace, PushRemote};
use pigpen_core::{GovernanceOutcome, RunContext};

/// Exit code of `scan` when a protected path is touched.
const PROTECTED_EXIT: u8 = 2;

#[derive(Parser)]
#[command(name = "pigpen")]
#[command(author = "PigPenOS Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Issue-comment driven patch governance (PigPenOS)", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the governance pipeline for the triggering comment
    Run(RunArgs),

    /// Print the plan comment for the triggering comment (dry run)
    Plan(EventArgs),

    /// Report the paths a patch file touches; exits 2 on protected paths
    Scan {
        /// Unified diff to scan
        patch_file: PathBuf,

        /// Comma-separated protected prefixes (default set when omitted)
        #[arg(long, env = "PROTECTED_PREFIXES")]
        protected_prefixes: Option<String>,
    },
}

/// The triggering event.
#[derive(Args, Debug)]
struct EventArgs {
    /// Repository as owner/name
    #[arg(long, env = "REPO")]
    repo: String,

    /// Issue the comment was posted on
    #[arg(long, env = "ISSUE_NUMBER")]
    issue_number: u64,

    #[arg(long, env = "ISSUE_TITLE", default_value = "")]
    issue_title: String,

    #[arg(long, env = "ISSUE_BODY", default_value = "")]
    issue_body: String,

    /// The triggering comment
    #[arg(long, env = "COMMENT_BODY", default_value = "")]
    comment_body: String,

    /// Login of the comment author
    #[arg(long, env = "ACTOR", default_value = "")]
    actor: String,

    /// Base branch for the pull request
    #[arg(long, env = "DEFAULT_BASE_BRANCH", default_value = "main")]
    base_branch: String,

    /// Comma-separated protected prefixes (default set when omitted)
    #[arg(long, env = "PROTECTED_PREFIXES")]
    protected_prefixes: Option<String>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    event: EventArgs,

    /// GitHub token for the API and for pushing
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: String,

    /// GitHub REST API base URL
    #[arg(long, env = "PIGPEN_GITHUB_API", default_value = DEFAULT_API_BASE)]
    github_api: String,

    /// Patch service base URL
    #[arg(long, env = "PIGPEN_LLM_ENDPOINT")]
    llm_endpoint: Option<String>,

    /// Patch service bearer key
    #[arg(long, env = "PIGPEN_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Test command, split on whitespace
    #[arg(long, env = "PIGPEN_TEST_COMMAND", default_value = "npm test")]
    test_command: String,

    /// Test command time limit in seconds (0 = none)
    #[arg(long, default_value_t = 0)]
    test_timeout: u64,

    /// Checkout to branch, patch and test in
    #[arg(long, default_value = ".")]
    workdir: PathBuf,

    /// Push to this URL instead of the token-authenticated GitHub remote
    #[arg(long)]
    push_remote: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Run(args) => cmd_run(args).await,
        Commands::Plan(event) => cmd_plan(&event),
        Commands::Scan {
            patch_file,
            protected_prefixes,
        } => cmd_scan(&patch_file, protected_prefixes.as_deref()),
    }
}

fn build_context(event: &EventArgs) -> Result<RunContext> {
    let ctx = RunContext::new(event.repo.clone(), event.issue_number)
        .context("Invalid run context")?
        .with_issue(event.issue_title.clone(), event.issue_body.clone())
        .with_comment(event.comment_body.clone())
        .with_actor(event.actor.clone())
        .with_base_branch(event.base_branch.clone())
        .with_protected_prefixes(ProtectedPrefixSet::from_config(
            event.protected_prefixes.as_deref(),
        ));
    Ok(ctx)
}

fn test_argv(command: &str) -> Result<Vec<String>> {
    let argv: Vec<String> = command.split_whitespace().map(str::to_string).collect();
    if argv.is_empty() {
        bail!("Test command is empty");
    }
    Ok(argv)
}

async fn cmd_run(args: RunArgs) -> Result<ExitCode> {
    let ctx = build_context(&args.event)?;
    info!(
        run_id = %ctx.run_id,
        repo = %ctx.repo,
        issue = ctx.issue_number,
        actor = %ctx.actor,
        "starting governance run"
    );

    let tracker = GitHubTracker::new(
        GitHubConfig::new(args.github_token.clone(), ctx.repo.clone())
            .with_api_base(args.github_api),
    )
    .context("Failed to build GitHub client")?;

    let patch_service =
        HttpPatchService::new(PatchServiceConfig::new(args.llm_endpoint, args.api_key))
            .context("Failed to build patch service client")?;

    let remote = match args.push_remote {
        Some(url) => PushRemote::Url(url),
        None => PushRemote::GitHub {
            token: args.github_token,
        },
    };
    let workspace = GitWorkspace::new(args.workdir, remote)
        .with_test_command(test_argv(&args.test_command)?)
        .with_test_timeout(args.test_timeout);

    let pipeline = GovernancePipeline::new(
        ctx,
        Arc::new(tracker),
        Arc::new(patch_service),
        Arc::new(workspace),
    );
    let report = pipeline
        .run()
        .await
        .context("Governance run could not report to the issue")?;

    match &report.outcome {
        RunOutcome::PlanOnly { action } => info!(action = %action, "plan posted"),
        RunOutcome::Refused { refusal } => {
            info!(
                code = refusal.code(),
                two_key = report.governance().two_key_required(),
                "run refused"
            )
        }
        RunOutcome::Failed { failure } => warn!(code = failure.code(), "run failed"),
        RunOutcome::Opened { pull_request } => {
            info!(url = %pull_request.html_url, "pull request opened")
        }
    }

    Ok(ExitCode::from(exit_status(report.exit_code())))
}

fn cmd_plan(event: &EventArgs) -> Result<ExitCode> {
    let ctx = build_context(event)?;
    let _span = RunSpan::enter(&ctx.run_id.to_string(), &ctx.repo, ctx.issue_number);

    let plan = plan_for(&ctx);
    info!(action = %plan.action, intent = %plan.intent, risk = %plan.risk, "plan built");
    println!(
        "{}",
        messages::plan_comment(&plan, &GovernanceOutcome::default())
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_scan(patch_file: &Path, protected_prefixes: Option<&str>) -> Result<ExitCode> {
    let protected = scan(patch_file, protected_prefixes)?;
    if protected > 0 {
        println!("Two-Key Required: YES");
        return Ok(ExitCode::from(PROTECTED_EXIT));
    }
    Ok(ExitCode::SUCCESS)
}

/// Print every touched path; returns how many are protected. Header lines
/// that cannot be read count as protected.
fn scan(patch_file: &Path, protected_prefixes: Option<&str>) -> Result<usize> {
    let patch = std::fs::read_to_string(patch_file)
        .with_context(|| format!("Failed to read patch file {}", patch_file.display()))?;
    let prefixes = ProtectedPrefixSet::from_config(protected_prefixes);

    let scanned = scan_patch(&patch);
    let mut protected = 0usize;
    for path in &scanned.touched {
        if prefixes.is_protected(path) {
            protected += 1;
            println!("PROTECTED  {path}");
        } else {
            println!("ok         {path}");
        }
    }
    for line in &scanned.unparsed {
        protected += 1;
        println!("UNREADABLE {line}");
    }
    println!(
        "\n{} path(s) touched, {} protected",
        scanned.touched.len(),
        protected
    );
    Ok(protected)
}

/// Pipeline exit codes are 0 or 1; anything unrepresentable is a failure.
fn exit_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}
