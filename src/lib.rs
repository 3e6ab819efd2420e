// src/lib.rs

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod orchestrator;
pub mod registry;
pub mod resource;
pub mod session;
pub mod submitter;
pub mod template;
pub mod types;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::app::{App, FetchOutcome};
use crate::cli::{CliArgs, Command, JobAction, JobsArgs, RunArgs};
use crate::config::load_or_default;
use crate::orchestrator::JobSpec;
use crate::submitter::FollowOutcome;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the catalog and the job registry
/// - Ctrl-C handling while following a job
/// - the `run` / `jobs` commands
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref())?;
    let app = App::from_config(cfg)?;

    match args.command {
        Command::Run(run_args) => run_command(&app, run_args).await,
        Command::Jobs(jobs_args) => jobs_command(&app, jobs_args).await,
    }
}

/// Job spec for `run`: spec files in order, then `-p` overrides, then the
/// dedicated flags.
pub fn job_spec_from_args(args: &RunArgs) -> Result<JobSpec> {
    let mut spec = JobSpec::default();
    for path in &args.job_specs {
        let file = JobSpec::load(path).with_context(|| format!("loading job spec {:?}", path))?;
        spec.merge(file);
    }
    for assignment in &args.params {
        spec.set_assignment(assignment)?;
    }

    spec.merge(JobSpec {
        orchestrator: args.orchestrator.clone(),
        submitter: args.submitter.clone(),
        message: args.message.clone(),
        inputs: args.inputs.clone(),
        outputs: args.outputs.clone(),
        command_str: command_str(&args.command),
        ..JobSpec::default()
    });
    Ok(spec)
}

/// A single word after `--` is taken as a shell command line; several words
/// are quoted so each stays one argument.
fn command_str(words: &[String]) -> Option<String> {
    match words {
        [] => None,
        [line] => Some(line.clone()),
        words => Some(session::quote::join(words)),
    }
}

async fn run_command(app: &App, args: RunArgs) -> Result<()> {
    let spec = job_spec_from_args(&args)?;

    let cancel = CancellationToken::new();
    let follow = args.follow.then(|| app.follow_options().with_cancel(cancel.clone()));
    if follow.is_some() {
        let token = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            token.cancel();
        });
    }

    let outcome = app.run_job(&args.resource, spec, follow.as_ref()).await?;
    println!("{}", outcome.jobid);
    match outcome.follow {
        Some(FollowOutcome::Finished { .. }) | None => Ok(()),
        Some(other) => {
            info!(jobid = %outcome.jobid, "job left registered; use `jobhop jobs fetch` later");
            bail!("stopped following job {}: {:?}", outcome.jobid, other)
        }
    }
}

async fn jobs_command(app: &App, args: JobsArgs) -> Result<()> {
    if args.jobids.is_empty() && !args.all && args.action != JobAction::List {
        bail!("no job ids given; pass job ids or --all");
    }

    let mut failures = 0usize;
    for (requested, resolved) in app.select_jobs(&args.jobids, args.all)? {
        let jobid = match resolved {
            Ok(id) => id,
            Err(e) => {
                error!(job = %requested, error = %e, "cannot resolve job");
                failures += 1;
                continue;
            }
        };
        if let Err(e) = job_action(app, args.action, &jobid).await {
            error!(jobid = %jobid, error = %e, "job action failed");
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{failures} job(s) failed");
    }
    Ok(())
}

async fn job_action(app: &App, action: JobAction, jobid: &str) -> errors::Result<()> {
    match action {
        JobAction::List => println!("{}", app.summarize(jobid).await?),
        JobAction::Show => print!("{}", app.load_record(jobid)?.to_yaml()?),
        JobAction::Fetch => match app.fetch_job(jobid).await? {
            FetchOutcome::Fetched => println!("{jobid} fetched"),
            FetchOutcome::NotCompleted => println!("{jobid} not completed"),
        },
        JobAction::Delete => {
            if app.delete_job(jobid)? {
                println!("{jobid} deleted");
            }
        }
    }
    Ok(())
}
