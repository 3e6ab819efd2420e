// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `jobhop`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jobhop",
    version,
    about = "Run commands on local or remote resources and fetch their results later.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `JOBHOP_CONFIG`, else `<config dir>/jobhop/jobhop.toml` if it
    /// exists.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JOBHOP_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Submit a command as a job on a resource.
    Run(RunArgs),
    /// Inspect, fetch or delete registered jobs.
    Jobs(JobsArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Resource to run on.
    #[arg(short, long, value_name = "NAME", default_value = "local")]
    pub resource: String,

    /// Orchestrator variant (plain, dataset).
    #[arg(short, long, value_name = "NAME")]
    pub orchestrator: Option<String>,

    /// Submitter (local, pbs, condor, slurm).
    #[arg(short, long, value_name = "NAME")]
    pub submitter: Option<String>,

    /// YAML job spec; may be given several times, later files win.
    #[arg(long = "job-spec", value_name = "FILE")]
    pub job_specs: Vec<PathBuf>,

    /// Job parameter override, applied after the job spec files.
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Input path, relative to the local directory.
    #[arg(short, long = "input", value_name = "PATH")]
    pub inputs: Vec<String>,

    /// Output path, relative to the working directory.
    #[arg(short = 'O', long = "output", value_name = "PATH")]
    pub outputs: Vec<String>,

    #[arg(short, long, value_name = "MSG")]
    pub message: Option<String>,

    /// Wait for the job, fetch its results and unregister it.
    #[arg(long)]
    pub follow: bool,

    /// The command to run.
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct JobsArgs {
    #[arg(value_enum, default_value_t = JobAction::List)]
    pub action: JobAction,

    /// Job ids or unambiguous prefixes. Default: all jobs for `list`.
    #[arg(value_name = "JOBID")]
    pub jobids: Vec<String>,

    /// Act on every registered job.
    #[arg(short, long)]
    pub all: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum JobAction {
    List,
    Show,
    Fetch,
    Delete,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
