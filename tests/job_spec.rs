use clap::Parser;
use jobhop::catalog::Catalog;
use jobhop::cli::{CliArgs, Command, JobAction};
use jobhop::errors::JobhopError;
use jobhop::job_spec_from_args;
use jobhop::logging::resolve_level;
use jobhop::orchestrator::JobSpec;
use jobhop::session::SshTransport;
use serde_yaml::Value;

fn run_args(argv: &[&str]) -> jobhop::cli::RunArgs {
    let mut full = vec!["jobhop", "run"];
    full.extend_from_slice(argv);
    match CliArgs::try_parse_from(full).unwrap().command {
        Command::Run(args) => args,
        other => panic!("expected run, got {other:?}"),
    }
}

#[test]
fn yaml_spec_keeps_unknown_keys() {
    let spec = JobSpec::from_yaml_str(
        "command_str: ./simulate\ninputs: [params.json]\nwalltime: \"01:00:00\"\nnum_processes: 4\n",
    )
    .unwrap();
    assert_eq!(spec.command_str.as_deref(), Some("./simulate"));
    assert_eq!(spec.inputs, vec!["params.json"]);
    assert_eq!(spec.extra["walltime"], Value::String("01:00:00".into()));
    assert_eq!(spec.extra["num_processes"], Value::Number(4.into()));
    assert_eq!(spec.orchestrator_name(), "plain");
    assert_eq!(spec.submitter_name(), "local");
}

#[test]
fn merge_lets_later_values_win() {
    let mut base = JobSpec::from_yaml_str("command_str: a\nmessage: keep\ninputs: [x]\nqueue: short\n").unwrap();
    let over = JobSpec::from_yaml_str("command_str: b\nqueue: long\n").unwrap();
    base.merge(over);
    assert_eq!(base.command_str.as_deref(), Some("b"));
    assert_eq!(base.message.as_deref(), Some("keep"));
    assert_eq!(base.inputs, vec!["x"]);
    assert_eq!(base.extra["queue"], Value::String("long".into()));
}

#[test]
fn set_param_parses_scalars() {
    let mut spec = JobSpec::default();
    spec.set_assignment("memory=4").unwrap();
    spec.set_assignment("exclusive=true").unwrap();
    spec.set_assignment("queue=long").unwrap();
    spec.set_assignment("message=42").unwrap();
    spec.set_assignment("outputs=[a, b]").unwrap();
    spec.set_assignment("inputs=single").unwrap();

    assert_eq!(spec.extra["memory"], Value::Number(4.into()));
    assert_eq!(spec.extra["exclusive"], Value::Bool(true));
    assert_eq!(spec.extra["queue"], Value::String("long".into()));
    assert_eq!(spec.message.as_deref(), Some("42"));
    assert_eq!(spec.outputs, vec!["a", "b"]);
    assert_eq!(spec.inputs, vec!["single"]);

    assert!(matches!(spec.set_assignment("no-equals"), Err(JobhopError::ConfigError(_))));
    assert!(spec.set_assignment("=value").is_err());
}

#[test]
fn run_args_layer_files_params_and_flags() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.yaml");
    let second = dir.path().join("second.yaml");
    std::fs::write(&first, "command_str: from-file\nqueue: short\nmemory: 1\n").unwrap();
    std::fs::write(&second, "queue: medium\n").unwrap();

    let args = run_args(&[
        "-r",
        "cluster",
        "--job-spec",
        first.to_str().unwrap(),
        "--job-spec",
        second.to_str().unwrap(),
        "-p",
        "memory=8",
        "-s",
        "slurm",
        "-i",
        "in",
        "-O",
        "out",
        "--follow",
    ]);
    assert_eq!(args.resource, "cluster");
    assert!(args.follow);

    let spec = job_spec_from_args(&args).unwrap();
    assert_eq!(spec.command_str.as_deref(), Some("from-file"));
    assert_eq!(spec.extra["queue"], Value::String("medium".into()));
    assert_eq!(spec.extra["memory"], Value::Number(8.into()));
    assert_eq!(spec.submitter_name(), "slurm");
    assert_eq!(spec.inputs, vec!["in"]);
    assert_eq!(spec.outputs, vec!["out"]);
}

#[test]
fn trailing_command_words() {
    let one = job_spec_from_args(&run_args(&["--", "cat in > out"])).unwrap();
    assert_eq!(one.command_str.as_deref(), Some("cat in > out"));

    let many = job_spec_from_args(&run_args(&["--", "echo", "two words"])).unwrap();
    assert_eq!(many.command_str.as_deref(), Some("echo 'two words'"));

    let defaults = run_args(&[]);
    assert_eq!(defaults.resource, "local");
    assert!(!defaults.follow);
}

#[test]
fn jobs_subcommand_defaults_to_list() {
    let args = CliArgs::try_parse_from(["jobhop", "jobs"]).unwrap();
    match args.command {
        Command::Jobs(jobs) => {
            assert_eq!(jobs.action, JobAction::List);
            assert!(jobs.jobids.is_empty());
        }
        other => panic!("expected jobs, got {other:?}"),
    }

    let args = CliArgs::try_parse_from(["jobhop", "--log-level", "debug", "jobs", "fetch", "2024", "-a"]).unwrap();
    assert!(args.log_level.is_some());
    match args.command {
        Command::Jobs(jobs) => {
            assert_eq!(jobs.action, JobAction::Fetch);
            assert_eq!(jobs.jobids, vec!["2024"]);
            assert!(jobs.all);
        }
        other => panic!("expected jobs, got {other:?}"),
    }
}

#[test]
fn log_level_priority() {
    use jobhop::cli::LogLevel;
    assert_eq!(resolve_level(Some(LogLevel::Warn), Some("trace")), tracing::Level::WARN);
    assert_eq!(resolve_level(None, Some("debug")), tracing::Level::DEBUG);
    assert_eq!(resolve_level(None, Some("nonsense")), tracing::Level::INFO);
    assert_eq!(resolve_level(None, None), tracing::Level::INFO);
}

#[test]
fn catalog_reports_known_names() {
    let catalog = Catalog::builtin();
    let names: Vec<_> = catalog.submitter_names().collect();
    assert_eq!(names, vec!["condor", "local", "pbs", "slurm"]);
    assert_eq!(catalog.orchestrator_names().collect::<Vec<_>>(), vec!["dataset", "plain"]);

    match catalog.submitter("sge") {
        Err(JobhopError::UnknownName { kind, name, known }) => {
            assert_eq!(kind, "submitter");
            assert_eq!(name, "sge");
            assert_eq!(known, "condor, local, pbs, slurm");
        }
        other => panic!("expected UnknownName, got {other:?}"),
    }
    assert!(catalog.transport("shell").is_ok());
    assert!(catalog.transport("docker").is_err());
}

#[test]
fn ssh_arguments() {
    let ssh = SshTransport::new("login")
        .with_user(Some("me".into()))
        .with_port(Some(2222))
        .with_key_filename(Some("/keys/id".into()));
    assert_eq!(ssh.destination(), "me@login");
    assert_eq!(
        ssh.ssh_args("echo 'hi there'"),
        vec![
            "-o",
            "BatchMode=yes",
            "-p",
            "2222",
            "-i",
            "/keys/id",
            "me@login",
            r#"sh -c 'echo '"'"'hi there'"'"''"#,
        ]
    );
}
