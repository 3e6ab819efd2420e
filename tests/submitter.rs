mod common;

use std::time::Duration;

use common::fake_session;
use jobhop::errors::CommandError;
use jobhop::session::CommandOutput;
use jobhop::submitter::{
    CondorBackend, FollowOptions, FollowOutcome, LocalBackend, PbsBackend, SlurmBackend, Submitter,
    SubmitterBackend,
};
use jobhop::types::{JobStatus, SubmitterStatus};
use jobhop_test_utils::init_tracing;
use tokio_util::sync::CancellationToken;

fn fast() -> FollowOptions {
    FollowOptions::default().with_interval(Duration::from_millis(1))
}

fn command_error(code: i32) -> CommandError {
    CommandError {
        cmd: "status".into(),
        exit_code: Some(code),
        stdout: String::new(),
        stderr: "boom".into(),
    }
}

#[tokio::test]
async fn status_without_submission_id_does_not_query() {
    init_tracing();
    let (session, fake) = fake_session();
    let submitter = Submitter::new(Box::new(SlurmBackend));

    let status = submitter.status(&session).await.unwrap();
    assert_eq!(status, SubmitterStatus::unknown());
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn follow_polls_until_no_longer_waiting() {
    init_tracing();
    let (session, fake) = fake_session();
    fake.on("ps -o stat=", CommandOutput::success("S\n"))
        .on("ps -o stat=", CommandOutput::success("R\n"))
        .on("ps -o stat=", CommandOutput::success(""));

    let submitter = Submitter::new(Box::new(LocalBackend)).with_submission_id(Some("4242".into()));
    let outcome = submitter.follow(&session, &fast()).await.unwrap();

    assert_eq!(
        outcome,
        FollowOutcome::Finished {
            status: SubmitterStatus::new(JobStatus::Completed, None),
            polls: 2,
        }
    );
    assert_eq!(fake.calls_matching("ps -o stat= -p 4242"), 3);
}

#[tokio::test]
async fn follow_returns_immediately_for_unknown_status() {
    let (session, fake) = fake_session();
    fake.on("squeue", CommandOutput::success("SOMETHING_NEW\n"));
    let submitter = Submitter::new(Box::new(SlurmBackend)).with_submission_id(Some("7".into()));

    match submitter.follow(&session, &fast()).await.unwrap() {
        FollowOutcome::Finished { status, polls } => {
            assert_eq!(status.status, JobStatus::Unknown);
            assert_eq!(status.raw.as_deref(), Some("SOMETHING_NEW"));
            assert_eq!(polls, 0);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(fake.calls().len(), 1);
}

#[tokio::test]
async fn follow_honours_timeout() {
    let (session, fake) = fake_session();
    fake.on("qstat", CommandOutput::success("    job_state = R\n"));
    let submitter = Submitter::new(Box::new(PbsBackend)).with_submission_id(Some("1.server".into()));

    let options = FollowOptions::default()
        .with_interval(Duration::from_millis(5))
        .with_timeout(Duration::from_millis(30));
    let outcome = submitter.follow(&session, &options).await.unwrap();
    assert_eq!(outcome, FollowOutcome::TimedOut);
}

#[tokio::test]
async fn follow_honours_cancellation() {
    let (session, fake) = fake_session();
    fake.on("condor_q", CommandOutput::success("2\n"));
    let submitter = Submitter::new(Box::new(CondorBackend)).with_submission_id(Some("12".into()));

    let token = CancellationToken::new();
    token.cancel();
    let options = FollowOptions::default()
        .with_interval(Duration::from_secs(3600))
        .with_cancel(token);
    let outcome = submitter.follow(&session, &options).await.unwrap();
    assert_eq!(outcome, FollowOutcome::Cancelled);
}

#[tokio::test]
async fn failed_status_query_is_interpreted_not_raised() {
    let (session, fake) = fake_session();
    fake.on("squeue", CommandOutput::failure(1, "slurm_load_jobs error: Invalid job id"));
    let submitter = Submitter::new(Box::new(SlurmBackend)).with_submission_id(Some("7".into()));
    assert_eq!(submitter.status(&session).await.unwrap(), SubmitterStatus::unknown());

    let (session, fake) = fake_session();
    fake.on("ps -o stat=", CommandOutput::failure(1, ""));
    let local = Submitter::new(Box::new(LocalBackend)).with_submission_id(Some("1".into()));
    assert_eq!(
        local.status(&session).await.unwrap().status,
        JobStatus::Completed
    );
}

#[tokio::test]
async fn submit_records_the_submission_id() {
    init_tracing();
    let (session, fake) = fake_session();
    fake.on("sbatch --parsable", CommandOutput::success("5555;cluster\n"));
    let mut submitter = Submitter::new(Box::new(SlurmBackend));

    let id = submitter.submit(&session, "/jobs/meta/submit").await.unwrap();
    assert_eq!(id.as_deref(), Some("5555"));
    assert_eq!(submitter.submission_id(), Some("5555"));
    assert_eq!(fake.calls(), vec!["sbatch --parsable /jobs/meta/submit".to_string()]);
}

#[tokio::test]
async fn submit_without_usable_id_is_not_fatal() {
    let (session, fake) = fake_session();
    fake.on("sh ", CommandOutput::success("nohup: ignoring input\n"));
    let mut submitter = Submitter::new(Box::new(LocalBackend));
    assert_eq!(submitter.submit(&session, "/x/submit").await.unwrap(), None);
    assert_eq!(submitter.submission_id(), None);
}

#[tokio::test]
async fn failing_submit_command_propagates() {
    let (session, fake) = fake_session();
    fake.on("qsub", CommandOutput::failure(2, "qsub: unknown queue"));
    let mut submitter = Submitter::new(Box::new(PbsBackend));
    let err = submitter.submit(&session, "/x/submit").await.unwrap_err();
    assert_eq!(err.as_command_error().and_then(|e| e.exit_code), Some(2));
}

#[test]
fn condor_rejects_ids_from_two_clusters() {
    let condor = CondorBackend;
    assert_eq!(
        condor.parse_submission_id("12.0 - 12.3\n").unwrap().as_deref(),
        Some("12")
    );
    assert!(condor.parse_submission_id("12.0 - 13.0\n").is_err());
    assert!(condor.parse_submission_id("Submitting job(s).\n").is_err());
    assert_eq!(condor.parse_submission_id("").unwrap(), None);
}

#[test]
fn condor_status_codes() {
    let condor = CondorBackend;
    let s = |out: &str| condor.interpret_status(Ok(out)).status;
    assert_eq!(s("1\n"), JobStatus::Waiting);
    assert_eq!(s("2\n"), JobStatus::Waiting);
    assert_eq!(s("4\n"), JobStatus::Completed);
    assert_eq!(s(""), JobStatus::Completed);
    assert_eq!(s("9\n"), JobStatus::Unknown);
    assert_eq!(condor.interpret_status(Err(&command_error(1))).status, JobStatus::Unknown);
}

#[test]
fn pbs_status_codes() {
    let pbs = PbsBackend;
    let s = |out: &str| pbs.interpret_status(Ok(out)).status;
    assert_eq!(s("Job Id: 1.server\n    job_state = Q\n"), JobStatus::Waiting);
    assert_eq!(s("    job_state = C\n"), JobStatus::Completed);
    assert_eq!(s("    job_state = X\n"), JobStatus::Unknown);
    assert_eq!(s("no state here"), JobStatus::Unknown);
    assert_eq!(pbs.interpret_status(Err(&command_error(153))).status, JobStatus::Unknown);
    assert_eq!(pbs.parse_submission_id("1234.server\n").unwrap().as_deref(), Some("1234.server"));
}

#[test]
fn slurm_status_codes() {
    let slurm = SlurmBackend;
    let s = |out: &str| slurm.interpret_status(Ok(out));
    assert_eq!(s("PENDING\n"), SubmitterStatus::new(JobStatus::Waiting, Some("PENDING".to_string())));
    assert_eq!(s("COMPLETED\n").status, JobStatus::Completed);
    assert_eq!(s("").status, JobStatus::Completed);
    assert_eq!(s("MYSTERY\n").status, JobStatus::Unknown);
}

#[test]
fn local_status_and_id_parsing() {
    let local = LocalBackend;
    assert_eq!(local.parse_submission_id("123\n").unwrap().as_deref(), Some("123"));
    assert_eq!(local.parse_submission_id("noise\n456\n\n").unwrap().as_deref(), Some("456"));
    assert_eq!(local.parse_submission_id("not a pid\n").unwrap(), None);
    assert_eq!(local.interpret_status(Ok("Ss\n")).status, JobStatus::Waiting);
    assert_eq!(local.interpret_status(Ok("Z+\n")).status, JobStatus::Completed);
    assert_eq!(local.interpret_status(Err(&command_error(2))).status, JobStatus::Unknown);
}

#[test]
fn status_commands_quote_the_submission_id() {
    let id = "1; touch /tmp/owned";
    let backends: [&dyn SubmitterBackend; 4] = [&LocalBackend, &PbsBackend, &CondorBackend, &SlurmBackend];
    for backend in backends {
        let command = backend.status_command(id);
        assert!(
            command.ends_with("'1; touch /tmp/owned'"),
            "{}: {command}",
            backend.name()
        );
    }
    assert_eq!(SlurmBackend.status_command("5555"), "squeue -h -o %T -j 5555");
}
