//! Integration tests for the process supervisor and engine runner.
//!
//! Scripted launchers cover the retry bound, cancellation, decoding and
//! progress forwarding; on Unix the real shell launcher runs small `sh`
//! scripts.

mod common;

use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::Duration;

use assert_matches::assert_matches;

use chloe_core::treatments::MapParams;
use chloe_core::{ExecutionRequest, ParameterValue, Treatment};
use chloe_runner::supervisor::{COMMAND_HEADER, OUTPUT_HEADER};
use chloe_runner::{
    CommandBuilder, EngineCommand, EngineConfig, EngineError, EngineRunner, ExecutionStatus,
    FeedbackEvent, ProcessSupervisor, PropertiesTarget, SupervisorState,
};

use common::{lines, Attempt, RecordingSink, ScriptedLauncher};

fn engine_command() -> EngineCommand {
    CommandBuilder::build(
        None,
        &["-jar".to_string(), "bin/chloe5-0.0.1.jar".to_string()],
        Path::new("/tmp/distance_params.properties"),
    )
}

// ---------------------------------------------------------------------------
// Test: retry bound
// ---------------------------------------------------------------------------

/// Four failed starts followed by a good one complete normally.
#[tokio::test]
async fn fifth_attempt_succeeds_after_four_failures() {
    let launcher = ScriptedLauncher::new([
        Attempt::FailToStart,
        Attempt::FailToStart,
        Attempt::FailToStart,
        Attempt::FailToStart,
        Attempt::Lines(lines(&["#50", "done"])),
    ]);
    let probe = launcher.probe.clone();
    let mut supervisor = ProcessSupervisor::new(launcher, "Chloe");
    let mut sink = RecordingSink::default();

    let outcome = supervisor.run(&engine_command(), &mut sink).await;

    assert_matches!(outcome.status, ExecutionStatus::Completed);
    assert_eq!(outcome.attempts, 5);
    assert_eq!(outcome.log, vec!["#50", "done"]);
    assert_eq!(outcome.last_progress, Some(50));
    assert_eq!(probe.launches.load(Ordering::SeqCst), 5);
    assert_eq!(supervisor.state(), SupervisorState::Terminated);
}

/// Five failed starts surface a start error and no sixth launch happens.
#[tokio::test]
async fn five_failures_surface_transient_start_error() {
    let launcher = ScriptedLauncher::new([
        Attempt::FailToStart,
        Attempt::FailToStart,
        Attempt::FailToStart,
        Attempt::FailToStart,
        Attempt::FailToStart,
        Attempt::Lines(lines(&["never seen"])),
    ]);
    let probe = launcher.probe.clone();
    let mut supervisor = ProcessSupervisor::new(launcher, "Chloe");
    let mut sink = RecordingSink::default();

    let outcome = supervisor.run(&engine_command(), &mut sink).await;

    assert_eq!(probe.launches.load(Ordering::SeqCst), 5);
    assert_eq!(outcome.attempts, 5);
    assert!(sink.console_lines().is_empty());
    assert_matches!(
        outcome.into_result(),
        Err(EngineError::TransientStart { attempts: 5, lines_read: 0, .. })
    );
}

/// A read error mid-stream uses up an attempt; the log restarts per attempt.
#[tokio::test]
async fn read_error_is_retried_with_fresh_log() {
    let launcher = ScriptedLauncher::new([
        Attempt::LinesThenError(lines(&["partial", "#20"])),
        Attempt::Lines(lines(&["again", "#100"])),
    ]);
    let mut supervisor = ProcessSupervisor::new(launcher, "Chloe");
    let mut sink = RecordingSink::default();

    let outcome = supervisor.run(&engine_command(), &mut sink).await;

    assert!(outcome.is_completed());
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.log, vec!["again", "#100"]);
    assert_eq!(sink.console_lines(), vec!["partial", "#20", "again", "#100"]);
    assert_eq!(sink.progress(), vec![20, 100]);
}

/// A failed read terminates that attempt's engine before the next launch.
#[tokio::test]
async fn read_error_terminates_engine_before_relaunch() {
    let launcher = ScriptedLauncher::new([
        Attempt::LinesThenError(lines(&["partial"])),
        Attempt::Lines(lines(&["again"])),
    ]);
    let probe = launcher.probe.clone();
    let mut supervisor = ProcessSupervisor::new(launcher, "Chloe");
    let mut sink = RecordingSink::default();

    let outcome = supervisor.run(&engine_command(), &mut sink).await;

    assert!(outcome.is_completed());
    assert_eq!(probe.launches.load(Ordering::SeqCst), 2);
    assert!(probe.terminated.load(Ordering::SeqCst));
    assert_eq!(*probe.terminated_during_launch.lock().unwrap(), vec![1]);
}

/// The final error carries the last ten lines read before it.
#[tokio::test]
async fn exhausted_retries_keep_last_ten_lines() {
    let noisy: Vec<String> = (1..=12).map(|i| format!("line {i}")).collect();
    let noisy: Vec<&str> = noisy.iter().map(String::as_str).collect();
    let launcher = ScriptedLauncher::new([
        Attempt::FailToStart,
        Attempt::LinesThenError(lines(&noisy)),
    ]);
    let mut supervisor = ProcessSupervisor::new(launcher, "Chloe").with_max_start_attempts(2);
    let mut sink = RecordingSink::default();

    let outcome = supervisor.run(&engine_command(), &mut sink).await;

    match outcome.status {
        ExecutionStatus::Failed(EngineError::TransientStart {
            attempts,
            lines_read,
            last_lines,
            ..
        }) => {
            assert_eq!(attempts, 2);
            assert_eq!(lines_read, 12);
            assert_eq!(last_lines.len(), 10);
            assert_eq!(last_lines[0], "line 3");
            assert_eq!(last_lines[9], "line 12");
        }
        other => panic!("expected start failure, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Test: cancellation
// ---------------------------------------------------------------------------

/// Cancelling after the second line forwards exactly two lines, terminates
/// the process, and never waits for more output.
#[tokio::test]
async fn cancel_after_second_line() {
    let launcher = ScriptedLauncher::new([Attempt::LinesThenHang(lines(&[
        "one", "two", "three",
    ]))]);
    let probe = launcher.probe.clone();
    let mut supervisor = ProcessSupervisor::new(launcher, "Chloe");
    let mut sink = RecordingSink::cancelling_after(2);

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        supervisor.run(&engine_command(), &mut sink),
    )
    .await
    .expect("run must not block after cancellation");

    assert!(outcome.is_cancelled());
    assert_eq!(outcome.attempts, 1);
    assert_eq!(sink.console_lines(), vec!["one", "two"]);
    assert_eq!(probe.reads.load(Ordering::SeqCst), 2);
    assert!(probe.terminated.load(Ordering::SeqCst));
    assert_eq!(supervisor.state(), SupervisorState::Terminated);
}

/// A sink that is already cancelled never sees console output.
#[tokio::test]
async fn cancel_before_first_line() {
    let launcher = ScriptedLauncher::new([Attempt::LinesThenHang(lines(&["one"]))]);
    let probe = launcher.probe.clone();
    let mut supervisor = ProcessSupervisor::new(launcher, "Chloe");
    let mut sink = RecordingSink::cancelling_after(0);

    let outcome = supervisor.run(&engine_command(), &mut sink).await;

    assert!(outcome.is_cancelled());
    assert!(sink.console_lines().is_empty());
    assert_eq!(probe.reads.load(Ordering::SeqCst), 0);
    assert!(probe.terminated.load(Ordering::SeqCst));
}

// ---------------------------------------------------------------------------
// Test: output forwarding
// ---------------------------------------------------------------------------

/// Headers, command echo, console lines and progress arrive in order.
#[tokio::test]
async fn events_are_forwarded_in_order() {
    let launcher = ScriptedLauncher::new([Attempt::Lines(lines(&[
        "starting", "#10", "#101", "#100",
    ]))]);
    let mut supervisor = ProcessSupervisor::new(launcher, "Chloe");
    let mut sink = RecordingSink::default();
    let command = engine_command();

    let outcome = supervisor.run(&command, &mut sink).await;

    assert_eq!(outcome.last_progress, Some(100));
    assert_eq!(
        sink.events,
        vec![
            FeedbackEvent::Info("Java launcher is not configured".into()),
            FeedbackEvent::Info(COMMAND_HEADER.into()),
            FeedbackEvent::CommandEcho(command.command_line()),
            FeedbackEvent::Info(OUTPUT_HEADER.into()),
            FeedbackEvent::ConsoleLine("starting".into()),
            FeedbackEvent::ConsoleLine("#10".into()),
            FeedbackEvent::Progress(10),
            FeedbackEvent::ConsoleLine("#101".into()),
            FeedbackEvent::ConsoleLine("#100".into()),
            FeedbackEvent::Progress(100),
        ]
    );
}

/// Invalid UTF-8 becomes a replacement character; carriage returns go.
#[tokio::test]
async fn output_is_decoded_permissively() {
    let launcher = ScriptedLauncher::new([Attempt::Lines(vec![
        b"caf\xe9\r\n".to_vec(),
        b"#42\r\n".to_vec(),
        b"tail without newline".to_vec(),
    ])]);
    let mut supervisor = ProcessSupervisor::new(launcher, "Chloe");
    let mut sink = RecordingSink::default();

    let outcome = supervisor.run(&engine_command(), &mut sink).await;

    assert_eq!(
        outcome.log,
        vec!["caf\u{FFFD}", "#42", "tail without newline"]
    );
    assert_eq!(sink.progress(), vec![42]);
}

// ---------------------------------------------------------------------------
// Test: EngineRunner
// ---------------------------------------------------------------------------

fn distance_request() -> ExecutionRequest {
    ExecutionRequest::new("distance")
        .with("input_raster", ParameterValue::path("/a/in.tif"))
        .with("distance_sources", ParameterValue::set(["1", "2"]))
        .with("output_raster", ParameterValue::path("/a/out.tif"))
}

/// The runner writes the document, points the command at it and runs in
/// the engine directory.
#[tokio::test]
async fn runner_writes_configuration_then_runs() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let properties = dir.path().join("distance.properties");
    let config = EngineConfig {
        engine_dir: dir.path().to_path_buf(),
        ..EngineConfig::default()
    };
    let launcher = ScriptedLauncher::new([Attempt::Lines(lines(&["#100"]))]);
    let probe = launcher.probe.clone();
    let mut runner = EngineRunner::with_launcher(config, launcher);
    let mut sink = RecordingSink::default();

    let outcome = runner
        .execute(
            &distance_request(),
            &PropertiesTarget::At(properties.clone()),
            &mut sink,
        )
        .await
        .expect("configuration written");

    assert!(outcome.is_completed());
    assert_eq!(outcome.properties_path.as_deref(), Some(properties.as_path()));

    let written = std::fs::read_to_string(&properties).expect("read back");
    assert!(written.starts_with('#'));
    assert!(written.ends_with(
        "treatment=distance\ninput_raster=/a/in.tif\ndistance_sources={1;2}\noutput_raster=/a/out.tif\n"
    ));

    let commands = probe.commands.lock().unwrap();
    assert_eq!(
        commands[0].last().map(String::as_str),
        Some(properties.to_str().expect("utf-8 path"))
    );
    assert_eq!(probe.working_dirs.lock().unwrap()[0], dir.path());
}

/// A configuration write failure is returned before anything is launched.
#[tokio::test]
async fn runner_fails_fast_on_unwritable_configuration() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let launcher = ScriptedLauncher::new([Attempt::Lines(lines(&["unreachable"]))]);
    let probe = launcher.probe.clone();
    let mut runner = EngineRunner::with_launcher(EngineConfig::default(), launcher);
    let mut sink = RecordingSink::default();

    let target = PropertiesTarget::At(dir.path().join("missing").join("p.properties"));
    let result = runner.execute(&distance_request(), &target, &mut sink).await;

    assert_matches!(result, Err(EngineError::Configuration(_)));
    assert_eq!(probe.launches.load(Ordering::SeqCst), 0);
    assert!(sink.events.is_empty());
}

/// Invalid treatment parameters stop the run before the configuration is
/// written or the engine launched.
#[tokio::test]
async fn runner_rejects_invalid_treatment() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let properties = dir.path().join("map.properties");
    let launcher = ScriptedLauncher::new([Attempt::Lines(lines(&["unreachable"]))]);
    let probe = launcher.probe.clone();
    let mut runner = EngineRunner::with_launcher(EngineConfig::default(), launcher);
    let mut sink = RecordingSink::default();

    let mut params = MapParams {
        input_raster: "/a/in.tif".into(),
        output_csv: "/a/map.csv".into(),
        metrics: vec![],
    };
    let target = PropertiesTarget::At(properties.clone());
    let result = runner
        .execute_treatment(&Treatment::Map(params.clone()), &target, &mut sink)
        .await;

    assert_matches!(result, Err(EngineError::Validation(_)));
    assert!(!properties.exists());
    assert_eq!(probe.launches.load(Ordering::SeqCst), 0);

    params.metrics = vec!["SHDI".into()];
    let outcome = runner
        .execute_treatment(&Treatment::Map(params), &target, &mut sink)
        .await
        .expect("valid treatment");
    assert!(outcome.is_completed());
    assert!(properties.exists());
}

// ---------------------------------------------------------------------------
// Test: real shell (Unix)
// ---------------------------------------------------------------------------

#[cfg(unix)]
mod shell {
    use super::*;

    /// `/bin/sh <script> <properties>`.
    fn script_command(dir: &Path, body: &str) -> EngineCommand {
        let script = dir.join("engine.sh");
        std::fs::write(&script, body).expect("write script");
        CommandBuilder::build(
            Some(Path::new("/bin/sh")),
            &[script.to_string_lossy().into_owned()],
            &dir.join("run.properties"),
        )
    }

    #[tokio::test]
    async fn merges_stderr_and_parses_progress() {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(dir.path().join("run.properties"), "treatment=map\n").expect("write");
        let command = script_command(
            dir.path(),
            "cat \"$1\"\necho '#50'\necho 'warning' 1>&2\nprintf '#100\\r\\n'\nexit 3\n",
        );
        let mut supervisor = ProcessSupervisor::new(chloe_runner::ShellLauncher, dir.path());
        let mut sink = RecordingSink::default();

        let outcome = supervisor.run(&command, &mut sink).await;

        // Non-zero exit still completes.
        assert!(outcome.is_completed());
        assert_eq!(outcome.log, vec!["treatment=map", "#50", "warning", "#100"]);
        assert_eq!(sink.progress(), vec![50, 100]);
    }

    #[tokio::test]
    async fn cancellation_terminates_sleeping_engine() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let command = script_command(dir.path(), "echo one\necho two\nsleep 30\necho three\n");
        let mut supervisor = ProcessSupervisor::new(chloe_runner::ShellLauncher, dir.path());
        let mut sink = RecordingSink::cancelling_after(2);

        let outcome = tokio::time::timeout(
            Duration::from_secs(10),
            supervisor.run(&command, &mut sink),
        )
        .await
        .expect("cancellation must not wait for the engine");

        assert!(outcome.is_cancelled());
        assert_eq!(sink.console_lines(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn missing_launcher_reports_through_stream() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let command = CommandBuilder::build(
            None,
            &["-jar".to_string(), "bin/chloe5-0.0.1.jar".to_string()],
            &dir.path().join("run.properties"),
        );
        let mut supervisor = ProcessSupervisor::new(chloe_runner::ShellLauncher, dir.path());
        let mut sink = RecordingSink::default();

        let outcome = supervisor.run(&command, &mut sink).await;

        assert!(outcome.is_completed());
        assert!(!outcome.log.is_empty(), "shell error should be streamed");
        assert_eq!(
            sink.events[0],
            FeedbackEvent::Info("Java launcher is not configured".into())
        );
    }
}
