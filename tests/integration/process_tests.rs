//! External process contract tests.
//!
//! These exercise the full classification matrix of the process runner
//! (exit code x stdout JSON x artifact presence) through the scripted
//! invoker, without spawning any real process.

use tseg_runner::{
    ProcessError, ProcessRunner, RegionBounds, TileExportSpec, RUNNER_PROGRAM, RUNNER_SUBCOMMAND,
};

use super::test_utils::{
    event_log, install_model, ready_layout, respond_failure, respond_success, ScriptedInvoker,
};

fn spec() -> TileExportSpec {
    TileExportSpec::new(
        RegionBounds::new(10, 20, 3000, 2000),
        1.0,
        0.25,
        512,
        0.25,
        ".jpg",
    )
    .unwrap()
}

#[tokio::test]
async fn test_success_with_empty_json_and_artifact() {
    let base = tempfile::tempdir().unwrap();
    let layout = ready_layout(base.path());
    let model = install_model(&layout);

    let invoker = ScriptedInvoker::new(event_log()).respond(respond_success("{}", Some("{}")));
    let runner = ProcessRunner::new(invoker);

    let report = runner.run(&layout, &model, &spec(), 0.5).await.unwrap();

    // Missing optional fields are not an error.
    assert_eq!(report.message, "Inference complete.");
    assert_eq!(report.polygon_count, None);
    assert_eq!(report.result_file, layout.result_path());
    assert!(report.elapsed_seconds >= 0.0);
}

#[tokio::test]
async fn test_success_with_reported_counts() {
    let base = tempfile::tempdir().unwrap();
    let layout = ready_layout(base.path());
    let model = install_model(&layout);

    let invoker = ScriptedInvoker::new(event_log()).respond(respond_success(
        r#"{"n_polygons": 12, "runtime_sec": 8.5}"#,
        Some("{}"),
    ));
    let runner = ProcessRunner::new(invoker);

    let report = runner.run(&layout, &model, &spec(), 0.5).await.unwrap();

    assert_eq!(report.message, "Found 12 polygon(s) in 8.500s.");
    assert_eq!(report.polygon_count, Some(12));
}

#[tokio::test]
async fn test_failure_message_classified() {
    let base = tempfile::tempdir().unwrap();
    let layout = ready_layout(base.path());
    let model = install_model(&layout);

    let invoker = ScriptedInvoker::new(event_log())
        .respond(respond_failure(2, r#"{"message": "model load failed"}"#));
    let runner = ProcessRunner::new(invoker);

    let result = runner.run(&layout, &model, &spec(), 0.5).await;

    match result {
        Err(ProcessError::Failed {
            reason,
            exit_code,
            log_file,
        }) => {
            assert_eq!(reason, "model load failed");
            assert_eq!(exit_code, 2);
            assert_eq!(log_file, layout.inference_log_path());
        }
        other => panic!("expected ProcessError::Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failure_with_non_json_stdout_falls_back() {
    let base = tempfile::tempdir().unwrap();
    let layout = ready_layout(base.path());
    let model = install_model(&layout);

    let invoker = ScriptedInvoker::new(event_log())
        .respond(respond_failure(1, "Traceback (most recent call last):"));
    let runner = ProcessRunner::new(invoker);

    let result = runner.run(&layout, &model, &spec(), 0.5).await;

    match result {
        Err(ProcessError::Failed { reason, .. }) => {
            assert!(reason.contains("non-JSON"));
            assert!(reason.contains("infer.log"));
        }
        other => panic!("expected ProcessError::Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_zero_exit_without_artifact_is_missing_output() {
    let base = tempfile::tempdir().unwrap();
    let layout = ready_layout(base.path());
    let model = install_model(&layout);

    // Child claims success but never writes polygons.geojson.
    let invoker = ScriptedInvoker::new(event_log())
        .respond(respond_success(r#"{"n_polygons": 3, "runtime_sec": 1.0}"#, None));
    let runner = ProcessRunner::new(invoker);

    let result = runner.run(&layout, &model, &spec(), 0.5).await;

    match result {
        Err(ProcessError::MissingOutput(path)) => assert_eq!(path, layout.result_path()),
        other => panic!("expected ProcessError::MissingOutput, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_script_aborts_before_invocation() {
    let base = tempfile::tempdir().unwrap();
    let layout = ready_layout(base.path());
    let model = install_model(&layout);
    std::fs::remove_file(layout.script_path()).unwrap();

    let invoker = ScriptedInvoker::new(event_log());
    let invocations = invoker.invocations.clone();
    let runner = ProcessRunner::new(invoker);

    let result = runner.run(&layout, &model, &spec(), 0.5).await;

    assert!(matches!(result, Err(ProcessError::ScriptNotFound(_))));
    assert!(invocations.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_command_carries_fixed_flag_contract() {
    let base = tempfile::tempdir().unwrap();
    let layout = ready_layout(base.path());
    let model = install_model(&layout);

    let invoker = ScriptedInvoker::new(event_log()).respond(respond_success("{}", Some("{}")));
    let invocations = invoker.invocations.clone();
    let runner = ProcessRunner::new(invoker);

    runner.run(&layout, &model, &spec(), 0.75).await.unwrap();

    let recorded = invocations.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    let command = &recorded[0];

    assert_eq!(command.program, RUNNER_PROGRAM);
    assert_eq!(command.cwd, layout.repo_dir());
    assert_eq!(command.args[0], RUNNER_SUBCOMMAND);
    assert_eq!(command.args[1], layout.script_path().display().to_string());

    for flag in [
        "--model-path",
        "--tile-dir",
        "--output-dir",
        "--roi-x",
        "--roi-y",
        "--roi-width",
        "--roi-height",
        "--downsample-rate",
        "--tile-size",
        "--confidence",
        "--log-file",
    ] {
        assert!(
            command.flag_value(flag).is_some(),
            "missing contract flag {flag}"
        );
    }

    assert_eq!(command.flag_value("--roi-x"), Some("10"));
    assert_eq!(command.flag_value("--roi-width"), Some("3000"));
    assert_eq!(command.flag_value("--downsample-rate"), Some("4"));
    assert_eq!(command.flag_value("--confidence"), Some("0.75"));
    assert_eq!(
        command.flag_value("--model-path"),
        Some(model.display().to_string().as_str())
    );
}

#[tokio::test]
async fn test_stderr_never_influences_classification() {
    let base = tempfile::tempdir().unwrap();
    let layout = ready_layout(base.path());
    let model = install_model(&layout);

    // Noisy stderr with a clean zero exit stays a success.
    let mut response = respond_success("{}", Some("{}"));
    if let super::test_utils::ScriptedResponse::Output { output, .. } = &mut response {
        output.stderr = "WARNING: deprecated API\nanother line\n".to_string();
    }

    let invoker = ScriptedInvoker::new(event_log()).respond(response);
    let runner = ProcessRunner::new(invoker);

    let report = runner.run(&layout, &model, &spec(), 0.5).await.unwrap();
    assert_eq!(report.message, "Inference complete.");
}

#[tokio::test]
async fn test_interpret_does_not_require_script() {
    // Classification is pure with respect to the script; only invoke
    // checks for it.
    let base = tempfile::tempdir().unwrap();
    let layout = ready_layout(base.path());
    std::fs::write(layout.result_path(), "{}").unwrap();

    let runner = ProcessRunner::new(ScriptedInvoker::new(event_log()));
    let timed = tseg_runner::process::TimedOutput {
        output: tseg_runner::ProcessOutput {
            exit_code: 0,
            stdout: "{}".to_string(),
            stderr: String::new(),
        },
        elapsed_seconds: 0.5,
    };

    let report = runner.interpret(&timed, &layout).unwrap();
    assert_eq!(report.elapsed_seconds, 0.5);
    assert_eq!(report.result_file, layout.result_path());
}
