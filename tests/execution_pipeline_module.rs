use pls::execution::{ExecutionPipeline, PipelineEvent, PipelineOutcome, TaskStatus};
use pls::executor::{CancellationToken, CommandExecutor, CommandOutcome, ExecuteCommand};
use std::cell::RefCell;

/// Returns scripted outcomes keyed by command text and records every call.
struct ScriptedExecutor {
    outcomes: Vec<(&'static str, CommandOutcome)>,
    cancel_on: Option<&'static str>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedExecutor {
    fn new(outcomes: Vec<(&'static str, CommandOutcome)>) -> Self {
        Self {
            outcomes,
            cancel_on: None,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn execute(
        &self,
        command: &ExecuteCommand,
        cancel: &CancellationToken,
        on_progress: &mut dyn FnMut(&str),
    ) -> CommandOutcome {
        self.calls.borrow_mut().push(command.command.clone());
        on_progress(&format!("running {}", command.command));
        if self.cancel_on == Some(command.command.as_str()) {
            cancel.cancel();
            return CommandOutcome::failure("command was cancelled", 40);
        }
        self.outcomes
            .iter()
            .find(|(text, _)| *text == command.command)
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or_else(|| CommandOutcome::success("", 0))
    }
}

fn command(text: &str) -> ExecuteCommand {
    ExecuteCommand::new(format!("Run {text}"), text)
}

fn run(pipeline: &mut ExecutionPipeline, executor: &ScriptedExecutor) -> PipelineOutcome {
    let cancel = CancellationToken::new();
    pipeline.run(executor, &cancel, &mut |_, _| {})
}

#[test]
fn critical_failure_halts_and_leaves_the_rest_pending() {
    let executor = ScriptedExecutor::new(vec![
        ("build", CommandOutcome::success("ok\n", 100)),
        ("test", CommandOutcome::failure("command exited with status 2", 300)),
    ]);
    let mut pipeline = ExecutionPipeline::new(
        vec![command("build"), command("test"), command("deploy")],
        None,
    );

    let outcome = run(&mut pipeline, &executor);

    assert_eq!(
        outcome,
        PipelineOutcome::Failed {
            index: 1,
            description: "Run test".to_string(),
            error: "command exited with status 2".to_string(),
        }
    );
    assert_eq!(
        outcome.failure_message().as_deref(),
        Some("Run test failed: command exited with status 2")
    );
    assert_eq!(
        pipeline.statuses(),
        vec![TaskStatus::Success, TaskStatus::Failed, TaskStatus::Pending]
    );
    assert_eq!(*executor.calls.borrow(), vec!["build", "test"]);
    assert_eq!(pipeline.tasks()[0].output, "ok\n");
}

#[test]
fn non_critical_failure_continues_and_totals_every_task() {
    let executor = ScriptedExecutor::new(vec![
        ("lint", CommandOutcome::failure("warnings found", 500)),
        ("build", CommandOutcome::success("", 750)),
    ]);
    let mut pipeline = ExecutionPipeline::new(
        vec![command("lint").with_critical(false), command("build")],
        None,
    );

    let outcome = run(&mut pipeline, &executor);

    assert_eq!(
        outcome,
        PipelineOutcome::Completed {
            message: "Execution completed in 1 second.".to_string(),
            total_elapsed_ms: 1250,
        }
    );
    assert_eq!(
        pipeline.statuses(),
        vec![TaskStatus::Failed, TaskStatus::Success]
    );
    assert_eq!(pipeline.tasks()[0].error.as_deref(), Some("warnings found"));
}

#[test]
fn non_critical_failure_of_the_last_task_still_completes() {
    let executor = ScriptedExecutor::new(vec![
        ("build", CommandOutcome::success("", 2_000)),
        ("notify", CommandOutcome::failure("webhook unreachable", 1_000)),
    ]);
    let mut pipeline = ExecutionPipeline::new(
        vec![command("build"), command("notify").with_critical(false)],
        Some("Build finished".to_string()),
    );

    let outcome = run(&mut pipeline, &executor);

    assert_eq!(
        outcome,
        PipelineOutcome::Completed {
            message: "Build finished in 3 seconds.".to_string(),
            total_elapsed_ms: 3_000,
        }
    );
    assert_eq!(outcome.failure_message(), None);
    assert_eq!(
        pipeline.statuses(),
        vec![TaskStatus::Success, TaskStatus::Failed]
    );
    assert_eq!(*executor.calls.borrow(), vec!["build", "notify"]);
}

#[test]
fn summary_text_leads_the_completion_message() {
    let executor = ScriptedExecutor::new(vec![("deploy", CommandOutcome::success("", 65_000))]);
    let mut pipeline =
        ExecutionPipeline::new(vec![command("deploy")], Some("Deployment finished".to_string()));
    match run(&mut pipeline, &executor) {
        PipelineOutcome::Completed { message, .. } => {
            assert_eq!(message, "Deployment finished in 1 minute 5 seconds.")
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn cancellation_mid_run_aborts_current_and_cancels_the_rest() {
    let mut executor = ScriptedExecutor::new(Vec::new());
    executor.cancel_on = Some("second");
    let mut pipeline = ExecutionPipeline::new(
        vec![command("first"), command("second"), command("third")],
        None,
    );
    let cancel = CancellationToken::new();
    let mut events = Vec::new();

    let outcome = pipeline.run(&executor, &cancel, &mut |event, _| {
        events.push(match event {
            PipelineEvent::Started { index } => format!("start {index}"),
            PipelineEvent::Progress { index, line } => format!("line {index} {line}"),
            PipelineEvent::Finished { index, status } => format!("done {index} {status}"),
        })
    });

    assert_eq!(outcome, PipelineOutcome::Cancelled { index: Some(1) });
    assert_eq!(
        pipeline.statuses(),
        vec![
            TaskStatus::Success,
            TaskStatus::Aborted,
            TaskStatus::Cancelled
        ]
    );
    assert_eq!(
        events,
        vec![
            "start 0",
            "line 0 running first",
            "done 0 success",
            "start 1",
            "line 1 running second",
            "done 1 aborted",
        ]
    );
    assert_eq!(*executor.calls.borrow(), vec!["first", "second"]);
}

#[test]
fn cancellation_before_start_runs_nothing() {
    let executor = ScriptedExecutor::new(Vec::new());
    let mut pipeline = ExecutionPipeline::new(vec![command("a"), command("b")], None);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = pipeline.run(&executor, &cancel, &mut |_, _| {});

    assert_eq!(outcome, PipelineOutcome::Cancelled { index: None });
    assert_eq!(
        pipeline.statuses(),
        vec![TaskStatus::Cancelled, TaskStatus::Cancelled]
    );
    assert!(executor.calls.borrow().is_empty());
}
