//! Integration tests for error reporting, timeouts and interceptor faults

use std::time::Duration;

use super::common::harness::{controller, lines, run_snippet};
use jsplayground::{ErrorKind, ErrorPhase, OutputKind, RunStatus};

#[tokio::test(start_paused = true)]
async fn test_awaited_rejection_keeps_prior_output() {
    let mut controller = controller();
    let run = run_snippet(
        &mut controller,
        "console.log('before'); await Promise.reject(new Error('boom'));",
    )
    .await;

    assert_eq!(run.status, RunStatus::Errored);
    assert_eq!(run.records.len(), 2);
    assert_eq!(run.records[0].text, "before");
    assert_eq!(run.records[1].kind, OutputKind::Uncaught);
    assert!(
        run.records[1].text.contains("Error: boom"),
        "unexpected uncaught text: {}",
        run.records[1].text
    );

    let error = run.terminal_error.expect("Errored run should carry an error");
    assert_eq!(error.kind, ErrorKind::AsynchronousRuntimeError);
    assert_eq!(error.message, "boom");
}

#[tokio::test(start_paused = true)]
async fn test_synchronous_error_stops_the_run() {
    let mut controller = controller();
    let run = run_snippet(
        &mut controller,
        r#"
        console.log('one');
        setTimeout(() => console.log('never'), 0);
        null.property;
        console.log('unreachable');
        "#,
    )
    .await;

    assert_eq!(run.status, RunStatus::Errored);
    assert_eq!(run.records[0].text, "one");
    assert_eq!(run.records.len(), 2);
    assert_eq!(run.records[1].kind, OutputKind::Uncaught);

    let error = run.terminal_error.expect("Errored run should carry an error");
    assert_eq!(error.kind, ErrorKind::SynchronousRuntimeError);
    assert_eq!(error.phase, ErrorPhase::Synchronous);
    assert_eq!(error.name.as_deref(), Some("TypeError"));
}

#[tokio::test(start_paused = true)]
async fn test_thrown_non_error_value() {
    let mut controller = controller();
    let run = run_snippet(&mut controller, "throw { code: 42 };").await;

    assert_eq!(run.status, RunStatus::Errored);
    assert_eq!(run.records[0].text, "Uncaught { code: 42 }");
    let error = run.terminal_error.expect("Errored run should carry an error");
    assert_eq!(error.name, None);
}

#[tokio::test(start_paused = true)]
async fn test_compile_error_goes_straight_to_errored() {
    let mut controller = controller();
    let run = run_snippet(&mut controller, "console.log('hi'\nconst = 1;").await;

    assert_eq!(run.status, RunStatus::Errored);
    let error = run.terminal_error.expect("Errored run should carry an error");
    assert_eq!(error.kind, ErrorKind::CompileError);
    assert_eq!(run.records.len(), 1);
    assert!(
        run.records[0].text.contains("SyntaxError"),
        "unexpected compile error text: {}",
        run.records[0].text
    );
}

#[tokio::test(start_paused = true)]
async fn test_interval_hits_run_budget() {
    let mut controller = controller();
    let started = tokio::time::Instant::now();
    let run = run_snippet(&mut controller, "setInterval(() => console.log('tick'), 500);").await;

    assert_eq!(run.status, RunStatus::TimedOut);
    assert_eq!(lines(&run), vec!["tick", "tick", "tick"]);
    let error = run.terminal_error.expect("Timed out run should carry an error");
    assert_eq!(error.kind, ErrorKind::TimeoutExceeded);
    assert_eq!(error.phase, ErrorPhase::Timeout);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(2000) && elapsed < Duration::from_millis(2100));
}

#[tokio::test(start_paused = true)]
async fn test_long_timer_is_dropped_at_wait_window() {
    let mut controller = controller();
    let run = run_snippet(
        &mut controller,
        "console.log('now'); setTimeout(() => console.log('much later'), 30000);",
    )
    .await;

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(lines(&run), vec!["now"]);
    assert_eq!(run.dropped_timers, 1);
}

#[tokio::test(start_paused = true)]
async fn test_console_identity_survives_every_outcome() {
    let mut controller = controller();
    let snippets = [
        "console.log('ok')",
        "throw new Error('sync')",
        "await Promise.reject(new Error('async'))",
        "setInterval(() => {}, 100)",
        "console.log(",
        "setTimeout(() => console.log('pending'), 100)",
    ];
    for source in snippets {
        run_snippet(&mut controller, source).await;
        assert!(
            controller.engine_mut().page_mut().host_console_installed(),
            "console left redirected after {source:?}"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_locked_console_faults_then_recovers() {
    let mut controller = controller();
    let run = run_snippet(
        &mut controller,
        r#"
        console.log('locking');
        Object.defineProperty(globalThis, 'console', {
            value: {}, writable: false, configurable: false,
        });
        "#,
    )
    .await;

    assert_eq!(run.status, RunStatus::Errored);
    let error = run.terminal_error.expect("Fault should carry an error");
    assert_eq!(error.kind, ErrorKind::InterceptorFault);
    assert_eq!(run.records[0].text, "locking");
    assert_eq!(
        run.records.last().map(|r| r.kind.clone()),
        Some(OutputKind::Diagnostic)
    );

    let next = run_snippet(&mut controller, "console.log('recovered')").await;
    assert_eq!(next.status, RunStatus::Completed);
    assert_eq!(lines(&next), vec!["recovered"]);
    assert!(controller.engine_mut().page_mut().host_console_installed());
}

#[tokio::test(start_paused = true)]
async fn test_queue_microtask_error_is_not_a_rejection() {
    let mut controller = controller();
    let run = run_snippet(
        &mut controller,
        "queueMicrotask(() => { throw new Error('qm') }); console.log('sync');",
    )
    .await;

    assert_eq!(run.status, RunStatus::Errored);
    assert_eq!(lines(&run), vec!["sync", "Uncaught Error: qm"]);
    assert_eq!(run.records[1].kind, OutputKind::Uncaught);

    let error = run.terminal_error.expect("Errored run should carry an error");
    assert_eq!(error.phase, ErrorPhase::Microtask);
}
