//! Integration tests for superseding runs and isolating their state

use std::time::Duration;

use super::common::harness::{controller, drain, lines, run_snippet};
use jsplayground::{RunStatus, Snippet, WidgetState};
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_superseded_timer_never_appears() {
    let mut controller = controller();
    let snippet = Snippet::new("setTimeout(() => console.log('old run'), 50); console.log('first');");
    controller.start(&snippet).unwrap();
    assert_eq!(controller.state(), WidgetState::Running);

    let run = run_snippet(&mut controller, "console.log('second run');").await;
    assert_eq!(lines(&run), vec!["second run"]);

    tokio::time::sleep(Duration::from_millis(100)).await;
    controller.poll(Instant::now());
    let run = controller.active_run().unwrap();
    assert_eq!(lines(run), vec!["second run"]);
    assert_eq!(controller.state(), WidgetState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_two_quick_runs_give_one_terminal_transcript() {
    let mut controller = controller();
    let mut updates = controller.subscribe();

    let slow = Snippet::new("console.log('slow'); setTimeout(() => console.log('slow done'), 20);");
    let fast = Snippet::new("console.log('fast'); setTimeout(() => console.log('fast done'), 10);");
    let first = controller.start(&slow).unwrap();
    let second = controller.start(&fast).unwrap();
    controller.drive_until_settled().await;

    let received = drain(&mut updates);
    let terminal: Vec<_> = received.iter().filter(|u| u.is_terminal()).collect();
    assert_eq!(terminal.len(), 1);
    assert_eq!(terminal[0].run_id, second);
    assert_eq!(terminal[0].texts(), vec!["fast", "fast done"]);
    assert!(received
        .iter()
        .filter(|u| u.run_id == first)
        .all(|u| u.status == RunStatus::Running));
}

#[tokio::test(start_paused = true)]
async fn test_superseded_microtasks_do_not_leak() {
    let mut controller = controller();
    let snippet = Snippet::new(
        r#"
        console.log('first');
        await new Promise(resolve => setTimeout(resolve, 30));
        console.log('first resumed');
        "#,
    );
    controller.start(&snippet).unwrap();

    let run = run_snippet(&mut controller, "console.log('second');").await;
    assert_eq!(lines(&run), vec!["second"]);
    assert!(controller.engine_mut().page_mut().host_console_installed());
}

#[tokio::test(start_paused = true)]
async fn test_globals_are_swept_between_runs() {
    let mut controller = controller();
    run_snippet(&mut controller, "leaked = 41; globalThis.other = 'x';").await;
    let run = run_snippet(
        &mut controller,
        "console.log(typeof leaked, typeof other, typeof Math);",
    )
    .await;

    assert_eq!(lines(&run), vec!["undefined undefined object"]);
}

#[tokio::test(start_paused = true)]
async fn test_updates_track_growing_records() {
    let mut controller = controller();
    let mut updates = controller.subscribe();
    run_snippet(
        &mut controller,
        r#"
        console.log('sync');
        setTimeout(() => console.log('t1'), 10);
        setTimeout(() => {}, 20);
        setTimeout(() => console.log('t3'), 30);
        "#,
    )
    .await;

    // Nothing is published for the silent timer; the last growth and the
    // terminal status arrive together.
    let received = drain(&mut updates);
    let counts: Vec<usize> = received.iter().map(|u| u.records.len()).collect();
    assert_eq!(counts, vec![1, 2, 3]);
    assert!(received.last().is_some_and(|u| u.is_terminal()));
    assert!(received[..2].iter().all(|u| !u.is_terminal()));
}
