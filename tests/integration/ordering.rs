//! Integration tests for event loop ordering and timing

use super::common::harness::{controller, lines, run_snippet};
use jsplayground::RunStatus;

#[tokio::test(start_paused = true)]
async fn test_zero_delay_timer_after_synchronous_code() {
    let mut controller = controller();
    let run = run_snippet(
        &mut controller,
        "console.log('A'); setTimeout(() => console.log('B'), 0); console.log('C');",
    )
    .await;

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(lines(&run), vec!["A", "C", "B"]);
}

#[tokio::test(start_paused = true)]
async fn test_timers_fire_by_delay_then_creation_order() {
    let mut controller = controller();
    let run = run_snippet(
        &mut controller,
        r#"
        setTimeout(() => console.log('slow'), 30);
        setTimeout(() => console.log('fast 1'), 10);
        setTimeout(() => console.log('fast 2'), 10);
        Promise.resolve().then(() => console.log('micro'));
        "#,
    )
    .await;

    assert_eq!(lines(&run), vec!["micro", "fast 1", "fast 2", "slow"]);
    let elapsed: Vec<u64> = run.records.iter().map(|r| r.elapsed_ms).collect();
    assert_eq!(elapsed, vec![0, 10, 10, 30]);
}

#[tokio::test(start_paused = true)]
async fn test_sequence_numbers_follow_call_order() {
    let mut controller = controller();
    let run = run_snippet(
        &mut controller,
        r#"
        setTimeout(() => console.log('t'), 5);
        await new Promise(resolve => setTimeout(resolve, 1));
        console.log('resumed');
        "#,
    )
    .await;

    assert_eq!(lines(&run), vec!["resumed", "t"]);
    let sequences: Vec<u64> = run.records.iter().map(|r| r.sequence).collect();
    assert_eq!(sequences, vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_interval_cleared_by_itself() {
    let mut controller = controller();
    let run = run_snippet(
        &mut controller,
        r#"
        let n = 0;
        const id = setInterval(() => {
            n += 1;
            console.log('tick', n);
            if (n === 3) clearInterval(id);
        }, 100);
        "#,
    )
    .await;

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(lines(&run), vec!["tick 1", "tick 2", "tick 3"]);
    assert_eq!(run.dropped_timers, 0);
}

#[tokio::test(start_paused = true)]
async fn test_group_depth_and_counters() {
    let mut controller = controller();
    let run = run_snippet(
        &mut controller,
        r#"
        console.group('outer');
        console.count();
        console.count();
        console.groupEnd();
        console.log('done');
        "#,
    )
    .await;

    let depths: Vec<usize> = run
        .records
        .iter()
        .filter(|r| r.is_visible())
        .map(|r| r.depth)
        .collect();
    assert_eq!(
        lines(&run),
        vec!["outer", "default: 1", "default: 2", "done"]
    );
    assert_eq!(depths, vec![0, 1, 1, 0]);
}

#[tokio::test(start_paused = true)]
async fn test_same_snippet_twice_gives_identical_transcripts() {
    let source = r#"
        console.log({ n: 1 }, [1, 'two']);
        setTimeout(() => console.warn('later'), 25);
        Promise.resolve().then(() => console.info('micro'));
    "#;
    let mut controller = controller();
    let first = run_snippet(&mut controller, source).await;
    let second = run_snippet(&mut controller, source).await;

    assert_ne!(first.id, second.id);
    assert_eq!(first.records, second.records);
    assert_eq!(first.status, second.status);
}

#[tokio::test(start_paused = true)]
async fn test_global_timer_functions_join_the_run() {
    let mut controller = controller();
    let run = run_snippet(
        &mut controller,
        r#"
        const setTimeout = globalThis.setTimeout;
        setTimeout(() => console.log('late'), 20);
        globalThis.setTimeout(() => console.log('soon'), 10);
        globalThis.queueMicrotask(() => console.log('micro'));
        "#,
    )
    .await;

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(lines(&run), vec!["micro", "soon", "late"]);
}
