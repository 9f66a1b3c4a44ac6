//! Integration tests for the widget driver and its handle

use super::common::harness::test_config;
use jsplayground::{PlaygroundError, PlaygroundWidget, RunStatus, Snippet, TranscriptUpdate};
use tokio::sync::broadcast;
use tokio::task::LocalSet;

async fn next_terminal(updates: &mut broadcast::Receiver<TranscriptUpdate>) -> TranscriptUpdate {
    loop {
        let update = updates.recv().await.expect("Widget closed before settling");
        if update.is_terminal() {
            return update;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_widget_runs_timers_to_completion() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let (handle, _task) = PlaygroundWidget::spawn(test_config()).unwrap();
            let mut updates = handle.subscribe();

            let token = handle
                .start_run("console.log('A'); setTimeout(() => console.log('B'), 0); console.log('C');")
                .await
                .unwrap();

            let update = next_terminal(&mut updates).await;
            assert_eq!(update.run_id, token);
            assert_eq!(update.status, RunStatus::Completed);
            assert_eq!(update.texts(), vec!["A", "C", "B"]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_widget_restart_supersedes() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let snippet = Snippet::new("");
            let snippet_id = snippet.id();
            let (handle, _task) =
                PlaygroundWidget::spawn_with_snippet(test_config(), snippet).unwrap();
            let mut updates = handle.subscribe();

            handle
                .start_run("setInterval(() => console.log('stale'), 5)")
                .await
                .unwrap();
            let second = handle.start_run("console.log('fresh')").await.unwrap();

            let update = next_terminal(&mut updates).await;
            assert_eq!(update.run_id, second);
            assert_eq!(update.snippet_id, snippet_id);
            assert_eq!(update.texts(), vec!["fresh"]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_widget_update_serializes_to_camel_case_json() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let (handle, _task) = PlaygroundWidget::spawn(test_config()).unwrap();
            let mut updates = handle.subscribe();
            handle.start_run("throw new Error('bad')").await.unwrap();

            let update = next_terminal(&mut updates).await;
            let json = serde_json::to_value(&update).unwrap();
            assert_eq!(json["status"], "errored");
            assert_eq!(json["error"]["kind"], "synchronousRuntimeError");
            assert_eq!(json["records"][0]["kind"], "uncaught");
            assert_eq!(json["droppedTimers"], 0);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_then_start_is_closed() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let (handle, task) = PlaygroundWidget::spawn(test_config()).unwrap();
            handle
                .start_run("setTimeout(() => console.log('never'), 100)")
                .await
                .unwrap();
            handle.shutdown().await.unwrap();
            task.await.unwrap();

            assert!(handle.is_closed());
            assert!(matches!(
                handle.start_run("1").await,
                Err(PlaygroundError::Closed)
            ));
        })
        .await;
}
