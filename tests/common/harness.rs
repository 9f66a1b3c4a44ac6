//! Run helpers shared by the integration tests

use std::time::Duration;

use jsplayground::{PlaygroundConfig, Run, RunSessionController, Snippet, TranscriptUpdate};
use tokio::sync::broadcast;

/// Defaults, with a short run budget so timeout tests stay quick.
pub fn test_config() -> PlaygroundConfig {
    PlaygroundConfig::default()
        .with_wait_window(Duration::from_millis(3000))
        .with_run_timeout(Duration::from_millis(2000))
}

pub fn controller() -> RunSessionController {
    RunSessionController::new(test_config()).expect("Failed to build controller")
}

/// Start `source` on `controller` and drive it until it settles.
///
/// Call from a `start_paused` test so timers resolve instantly.
pub async fn run_snippet(controller: &mut RunSessionController, source: &str) -> Run {
    let snippet = Snippet::new(source);
    controller.start(&snippet).expect("Failed to start run");
    controller
        .drive_until_settled()
        .await
        .cloned()
        .expect("Run should exist after start")
}

pub fn lines(run: &Run) -> Vec<String> {
    run.records
        .iter()
        .filter(|r| r.is_visible())
        .map(|r| r.text.clone())
        .collect()
}

/// Every update already sent on `updates`.
pub fn drain(updates: &mut broadcast::Receiver<TranscriptUpdate>) -> Vec<TranscriptUpdate> {
    let mut received = Vec::new();
    while let Ok(update) = updates.try_recv() {
        received.push(update);
    }
    received
}
