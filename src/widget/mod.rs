//! The widget driver: a local task that owns a [`RunSessionController`] and
//! serves the presentation layer through a [`PlaygroundHandle`].

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::PlaygroundConfig;
use crate::error::PlaygroundError;
use crate::session::{RunSessionController, Snippet, SnippetId, TranscriptUpdate};
use crate::transcript::RunToken;

const COMMAND_CAPACITY: usize = 16;

/// Requests the presentation layer sends to a widget.
#[derive(Debug)]
pub enum WidgetCommand {
    /// Replace the snippet source and run it.
    Start {
        source: String,
        reply: oneshot::Sender<Result<RunToken, PlaygroundError>>,
    },
    /// Unmount: cancel any run and stop the driver.
    Shutdown { ack: oneshot::Sender<()> },
}

/// Cloneable handle to a running widget.
#[derive(Debug, Clone)]
pub struct PlaygroundHandle {
    commands: mpsc::Sender<WidgetCommand>,
    updates: broadcast::Sender<TranscriptUpdate>,
    snippet_id: SnippetId,
}

impl PlaygroundHandle {
    pub fn snippet_id(&self) -> SnippetId {
        self.snippet_id
    }

    /// Run `source`, superseding whatever is running.
    pub async fn start_run(&self, source: impl Into<String>) -> Result<RunToken, PlaygroundError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(WidgetCommand::Start {
                source: source.into(),
                reply,
            })
            .await
            .map_err(|_| PlaygroundError::Closed)?;
        response.await.map_err(|_| PlaygroundError::Closed)?
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TranscriptUpdate> {
        self.updates.subscribe()
    }

    /// Unmount the widget. Returns once the page's console is restored.
    pub async fn shutdown(&self) -> Result<(), PlaygroundError> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(WidgetCommand::Shutdown { ack })
            .await
            .map_err(|_| PlaygroundError::Closed)?;
        done.await.map_err(|_| PlaygroundError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// Spawns widget drivers.
pub struct PlaygroundWidget;

impl PlaygroundWidget {
    /// Build a page and start its driver on the current `LocalSet`.
    ///
    /// Must be called from within a `tokio::task::LocalSet`.
    pub fn spawn(config: PlaygroundConfig) -> Result<(PlaygroundHandle, JoinHandle<()>), PlaygroundError> {
        Self::spawn_with_snippet(config, Snippet::new(""))
    }

    pub fn spawn_with_snippet(
        config: PlaygroundConfig,
        snippet: Snippet,
    ) -> Result<(PlaygroundHandle, JoinHandle<()>), PlaygroundError> {
        let controller = RunSessionController::new(config)?;
        let (commands, receiver) = mpsc::channel(COMMAND_CAPACITY);
        let handle = PlaygroundHandle {
            commands,
            updates: controller.updates(),
            snippet_id: snippet.id(),
        };
        tracing::debug!(snippet = %snippet.id(), "Mounting playground widget");
        let task = tokio::task::spawn_local(drive(controller, snippet, receiver));
        Ok((handle, task))
    }
}

async fn drive(
    mut controller: RunSessionController,
    mut snippet: Snippet,
    mut commands: mpsc::Receiver<WidgetCommand>,
) {
    loop {
        let wakeup = controller.next_wakeup();

        tokio::select! {
            biased;

            command = commands.recv() => match command {
                Some(WidgetCommand::Start { source, reply }) => {
                    snippet.edit(source);
                    let started = controller.start(&snippet);
                    if let Err(e) = &started {
                        tracing::error!(snippet = %snippet.id(), error = %e, "Failed to start run");
                    }
                    let _ = reply.send(started);
                }
                Some(WidgetCommand::Shutdown { ack }) => {
                    controller.shutdown();
                    let _ = ack.send(());
                    break;
                }
                None => {
                    controller.shutdown();
                    break;
                }
            },

            _ = tokio::time::sleep_until(wakeup.unwrap_or_else(Instant::now)), if wakeup.is_some() => {
                controller.poll(Instant::now());
            }
        }
    }
    tracing::debug!(snippet = %snippet.id(), "Playground widget unmounted");
}
