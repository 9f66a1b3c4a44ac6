//! Snippets, runs and the controller that sequences them for one widget.

pub mod controller;
pub mod events;
pub mod run;
pub mod snippet;

pub use controller::RunSessionController;
pub use events::TranscriptUpdate;
pub use run::{Run, RunStatus, WidgetState};
pub use snippet::{Snippet, SnippetId};
