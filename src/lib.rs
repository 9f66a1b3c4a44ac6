pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod session;
pub mod transcript;
pub mod util;
pub mod widget;

pub use config::{PlaygroundConfig, RenderConfig};
pub use console::{ConsoleInterceptor, InterceptGuard};
pub use engine::{ErrorInfo, ErrorPhase, ExecutionEngine, RunOutcome};
pub use error::{ErrorKind, PlaygroundError};
pub use session::{
    Run, RunSessionController, RunStatus, Snippet, SnippetId, TranscriptUpdate, WidgetState,
};
pub use transcript::{OutputKind, OutputRecord, RenderedValue, RunToken};
pub use widget::{PlaygroundHandle, PlaygroundWidget};
