//! Transcript data: records, the recorder, and text rendering.

pub mod format;
pub mod record;
pub mod recorder;
pub mod table;
pub mod value;

pub use format::{format_console_args, format_nested, format_top_level};
pub use record::{OutputKind, OutputRecord, PendingRecord, RunToken};
pub use recorder::{OutputRecorder, RecorderHandle};
pub use table::render_table;
pub use value::{PromiseSummary, RenderedValue};
