use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a widget's snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnippetId(Uuid);

impl SnippetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SnippetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnippetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The source shown in a widget's editor. The id survives edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    id: SnippetId,
    source_text: String,
}

impl Snippet {
    pub fn new(source_text: impl Into<String>) -> Self {
        Self {
            id: SnippetId::new(),
            source_text: source_text.into(),
        }
    }

    pub fn with_id(mut self, id: SnippetId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> SnippetId {
        self.id
    }

    pub fn source(&self) -> &str {
        &self.source_text
    }

    /// Replace the source text, keeping the id.
    pub fn edit(&mut self, source_text: impl Into<String>) {
        self.source_text = source_text.into();
    }
}
