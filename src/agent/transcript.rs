//! Running transcript of one agent task.

use std::fmt::Write as _;

/// One entry in the task transcript.
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    /// Where the entry came from ("plan", "action", "tool", "vision", ...).
    pub source: String,
    /// Entry content.
    pub content: String,
}

/// Ordered log of everything that happened during one task.
///
/// Rendered into each model prompt so every role sees the same history.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&mut self, source: impl Into<String>, content: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            source: source.into(),
            content: content.into(),
        });
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the transcript for inclusion in a prompt.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = writeln!(out, "[{}] {}", entry.source, entry.content);
        }
        out
    }
}
