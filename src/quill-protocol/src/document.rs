//! Document models served by the document store.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A document with content and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Document {
    pub id: String,
    pub title: String,
    /// Full document content.
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Split the content into numbered lines (1-based).
    pub fn lines(&self) -> Vec<DocumentLine> {
        self.content
            .split('\n')
            .enumerate()
            .map(|(i, line)| DocumentLine {
                line_number: i as u32 + 1,
                content: line.to_string(),
            })
            .collect()
    }

    /// Get the content of a specific line (1-based). Returns `None` when
    /// the line number is out of range.
    pub fn line(&self, line_number: u32) -> Option<&str> {
        if line_number == 0 {
            return None;
        }
        self.content.split('\n').nth(line_number as usize - 1)
    }

    /// Number of lines in the document.
    pub fn line_count(&self) -> u32 {
        self.content.split('\n').count() as u32
    }
}

/// A single line of a document with its 1-based number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DocumentLine {
    pub line_number: u32,
    pub content: String,
}

/// Request body for creating a new document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DocumentCreate {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl DocumentCreate {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Request body for updating a document. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DocumentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Kind of line-level edit the agent applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EditOperation {
    /// Insert new lines after `line_start`.
    Insert,
    /// Replace lines `line_start..=line_end`.
    Replace,
    /// Delete lines `line_start..=line_end`.
    Delete,
}

impl std::fmt::Display for EditOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Replace => write!(f, "replace"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A line-level edit operation the agent applied to a document.
///
/// Carried by `edit` stream events for visibility only — the engine never
/// applies it locally, it re-fetches the authoritative document instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DocumentEdit {
    pub operation: EditOperation,
    /// Starting line number (1-based).
    pub line_start: u32,
    /// Ending line number for multi-line operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<u32>,
    #[serde(default)]
    pub new_content: String,
}
