use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::utils::segmenter::segment_message;

/// One atomic unit of a decomposed message: a run of plain text, or a
/// fenced code block with its declared language tag.
#[derive(Clone, Debug, PartialEq)]
pub enum Segment {
    Text(String),
    Code { language: String, code: String },
}

/// A file attachment as displayed in the log. The raw bytes only ever live
/// inside the outbound socket frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FileRef {
    pub name: String,
    pub mime: String,
}

#[derive(Clone, Debug)]
pub struct ChatMessage {
    pub id: String,
    pub is_user: bool,
    /// True only for assistant replies that arrived live over the socket.
    /// Controls whether the text segments are revealed with the typing
    /// animation; history is always rendered statically.
    pub is_new: bool,
    pub content: String,
    pub segments: Vec<Segment>,
    pub file: Option<FileRef>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// A message the local user just typed or uploaded.
    pub fn user(content: String, file: Option<FileRef>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            is_user: true,
            is_new: false,
            segments: segment_message(&content),
            content,
            file,
            timestamp: None,
        }
    }

    /// An assistant reply that just arrived over the socket.
    pub fn assistant(
        id: String,
        content: String,
        file: Option<FileRef>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            is_user: false,
            is_new: true,
            segments: segment_message(&content),
            content,
            file,
            timestamp,
        }
    }

    /// A message loaded from the history service.
    pub fn from_history(
        id: String,
        content: String,
        is_user: bool,
        file: Option<FileRef>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            is_user,
            is_new: false,
            segments: segment_message(&content),
            content,
            file,
            timestamp,
        }
    }
}
