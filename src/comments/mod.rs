// Comments — the raw unit of input and the loaders that produce them.

pub mod loader;

use serde::{Deserialize, Serialize};

/// A single comment as supplied by the ingestion source.
///
/// Feature extraction only ever reads `text`, `like_count` and whether
/// `parent_id` is set; the comment itself is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub like_count: u64,
    /// Set when the comment is a reply to another comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Comment {
    pub fn new(id: impl Into<String>, text: impl Into<String>, like_count: u64) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            like_count,
            parent_id: None,
        }
    }

    pub fn is_reply(&self) -> bool {
        self.parent_id.as_deref().is_some_and(|p| !p.is_empty())
    }
}
