//! Note model

use serde::{Deserialize, Serialize};

/// A private note. Only its author can see or change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub text: String,
    /// Unique across all notes
    pub slug: String,
    pub author_id: i64,
}

/// Maximum note title length
pub const TITLE_MAX_LENGTH: usize = 100;

/// Maximum slug length; generated slugs are truncated to it
pub const SLUG_MAX_LENGTH: usize = 100;
