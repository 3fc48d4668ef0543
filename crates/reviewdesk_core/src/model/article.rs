//! Article records: the unit of review work.

use super::ValidationError;
use serde::{Deserialize, Serialize};

/// Externally assigned, stable article identifier.
pub type ArticleId = i64;

/// Source label used in reports when an article has no source tag.
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Report label for a source tag; missing and blank tags collapse to
/// [`UNKNOWN_SOURCE`].
pub fn source_label(source: Option<&str>) -> &str {
    match source.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => UNKNOWN_SOURCE,
    }
}

/// Read-only article metadata as stored by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    /// Origin tag used for relevance cross-tabs (e.g. search database name).
    pub source: Option<String>,
    pub doi: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub year: Option<i32>,
}

impl Article {
    /// Creates an article with only the required fields set.
    pub fn new(id: ArticleId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            source: None,
            doi: None,
            abstract_text: None,
            year: None,
        }
    }

    /// Checks write-time invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id <= 0 {
            return Err(ValidationError::NonPositiveArticleId(self.id));
        }
        if self.title.trim().is_empty() {
            return Err(ValidationError::BlankTitle);
        }
        Ok(())
    }
}
