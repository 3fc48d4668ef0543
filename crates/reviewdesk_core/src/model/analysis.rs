//! Third-party (LLM) analysis records attached to articles.

use super::article::ArticleId;
use super::ValidationError;
use serde::{Deserialize, Serialize};

/// One stored analysis of an article by a named model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub article_id: ArticleId,
    pub model_name: String,
    /// `None` when the analysis run produced no verdict.
    pub is_relevant: Option<bool>,
    pub justification: Option<String>,
}

impl Analysis {
    pub fn new(
        article_id: ArticleId,
        model_name: impl Into<String>,
        is_relevant: Option<bool>,
    ) -> Self {
        Self {
            article_id,
            model_name: model_name.into(),
            is_relevant,
            justification: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.model_name.trim().is_empty() {
            return Err(ValidationError::BlankModelName);
        }
        Ok(())
    }
}
