//! Review assignment records and their decision state machine.
//!
//! # Invariants
//! - `is_reviewed == false` implies `decision == None`.
//! - `Reviewed` is re-enterable: resubmission overwrites the decision.

use super::article::ArticleId;
use super::reviewer::ReviewerId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// A reviewer's verdict on an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Relevant,
    NotRelevant,
}

impl Decision {
    pub fn from_bool(is_relevant: bool) -> Self {
        if is_relevant {
            Self::Relevant
        } else {
            Self::NotRelevant
        }
    }

    pub fn is_relevant(self) -> bool {
        self == Self::Relevant
    }

    /// Parses a raw form/CLI selection.
    ///
    /// A missing selection is an error, not an implicit "not relevant".
    pub fn parse(raw: Option<&str>) -> Result<Self, DecisionParseError> {
        let Some(raw) = raw else {
            return Err(DecisionParseError::Missing);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "relevant" => Ok(Self::Relevant),
            "false" | "not_relevant" | "not-relevant" => Ok(Self::NotRelevant),
            "" => Err(DecisionParseError::Missing),
            _ => Err(DecisionParseError::Unrecognized(raw.trim().to_string())),
        }
    }
}

/// Rejected decision input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionParseError {
    Missing,
    Unrecognized(String),
}

impl Display for DecisionParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "a decision (relevant or not relevant) must be selected"),
            Self::Unrecognized(value) => write!(
                f,
                "unrecognized decision `{value}`; expected relevant|not_relevant"
            ),
        }
    }
}

impl Error for DecisionParseError {}

/// Derived review state of one assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "decision", rename_all = "snake_case")]
pub enum ReviewState {
    Unreviewed,
    Reviewed(Decision),
}

/// Link between one reviewer and one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub reviewer_id: ReviewerId,
    pub article_id: ArticleId,
    pub decision: Option<Decision>,
    pub is_reviewed: bool,
}

impl Assignment {
    /// Fresh, unreviewed assignment as produced by allocation.
    pub fn new(reviewer_id: ReviewerId, article_id: ArticleId) -> Self {
        Self {
            reviewer_id,
            article_id,
            decision: None,
            is_reviewed: false,
        }
    }

    pub fn state(&self) -> ReviewState {
        match (self.is_reviewed, self.decision) {
            (true, Some(decision)) => ReviewState::Reviewed(decision),
            _ => ReviewState::Unreviewed,
        }
    }

    /// Applies a decision; valid from both `Unreviewed` and `Reviewed`.
    pub fn record(&mut self, decision: Decision) {
        self.decision = Some(decision);
        self.is_reviewed = true;
    }
}
