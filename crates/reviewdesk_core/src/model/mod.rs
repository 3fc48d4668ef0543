//! Review domain model.
//!
//! # Responsibility
//! - Define the records shared by registry, allocation, review and reporting.
//! - Own record-level validation used by repository write paths.
//!
//! # Invariants
//! - Article ids are externally assigned and stable.
//! - Reviewer ids are stable UUIDs; usernames are unique.
//! - One assignment per (reviewer, article) pair.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod analysis;
pub mod article;
pub mod assignment;
pub mod reviewer;

/// Record-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Article ids are positive integers.
    NonPositiveArticleId(i64),
    /// Article title is blank after trim.
    BlankTitle,
    /// Reviewer username is blank after trim.
    BlankUsername,
    /// Analysis model name is blank after trim.
    BlankModelName,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveArticleId(id) => write!(f, "article id must be positive, got {id}"),
            Self::BlankTitle => write!(f, "article title must not be blank"),
            Self::BlankUsername => write!(f, "reviewer username must not be blank"),
            Self::BlankModelName => write!(f, "analysis model name must not be blank"),
        }
    }
}

impl Error for ValidationError {}
