//! Article/reviewer registry use-case.
//!
//! # Responsibility
//! - Register articles, reviewers and third-party analyses.
//!
//! # Invariants
//! - Registering an existing username keeps its id and updates its role.
//! - Verificators holding assignments cannot be moved to another role.
//! - Repeated analyses for the same (article, model) are skipped, not errors.

use crate::model::analysis::Analysis;
use crate::model::article::{Article, ArticleId};
use crate::model::reviewer::{Reviewer, ReviewerId, Role};
use crate::model::ValidationError;
use crate::repo::common::RepoError;
use crate::repo::registry_repo::RegistryRepository;
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from registry operations.
#[derive(Debug)]
pub enum RegistryError {
    Validation(ValidationError),
    DuplicateArticle(ArticleId),
    ArticleNotFound(ArticleId),
    ReviewerHasAssignments {
        reviewer_id: ReviewerId,
        assigned: u32,
    },
    Repo(RepoError),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateArticle(id) => write!(f, "article already exists: {id}"),
            Self::ArticleNotFound(id) => write!(f, "article not found: {id}"),
            Self::ReviewerHasAssignments {
                reviewer_id,
                assigned,
            } => write!(
                f,
                "reviewer {reviewer_id} still holds {assigned} assignments; reallocate before changing role"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RegistryError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::DuplicateArticle(id) => Self::DuplicateArticle(id),
            RepoError::ArticleNotFound(id) => Self::ArticleNotFound(id),
            RepoError::ReviewerHasAssignments {
                reviewer_id,
                assigned,
            } => Self::ReviewerHasAssignments {
                reviewer_id,
                assigned,
            },
            other => Self::Repo(other),
        }
    }
}

/// Result of a reviewer registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewerRegistration {
    pub reviewer: Reviewer,
    /// `false` when the username already existed and only its role changed.
    pub created: bool,
}

/// Registry service facade.
pub struct RegistryService<G: RegistryRepository> {
    repo: G,
}

impl<G: RegistryRepository> RegistryService<G> {
    pub fn new(repo: G) -> Self {
        Self { repo }
    }

    /// Adds one article and returns the stored record.
    pub fn add_article(&self, article: &Article) -> Result<Article, RegistryError> {
        let id = self.repo.create_article(article)?;
        info!("event=article_add module=registry status=ok article_id={id}");
        self.repo
            .get_article(id)?
            .ok_or(RegistryError::ArticleNotFound(id))
    }

    pub fn get_article(&self, id: ArticleId) -> Result<Option<Article>, RegistryError> {
        Ok(self.repo.get_article(id)?)
    }

    pub fn list_articles(&self) -> Result<Vec<Article>, RegistryError> {
        Ok(self.repo.list_articles()?)
    }

    /// Deletes an article together with its assignments and analyses.
    pub fn delete_article(&self, id: ArticleId) -> Result<(), RegistryError> {
        self.repo.delete_article(id)?;
        info!("event=article_delete module=registry status=ok article_id={id}");
        Ok(())
    }

    /// Creates a reviewer, or updates the role of an existing username.
    pub fn register_reviewer(
        &self,
        username: &str,
        role: Role,
    ) -> Result<ReviewerRegistration, RegistryError> {
        let existing = self.repo.find_reviewer_by_username(username)?;
        let candidate = match &existing {
            Some(reviewer) => Reviewer {
                role,
                ..reviewer.clone()
            },
            None => Reviewer::new(username.trim(), role),
        };

        let reviewer = self.repo.upsert_reviewer(&candidate).map_err(|err| {
            if let RepoError::ReviewerHasAssignments { assigned, .. } = &err {
                warn!(
                    "event=reviewer_register module=registry status=rejected role={role} assigned={assigned} error_code=reviewer_has_assignments"
                );
            }
            RegistryError::from(err)
        })?;
        let created = existing.is_none();
        info!(
            "event=reviewer_register module=registry status=ok created={} role={}",
            created, reviewer.role
        );
        Ok(ReviewerRegistration { reviewer, created })
    }

    pub fn get_reviewer(&self, id: ReviewerId) -> Result<Option<Reviewer>, RegistryError> {
        Ok(self.repo.get_reviewer(id)?)
    }

    pub fn find_reviewer(&self, username: &str) -> Result<Option<Reviewer>, RegistryError> {
        Ok(self.repo.find_reviewer_by_username(username)?)
    }

    pub fn list_reviewers(&self) -> Result<Vec<Reviewer>, RegistryError> {
        Ok(self.repo.list_reviewers()?)
    }

    /// Stores one analysis; returns `false` when the article already has an
    /// analysis from the same model.
    pub fn record_analysis(&self, analysis: &Analysis) -> Result<bool, RegistryError> {
        let inserted = self.repo.insert_analysis(analysis)?;
        info!(
            "event=analysis_add module=registry status={} article_id={}",
            if inserted { "ok" } else { "skipped" },
            analysis.article_id
        );
        Ok(inserted)
    }

    pub fn list_analyses(&self, article_id: ArticleId) -> Result<Vec<Analysis>, RegistryError> {
        Ok(self.repo.list_analyses(article_id)?)
    }
}
