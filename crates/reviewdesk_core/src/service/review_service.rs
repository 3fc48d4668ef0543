//! Review decision use-case.
//!
//! # Responsibility
//! - Record a reviewer's verdict on one assigned article.
//! - Point the reviewer at the next article of their queue.
//!
//! # Invariants
//! - Only verificators submit decisions.
//! - Only existing (reviewer, article) assignments are mutated.
//! - Rejected submissions leave stored state untouched.
//! - Resubmission overwrites the previous decision.

use crate::model::article::ArticleId;
use crate::model::assignment::{Decision, DecisionParseError};
use crate::model::reviewer::{ReviewerId, Role};
use crate::repo::assignment_repo::AssignmentRepository;
use crate::repo::common::RepoError;
use crate::repo::registry_repo::RegistryRepository;
use crate::service::queue_service::{neighbors_in, resume_in};
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from decision submission.
#[derive(Debug)]
pub enum ReviewError {
    ReviewerNotFound(ReviewerId),
    /// Admins and other non-verificator roles cannot record decisions.
    NotVerificator(ReviewerId),
    /// The reviewer has no assignment for this article.
    NotAssigned {
        reviewer_id: ReviewerId,
        article_id: ArticleId,
    },
    /// Submitted decision is missing or unrecognized.
    InvalidDecision(DecisionParseError),
    Repo(RepoError),
}

impl Display for ReviewError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReviewerNotFound(id) => write!(f, "reviewer not found: {id}"),
            Self::NotVerificator(id) => {
                write!(f, "reviewer {id} is not a verificator; only verificators submit reviews")
            }
            Self::NotAssigned {
                reviewer_id,
                article_id,
            } => write!(
                f,
                "reviewer {reviewer_id} is not assigned article {article_id}"
            ),
            Self::InvalidDecision(err) => write!(f, "invalid decision: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReviewError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidDecision(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::ReviewerNotFound(_) | Self::NotVerificator(_) | Self::NotAssigned { .. } => None,
        }
    }
}

impl From<RepoError> for ReviewError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::AssignmentNotFound {
                reviewer_id,
                article_id,
            } => Self::NotAssigned {
                reviewer_id,
                article_id,
            },
            RepoError::ReviewerNotFound(id) => Self::ReviewerNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<DecisionParseError> for ReviewError {
    fn from(value: DecisionParseError) -> Self {
        Self::InvalidDecision(value)
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubmitOutcome {
    pub article_id: ArticleId,
    pub decision: Decision,
    /// Next queued article after this one, or the resume item at queue end.
    pub next_article: Option<ArticleId>,
}

/// Review decision service facade.
pub struct ReviewService<G: RegistryRepository, S: AssignmentRepository> {
    registry: G,
    assignments: S,
}

impl<G: RegistryRepository, S: AssignmentRepository> ReviewService<G, S> {
    pub fn new(registry: G, assignments: S) -> Self {
        Self {
            registry,
            assignments,
        }
    }

    /// Records a raw decision selection (form or CLI input).
    ///
    /// Role and assignment ownership are checked before the decision is
    /// parsed, so an ineligible caller never sees `InvalidDecision`.
    pub fn submit_decision(
        &self,
        reviewer_id: ReviewerId,
        article_id: ArticleId,
        raw_decision: Option<&str>,
    ) -> Result<SubmitOutcome, ReviewError> {
        self.ensure_verificator(reviewer_id)?;
        self.ensure_assigned(reviewer_id, article_id)?;
        let decision = match Decision::parse(raw_decision) {
            Ok(decision) => decision,
            Err(err) => {
                warn!(
                    "event=decision_submit module=review status=rejected article_id={article_id} error_code=invalid_decision"
                );
                return Err(err.into());
            }
        };
        self.store_decision(reviewer_id, article_id, decision)
    }

    /// Records an already-typed decision.
    pub fn record_decision(
        &self,
        reviewer_id: ReviewerId,
        article_id: ArticleId,
        decision: Decision,
    ) -> Result<SubmitOutcome, ReviewError> {
        self.ensure_verificator(reviewer_id)?;
        self.store_decision(reviewer_id, article_id, decision)
    }

    fn store_decision(
        &self,
        reviewer_id: ReviewerId,
        article_id: ArticleId,
        decision: Decision,
    ) -> Result<SubmitOutcome, ReviewError> {
        if let Err(err) = self
            .assignments
            .record_decision(reviewer_id, article_id, decision)
        {
            if matches!(err, RepoError::AssignmentNotFound { .. }) {
                warn!(
                    "event=decision_submit module=review status=rejected article_id={article_id} error_code=not_assigned"
                );
            }
            return Err(err.into());
        }
        info!(
            "event=decision_submit module=review status=ok article_id={} relevant={}",
            article_id,
            decision.is_relevant()
        );

        let queue = self.assignments.list_for_reviewer(reviewer_id)?;
        let ids: Vec<ArticleId> = queue.iter().map(|assignment| assignment.article_id).collect();
        let next_article = neighbors_in(&ids, article_id)
            .next
            .or_else(|| resume_in(&queue));

        Ok(SubmitOutcome {
            article_id,
            decision,
            next_article,
        })
    }

    fn ensure_verificator(&self, reviewer_id: ReviewerId) -> Result<(), ReviewError> {
        let reviewer = self
            .registry
            .get_reviewer(reviewer_id)?
            .ok_or(ReviewError::ReviewerNotFound(reviewer_id))?;
        if reviewer.role != Role::Verificator {
            warn!(
                "event=decision_submit module=review status=rejected role={} error_code=not_verificator",
                reviewer.role
            );
            return Err(ReviewError::NotVerificator(reviewer_id));
        }
        Ok(())
    }

    fn ensure_assigned(
        &self,
        reviewer_id: ReviewerId,
        article_id: ArticleId,
    ) -> Result<(), ReviewError> {
        if self
            .assignments
            .get_assignment(reviewer_id, article_id)?
            .is_none()
        {
            warn!(
                "event=decision_submit module=review status=rejected article_id={article_id} error_code=not_assigned"
            );
            return Err(ReviewError::NotAssigned {
                reviewer_id,
                article_id,
            });
        }
        Ok(())
    }
}
