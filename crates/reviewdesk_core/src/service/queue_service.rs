//! Reviewer queue navigation use-case.
//!
//! # Responsibility
//! - Derive a reviewer's ordered queue, resume item and neighbors.
//! - Guard per-article views so verificators only open assigned articles.
//!
//! # Invariants
//! - Queues are ordered by article id ascending for both roles.
//! - Holds no state of its own; every call reads current assignment state.

use crate::model::analysis::Analysis;
use crate::model::article::{Article, ArticleId};
use crate::model::assignment::Assignment;
use crate::model::reviewer::{Reviewer, ReviewerId, Role};
use crate::repo::assignment_repo::{AssignmentRepository, ReviewCounts};
use crate::repo::common::RepoError;
use crate::repo::registry_repo::RegistryRepository;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from queue navigation.
#[derive(Debug)]
pub enum QueueError {
    ReviewerNotFound(ReviewerId),
    ArticleNotFound(ArticleId),
    /// Verificator tried to open an article that is not in their queue.
    NotAssigned {
        reviewer_id: ReviewerId,
        article_id: ArticleId,
    },
    Repo(RepoError),
}

impl Display for QueueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReviewerNotFound(id) => write!(f, "reviewer not found: {id}"),
            Self::ArticleNotFound(id) => write!(f, "article not found: {id}"),
            Self::NotAssigned {
                reviewer_id,
                article_id,
            } => write!(
                f,
                "reviewer {reviewer_id} is not assigned article {article_id}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for QueueError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for QueueError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ReviewerNotFound(id) => Self::ReviewerNotFound(id),
            RepoError::ArticleNotFound(id) => Self::ArticleNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Previous/next article ids around a queue position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Neighbors {
    pub prev: Option<ArticleId>,
    pub next: Option<ArticleId>,
}

/// Coarse queue status shown when a reviewer lands on their dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    /// Nothing to show: no assignments (or no articles for admins).
    Empty,
    InProgress,
    /// Every counted assignment has a decision.
    Completed,
}

/// Dashboard landing data for one reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueOverview {
    pub reviewer_id: ReviewerId,
    pub role: Role,
    pub resume: Option<ArticleId>,
    pub reviewed_count: u32,
    pub total_count: u32,
    pub state: QueueState,
}

/// Everything needed to render one article in a reviewer's workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleView {
    pub article: Article,
    /// The viewer's own assignment; always `None` for admins.
    pub assignment: Option<Assignment>,
    pub analyses: Vec<Analysis>,
    pub neighbors: Neighbors,
    pub reviewed_count: u32,
    pub total_count: u32,
}

/// Returns the ids around `current` in `queue`.
///
/// Both sides are `None` when the queue is empty or `current` is not queued.
pub fn neighbors_in(queue: &[ArticleId], current: ArticleId) -> Neighbors {
    let Some(index) = queue.iter().position(|id| *id == current) else {
        return Neighbors::default();
    };
    Neighbors {
        prev: index.checked_sub(1).map(|prev| queue[prev]),
        next: queue.get(index + 1).copied(),
    }
}

/// First unreviewed article of an ordered assignment list, falling back to
/// the first article so a finished reviewer restarts at the top.
pub fn resume_in(assignments: &[Assignment]) -> Option<ArticleId> {
    assignments
        .iter()
        .find(|assignment| !assignment.is_reviewed)
        .or_else(|| assignments.first())
        .map(|assignment| assignment.article_id)
}

/// Queue navigation service facade.
pub struct QueueService<G: RegistryRepository, S: AssignmentRepository> {
    registry: G,
    assignments: S,
}

impl<G: RegistryRepository, S: AssignmentRepository> QueueService<G, S> {
    pub fn new(registry: G, assignments: S) -> Self {
        Self {
            registry,
            assignments,
        }
    }

    /// Ordered article ids the reviewer works through.
    pub fn queue(&self, reviewer_id: ReviewerId) -> Result<Vec<ArticleId>, QueueError> {
        let reviewer = self.load_reviewer(reviewer_id)?;
        self.queue_for(&reviewer)
    }

    /// Article the reviewer should continue with, if any.
    pub fn resume(&self, reviewer_id: ReviewerId) -> Result<Option<ArticleId>, QueueError> {
        let reviewer = self.load_reviewer(reviewer_id)?;
        self.resume_for(&reviewer)
    }

    /// Previous and next ids around `article_id` in the reviewer's queue.
    pub fn neighbors(
        &self,
        reviewer_id: ReviewerId,
        article_id: ArticleId,
    ) -> Result<Neighbors, QueueError> {
        let queue = self.queue(reviewer_id)?;
        Ok(neighbors_in(&queue, article_id))
    }

    /// Resume item plus progress counters and queue state.
    pub fn overview(&self, reviewer_id: ReviewerId) -> Result<QueueOverview, QueueError> {
        let reviewer = self.load_reviewer(reviewer_id)?;
        let resume = self.resume_for(&reviewer)?;
        let counts = self.counts_for(&reviewer)?;

        let state = if resume.is_none() {
            QueueState::Empty
        } else if counts.total > 0 && counts.reviewed == counts.total {
            QueueState::Completed
        } else {
            QueueState::InProgress
        };

        Ok(QueueOverview {
            reviewer_id,
            role: reviewer.role,
            resume,
            reviewed_count: counts.reviewed,
            total_count: counts.total,
            state,
        })
    }

    /// Loads one article in the reviewer's workflow context.
    ///
    /// # Errors
    /// - `NotAssigned` when a verificator opens an article outside their queue.
    /// - `ArticleNotFound` when the article does not exist.
    pub fn view(
        &self,
        reviewer_id: ReviewerId,
        article_id: ArticleId,
    ) -> Result<ArticleView, QueueError> {
        let reviewer = self.load_reviewer(reviewer_id)?;

        let assignment = match reviewer.role {
            Role::Admin => None,
            Role::Verificator => Some(
                self.assignments
                    .get_assignment(reviewer_id, article_id)?
                    .ok_or(QueueError::NotAssigned {
                        reviewer_id,
                        article_id,
                    })?,
            ),
        };

        let article = self
            .registry
            .get_article(article_id)?
            .ok_or(QueueError::ArticleNotFound(article_id))?;
        let analyses = self.registry.list_analyses(article_id)?;
        let queue = self.queue_for(&reviewer)?;
        let counts = self.counts_for(&reviewer)?;

        Ok(ArticleView {
            article,
            assignment,
            analyses,
            neighbors: neighbors_in(&queue, article_id),
            reviewed_count: counts.reviewed,
            total_count: counts.total,
        })
    }

    fn load_reviewer(&self, reviewer_id: ReviewerId) -> Result<Reviewer, QueueError> {
        self.registry
            .get_reviewer(reviewer_id)?
            .ok_or(QueueError::ReviewerNotFound(reviewer_id))
    }

    fn queue_for(&self, reviewer: &Reviewer) -> Result<Vec<ArticleId>, QueueError> {
        match reviewer.role {
            Role::Admin => Ok(self.registry.list_article_ids()?),
            Role::Verificator => Ok(self
                .assignments
                .list_for_reviewer(reviewer.id)?
                .into_iter()
                .map(|assignment| assignment.article_id)
                .collect()),
        }
    }

    fn resume_for(&self, reviewer: &Reviewer) -> Result<Option<ArticleId>, QueueError> {
        match reviewer.role {
            Role::Admin => Ok(self.registry.list_article_ids()?.first().copied()),
            Role::Verificator => {
                let assignments = self.assignments.list_for_reviewer(reviewer.id)?;
                Ok(resume_in(&assignments))
            }
        }
    }

    fn counts_for(&self, reviewer: &Reviewer) -> Result<ReviewCounts, QueueError> {
        let scope = match reviewer.role {
            Role::Admin => None,
            Role::Verificator => Some(reviewer.id),
        };
        Ok(self.assignments.counts(scope)?)
    }
}
