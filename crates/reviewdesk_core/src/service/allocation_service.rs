//! Assignment allocation use-case.
//!
//! # Responsibility
//! - Turn an article pool and a verificator pool into a balanced,
//!   duplicate-free review schedule.
//! - Replace the stored assignment set with the new schedule atomically.
//!
//! # Invariants
//! - Every planned article gets exactly `REVIEWS_PER_ARTICLE` distinct reviewers.
//! - Reviewer loads differ by at most one after a run.
//! - Preconditions are checked before anything stored is discarded.

use crate::model::article::ArticleId;
use crate::model::assignment::Assignment;
use crate::model::reviewer::ReviewerId;
use crate::repo::assignment_repo::{AssignmentRepository, DiscardPolicy};
use crate::repo::common::RepoError;
use crate::repo::registry_repo::RegistryRepository;
use log::{error, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Independent reviews required per article.
pub const REVIEWS_PER_ARTICLE: usize = 2;

/// Errors from allocation runs.
#[derive(Debug)]
pub enum AllocationError {
    /// Fewer than two verificators are available.
    InsufficientReviewers { available: usize },
    /// The article pool is empty.
    NoArticles,
    /// Stored assignments carry decisions and the caller did not accept
    /// discarding them.
    ReviewedAssignmentsExist { reviewed: u32 },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for AllocationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientReviewers { available } => write!(
                f,
                "at least {REVIEWS_PER_ARTICLE} verificators are required, found {available}"
            ),
            Self::NoArticles => write!(f, "no articles available for allocation"),
            Self::ReviewedAssignmentsExist { reviewed } => write!(
                f,
                "{reviewed} assignments already have recorded decisions; re-run with discard enabled to drop them"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AllocationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AllocationError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ReviewedAssignmentsExist(reviewed) => {
                Self::ReviewedAssignmentsExist { reviewed }
            }
            other => Self::Repo(other),
        }
    }
}

/// Assigned-article count of one reviewer after planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReviewerLoad {
    pub reviewer_id: ReviewerId,
    pub assigned: u32,
}

/// In-memory result of the allocation algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationPlan {
    /// Planned assignments in the order they were produced.
    pub assignments: Vec<Assignment>,
    /// Final load per reviewer, in reviewer input order.
    pub loads: Vec<ReviewerLoad>,
    /// Articles whose review slot found no eligible reviewer.
    pub skipped_slots: Vec<ArticleId>,
}

impl AllocationPlan {
    /// Difference between the highest and lowest reviewer load.
    pub fn load_spread(&self) -> u32 {
        let max = self.loads.iter().map(|load| load.assigned).max().unwrap_or(0);
        let min = self.loads.iter().map(|load| load.assigned).min().unwrap_or(0);
        max - min
    }
}

/// Outcome of a persisted allocation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationReport {
    #[serde(flatten)]
    pub plan: AllocationPlan,
    /// Number of previously stored assignments removed by this run.
    pub discarded: u32,
}

/// Plans a review schedule without touching storage.
///
/// Articles are visited in random order and both review slots of an article
/// are filled back to back. Each slot goes to the eligible reviewer with the
/// smallest `(load, random tag)` key, so ties never favor a fixed reviewer.
///
/// Filling an article's slots consecutively keeps the load spread within one:
/// before each article all loads are in `{L, L + 1}`, and two picks of the
/// least-loaded distinct reviewers cannot push anyone past `L + 2` while a
/// reviewer is still at `L`.
///
/// Duplicate ids in either input are ignored.
///
/// # Errors
/// - `NoArticles` when `article_ids` is empty.
/// - `InsufficientReviewers` when fewer than two distinct reviewers remain.
pub fn plan_allocation<R: Rng + ?Sized>(
    article_ids: &[ArticleId],
    reviewer_ids: &[ReviewerId],
    rng: &mut R,
) -> Result<AllocationPlan, AllocationError> {
    let mut articles = dedup_preserving_order(article_ids);
    let reviewers = dedup_preserving_order(reviewer_ids);

    if articles.is_empty() {
        return Err(AllocationError::NoArticles);
    }
    if reviewers.len() < REVIEWS_PER_ARTICLE {
        return Err(AllocationError::InsufficientReviewers {
            available: reviewers.len(),
        });
    }

    articles.shuffle(rng);

    let mut load: HashMap<ReviewerId, u32> = reviewers.iter().map(|id| (*id, 0)).collect();
    let mut assignments = Vec::with_capacity(articles.len() * REVIEWS_PER_ARTICLE);
    let mut skipped_slots = Vec::new();

    for article_id in articles {
        let mut taken: Vec<ReviewerId> = Vec::with_capacity(REVIEWS_PER_ARTICLE);
        for _ in 0..REVIEWS_PER_ARTICLE {
            let pick = reviewers
                .iter()
                .copied()
                .filter(|id| !taken.contains(id))
                .min_by_key(|id| (load[id], rng.gen::<u64>()));

            match pick {
                Some(reviewer_id) => {
                    taken.push(reviewer_id);
                    if let Some(count) = load.get_mut(&reviewer_id) {
                        *count += 1;
                    }
                    assignments.push(Assignment::new(reviewer_id, article_id));
                }
                None => {
                    warn!(
                        "event=allocation_slot_skipped module=allocation status=warn article_id={article_id}"
                    );
                    skipped_slots.push(article_id);
                }
            }
        }
    }

    let loads = reviewers
        .iter()
        .map(|id| ReviewerLoad {
            reviewer_id: *id,
            assigned: load[id],
        })
        .collect();

    Ok(AllocationPlan {
        assignments,
        loads,
        skipped_slots,
    })
}

fn dedup_preserving_order<T: Copy + Eq + std::hash::Hash>(values: &[T]) -> Vec<T> {
    let mut seen = HashSet::with_capacity(values.len());
    values
        .iter()
        .copied()
        .filter(|value| seen.insert(*value))
        .collect()
}

/// Allocation service over registry and assignment repositories.
pub struct AllocationService<G: RegistryRepository, S: AssignmentRepository> {
    registry: G,
    assignments: S,
}

impl<G: RegistryRepository, S: AssignmentRepository> AllocationService<G, S> {
    pub fn new(registry: G, assignments: S) -> Self {
        Self {
            registry,
            assignments,
        }
    }

    /// Allocates every registered article across every verificator.
    ///
    /// # Side effects
    /// - Replaces the stored assignment set (destructive regenerate).
    pub fn run_allocation(
        &self,
        policy: DiscardPolicy,
    ) -> Result<AllocationReport, AllocationError> {
        self.run_allocation_with_rng(policy, &mut rand::thread_rng())
    }

    /// Same as [`Self::run_allocation`] with a caller-provided random source.
    pub fn run_allocation_with_rng<R: Rng + ?Sized>(
        &self,
        policy: DiscardPolicy,
        rng: &mut R,
    ) -> Result<AllocationReport, AllocationError> {
        let article_ids = self.registry.list_article_ids()?;
        let reviewer_ids = self.registry.list_verificator_ids()?;
        self.persist_plan(&article_ids, &reviewer_ids, policy, rng)
    }

    /// Allocates explicit candidate sets and persists the result.
    ///
    /// Reviewer ids that are unknown or not verificators are dropped before
    /// planning. The stored set is left untouched when planning or the
    /// discard guard fails.
    pub fn allocate<R: Rng + ?Sized>(
        &self,
        article_ids: &[ArticleId],
        reviewer_ids: &[ReviewerId],
        policy: DiscardPolicy,
        rng: &mut R,
    ) -> Result<AllocationReport, AllocationError> {
        let verificators: HashSet<ReviewerId> =
            self.registry.list_verificator_ids()?.into_iter().collect();
        let eligible: Vec<ReviewerId> = reviewer_ids
            .iter()
            .copied()
            .filter(|id| verificators.contains(id))
            .collect();
        if eligible.len() < reviewer_ids.len() {
            warn!(
                "event=allocation_run module=allocation status=filtered requested={} eligible={}",
                reviewer_ids.len(),
                eligible.len()
            );
        }
        self.persist_plan(article_ids, &eligible, policy, rng)
    }

    fn persist_plan<R: Rng + ?Sized>(
        &self,
        article_ids: &[ArticleId],
        reviewer_ids: &[ReviewerId],
        policy: DiscardPolicy,
        rng: &mut R,
    ) -> Result<AllocationReport, AllocationError> {
        let started_at = Instant::now();
        let plan = match plan_allocation(article_ids, reviewer_ids, rng) {
            Ok(plan) => plan,
            Err(err) => {
                error!(
                    "event=allocation_run module=allocation status=error articles={} reviewers={} error={}",
                    article_ids.len(),
                    reviewer_ids.len(),
                    err
                );
                return Err(err);
            }
        };

        let discarded = self.assignments.replace_all(&plan.assignments, policy)?;
        info!(
            "event=allocation_run module=allocation status=ok articles={} reviewers={} assignments={} skipped={} discarded={} spread={} duration_ms={}",
            article_ids.len(),
            plan.loads.len(),
            plan.assignments.len(),
            plan.skipped_slots.len(),
            discarded,
            plan.load_spread(),
            started_at.elapsed().as_millis()
        );

        Ok(AllocationReport { plan, discarded })
    }
}
