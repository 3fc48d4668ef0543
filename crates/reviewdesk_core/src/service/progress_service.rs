//! Progress reporting use-case.
//!
//! # Responsibility
//! - Completion counters, globally or per reviewer.
//! - Relevance cross-tab of third-party analyses by article source.
//! - Per-verificator decision split and completion ranking.
//!
//! # Invariants
//! - Read-only; recomputed on every call.
//! - Ratios over empty sets are `0.0`, never NaN.

use crate::model::article::{source_label, ArticleId};
use crate::model::reviewer::{ReviewerId, Role};
use crate::repo::assignment_repo::{AssignmentRepository, ReviewerTally};
use crate::repo::common::RepoError;
use crate::repo::registry_repo::RegistryRepository;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from progress reporting.
#[derive(Debug)]
pub enum ProgressError {
    ReviewerNotFound(ReviewerId),
    Repo(RepoError),
}

impl Display for ProgressError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReviewerNotFound(id) => write!(f, "reviewer not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProgressError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ReviewerNotFound(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for ProgressError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Aggregation scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressScope {
    Global,
    /// Admin reviewers resolve to `Global`.
    Reviewer(ReviewerId),
}

/// Count and share of articles of one source within one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceCell {
    pub source: String,
    pub count: u32,
    /// Share of all articles, in percent.
    pub percentage: f64,
}

/// Articles sharing the same number of "relevant" analyses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelevanceBucket {
    pub relevant_analyses: u32,
    /// One cell per known source, in `RelevanceBreakdown::sources` order.
    pub cells: Vec<SourceCell>,
}

/// Relevant-analysis count crossed with article source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelevanceBreakdown {
    pub total_articles: u32,
    /// Sorted source labels.
    pub sources: Vec<String>,
    /// Buckets sorted by `relevant_analyses` ascending.
    pub buckets: Vec<RelevanceBucket>,
}

/// Relevant vs. not-relevant decisions among completed reviews.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecisionSplit {
    pub relevant: u32,
    pub not_relevant: u32,
    pub relevant_ratio: f64,
}

/// Scope-specific detail attached to a progress report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressBreakdown {
    Relevance(RelevanceBreakdown),
    Decisions(DecisionSplit),
}

/// Completion counters plus scope-specific breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    /// `None` for global reports.
    pub reviewer_id: Option<ReviewerId>,
    pub reviewed_count: u32,
    pub total_count: u32,
    pub completion_ratio: f64,
    pub breakdown: ProgressBreakdown,
}

/// One verificator's row in the completion ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewerReport {
    pub reviewer_id: ReviewerId,
    pub username: String,
    pub reviewed_count: u32,
    pub total_count: u32,
    pub completion_pct: f64,
    pub decisions: DecisionSplit,
}

impl From<&ReviewerTally> for ReviewerReport {
    fn from(tally: &ReviewerTally) -> Self {
        Self {
            reviewer_id: tally.reviewer_id,
            username: tally.username.clone(),
            reviewed_count: tally.reviewed,
            total_count: tally.total,
            completion_pct: ratio(tally.reviewed, tally.total) * 100.0,
            decisions: decision_split(tally.relevant, tally.not_relevant),
        }
    }
}

/// `numerator / denominator`, or `0.0` for an empty denominator.
pub fn ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        f64::from(numerator) / f64::from(denominator)
    }
}

fn decision_split(relevant: u32, not_relevant: u32) -> DecisionSplit {
    DecisionSplit {
        relevant,
        not_relevant,
        relevant_ratio: ratio(relevant, relevant + not_relevant),
    }
}

/// Builds the relevance cross-tab from `(article, source, relevant count)`
/// rows.
pub fn relevance_breakdown<'a, I>(rows: I) -> RelevanceBreakdown
where
    I: IntoIterator<Item = (ArticleId, Option<&'a str>, u32)>,
{
    let mut counts: BTreeMap<u32, BTreeMap<String, u32>> = BTreeMap::new();
    let mut sources = BTreeSet::new();
    let mut total_articles = 0u32;

    for (_article_id, source, relevant_analyses) in rows {
        let label = source_label(source).to_string();
        *counts
            .entry(relevant_analyses)
            .or_default()
            .entry(label.clone())
            .or_default() += 1;
        sources.insert(label);
        total_articles += 1;
    }

    let buckets = counts
        .into_iter()
        .map(|(relevant_analyses, per_source)| RelevanceBucket {
            relevant_analyses,
            cells: sources
                .iter()
                .map(|source| {
                    let count = per_source.get(source).copied().unwrap_or(0);
                    SourceCell {
                        source: source.clone(),
                        count,
                        percentage: ratio(count, total_articles) * 100.0,
                    }
                })
                .collect(),
        })
        .collect();

    RelevanceBreakdown {
        total_articles,
        sources: sources.into_iter().collect(),
        buckets,
    }
}

/// Progress reporting service facade.
pub struct ProgressService<G: RegistryRepository, S: AssignmentRepository> {
    registry: G,
    assignments: S,
}

impl<G: RegistryRepository, S: AssignmentRepository> ProgressService<G, S> {
    pub fn new(registry: G, assignments: S) -> Self {
        Self {
            registry,
            assignments,
        }
    }

    /// Completion counters for a scope.
    ///
    /// Global scope carries the relevance cross-tab; a verificator scope
    /// carries their decision split.
    pub fn progress(&self, scope: ProgressScope) -> Result<ProgressReport, ProgressError> {
        let reviewer_id = match scope {
            ProgressScope::Global => None,
            ProgressScope::Reviewer(reviewer_id) => {
                let reviewer = self
                    .registry
                    .get_reviewer(reviewer_id)?
                    .ok_or(ProgressError::ReviewerNotFound(reviewer_id))?;
                match reviewer.role {
                    Role::Admin => None,
                    Role::Verificator => Some(reviewer_id),
                }
            }
        };

        let counts = self.assignments.counts(reviewer_id)?;
        let breakdown = match reviewer_id {
            None => ProgressBreakdown::Relevance(self.relevance()?),
            Some(reviewer_id) => {
                let (relevant, not_relevant) = self
                    .assignments
                    .list_for_reviewer(reviewer_id)?
                    .iter()
                    .filter_map(|assignment| assignment.decision)
                    .fold((0, 0), |(relevant, not_relevant), decision| {
                        if decision.is_relevant() {
                            (relevant + 1, not_relevant)
                        } else {
                            (relevant, not_relevant + 1)
                        }
                    });
                ProgressBreakdown::Decisions(decision_split(relevant, not_relevant))
            }
        };

        Ok(ProgressReport {
            reviewer_id,
            reviewed_count: counts.reviewed,
            total_count: counts.total,
            completion_ratio: ratio(counts.reviewed, counts.total),
            breakdown,
        })
    }

    /// Relevance cross-tab over every registered article.
    pub fn relevance(&self) -> Result<RelevanceBreakdown, ProgressError> {
        let rows = self.registry.relevance_rows()?;
        Ok(relevance_breakdown(rows.iter().map(|row| {
            (row.article_id, row.source.as_deref(), row.relevant_analyses)
        })))
    }

    /// Verificators ranked by completion percentage, highest first; ties
    /// ordered by username.
    pub fn leaderboard(&self) -> Result<Vec<ReviewerReport>, ProgressError> {
        let mut reports: Vec<ReviewerReport> = self
            .assignments
            .reviewer_tallies()?
            .iter()
            .map(ReviewerReport::from)
            .collect();
        reports.sort_by(|a, b| {
            b.completion_pct
                .total_cmp(&a.completion_pct)
                .then_with(|| a.username.cmp(&b.username))
        });
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::{ratio, relevance_breakdown};

    #[test]
    fn ratio_of_empty_set_is_zero() {
        assert_eq!(ratio(0, 0), 0.0);
        assert_eq!(ratio(1, 4), 0.25);
    }

    #[test]
    fn breakdown_buckets_by_relevant_count_and_source() {
        let rows = vec![
            (1, Some("scopus"), 0),
            (2, Some("scopus"), 2),
            (3, Some("wos"), 2),
            (4, None, 2),
        ];

        let breakdown = relevance_breakdown(rows);

        assert_eq!(breakdown.total_articles, 4);
        assert_eq!(breakdown.sources, vec!["Unknown", "scopus", "wos"]);
        assert_eq!(breakdown.buckets.len(), 2);

        let zero = &breakdown.buckets[0];
        assert_eq!(zero.relevant_analyses, 0);
        let counts: Vec<u32> = zero.cells.iter().map(|cell| cell.count).collect();
        assert_eq!(counts, vec![0, 1, 0]);
        assert_eq!(zero.cells[1].percentage, 25.0);

        let two = &breakdown.buckets[1];
        assert_eq!(two.relevant_analyses, 2);
        assert!(two.cells.iter().all(|cell| cell.count == 1));
    }

    #[test]
    fn breakdown_of_no_articles_is_empty() {
        let breakdown = relevance_breakdown(Vec::new());
        assert_eq!(breakdown.total_articles, 0);
        assert!(breakdown.buckets.is_empty());
        assert!(breakdown.sources.is_empty());
    }
}
