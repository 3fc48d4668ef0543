//! Assignment repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Own the assignment table: bulk replacement, decision updates, queries.
//! - Keep queue ordering (`article_id ASC`) inside the persistence boundary.
//!
//! # Invariants
//! - `replace_all` deletes and repopulates inside one immediate transaction;
//!   readers never observe a partially cleared table.
//! - `record_decision` touches exactly one (reviewer, article) row.
//! - Per-reviewer listings are ordered by `article_id ASC`, never by
//!   allocation order.

use crate::model::article::ArticleId;
use crate::model::assignment::{Assignment, Decision};
use crate::model::reviewer::{ReviewerId, Role};
use crate::repo::common::{
    bool_to_int, ensure_connection_ready, parse_flag, parse_optional_flag, parse_uuid, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const ASSIGNMENT_SELECT_SQL: &str = "SELECT
    reviewer_id,
    article_id,
    is_relevant,
    is_reviewed
FROM assignments";

/// Reviewed/total counters over a set of assignments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewCounts {
    pub reviewed: u32,
    pub total: u32,
}

/// Per-verificator decision tallies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewerTally {
    pub reviewer_id: ReviewerId,
    pub username: String,
    pub total: u32,
    pub reviewed: u32,
    pub relevant: u32,
    pub not_relevant: u32,
}

/// What `replace_all` does when stored assignments already carry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscardPolicy {
    /// Refuse the replacement with `ReviewedAssignmentsExist`.
    #[default]
    KeepReviewedGuard,
    /// Drop recorded decisions together with the old assignment set.
    DiscardReviewed,
}

/// Repository interface for assignment state.
pub trait AssignmentRepository {
    /// Replaces the full assignment set; returns how many rows were discarded.
    fn replace_all(&self, assignments: &[Assignment], policy: DiscardPolicy) -> RepoResult<u32>;
    fn get_assignment(
        &self,
        reviewer_id: ReviewerId,
        article_id: ArticleId,
    ) -> RepoResult<Option<Assignment>>;
    /// Stores a decision and marks the row reviewed.
    fn record_decision(
        &self,
        reviewer_id: ReviewerId,
        article_id: ArticleId,
        decision: Decision,
    ) -> RepoResult<()>;
    /// Assignments of one reviewer ordered by `article_id ASC`.
    fn list_for_reviewer(&self, reviewer_id: ReviewerId) -> RepoResult<Vec<Assignment>>;
    /// Every assignment ordered by `article_id ASC, reviewer_id ASC`.
    fn list_all(&self) -> RepoResult<Vec<Assignment>>;
    /// Reviewed/total counters, globally (`None`) or for one reviewer.
    fn counts(&self, reviewer_id: Option<ReviewerId>) -> RepoResult<ReviewCounts>;
    /// One tally per verificator, including those without assignments.
    fn reviewer_tallies(&self) -> RepoResult<Vec<ReviewerTally>>;
}

/// SQLite-backed assignment repository.
pub struct SqliteAssignmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAssignmentRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["assignments", "reviewers", "articles"])?;
        Ok(Self { conn })
    }
}

impl AssignmentRepository for SqliteAssignmentRepository<'_> {
    fn replace_all(&self, assignments: &[Assignment], policy: DiscardPolicy) -> RepoResult<u32> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        if policy == DiscardPolicy::KeepReviewedGuard {
            let reviewed: u32 = tx.query_row(
                "SELECT COUNT(*) FROM assignments WHERE is_reviewed = 1;",
                [],
                |row| row.get(0),
            )?;
            if reviewed > 0 {
                return Err(RepoError::ReviewedAssignmentsExist(reviewed));
            }
        }

        let discarded = tx.execute("DELETE FROM assignments;", [])?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO assignments (
                    reviewer_id,
                    article_id,
                    is_relevant,
                    is_reviewed
                ) VALUES (?1, ?2, ?3, ?4);",
            )?;
            for assignment in assignments {
                insert.execute(params![
                    assignment.reviewer_id.to_string(),
                    assignment.article_id,
                    assignment.decision.map(|d| bool_to_int(d.is_relevant())),
                    bool_to_int(assignment.is_reviewed),
                ])?;
            }
        }

        tx.commit()?;
        Ok(u32::try_from(discarded).unwrap_or(u32::MAX))
    }

    fn get_assignment(
        &self,
        reviewer_id: ReviewerId,
        article_id: ArticleId,
    ) -> RepoResult<Option<Assignment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ASSIGNMENT_SELECT_SQL}
             WHERE reviewer_id = ?1
               AND article_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![reviewer_id.to_string(), article_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_assignment_row(row)?));
        }
        Ok(None)
    }

    fn record_decision(
        &self,
        reviewer_id: ReviewerId,
        article_id: ArticleId,
        decision: Decision,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE assignments
             SET
                is_relevant = ?3,
                is_reviewed = 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE reviewer_id = ?1
               AND article_id = ?2;",
            params![
                reviewer_id.to_string(),
                article_id,
                bool_to_int(decision.is_relevant()),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::AssignmentNotFound {
                reviewer_id,
                article_id,
            });
        }
        Ok(())
    }

    fn list_for_reviewer(&self, reviewer_id: ReviewerId) -> RepoResult<Vec<Assignment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ASSIGNMENT_SELECT_SQL}
             WHERE reviewer_id = ?1
             ORDER BY article_id ASC;"
        ))?;
        let mut rows = stmt.query([reviewer_id.to_string()])?;
        let mut assignments = Vec::new();
        while let Some(row) = rows.next()? {
            assignments.push(parse_assignment_row(row)?);
        }
        Ok(assignments)
    }

    fn list_all(&self) -> RepoResult<Vec<Assignment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ASSIGNMENT_SELECT_SQL} ORDER BY article_id ASC, reviewer_id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut assignments = Vec::new();
        while let Some(row) = rows.next()? {
            assignments.push(parse_assignment_row(row)?);
        }
        Ok(assignments)
    }

    fn counts(&self, reviewer_id: Option<ReviewerId>) -> RepoResult<ReviewCounts> {
        let (total, reviewed): (u32, u32) = match reviewer_id {
            Some(reviewer_id) => self.conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(is_reviewed), 0)
                 FROM assignments
                 WHERE reviewer_id = ?1;",
                [reviewer_id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?,
            None => self.conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(is_reviewed), 0) FROM assignments;",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?,
        };
        Ok(ReviewCounts { reviewed, total })
    }

    fn reviewer_tallies(&self) -> RepoResult<Vec<ReviewerTally>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                r.id AS reviewer_id,
                r.username AS username,
                COUNT(a.id) AS total,
                COALESCE(SUM(a.is_reviewed), 0) AS reviewed,
                COALESCE(SUM(CASE WHEN a.is_reviewed = 1 AND a.is_relevant = 1
                    THEN 1 ELSE 0 END), 0) AS relevant,
                COALESCE(SUM(CASE WHEN a.is_reviewed = 1 AND a.is_relevant = 0
                    THEN 1 ELSE 0 END), 0) AS not_relevant
             FROM reviewers r
             LEFT JOIN assignments a ON a.reviewer_id = r.id
             WHERE r.role = ?1
             GROUP BY r.id
             ORDER BY r.username ASC;",
        )?;
        let mut rows = stmt.query([Role::Verificator.as_str()])?;
        let mut tallies = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("reviewer_id")?;
            tallies.push(ReviewerTally {
                reviewer_id: parse_uuid(&id_text, "reviewers.id")?,
                username: row.get("username")?,
                total: row.get("total")?,
                reviewed: row.get("reviewed")?,
                relevant: row.get("relevant")?,
                not_relevant: row.get("not_relevant")?,
            });
        }
        Ok(tallies)
    }
}

fn parse_assignment_row(row: &Row<'_>) -> RepoResult<Assignment> {
    let reviewer_text: String = row.get("reviewer_id")?;
    let reviewer_id = parse_uuid(&reviewer_text, "assignments.reviewer_id")?;
    let is_reviewed = parse_flag(row.get("is_reviewed")?, "assignments.is_reviewed")?;
    let is_relevant = parse_optional_flag(row.get("is_relevant")?, "assignments.is_relevant")?;

    let decision = match (is_reviewed, is_relevant) {
        (true, Some(value)) => Some(Decision::from_bool(value)),
        (false, None) => None,
        (true, None) => {
            return Err(RepoError::InvalidData(format!(
                "reviewed assignment without decision for article {} in assignments",
                row.get::<_, ArticleId>("article_id")?
            )));
        }
        (false, Some(_)) => {
            return Err(RepoError::InvalidData(format!(
                "unreviewed assignment with decision for article {} in assignments",
                row.get::<_, ArticleId>("article_id")?
            )));
        }
    };

    Ok(Assignment {
        reviewer_id,
        article_id: row.get("article_id")?,
        decision,
        is_reviewed,
    })
}
