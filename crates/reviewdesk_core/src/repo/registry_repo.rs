//! Article/reviewer registry contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist the article pool, the reviewer pool and third-party analyses.
//! - Supply the candidate id sets consumed by allocation.
//!
//! # Invariants
//! - Article listings are ordered by `id ASC`.
//! - Reviewer upserts keep the existing id and only update the role.
//! - A reviewer holding assignments stays a verificator.
//! - At most one analysis per (article, model name); repeats are skipped.

use crate::model::analysis::Analysis;
use crate::model::article::{Article, ArticleId};
use crate::model::reviewer::{Reviewer, ReviewerId, Role};
use crate::model::ValidationError;
use crate::repo::common::{
    bool_to_int, ensure_connection_ready, parse_optional_flag, parse_uuid, RepoError,
    RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const ARTICLE_SELECT_SQL: &str = "SELECT
    id,
    title,
    source,
    doi,
    abstract,
    year
FROM articles";

const REVIEWER_SELECT_SQL: &str = "SELECT
    id,
    username,
    role
FROM reviewers";

/// Per-article relevance tally used by the relevance cross-tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRelevanceRow {
    pub article_id: ArticleId,
    pub source: Option<String>,
    /// Number of analyses with `is_relevant = true`.
    pub relevant_analyses: u32,
}

/// Repository interface for the article/reviewer registry.
pub trait RegistryRepository {
    /// Inserts one article; fails with `DuplicateArticle` on id reuse.
    fn create_article(&self, article: &Article) -> RepoResult<ArticleId>;
    fn get_article(&self, id: ArticleId) -> RepoResult<Option<Article>>;
    /// All articles ordered by id ascending.
    fn list_articles(&self) -> RepoResult<Vec<Article>>;
    /// All article ids ordered ascending.
    fn list_article_ids(&self) -> RepoResult<Vec<ArticleId>>;
    /// Deletes one article; assignments and analyses cascade.
    fn delete_article(&self, id: ArticleId) -> RepoResult<()>;
    /// Creates the reviewer or updates the role of an existing username.
    ///
    /// The supplied id is only used when the username is new. Moving a
    /// reviewer away from `verificator` fails with
    /// `RepoError::ReviewerHasAssignments` while any assignment references it.
    fn upsert_reviewer(&self, reviewer: &Reviewer) -> RepoResult<Reviewer>;
    fn get_reviewer(&self, id: ReviewerId) -> RepoResult<Option<Reviewer>>;
    fn find_reviewer_by_username(&self, username: &str) -> RepoResult<Option<Reviewer>>;
    /// All reviewers ordered by username.
    fn list_reviewers(&self) -> RepoResult<Vec<Reviewer>>;
    /// Ids of reviewers eligible for allocation, ordered by username.
    fn list_verificator_ids(&self) -> RepoResult<Vec<ReviewerId>>;
    /// Inserts one analysis; returns `false` when the (article, model) pair
    /// already has one.
    fn insert_analysis(&self, analysis: &Analysis) -> RepoResult<bool>;
    /// Analyses of one article ordered by model name.
    fn list_analyses(&self, article_id: ArticleId) -> RepoResult<Vec<Analysis>>;
    /// One row per article with its relevant-analysis count.
    fn relevance_rows(&self) -> RepoResult<Vec<ArticleRelevanceRow>>;
}

/// SQLite-backed registry repository.
pub struct SqliteRegistryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRegistryRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["articles", "reviewers", "assignments", "analyses"])?;
        Ok(Self { conn })
    }
}

impl RegistryRepository for SqliteRegistryRepository<'_> {
    fn create_article(&self, article: &Article) -> RepoResult<ArticleId> {
        article.validate()?;

        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO articles (
                id,
                title,
                source,
                doi,
                abstract,
                year
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                article.id,
                article.title.trim(),
                article.source.as_deref(),
                article.doi.as_deref(),
                article.abstract_text.as_deref(),
                article.year,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::DuplicateArticle(article.id));
        }
        Ok(article.id)
    }

    fn get_article(&self, id: ArticleId) -> RepoResult<Option<Article>> {
        let article = self
            .conn
            .query_row(
                &format!("{ARTICLE_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_article_row,
            )
            .optional()?;
        Ok(article)
    }

    fn list_articles(&self) -> RepoResult<Vec<Article>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ARTICLE_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut articles = Vec::new();
        while let Some(row) = rows.next()? {
            articles.push(parse_article_row(row)?);
        }
        Ok(articles)
    }

    fn list_article_ids(&self) -> RepoResult<Vec<ArticleId>> {
        let mut stmt = self.conn.prepare("SELECT id FROM articles ORDER BY id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    fn delete_article(&self, id: ArticleId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM articles WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::ArticleNotFound(id));
        }
        Ok(())
    }

    fn upsert_reviewer(&self, reviewer: &Reviewer) -> RepoResult<Reviewer> {
        let username = reviewer.username.trim();
        if username.is_empty() {
            return Err(ValidationError::BlankUsername.into());
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if reviewer.role != Role::Verificator {
            let held: Option<(String, u32)> = tx
                .query_row(
                    "SELECT r.id, COUNT(*)
                     FROM reviewers r
                     JOIN assignments a ON a.reviewer_id = r.id
                     WHERE r.username = ?1
                     GROUP BY r.id;",
                    [username],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            if let Some((id, assigned)) = held {
                return Err(RepoError::ReviewerHasAssignments {
                    reviewer_id: parse_uuid(&id, "reviewers.id")?,
                    assigned,
                });
            }
        }

        let updated = tx.execute(
            "UPDATE reviewers
             SET
                role = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE username = ?1;",
            params![username, reviewer.role.as_str()],
        )?;
        if updated == 0 {
            tx.execute(
                "INSERT INTO reviewers (id, username, role) VALUES (?1, ?2, ?3);",
                params![reviewer.id.to_string(), username, reviewer.role.as_str()],
            )?;
        }
        tx.commit()?;

        self.find_reviewer_by_username(username)?.ok_or_else(|| {
            RepoError::InvalidData(format!("reviewer `{username}` missing after upsert"))
        })
    }

    fn get_reviewer(&self, id: ReviewerId) -> RepoResult<Option<Reviewer>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{REVIEWER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_reviewer_row(row)?));
        }
        Ok(None)
    }

    fn find_reviewer_by_username(&self, username: &str) -> RepoResult<Option<Reviewer>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{REVIEWER_SELECT_SQL} WHERE username = ?1;"))?;
        let mut rows = stmt.query([username.trim()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_reviewer_row(row)?));
        }
        Ok(None)
    }

    fn list_reviewers(&self) -> RepoResult<Vec<Reviewer>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{REVIEWER_SELECT_SQL} ORDER BY username ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut reviewers = Vec::new();
        while let Some(row) = rows.next()? {
            reviewers.push(parse_reviewer_row(row)?);
        }
        Ok(reviewers)
    }

    fn list_verificator_ids(&self) -> RepoResult<Vec<ReviewerId>> {
        let mut stmt = self.conn.prepare(
            "SELECT id
             FROM reviewers
             WHERE role = ?1
             ORDER BY username ASC;",
        )?;
        let mut rows = stmt.query([Role::Verificator.as_str()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get(0)?;
            ids.push(parse_uuid(&id_text, "reviewers.id")?);
        }
        Ok(ids)
    }

    fn insert_analysis(&self, analysis: &Analysis) -> RepoResult<bool> {
        analysis.validate()?;
        if self.get_article(analysis.article_id)?.is_none() {
            return Err(RepoError::ArticleNotFound(analysis.article_id));
        }

        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO analyses (
                article_id,
                model_name,
                is_relevant,
                justification
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                analysis.article_id,
                analysis.model_name.trim(),
                analysis.is_relevant.map(bool_to_int),
                analysis.justification.as_deref(),
            ],
        )?;
        Ok(changed == 1)
    }

    fn list_analyses(&self, article_id: ArticleId) -> RepoResult<Vec<Analysis>> {
        let mut stmt = self.conn.prepare(
            "SELECT article_id, model_name, is_relevant, justification
             FROM analyses
             WHERE article_id = ?1
             ORDER BY model_name ASC;",
        )?;
        let mut rows = stmt.query([article_id])?;
        let mut analyses = Vec::new();
        while let Some(row) = rows.next()? {
            analyses.push(Analysis {
                article_id: row.get("article_id")?,
                model_name: row.get("model_name")?,
                is_relevant: parse_optional_flag(
                    row.get("is_relevant")?,
                    "analyses.is_relevant",
                )?,
                justification: row.get("justification")?,
            });
        }
        Ok(analyses)
    }

    fn relevance_rows(&self) -> RepoResult<Vec<ArticleRelevanceRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                a.id AS article_id,
                a.source AS source,
                COALESCE(SUM(CASE WHEN an.is_relevant = 1 THEN 1 ELSE 0 END), 0)
                    AS relevant_analyses
             FROM articles a
             LEFT JOIN analyses an ON an.article_id = a.id
             GROUP BY a.id
             ORDER BY a.id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut tallies = Vec::new();
        while let Some(row) = rows.next()? {
            tallies.push(ArticleRelevanceRow {
                article_id: row.get("article_id")?,
                source: row.get("source")?,
                relevant_analyses: row.get("relevant_analyses")?,
            });
        }
        Ok(tallies)
    }
}

fn parse_article_row(row: &Row<'_>) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get("id")?,
        title: row.get("title")?,
        source: row.get("source")?,
        doi: row.get("doi")?,
        abstract_text: row.get("abstract")?,
        year: row.get("year")?,
    })
}

fn parse_reviewer_row(row: &Row<'_>) -> RepoResult<Reviewer> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "reviewers.id")?;

    let role_text: String = row.get("role")?;
    let role = role_text.parse::<Role>().map_err(|_| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in reviewers.role"))
    })?;

    Ok(Reviewer {
        id,
        username: row.get("username")?,
        role,
    })
}
