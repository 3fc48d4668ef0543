//! Subcommand handlers. Each handler opens its own repositories over the
//! shared connection and prints a JSON document on success.

use crate::cli::{AnalysisCommand, ArticleCommand, Command, ReviewerCommand};
use anyhow::{anyhow, Context, Result};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use reviewdesk_core::db::migrations::{current_user_version, latest_version};
use reviewdesk_core::db::open_db;
use reviewdesk_core::{
    AllocationReport, AllocationService, Analysis, Article, ArticleId, DiscardPolicy,
    ProgressScope, ProgressService, QueueService, RegistryService, ReviewService, Reviewer,
    ReviewerId, SqliteAssignmentRepository, SqliteRegistryRepository,
};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Allocation result with reviewer usernames resolved for display.
#[derive(Debug, Serialize)]
struct AllocationSummary {
    assignments: usize,
    discarded: u32,
    load_spread: u32,
    skipped_slots: Vec<ArticleId>,
    distribution: Vec<ReviewerShare>,
}

#[derive(Debug, Serialize)]
struct ReviewerShare {
    username: String,
    assigned: u32,
}

#[derive(Debug, Serialize)]
struct SchemaStatus {
    database: String,
    schema_version: u32,
    latest_supported: u32,
}

pub fn run(command: Command, database_path: &Path) -> Result<()> {
    let conn = open_db(database_path)
        .with_context(|| format!("failed to open database `{}`", database_path.display()))?;

    match command {
        Command::InitDb => print_json(&SchemaStatus {
            database: database_path.display().to_string(),
            schema_version: current_user_version(&conn)?,
            latest_supported: latest_version(),
        }),
        Command::Reviewer { action } => reviewer_command(&conn, action),
        Command::Article { action } => article_command(&conn, action),
        Command::Analysis { action } => analysis_command(&conn, action),
        Command::Allocate {
            discard_reviews,
            seed,
        } => allocate(&conn, discard_reviews, seed),
        Command::Submit {
            reviewer,
            article,
            decision,
        } => {
            let reviewer = resolve_reviewer(&conn, &reviewer)?;
            let service = ReviewService::new(
                SqliteRegistryRepository::try_new(&conn)?,
                SqliteAssignmentRepository::try_new(&conn)?,
            );
            print_json(&service.submit_decision(reviewer.id, article, decision.as_deref())?)
        }
        Command::Queue { reviewer } => {
            let reviewer = resolve_reviewer(&conn, &reviewer)?;
            print_json(&queue_service(&conn)?.queue(reviewer.id)?)
        }
        Command::Resume { reviewer } => {
            let reviewer = resolve_reviewer(&conn, &reviewer)?;
            print_json(&queue_service(&conn)?.resume(reviewer.id)?)
        }
        Command::Neighbors { reviewer, article } => {
            let reviewer = resolve_reviewer(&conn, &reviewer)?;
            print_json(&queue_service(&conn)?.neighbors(reviewer.id, article)?)
        }
        Command::View { reviewer, article } => {
            let reviewer = resolve_reviewer(&conn, &reviewer)?;
            print_json(&queue_service(&conn)?.view(reviewer.id, article)?)
        }
        Command::Dashboard { reviewer } => {
            let reviewer = resolve_reviewer(&conn, &reviewer)?;
            print_json(&queue_service(&conn)?.overview(reviewer.id)?)
        }
        Command::Progress { reviewer } => {
            let scope = match reviewer {
                Some(username) => {
                    ProgressScope::Reviewer(resolve_reviewer(&conn, &username)?.id)
                }
                None => ProgressScope::Global,
            };
            print_json(&progress_service(&conn)?.progress(scope)?)
        }
        Command::Leaderboard => print_json(&progress_service(&conn)?.leaderboard()?),
        Command::Breakdown => print_json(&progress_service(&conn)?.relevance()?),
    }
}

fn reviewer_command(conn: &Connection, action: ReviewerCommand) -> Result<()> {
    let registry = registry_service(conn)?;
    match action {
        ReviewerCommand::Add { username, role } => {
            print_json(&registry.register_reviewer(&username, role.into())?)
        }
        ReviewerCommand::List => print_json(&registry.list_reviewers()?),
    }
}

fn article_command(conn: &Connection, action: ArticleCommand) -> Result<()> {
    let registry = registry_service(conn)?;
    match action {
        ArticleCommand::Add {
            id,
            title,
            source,
            doi,
            year,
            abstract_text,
        } => {
            let article = Article {
                source,
                doi,
                year,
                abstract_text,
                ..Article::new(id, title)
            };
            print_json(&registry.add_article(&article)?)
        }
        ArticleCommand::List => print_json(&registry.list_articles()?),
        ArticleCommand::Delete { id } => {
            registry.delete_article(id)?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
    }
}

fn analysis_command(conn: &Connection, action: AnalysisCommand) -> Result<()> {
    let registry = registry_service(conn)?;
    match action {
        AnalysisCommand::Add {
            article,
            model,
            relevant,
            justification,
        } => {
            let analysis = Analysis {
                justification,
                ..Analysis::new(article, model, relevant)
            };
            let inserted = registry.record_analysis(&analysis)?;
            print_json(&serde_json::json!({
                "article_id": article,
                "inserted": inserted,
            }))
        }
    }
}

fn allocate(conn: &Connection, discard_reviews: bool, seed: Option<u64>) -> Result<()> {
    let policy = if discard_reviews {
        DiscardPolicy::DiscardReviewed
    } else {
        DiscardPolicy::KeepReviewedGuard
    };
    let service = AllocationService::new(
        SqliteRegistryRepository::try_new(conn)?,
        SqliteAssignmentRepository::try_new(conn)?,
    );

    let report = match seed {
        Some(seed) => {
            info!("event=allocation_seeded module=cli status=ok seed={seed}");
            service.run_allocation_with_rng(policy, &mut StdRng::seed_from_u64(seed))?
        }
        None => service.run_allocation(policy)?,
    };

    let usernames: HashMap<ReviewerId, String> = registry_service(conn)?
        .list_reviewers()?
        .into_iter()
        .map(|reviewer| (reviewer.id, reviewer.username))
        .collect();
    print_json(&summarize(&report, &usernames))
}

fn summarize(
    report: &AllocationReport,
    usernames: &HashMap<ReviewerId, String>,
) -> AllocationSummary {
    let distribution = report
        .plan
        .loads
        .iter()
        .map(|load| ReviewerShare {
            username: usernames
                .get(&load.reviewer_id)
                .cloned()
                .unwrap_or_else(|| load.reviewer_id.to_string()),
            assigned: load.assigned,
        })
        .collect();

    AllocationSummary {
        assignments: report.plan.assignments.len(),
        discarded: report.discarded,
        load_spread: report.plan.load_spread(),
        skipped_slots: report.plan.skipped_slots.clone(),
        distribution,
    }
}

fn resolve_reviewer(conn: &Connection, username: &str) -> Result<Reviewer> {
    registry_service(conn)?
        .find_reviewer(username)?
        .ok_or_else(|| anyhow!("unknown reviewer `{username}`"))
}

fn registry_service(conn: &Connection) -> Result<RegistryService<SqliteRegistryRepository<'_>>> {
    Ok(RegistryService::new(SqliteRegistryRepository::try_new(conn)?))
}

fn queue_service(
    conn: &Connection,
) -> Result<QueueService<SqliteRegistryRepository<'_>, SqliteAssignmentRepository<'_>>> {
    Ok(QueueService::new(
        SqliteRegistryRepository::try_new(conn)?,
        SqliteAssignmentRepository::try_new(conn)?,
    ))
}

fn progress_service(
    conn: &Connection,
) -> Result<ProgressService<SqliteRegistryRepository<'_>, SqliteAssignmentRepository<'_>>> {
    Ok(ProgressService::new(
        SqliteRegistryRepository::try_new(conn)?,
        SqliteAssignmentRepository::try_new(conn)?,
    ))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::summarize;
    use reviewdesk_core::{
        AllocationPlan, AllocationReport, Reviewer, ReviewerId, ReviewerLoad, Role,
    };
    use std::collections::HashMap;

    fn reviewer_id() -> ReviewerId {
        Reviewer::new("ghost", Role::Verificator).id
    }

    #[test]
    fn summary_resolves_usernames_and_falls_back_to_id() {
        let known = reviewer_id();
        let unknown = reviewer_id();
        let report = AllocationReport {
            plan: AllocationPlan {
                assignments: Vec::new(),
                loads: vec![
                    ReviewerLoad {
                        reviewer_id: known,
                        assigned: 2,
                    },
                    ReviewerLoad {
                        reviewer_id: unknown,
                        assigned: 1,
                    },
                ],
                skipped_slots: Vec::new(),
            },
            discarded: 0,
        };
        let usernames = HashMap::from([(known, "alice".to_string())]);

        let summary = summarize(&report, &usernames);

        assert_eq!(summary.distribution[0].username, "alice");
        assert_eq!(summary.distribution[1].username, unknown.to_string());
        assert_eq!(summary.load_spread, 1);
    }
}
