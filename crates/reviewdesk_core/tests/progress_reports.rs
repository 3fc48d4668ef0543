use reviewdesk_core::db::open_db_in_memory;
use reviewdesk_core::{
    Analysis, Article, Assignment, AssignmentRepository, Decision, DiscardPolicy,
    ProgressBreakdown, ProgressError, ProgressScope, ProgressService, RegistryError,
    RegistryService, ReviewService, Reviewer, Role, SqliteAssignmentRepository,
    SqliteRegistryRepository, UNKNOWN_SOURCE,
};
use rusqlite::Connection;
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn registry(conn: &Connection) -> RegistryService<SqliteRegistryRepository<'_>> {
    RegistryService::new(SqliteRegistryRepository::try_new(conn).unwrap())
}

fn progress_service(
    conn: &Connection,
) -> ProgressService<SqliteRegistryRepository<'_>, SqliteAssignmentRepository<'_>> {
    ProgressService::new(
        SqliteRegistryRepository::try_new(conn).unwrap(),
        SqliteAssignmentRepository::try_new(conn).unwrap(),
    )
}

fn verificator(conn: &Connection, username: &str) -> Reviewer {
    registry(conn)
        .register_reviewer(username, Role::Verificator)
        .unwrap()
        .reviewer
}

/// Articles 1..=3; alice holds {1, 2}, bob holds {1, 3}, carol holds {2, 3}.
fn seed_assignments(conn: &Connection) -> (Reviewer, Reviewer, Reviewer) {
    let registry = registry(conn);
    for id in 1..=3 {
        registry
            .add_article(&Article::new(id, format!("Article {id}")))
            .unwrap();
    }
    let alice = verificator(conn, "alice");
    let bob = verificator(conn, "bob");
    let carol = verificator(conn, "carol");

    let plan: Vec<Assignment> = [
        (alice.id, 1),
        (bob.id, 1),
        (alice.id, 2),
        (carol.id, 2),
        (bob.id, 3),
        (carol.id, 3),
    ]
    .into_iter()
    .map(|(reviewer_id, article_id)| Assignment::new(reviewer_id, article_id))
    .collect();
    SqliteAssignmentRepository::try_new(conn)
        .unwrap()
        .replace_all(&plan, DiscardPolicy::default())
        .unwrap();

    (alice, bob, carol)
}

fn review(conn: &Connection, reviewer: &Reviewer, article_id: i64, decision: Decision) {
    ReviewService::new(
        SqliteRegistryRepository::try_new(conn).unwrap(),
        SqliteAssignmentRepository::try_new(conn).unwrap(),
    )
    .record_decision(reviewer.id, article_id, decision)
    .unwrap();
}

#[test]
fn empty_store_reports_zero_progress() {
    let conn = setup();

    let report = progress_service(&conn)
        .progress(ProgressScope::Global)
        .unwrap();

    assert_eq!(report.reviewer_id, None);
    assert_eq!((report.reviewed_count, report.total_count), (0, 0));
    assert_eq!(report.completion_ratio, 0.0);
    match report.breakdown {
        ProgressBreakdown::Relevance(breakdown) => {
            assert_eq!(breakdown.total_articles, 0);
            assert!(breakdown.buckets.is_empty());
        }
        other => panic!("unexpected breakdown: {other:?}"),
    }
}

#[test]
fn reviewer_scope_counts_own_assignments_and_decisions() {
    let conn = setup();
    let (alice, bob, _carol) = seed_assignments(&conn);
    review(&conn, &bob, 1, Decision::Relevant);

    let report = progress_service(&conn)
        .progress(ProgressScope::Reviewer(bob.id))
        .unwrap();
    assert_eq!(report.reviewer_id, Some(bob.id));
    assert_eq!((report.reviewed_count, report.total_count), (1, 2));
    assert_eq!(report.completion_ratio, 0.5);
    match report.breakdown {
        ProgressBreakdown::Decisions(split) => {
            assert_eq!((split.relevant, split.not_relevant), (1, 0));
            assert_eq!(split.relevant_ratio, 1.0);
        }
        other => panic!("unexpected breakdown: {other:?}"),
    }

    let untouched = progress_service(&conn)
        .progress(ProgressScope::Reviewer(alice.id))
        .unwrap();
    assert_eq!((untouched.reviewed_count, untouched.total_count), (0, 2));
}

#[test]
fn admin_scope_resolves_to_global_counts() {
    let conn = setup();
    let (alice, _bob, carol) = seed_assignments(&conn);
    review(&conn, &alice, 1, Decision::Relevant);
    review(&conn, &carol, 3, Decision::NotRelevant);
    let admin = registry(&conn)
        .register_reviewer("root", Role::Admin)
        .unwrap()
        .reviewer;

    let report = progress_service(&conn)
        .progress(ProgressScope::Reviewer(admin.id))
        .unwrap();

    assert_eq!(report.reviewer_id, None);
    assert_eq!((report.reviewed_count, report.total_count), (2, 6));
    assert!(matches!(report.breakdown, ProgressBreakdown::Relevance(_)));
}

#[test]
fn unknown_reviewer_scope_fails() {
    let conn = setup();

    let err = progress_service(&conn)
        .progress(ProgressScope::Reviewer(Uuid::new_v4()))
        .unwrap_err();

    assert!(matches!(err, ProgressError::ReviewerNotFound(_)));
}

#[test]
fn leaderboard_orders_by_completion_then_username() {
    let conn = setup();
    let (alice, bob, _carol) = seed_assignments(&conn);
    verificator(&conn, "dave");
    registry(&conn)
        .register_reviewer("root", Role::Admin)
        .unwrap();

    review(&conn, &alice, 1, Decision::Relevant);
    review(&conn, &alice, 2, Decision::NotRelevant);
    review(&conn, &bob, 3, Decision::Relevant);

    let board = progress_service(&conn).leaderboard().unwrap();
    let order: Vec<&str> = board.iter().map(|row| row.username.as_str()).collect();
    assert_eq!(order, vec!["alice", "bob", "carol", "dave"]);

    assert_eq!(board[0].completion_pct, 100.0);
    assert_eq!(
        (board[0].decisions.relevant, board[0].decisions.not_relevant),
        (1, 1)
    );
    assert_eq!(board[1].completion_pct, 50.0);
    assert_eq!((board[3].reviewed_count, board[3].total_count), (0, 0));
}

#[test]
fn relevance_breakdown_crosses_analyses_with_source() {
    let conn = setup();
    let registry = registry(&conn);
    registry
        .add_article(&Article {
            source: Some("PubMed".to_string()),
            ..Article::new(1, "One")
        })
        .unwrap();
    registry
        .add_article(&Article {
            source: Some("PubMed".to_string()),
            ..Article::new(2, "Two")
        })
        .unwrap();
    registry
        .add_article(&Article {
            source: Some("Scopus".to_string()),
            ..Article::new(3, "Three")
        })
        .unwrap();
    registry.add_article(&Article::new(4, "Four")).unwrap();

    for analysis in [
        Analysis::new(1, "model-a", Some(true)),
        Analysis::new(1, "model-b", Some(true)),
        Analysis::new(2, "model-a", Some(true)),
        Analysis::new(2, "model-b", Some(false)),
        Analysis::new(3, "model-a", None),
    ] {
        assert!(registry.record_analysis(&analysis).unwrap());
    }
    assert!(!registry
        .record_analysis(&Analysis::new(1, "model-a", Some(false)))
        .unwrap());

    let breakdown = progress_service(&conn).relevance().unwrap();

    assert_eq!(breakdown.total_articles, 4);
    assert_eq!(breakdown.sources, vec!["PubMed", "Scopus", UNKNOWN_SOURCE]);
    let buckets: Vec<(u32, Vec<u32>)> = breakdown
        .buckets
        .iter()
        .map(|bucket| {
            (
                bucket.relevant_analyses,
                bucket.cells.iter().map(|cell| cell.count).collect(),
            )
        })
        .collect();
    assert_eq!(
        buckets,
        vec![(0, vec![0, 1, 1]), (1, vec![1, 0, 0]), (2, vec![1, 0, 0])]
    );
    assert_eq!(breakdown.buckets[0].cells[1].percentage, 25.0);
}

#[test]
fn analyses_require_existing_article() {
    let conn = setup();

    let err = registry(&conn)
        .record_analysis(&Analysis::new(5, "model-a", Some(true)))
        .unwrap_err();

    assert!(matches!(err, RegistryError::ArticleNotFound(5)));
}

#[test]
fn deleting_article_cascades_to_assignments_and_analyses() {
    let conn = setup();
    seed_assignments(&conn);
    let registry = registry(&conn);
    registry
        .record_analysis(&Analysis::new(3, "model-a", Some(true)))
        .unwrap();

    registry.delete_article(3).unwrap();

    let repo = SqliteAssignmentRepository::try_new(&conn).unwrap();
    assert_eq!(repo.counts(None).unwrap().total, 4);
    assert!(registry.list_analyses(3).unwrap().is_empty());
    assert!(matches!(
        registry.delete_article(3).unwrap_err(),
        RegistryError::ArticleNotFound(3)
    ));
}

#[test]
fn reports_serialize_with_tagged_breakdown() {
    let conn = setup();
    let (_alice, bob, _carol) = seed_assignments(&conn);
    review(&conn, &bob, 3, Decision::NotRelevant);
    let service = progress_service(&conn);

    let global = serde_json::to_value(service.progress(ProgressScope::Global).unwrap()).unwrap();
    assert_eq!(global["breakdown"]["kind"], "relevance");
    assert_eq!(global["reviewer_id"], serde_json::Value::Null);

    let own =
        serde_json::to_value(service.progress(ProgressScope::Reviewer(bob.id)).unwrap()).unwrap();
    assert_eq!(own["breakdown"]["kind"], "decisions");
    assert_eq!(own["breakdown"]["not_relevant"], 1);
    assert_eq!(own["reviewer_id"], bob.id.to_string());
}
