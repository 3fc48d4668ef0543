use rand::rngs::StdRng;
use rand::SeedableRng;
use reviewdesk_core::db::open_db_in_memory;
use reviewdesk_core::{
    AllocationService, Article, AssignmentRepository, Decision, DecisionParseError,
    DiscardPolicy, RegistryError, RegistryService, ReviewError, ReviewService, ReviewState,
    Reviewer, Role, SqliteAssignmentRepository, SqliteRegistryRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

struct Fixture {
    conn: Connection,
    alice: Reviewer,
    bob: Reviewer,
    admin: Reviewer,
}

/// Three articles and two verificators: both reviewers get all three.
fn setup() -> Fixture {
    let conn = open_db_in_memory().unwrap();
    let (alice, bob, admin) = {
        let registry = RegistryService::new(SqliteRegistryRepository::try_new(&conn).unwrap());
        for id in 1..=3 {
            registry
                .add_article(&Article::new(id, format!("Article {id}")))
                .unwrap();
        }
        let alice = registry
            .register_reviewer("alice", Role::Verificator)
            .unwrap()
            .reviewer;
        let bob = registry
            .register_reviewer("bob", Role::Verificator)
            .unwrap()
            .reviewer;
        let admin = registry.register_reviewer("root", Role::Admin).unwrap().reviewer;

        AllocationService::new(
            SqliteRegistryRepository::try_new(&conn).unwrap(),
            SqliteAssignmentRepository::try_new(&conn).unwrap(),
        )
        .run_allocation_with_rng(DiscardPolicy::default(), &mut StdRng::seed_from_u64(42))
        .unwrap();
        (alice, bob, admin)
    };

    Fixture {
        conn,
        alice,
        bob,
        admin,
    }
}

fn review_service(
    conn: &Connection,
) -> ReviewService<SqliteRegistryRepository<'_>, SqliteAssignmentRepository<'_>> {
    ReviewService::new(
        SqliteRegistryRepository::try_new(conn).unwrap(),
        SqliteAssignmentRepository::try_new(conn).unwrap(),
    )
}

#[test]
fn submit_marks_assignment_reviewed_and_points_to_next_article() {
    let fixture = setup();
    let service = review_service(&fixture.conn);

    let outcome = service
        .submit_decision(fixture.alice.id, 1, Some("relevant"))
        .unwrap();

    assert_eq!(outcome.article_id, 1);
    assert_eq!(outcome.decision, Decision::Relevant);
    assert_eq!(outcome.next_article, Some(2));

    let repo = SqliteAssignmentRepository::try_new(&fixture.conn).unwrap();
    let stored = repo.get_assignment(fixture.alice.id, 1).unwrap().unwrap();
    assert_eq!(stored.state(), ReviewState::Reviewed(Decision::Relevant));
    let other = repo.get_assignment(fixture.bob.id, 1).unwrap().unwrap();
    assert_eq!(other.state(), ReviewState::Unreviewed);
}

#[test]
fn resubmission_overwrites_previous_decision() {
    let fixture = setup();
    let service = review_service(&fixture.conn);

    service
        .submit_decision(fixture.bob.id, 2, Some("true"))
        .unwrap();
    service
        .submit_decision(fixture.bob.id, 2, Some("not_relevant"))
        .unwrap();

    let repo = SqliteAssignmentRepository::try_new(&fixture.conn).unwrap();
    let stored = repo.get_assignment(fixture.bob.id, 2).unwrap().unwrap();
    assert_eq!(stored.decision, Some(Decision::NotRelevant));
    assert!(stored.is_reviewed);
    assert_eq!(repo.counts(Some(fixture.bob.id)).unwrap().reviewed, 1);
}

#[test]
fn last_article_falls_back_to_first_unreviewed() {
    let fixture = setup();
    let service = review_service(&fixture.conn);

    let outcome = service
        .submit_decision(fixture.alice.id, 3, Some("false"))
        .unwrap();
    assert_eq!(outcome.next_article, Some(1));

    service
        .record_decision(fixture.alice.id, 1, Decision::Relevant)
        .unwrap();
    service
        .record_decision(fixture.alice.id, 2, Decision::NotRelevant)
        .unwrap();
    let finished = service
        .submit_decision(fixture.alice.id, 3, Some("relevant"))
        .unwrap();
    assert_eq!(finished.next_article, Some(1));
}

#[test]
fn unassigned_reviewer_is_rejected_without_changes() {
    let fixture = setup();
    let service = review_service(&fixture.conn);
    let repo = SqliteAssignmentRepository::try_new(&fixture.conn).unwrap();
    let before = repo.list_all().unwrap();

    let err = service
        .submit_decision(fixture.alice.id, 99, Some("relevant"))
        .unwrap_err();
    assert!(matches!(err, ReviewError::NotAssigned { article_id: 99, .. }));

    assert_eq!(repo.list_all().unwrap(), before);
}

#[test]
fn admin_submission_is_rejected_as_not_verificator() {
    let fixture = setup();
    let service = review_service(&fixture.conn);

    let err = service
        .submit_decision(fixture.admin.id, 1, Some("relevant"))
        .unwrap_err();
    assert!(matches!(err, ReviewError::NotVerificator(id) if id == fixture.admin.id));

    let err = service
        .record_decision(fixture.admin.id, 1, Decision::Relevant)
        .unwrap_err();
    assert!(matches!(err, ReviewError::NotVerificator(_)));

    let err = service
        .submit_decision(Uuid::new_v4(), 1, Some("relevant"))
        .unwrap_err();
    assert!(matches!(err, ReviewError::ReviewerNotFound(_)));
}

#[test]
fn assigned_verificator_cannot_be_reregistered_as_admin() {
    let fixture = setup();
    let registry = RegistryService::new(SqliteRegistryRepository::try_new(&fixture.conn).unwrap());

    let err = registry
        .register_reviewer("alice", Role::Admin)
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::ReviewerHasAssignments { assigned: 3, reviewer_id } if reviewer_id == fixture.alice.id
    ));

    let alice = registry.find_reviewer("alice").unwrap().unwrap();
    assert_eq!(alice.role, Role::Verificator);
    let outcome = review_service(&fixture.conn)
        .submit_decision(fixture.alice.id, 1, Some("relevant"))
        .unwrap();
    assert_eq!(outcome.decision, Decision::Relevant);
}

#[test]
fn verificator_without_assignments_can_change_role() {
    let fixture = setup();
    let registry = RegistryService::new(SqliteRegistryRepository::try_new(&fixture.conn).unwrap());
    let carol = registry
        .register_reviewer("carol", Role::Verificator)
        .unwrap()
        .reviewer;

    let promoted = registry.register_reviewer("carol", Role::Admin).unwrap();

    assert!(!promoted.created);
    assert_eq!(promoted.reviewer.id, carol.id);
    assert_eq!(promoted.reviewer.role, Role::Admin);
}

#[test]
fn role_changed_outside_registry_still_blocks_submission() {
    let fixture = setup();
    fixture
        .conn
        .execute(
            "UPDATE reviewers SET role = 'admin' WHERE username = 'alice';",
            [],
        )
        .unwrap();
    let repo = SqliteAssignmentRepository::try_new(&fixture.conn).unwrap();
    let before = repo.list_all().unwrap();

    let err = review_service(&fixture.conn)
        .submit_decision(fixture.alice.id, 1, Some("relevant"))
        .unwrap_err();

    assert!(matches!(err, ReviewError::NotVerificator(_)));
    assert_eq!(repo.list_all().unwrap(), before);
}

#[test]
fn missing_or_unknown_decision_is_rejected() {
    let fixture = setup();
    let service = review_service(&fixture.conn);

    let err = service
        .submit_decision(fixture.alice.id, 1, None)
        .unwrap_err();
    assert!(matches!(
        err,
        ReviewError::InvalidDecision(DecisionParseError::Missing)
    ));

    let err = service
        .submit_decision(fixture.alice.id, 1, Some("maybe"))
        .unwrap_err();
    assert!(matches!(
        err,
        ReviewError::InvalidDecision(DecisionParseError::Unrecognized(_))
    ));

    let repo = SqliteAssignmentRepository::try_new(&fixture.conn).unwrap();
    let stored = repo.get_assignment(fixture.alice.id, 1).unwrap().unwrap();
    assert_eq!(stored.state(), ReviewState::Unreviewed);
}

#[test]
fn eligibility_checks_run_before_decision_parsing() {
    let fixture = setup();
    let service = review_service(&fixture.conn);

    let err = service
        .submit_decision(fixture.alice.id, 99, Some("maybe"))
        .unwrap_err();
    assert!(matches!(err, ReviewError::NotAssigned { .. }));

    let err = service
        .submit_decision(fixture.admin.id, 2, Some("maybe"))
        .unwrap_err();
    assert!(matches!(err, ReviewError::NotVerificator(_)));
}
