//! Core domain logic for ReviewDesk.
//! This crate is the single source of truth for assignment and review
//! invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::analysis::Analysis;
pub use model::article::{source_label, Article, ArticleId, UNKNOWN_SOURCE};
pub use model::assignment::{Assignment, Decision, DecisionParseError, ReviewState};
pub use model::reviewer::{Reviewer, ReviewerId, Role};
pub use model::ValidationError;
pub use repo::assignment_repo::{
    AssignmentRepository, DiscardPolicy, ReviewCounts, ReviewerTally, SqliteAssignmentRepository,
};
pub use repo::common::{RepoError, RepoResult};
pub use repo::registry_repo::{
    ArticleRelevanceRow, RegistryRepository, SqliteRegistryRepository,
};
pub use service::allocation_service::{
    plan_allocation, AllocationError, AllocationPlan, AllocationReport, AllocationService,
    ReviewerLoad, REVIEWS_PER_ARTICLE,
};
pub use service::progress_service::{
    DecisionSplit, ProgressBreakdown, ProgressError, ProgressReport, ProgressScope,
    ProgressService, RelevanceBreakdown, RelevanceBucket, ReviewerReport, SourceCell,
};
pub use service::queue_service::{
    ArticleView, Neighbors, QueueError, QueueOverview, QueueService, QueueState,
};
pub use service::registry_service::{RegistryError, RegistryService, ReviewerRegistration};
pub use service::review_service::{ReviewError, ReviewService, SubmitOutcome};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
