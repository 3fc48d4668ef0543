//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Write paths validate records before persistence.
//! - Repository APIs return semantic errors (`ArticleNotFound`,
//!   `AssignmentNotFound`) in addition to DB transport errors.
//! - Every list query has an explicit, deterministic `ORDER BY`.

pub mod assignment_repo;
pub mod common;
pub mod registry_repo;
