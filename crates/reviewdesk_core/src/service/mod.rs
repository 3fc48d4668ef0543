//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Map repository errors into semantic, caller-facing errors.

pub mod allocation_service;
pub mod progress_service;
pub mod queue_service;
pub mod registry_service;
pub mod review_service;
