//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for apps and tokens.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes validate models before persistence.
//! - Repository APIs return semantic errors (`AppNotFound`, `DuplicateToken`)
//!   in addition to DB transport errors.

pub mod app_repo;
pub mod token_repo;
