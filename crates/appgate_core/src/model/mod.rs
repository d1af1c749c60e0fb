//! Domain model for apps, their tokens and permissions.
//!
//! # Responsibility
//! - Define the canonical in-memory shapes used by repositories and services.
//! - Keep validation rules next to the data they constrain.
//!
//! # Invariants
//! - Model types perform no I/O.
//! - Permissions are a closed enum; free-form identifiers exist only at the
//!   parse boundary.

pub mod app;
pub mod app_token;
pub mod metadata;
pub mod permission;
