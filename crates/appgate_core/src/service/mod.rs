//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Host the permission resolver and token issuance policy.
//! - Keep callers decoupled from storage details.

pub mod app_service;
pub mod permission_resolver;
pub mod token_service;
