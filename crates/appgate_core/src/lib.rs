//! Core domain logic for third-party app registration and authorization.
//! This crate is the single source of truth for app, token and permission
//! invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::app::{App, AppId, AppValidationError, NewApp};
pub use model::app_token::{AppToken, AppTokenId};
pub use model::metadata::Metadata;
pub use model::permission::{parse_permission, Permission, PermissionParseError, PermissionSet};
pub use repo::app_repo::{
    AppListQuery, AppRepository, PermissionSource, RepoError, RepoResult, SqliteAppRepository,
};
pub use repo::token_repo::{AppTokenRepository, SqliteAppTokenRepository};
pub use service::app_service::AppService;
pub use service::permission_resolver::PermissionResolver;
pub use service::token_service::{
    SecureTokenGenerator, TokenGenerator, TokenIssuePolicy, TokenService,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
