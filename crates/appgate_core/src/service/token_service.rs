//! App token use-case service.
//!
//! # Responsibility
//! - Issue new bearer secrets for apps and persist them.
//! - List, revoke and resolve tokens for callers outside core.
//!
//! # Invariants
//! - Secrets are drawn from the OS CSPRNG unless a generator is injected.
//! - A secret collision is never resolved by overwriting; issuance retries
//!   with a fresh secret and gives up with `DuplicateToken`.
//! - Secrets never appear in log events.

use crate::model::app::{App, AppId};
use crate::model::app_token::{AppToken, AppTokenId, TOKEN_SECRET_MAX_CHARS};
use crate::repo::app_repo::{RepoError, RepoResult};
use crate::repo::token_repo::AppTokenRepository;
use log::{info, warn};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use uuid::Uuid;

const DEFAULT_MAX_ISSUE_ATTEMPTS: u32 = 3;

/// Source of new token secrets.
pub trait TokenGenerator {
    fn generate(&self) -> String;
}

/// 30 alphanumeric characters from the operating system RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureTokenGenerator;

impl TokenGenerator for SecureTokenGenerator {
    fn generate(&self) -> String {
        OsRng
            .sample_iter(&Alphanumeric)
            .take(TOKEN_SECRET_MAX_CHARS)
            .map(char::from)
            .collect()
    }
}

/// Retry policy for token issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenIssuePolicy {
    /// Inserts attempted before `DuplicateToken` is returned. `0` behaves as `1`.
    pub max_attempts: u32,
}

impl Default for TokenIssuePolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ISSUE_ATTEMPTS,
        }
    }
}

/// Use-case service for app tokens.
pub struct TokenService<R: AppTokenRepository, G: TokenGenerator = SecureTokenGenerator> {
    repo: R,
    generator: G,
    policy: TokenIssuePolicy,
}

impl<R: AppTokenRepository> TokenService<R> {
    /// Creates a service with the secure generator and default policy.
    pub fn new(repo: R) -> Self {
        Self::with_generator(repo, SecureTokenGenerator, TokenIssuePolicy::default())
    }
}

impl<R: AppTokenRepository, G: TokenGenerator> TokenService<R, G> {
    pub fn with_generator(repo: R, generator: G, policy: TokenIssuePolicy) -> Self {
        Self {
            repo,
            generator,
            policy,
        }
    }

    /// Issues and stores a new token for `app_id`.
    ///
    /// # Errors
    /// - `AppNotFound` when the app does not exist.
    /// - `DuplicateToken` when every attempt collided with an existing secret.
    /// - `Validation` when `name` is too long.
    pub fn issue_token(&self, app_id: AppId, name: &str) -> RepoResult<AppToken> {
        let attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=attempts {
            let token = AppToken {
                id: Uuid::new_v4(),
                app_id,
                name: name.to_string(),
                auth_token: self.generator.generate(),
            };

            match self.repo.create_token(&token) {
                Ok(_) => {
                    info!(
                        "event=app_token_issue module=service status=ok app_id={app_id} token_id={} attempt={attempt}",
                        token.id
                    );
                    return Ok(token);
                }
                Err(RepoError::DuplicateToken) => {
                    warn!(
                        "event=app_token_issue module=service status=collision app_id={app_id} attempt={attempt} max_attempts={attempts}"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Err(RepoError::DuplicateToken)
    }

    pub fn get_token(&self, id: AppTokenId) -> RepoResult<Option<AppToken>> {
        self.repo.get_token(id)
    }

    pub fn list_tokens(&self, app_id: AppId) -> RepoResult<Vec<AppToken>> {
        self.repo.list_tokens(app_id)
    }

    /// Deletes one token. Returns `TokenNotFound` when it does not exist.
    pub fn revoke_token(&self, id: AppTokenId) -> RepoResult<()> {
        self.repo.delete_token(id)?;
        info!("event=app_token_revoke module=service status=ok token_id={id}");
        Ok(())
    }

    /// Resolves a bearer secret to its app; `None` for unknown secrets or
    /// inactive apps.
    pub fn find_active_app_by_token(&self, secret: &str) -> RepoResult<Option<App>> {
        if secret.is_empty() {
            return Ok(None);
        }
        self.repo.find_active_app_by_secret(secret)
    }
}
