//! App domain model.
//!
//! # Responsibility
//! - Define the persisted shape of a third-party integration.
//! - Own the instance-local permission cache used by permission checks.
//!
//! # Invariants
//! - `id` is stable and never reused for another app.
//! - `created_at` is assigned by storage and never rewritten.
//! - An inactive app has no effective permissions, whatever it was granted.
//! - The permission cache belongs to one in-memory instance and is never
//!   persisted or shared.

use crate::model::metadata::Metadata;
use crate::model::permission::{Permission, PermissionSet};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of an app.
pub type AppId = Uuid;

/// Maximum app name length, in characters.
pub const APP_NAME_MAX_CHARS: usize = 60;

/// Registered third-party integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    pub id: AppId,
    pub name: String,
    /// Unix epoch milliseconds, populated by storage on insert.
    pub created_at: i64,
    /// Gates every permission check.
    pub is_active: bool,
    pub metadata: Metadata,
    pub private_metadata: Metadata,
    #[serde(skip)]
    permission_cache: Option<PermissionSet>,
}

impl App {
    /// Builds an app from persisted column values, with an empty cache.
    pub fn from_parts(
        id: AppId,
        name: impl Into<String>,
        created_at: i64,
        is_active: bool,
        metadata: Metadata,
        private_metadata: Metadata,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            created_at,
            is_active,
            metadata,
            private_metadata,
            permission_cache: None,
        }
    }

    /// Validates fields before they reach storage.
    pub fn validate(&self) -> Result<(), AppValidationError> {
        validate_app_name(&self.name)
    }

    /// Permission set memoized by an earlier computation, if any.
    pub fn cached_permissions(&self) -> Option<&PermissionSet> {
        self.permission_cache.as_ref()
    }

    /// Returns the memoized set, running `load` first when nothing is cached.
    ///
    /// A failed load leaves the cache empty.
    pub(crate) fn permissions_or_try_load<E, F>(&mut self, load: F) -> Result<&PermissionSet, E>
    where
        F: FnOnce() -> Result<PermissionSet, E>,
    {
        let permissions = match self.permission_cache.take() {
            Some(cached) => cached,
            None => load()?,
        };
        Ok(self.permission_cache.insert(permissions))
    }

    /// Drops the memoized set so the next check reads the grant relation again.
    pub fn invalidate_permission_cache(&mut self) {
        self.permission_cache = None;
    }

    pub fn store_value_in_metadata<I, K, V>(&mut self, items: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.metadata.store_values(items);
    }

    pub fn get_value_from_metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get_value(key)
    }

    pub fn delete_value_from_metadata(&mut self, key: &str) -> Option<String> {
        self.metadata.delete_value(key)
    }

    pub fn clear_metadata(&mut self) {
        self.metadata.clear();
    }

    pub fn store_value_in_private_metadata<I, K, V>(&mut self, items: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.private_metadata.store_values(items);
    }

    pub fn get_value_from_private_metadata(&self, key: &str) -> Option<&str> {
        self.private_metadata.get_value(key)
    }

    pub fn delete_value_from_private_metadata(&mut self, key: &str) -> Option<String> {
        self.private_metadata.delete_value(key)
    }

    pub fn clear_private_metadata(&mut self) {
        self.private_metadata.clear();
    }
}

/// Request model for installing a new app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApp {
    pub name: String,
    pub is_active: bool,
    /// Initial grant set. Duplicates collapse.
    pub permissions: Vec<Permission>,
    pub metadata: Metadata,
    pub private_metadata: Metadata,
}

impl NewApp {
    /// Active app with no grants and empty metadata.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_active: true,
            permissions: Vec::new(),
            metadata: Metadata::new(),
            private_metadata: Metadata::new(),
        }
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions.extend(permissions);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn validate(&self) -> Result<(), AppValidationError> {
        validate_app_name(&self.name)
    }
}

/// Field-level validation failures for apps and tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppValidationError {
    EmptyAppName,
    AppNameTooLong { max_chars: usize, actual: usize },
    TokenNameTooLong { max_chars: usize, actual: usize },
    EmptyTokenSecret,
    TokenSecretTooLong { max_chars: usize, actual: usize },
}

impl Display for AppValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyAppName => write!(f, "app name must not be empty"),
            Self::AppNameTooLong { max_chars, actual } => {
                write!(f, "app name has {actual} chars; at most {max_chars} allowed")
            }
            Self::TokenNameTooLong { max_chars, actual } => {
                write!(f, "token name has {actual} chars; at most {max_chars} allowed")
            }
            Self::EmptyTokenSecret => write!(f, "token secret must not be empty"),
            Self::TokenSecretTooLong { max_chars, actual } => {
                write!(f, "token secret has {actual} chars; at most {max_chars} allowed")
            }
        }
    }
}

impl Error for AppValidationError {}

fn validate_app_name(name: &str) -> Result<(), AppValidationError> {
    if name.trim().is_empty() {
        return Err(AppValidationError::EmptyAppName);
    }
    let actual = name.chars().count();
    if actual > APP_NAME_MAX_CHARS {
        return Err(AppValidationError::AppNameTooLong {
            max_chars: APP_NAME_MAX_CHARS,
            actual,
        });
    }
    Ok(())
}
