//! Effective-permission computation and membership checks.
//!
//! # Responsibility
//! - Compute the permission set an app may currently exercise.
//! - Answer `has_perm` / `has_perms` queries against that set.
//!
//! # Invariants
//! - Inactive apps short-circuit to "no permissions" before any storage read,
//!   and never populate the cache.
//! - The grant relation is read at most once per `App` instance until its
//!   cache is invalidated.
//! - Denial is a `false` answer, never an error. Errors only report storage
//!   failures.

use crate::model::app::App;
use crate::model::permission::{Permission, PermissionSet};
use crate::repo::app_repo::{PermissionSource, RepoResult};
use log::debug;

static NO_PERMISSIONS: PermissionSet = PermissionSet::new();

/// Permission checks backed by a grant source.
pub struct PermissionResolver<'s, S: PermissionSource + ?Sized> {
    source: &'s S,
}

impl<'s, S: PermissionSource + ?Sized> PermissionResolver<'s, S> {
    pub fn new(source: &'s S) -> Self {
        Self { source }
    }

    /// Returns the permissions `app` holds right now.
    ///
    /// Empty for inactive apps. Otherwise loaded lazily on first call and
    /// memoized on the instance.
    pub fn effective_permissions<'a>(&self, app: &'a mut App) -> RepoResult<&'a PermissionSet> {
        if !app.is_active {
            return Ok(&NO_PERMISSIONS);
        }

        let app_id = app.id;
        let source = self.source;
        app.permissions_or_try_load(|| -> RepoResult<PermissionSet> {
            let loaded = source.load_app_permissions(app_id)?;
            debug!(
                "event=app_permissions_load module=service status=ok app_id={app_id} count={}",
                loaded.len()
            );
            Ok(loaded)
        })
    }

    /// Whether `app` may exercise `permission`.
    pub fn has_perm(&self, app: &mut App, permission: Permission) -> RepoResult<bool> {
        if !app.is_active {
            return Ok(false);
        }

        Ok(self.effective_permissions(app)?.contains(&permission))
    }

    /// Whether `app` holds every permission in `permissions`.
    ///
    /// An empty list is satisfied by any active app and by no inactive one.
    pub fn has_perms(&self, app: &mut App, permissions: &[Permission]) -> RepoResult<bool> {
        if !app.is_active {
            return Ok(false);
        }

        let actual = self.effective_permissions(app)?;
        Ok(permissions.iter().all(|perm| actual.contains(perm)))
    }
}
