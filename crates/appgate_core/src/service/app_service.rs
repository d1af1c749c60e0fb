//! App use-case service.
//!
//! # Responsibility
//! - Provide lifecycle entry points (install, update, activate, delete).
//! - Mutate grants and keep the caller's in-memory cache consistent.
//! - Expose permission checks backed by the same repository.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Any grant write made through an `&mut App` clears that instance's cache.
//! - Service layer remains storage-agnostic.

use crate::model::app::{App, AppId, NewApp};
use crate::model::permission::{Permission, PermissionSet};
use crate::repo::app_repo::{AppListQuery, AppRepository, RepoResult};
use crate::service::permission_resolver::PermissionResolver;
use log::info;

/// Use-case service wrapper for app operations.
pub struct AppService<R: AppRepository> {
    repo: R,
}

impl<R: AppRepository> AppService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Installs a new app with its initial grants.
    pub fn create_app(&self, request: &NewApp) -> RepoResult<App> {
        let app = self.repo.create_app(request)?;
        info!(
            "event=app_create module=service status=ok app_id={} is_active={} grants={}",
            app.id,
            app.is_active,
            request.permissions.len()
        );
        Ok(app)
    }

    /// Loads a fresh instance; its permission cache starts empty.
    pub fn get_app(&self, id: AppId) -> RepoResult<Option<App>> {
        self.repo.get_app(id)
    }

    pub fn list_apps(&self, query: &AppListQuery) -> RepoResult<Vec<App>> {
        self.repo.list_apps(query)
    }

    /// Persists name, active flag and metadata of `app`.
    pub fn update_app(&self, app: &App) -> RepoResult<()> {
        self.repo.update_app(app)
    }

    pub fn activate(&self, app: &mut App) -> RepoResult<()> {
        self.set_active(app, true)
    }

    /// Soft-disables the app; every permission check on it then fails.
    pub fn deactivate(&self, app: &mut App) -> RepoResult<()> {
        self.set_active(app, false)
    }

    /// Hard-deletes the app together with its tokens and grants.
    pub fn delete_app(&self, id: AppId) -> RepoResult<()> {
        self.repo.delete_app(id)?;
        info!("event=app_delete module=service status=ok app_id={id}");
        Ok(())
    }

    /// Replaces the grant set of `app`.
    pub fn set_permissions(&self, app: &mut App, permissions: &[Permission]) -> RepoResult<()> {
        self.repo.set_app_permissions(app.id, permissions)?;
        app.invalidate_permission_cache();
        info!(
            "event=app_permissions_set module=service status=ok app_id={} grants={}",
            app.id,
            permissions.len()
        );
        Ok(())
    }

    pub fn add_permissions(&self, app: &mut App, permissions: &[Permission]) -> RepoResult<()> {
        self.repo.add_app_permissions(app.id, permissions)?;
        app.invalidate_permission_cache();
        Ok(())
    }

    pub fn remove_permissions(&self, app: &mut App, permissions: &[Permission]) -> RepoResult<()> {
        self.repo.remove_app_permissions(app.id, permissions)?;
        app.invalidate_permission_cache();
        Ok(())
    }

    /// See [`PermissionResolver::effective_permissions`].
    pub fn effective_permissions<'a>(&self, app: &'a mut App) -> RepoResult<&'a PermissionSet> {
        self.resolver().effective_permissions(app)
    }

    pub fn has_perm(&self, app: &mut App, permission: Permission) -> RepoResult<bool> {
        self.resolver().has_perm(app, permission)
    }

    pub fn has_perms(&self, app: &mut App, permissions: &[Permission]) -> RepoResult<bool> {
        self.resolver().has_perms(app, permissions)
    }

    fn resolver(&self) -> PermissionResolver<'_, R> {
        PermissionResolver::new(&self.repo)
    }

    fn set_active(&self, app: &mut App, is_active: bool) -> RepoResult<()> {
        self.repo.set_app_active(app.id, is_active)?;
        app.is_active = is_active;
        info!(
            "event=app_set_active module=service status=ok app_id={} is_active={is_active}",
            app.id
        );
        Ok(())
    }
}
