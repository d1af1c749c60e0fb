//! App token repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist, look up and revoke bearer tokens owned by apps.
//!
//! # Invariants
//! - Secret uniqueness is enforced by the `app_tokens.auth_token` unique
//!   index, never by a read-then-write check.
//! - Tokens cannot outlive their app (`ON DELETE CASCADE`).

use crate::model::app::{App, AppId};
use crate::model::app_token::{AppToken, AppTokenId};
use crate::repo::app_repo::{
    ensure_connection_ready, parse_app_row, RepoError, RepoResult, APP_SELECT_SQL,
};
use rusqlite::ffi;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const TOKEN_SELECT_SQL: &str = "SELECT
    uuid,
    app_uuid,
    name,
    auth_token
FROM app_tokens";

/// Repository interface for app token operations.
pub trait AppTokenRepository {
    /// Inserts a token. Fails with `DuplicateToken` when the secret is taken.
    fn create_token(&self, token: &AppToken) -> RepoResult<AppTokenId>;
    fn get_token(&self, id: AppTokenId) -> RepoResult<Option<AppToken>>;
    /// Lists tokens of one app ordered by `name ASC, uuid ASC`.
    fn list_tokens(&self, app_id: AppId) -> RepoResult<Vec<AppToken>>;
    fn delete_token(&self, id: AppTokenId) -> RepoResult<()>;
    /// Resolves a secret to its owning app, if that app is active.
    fn find_active_app_by_secret(&self, secret: &str) -> RepoResult<Option<App>>;
}

/// SQLite-backed app token repository.
pub struct SqliteAppTokenRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAppTokenRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AppTokenRepository for SqliteAppTokenRepository<'_> {
    fn create_token(&self, token: &AppToken) -> RepoResult<AppTokenId> {
        token.validate()?;

        let inserted = self.conn.execute(
            "INSERT INTO app_tokens (
                uuid,
                app_uuid,
                name,
                auth_token
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                token.id.to_string(),
                token.app_id.to_string(),
                token.name.as_str(),
                token.auth_token.as_str(),
            ],
        );

        match inserted {
            Ok(_) => Ok(token.id),
            Err(err) => Err(classify_insert_error(err, token.app_id)),
        }
    }

    fn get_token(&self, id: AppTokenId) -> RepoResult<Option<AppToken>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TOKEN_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_token_row(row)?));
        }
        Ok(None)
    }

    fn list_tokens(&self, app_id: AppId) -> RepoResult<Vec<AppToken>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TOKEN_SELECT_SQL}
             WHERE app_uuid = ?1
             ORDER BY name ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([app_id.to_string()])?;
        let mut tokens = Vec::new();
        while let Some(row) = rows.next()? {
            tokens.push(parse_token_row(row)?);
        }
        Ok(tokens)
    }

    fn delete_token(&self, id: AppTokenId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM app_tokens WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::TokenNotFound(id));
        }

        Ok(())
    }

    fn find_active_app_by_secret(&self, secret: &str) -> RepoResult<Option<App>> {
        let mut stmt = self.conn.prepare(&format!(
            "{APP_SELECT_SQL}
             INNER JOIN app_tokens t ON t.app_uuid = apps.uuid
             WHERE t.auth_token = ?1
               AND apps.is_active = 1;"
        ))?;
        let mut rows = stmt.query([secret])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_app_row(row)?));
        }
        Ok(None)
    }
}

fn classify_insert_error(err: rusqlite::Error, app_id: AppId) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE => return RepoError::DuplicateToken,
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return RepoError::AppNotFound(app_id),
            _ => {}
        }
    }
    err.into()
}

fn parse_token_row(row: &Row<'_>) -> RepoResult<AppToken> {
    let id = parse_uuid_column(row, "uuid")?;
    let app_id = parse_uuid_column(row, "app_uuid")?;

    let token = AppToken {
        id,
        app_id,
        name: row.get("name")?,
        auth_token: row.get("auth_token")?,
    };
    token.validate()?;
    Ok(token)
}

fn parse_uuid_column(row: &Row<'_>, column: &str) -> RepoResult<Uuid> {
    let value: String = row.get(column)?;
    Uuid::parse_str(&value).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{value}` in app_tokens.{column}"
        ))
    })
}
