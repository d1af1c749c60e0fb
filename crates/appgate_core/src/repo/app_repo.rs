//! App repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `apps` and the `app_permissions` grant relation.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths validate the model before SQL mutations.
//! - Grant replacement is atomic; readers never observe a half-written set.
//! - `created_at` is written only by the column default.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::app::{App, AppId, AppValidationError, NewApp};
use crate::model::app_token::AppTokenId;
use crate::model::metadata::Metadata;
use crate::model::permission::{Permission, PermissionSet};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub(crate) const APP_SELECT_SQL: &str = "SELECT
    apps.uuid AS uuid,
    apps.name AS name,
    apps.created_at AS created_at,
    apps.is_active AS is_active,
    apps.metadata AS metadata,
    apps.private_metadata AS private_metadata
FROM apps";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for app and token persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(AppValidationError),
    Db(DbError),
    AppNotFound(AppId),
    TokenNotFound(AppTokenId),
    /// The generated secret collides with an existing token. Retry with a new one.
    DuplicateToken,
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Metadata could not be encoded for storage.
    Encoding(serde_json::Error),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::AppNotFound(id) => write!(f, "app not found: {id}"),
            Self::TokenNotFound(id) => write!(f, "app token not found: {id}"),
            Self::DuplicateToken => write!(f, "app token secret already exists"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "app repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::Encoding(err) => write!(f, "failed to encode metadata: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted app data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Encoding(err) => Some(err),
            Self::AppNotFound(_)
            | Self::TokenNotFound(_)
            | Self::DuplicateToken
            | Self::UninitializedConnection { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<AppValidationError> for RepoError {
    fn from(value: AppValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Query options for listing apps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppListQuery {
    /// Restrict to active (`Some(true)`) or inactive (`Some(false)`) apps.
    pub is_active: Option<bool>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Read access to the grant relation, used by permission checks.
pub trait PermissionSource {
    /// Loads the permissions granted to `app_id`, ignoring its active flag.
    ///
    /// A missing app yields an empty set.
    fn load_app_permissions(&self, app_id: AppId) -> RepoResult<PermissionSet>;
}

/// Repository interface for app lifecycle operations.
pub trait AppRepository: PermissionSource {
    /// Inserts an app with its initial grants and returns the stored record.
    fn create_app(&self, request: &NewApp) -> RepoResult<App>;
    fn get_app(&self, id: AppId) -> RepoResult<Option<App>>;
    /// Lists apps ordered by `name ASC, uuid ASC`.
    fn list_apps(&self, query: &AppListQuery) -> RepoResult<Vec<App>>;
    /// Persists name, active flag and both metadata stores.
    fn update_app(&self, app: &App) -> RepoResult<()>;
    fn set_app_active(&self, id: AppId, is_active: bool) -> RepoResult<()>;
    /// Deletes the app; tokens and grants follow by cascade.
    fn delete_app(&self, id: AppId) -> RepoResult<()>;
    /// Replaces the whole grant set in one transaction.
    fn set_app_permissions(&self, id: AppId, permissions: &[Permission]) -> RepoResult<()>;
    fn add_app_permissions(&self, id: AppId, permissions: &[Permission]) -> RepoResult<()>;
    fn remove_app_permissions(&self, id: AppId, permissions: &[Permission]) -> RepoResult<()>;
}

/// SQLite-backed app repository.
pub struct SqliteAppRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAppRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PermissionSource for SqliteAppRepository<'_> {
    fn load_app_permissions(&self, app_id: AppId) -> RepoResult<PermissionSet> {
        let mut stmt = self.conn.prepare(
            "SELECT p.category, p.codename
             FROM app_permissions ap
             INNER JOIN permissions p ON p.id = ap.permission_id
             WHERE ap.app_uuid = ?1;",
        )?;

        let mut rows = stmt.query([app_id.to_string()])?;
        let mut permissions = PermissionSet::new();
        while let Some(row) = rows.next()? {
            let category: String = row.get(0)?;
            let codename: String = row.get(1)?;
            let perm = Permission::from_parts(&category, &codename).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "unknown permission `{category}.{codename}` granted to app {app_id}"
                ))
            })?;
            permissions.insert(perm);
        }

        Ok(permissions)
    }
}

impl AppRepository for SqliteAppRepository<'_> {
    fn create_app(&self, request: &NewApp) -> RepoResult<App> {
        request.validate()?;

        let id = Uuid::new_v4();
        let metadata = encode_metadata(&request.metadata)?;
        let private_metadata = encode_metadata(&request.private_metadata)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO apps (
                uuid,
                name,
                is_active,
                metadata,
                private_metadata
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                request.name.as_str(),
                bool_to_int(request.is_active),
                metadata,
                private_metadata,
            ],
        )?;
        insert_grants(&tx, id, &request.permissions)?;
        let app = load_app(&tx, id)?.ok_or(RepoError::AppNotFound(id))?;
        tx.commit()?;

        Ok(app)
    }

    fn get_app(&self, id: AppId) -> RepoResult<Option<App>> {
        load_app(self.conn, id)
    }

    fn list_apps(&self, query: &AppListQuery) -> RepoResult<Vec<App>> {
        let mut sql = format!("{APP_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(is_active) = query.is_active {
            sql.push_str(" AND is_active = ?");
            bind_values.push(Value::Integer(bool_to_int(is_active)));
        }

        sql.push_str(" ORDER BY name ASC, uuid ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut apps = Vec::new();
        while let Some(row) = rows.next()? {
            apps.push(parse_app_row(row)?);
        }

        Ok(apps)
    }

    fn update_app(&self, app: &App) -> RepoResult<()> {
        app.validate()?;

        let changed = self.conn.execute(
            "UPDATE apps
             SET
                name = ?1,
                is_active = ?2,
                metadata = ?3,
                private_metadata = ?4
             WHERE uuid = ?5;",
            params![
                app.name.as_str(),
                bool_to_int(app.is_active),
                encode_metadata(&app.metadata)?,
                encode_metadata(&app.private_metadata)?,
                app.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::AppNotFound(app.id));
        }

        Ok(())
    }

    fn set_app_active(&self, id: AppId, is_active: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE apps SET is_active = ?1 WHERE uuid = ?2;",
            params![bool_to_int(is_active), id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::AppNotFound(id));
        }

        Ok(())
    }

    fn delete_app(&self, id: AppId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM apps WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::AppNotFound(id));
        }

        Ok(())
    }

    fn set_app_permissions(&self, id: AppId, permissions: &[Permission]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_app_exists(&tx, id)?;

        tx.execute(
            "DELETE FROM app_permissions WHERE app_uuid = ?1;",
            [id.to_string()],
        )?;
        insert_grants(&tx, id, permissions)?;

        tx.commit()?;
        Ok(())
    }

    fn add_app_permissions(&self, id: AppId, permissions: &[Permission]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_app_exists(&tx, id)?;
        insert_grants(&tx, id, permissions)?;
        tx.commit()?;
        Ok(())
    }

    fn remove_app_permissions(&self, id: AppId, permissions: &[Permission]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_app_exists(&tx, id)?;

        let id_text = id.to_string();
        for perm in permissions {
            tx.execute(
                "DELETE FROM app_permissions
                 WHERE app_uuid = ?1
                   AND permission_id = (
                       SELECT id
                       FROM permissions
                       WHERE category = ?2 AND codename = ?3
                   );",
                params![id_text.as_str(), perm.category(), perm.codename()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

/// Parses one row selected with `APP_SELECT_SQL`.
pub(crate) fn parse_app_row(row: &Row<'_>) -> RepoResult<App> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in apps.uuid"))
    })?;

    let is_active = match row.get::<_, i64>("is_active")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_active value `{other}` in apps.is_active"
            )));
        }
    };

    let metadata = decode_metadata(&row.get::<_, String>("metadata")?, "apps.metadata")?;
    let private_metadata = decode_metadata(
        &row.get::<_, String>("private_metadata")?,
        "apps.private_metadata",
    )?;

    let app = App::from_parts(
        id,
        row.get::<_, String>("name")?,
        row.get("created_at")?,
        is_active,
        metadata,
        private_metadata,
    );
    app.validate()?;
    Ok(app)
}

fn load_app(conn: &Connection, id: AppId) -> RepoResult<Option<App>> {
    let mut stmt = conn.prepare(&format!("{APP_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_app_row(row)?));
    }
    Ok(None)
}

fn insert_grants(conn: &Connection, id: AppId, permissions: &[Permission]) -> RepoResult<()> {
    let id_text = id.to_string();
    for perm in permissions {
        let permission_id = registry_row_id(conn, *perm)?;
        conn.execute(
            "INSERT OR IGNORE INTO app_permissions (app_uuid, permission_id)
             VALUES (?1, ?2);",
            params![id_text.as_str(), permission_id],
        )?;
    }
    Ok(())
}

fn registry_row_id(conn: &Connection, perm: Permission) -> RepoResult<i64> {
    conn.query_row(
        "SELECT id FROM permissions WHERE category = ?1 AND codename = ?2;",
        params![perm.category(), perm.codename()],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| RepoError::InvalidData(format!("permission `{perm}` missing from registry")))
}

fn ensure_app_exists(conn: &Connection, id: AppId) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM apps WHERE uuid = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(RepoError::AppNotFound(id))
    }
}

fn encode_metadata(metadata: &Metadata) -> RepoResult<String> {
    serde_json::to_string(metadata).map_err(RepoError::Encoding)
}

fn decode_metadata(raw: &str, column: &str) -> RepoResult<Metadata> {
    serde_json::from_str(raw)
        .map_err(|err| RepoError::InvalidData(format!("invalid JSON in {column}: {err}")))
}

/// Fails unless `conn` carries the schema version this binary writes.
pub(crate) fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
