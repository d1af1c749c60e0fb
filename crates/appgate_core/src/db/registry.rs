//! Permission registry synchronization.
//!
//! # Responsibility
//! - Mirror every compiled `Permission` variant into the `permissions` table.
//!
//! # Invariants
//! - Sync is additive (`INSERT OR IGNORE`) and safe to repeat on every open.
//! - Existing row ids never change, so grant rows stay valid across syncs.

use super::DbResult;
use crate::model::permission::Permission;
use rusqlite::{params, Connection};

/// Inserts registry rows for any permission variants missing from storage.
///
/// Returns the number of rows inserted.
pub fn sync_permission_registry(conn: &Connection) -> DbResult<usize> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO permissions (category, codename, name)
         VALUES (?1, ?2, ?3);",
    )?;

    let mut inserted = 0;
    for perm in Permission::ALL {
        inserted += stmt.execute(params![perm.category(), perm.codename(), perm.description()])?;
    }
    Ok(inserted)
}

/// Counts rows currently present in the permission registry.
pub fn registered_permission_count(conn: &Connection) -> DbResult<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM permissions;", [], |row| row.get(0))?;
    Ok(usize::try_from(count).unwrap_or_default())
}
