use super::schema::VERSIONED_SCHEMAS;
use super::versioned_schema::BASE_DB_VERSION;
use crate::error::{StorageError, StorageResult};
use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// The relational store backing users, sessions and resumes.
///
/// A single connection guarded by a mutex; every store trait of the crate is
/// implemented on this type in the corresponding domain module.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let is_new = !db_path.as_ref().exists();
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database {:?}", db_path.as_ref()))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // Needed on every connection for the cascading deletes
        conn.pragma_update(None, "foreign_keys", true)?;

        if is_new {
            VERSIONED_SCHEMAS
                .last()
                .context("No schema defined")?
                .create(&conn)?;
        }

        // Read the database version
        let db_version = conn
            .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
            .context("Failed to read database version")?
            - BASE_DB_VERSION as i64;

        if db_version < 0 {
            bail!(
                "Database version {} is too old, does not contain base db version {}",
                db_version,
                BASE_DB_VERSION
            );
        }
        let version = db_version as usize;

        if version >= VERSIONED_SCHEMAS.len() {
            bail!("Database version {} is too new", version);
        }
        VERSIONED_SCHEMAS[version].validate(&conn)?;

        Self::migrate_if_needed(&conn, version)?;

        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate_if_needed(conn: &Connection, version: usize) -> Result<()> {
        let mut latest_from = version;
        for schema in VERSIONED_SCHEMAS.iter().skip(version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!(
                    "Migrating db from version {} to {}",
                    latest_from, schema.version
                );
                migration_fn(conn)?;
            }
            latest_from = schema.version;
        }
        conn.pragma_update(None, "user_version", (BASE_DB_VERSION + latest_from) as i64)?;

        Ok(())
    }

    pub(crate) fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Fatal("database connection mutex poisoned".to_string()))
    }
}
