use super::auth::{CredentialHasher, PasswordCredentials};
use super::permissions::UserRole;
use super::user_models::{normalize_email, User};
use super::user_store::UserStore;
use crate::clock::datetime_from_timestamp;
use crate::error::{StorageError, StorageResult};
use crate::sqlite_persistence::SqliteStore;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use std::str::FromStr;
use tracing::debug;

const USER_COLUMNS: &str = "id, email, role, is_active, created";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    let role: String = row.get(2)?;
    Ok(User {
        id: row.get::<usize, i64>(0)? as usize,
        email: row.get(1)?,
        // Unknown roles never gain privileges
        role: UserRole::from_str(&role).unwrap_or(UserRole::Regular),
        is_active: row.get::<_, i64>(3)? != 0,
        created: datetime_from_timestamp(row.get(4)?),
    })
}

impl UserStore for SqliteStore {
    fn create_user(&self, email: &str, role: UserRole) -> StorageResult<usize> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO user (email, role) VALUES (?1, ?2)",
            params![normalize_email(email), role.as_str()],
        )?;
        let id = conn.last_insert_rowid() as usize;
        debug!("Created user {} with role {}", id, role.as_str());
        Ok(id)
    }

    fn get_user(&self, user_id: usize) -> StorageResult<Option<User>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM user WHERE id = ?1", USER_COLUMNS),
                params![user_id],
                user_from_row,
            )
            .optional()?)
    }

    fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM user WHERE email = ?1", USER_COLUMNS),
                params![normalize_email(email)],
                user_from_row,
            )
            .optional()?)
    }

    fn get_all_users(&self) -> StorageResult<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM user ORDER BY id", USER_COLUMNS))?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn set_user_role(&self, user_id: usize, role: UserRole) -> StorageResult<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE user SET role = ?1 WHERE id = ?2",
            params![role.as_str(), user_id],
        )?;
        Ok(updated > 0)
    }

    fn set_user_active(&self, user_id: usize, is_active: bool) -> StorageResult<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE user SET is_active = ?1 WHERE id = ?2",
            params![is_active as i64, user_id],
        )?;
        Ok(updated > 0)
    }

    fn get_password_credentials(&self, user_id: usize) -> StorageResult<Option<PasswordCredentials>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT salt, hash, hasher, created, last_tried, last_used FROM user_password_credentials WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                        row.get::<_, Option<i64>>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((salt, hash, hasher, created, last_tried, last_used)) = row else {
            return Ok(None);
        };
        let hasher = CredentialHasher::from_str(&hasher)
            .map_err(|err| StorageError::Fatal(err.to_string()))?;
        Ok(Some(PasswordCredentials {
            user_id,
            salt,
            hash,
            hasher,
            created: datetime_from_timestamp(created),
            last_tried: last_tried.map(datetime_from_timestamp),
            last_used: last_used.map(datetime_from_timestamp),
        }))
    }

    fn upsert_password_credentials(&self, credentials: &PasswordCredentials) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO user_password_credentials (user_id, salt, hash, hasher, created)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id) DO UPDATE SET
                salt = excluded.salt,
                hash = excluded.hash,
                hasher = excluded.hasher,
                created = excluded.created,
                last_tried = NULL,
                last_used = NULL",
            params![
                credentials.user_id,
                credentials.salt,
                credentials.hash,
                credentials.hasher.to_string(),
                credentials.created.timestamp(),
            ],
        )?;
        Ok(())
    }

    fn record_password_attempt(
        &self,
        user_id: usize,
        succeeded: bool,
        at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let conn = self.conn()?;
        let sql = if succeeded {
            "UPDATE user_password_credentials SET last_tried = ?1, last_used = ?1 WHERE user_id = ?2"
        } else {
            "UPDATE user_password_credentials SET last_tried = ?1 WHERE user_id = ?2"
        };
        conn.execute(sql, params![at.timestamp(), user_id])?;
        Ok(())
    }
}
