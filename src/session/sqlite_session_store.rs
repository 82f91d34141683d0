use super::device::DeviceClass;
use super::session_store::{NewSession, Session, SessionStore, SessionToken};
use crate::clock::datetime_from_timestamp;
use crate::error::StorageResult;
use crate::sqlite_persistence::SqliteStore;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

const SESSION_COLUMNS: &str = "id, user_id, token, created_at, expires_at, device_class";

fn session_from_row(row: &Row) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get::<usize, i64>(0)? as usize,
        user_id: row.get::<usize, i64>(1)? as usize,
        token: SessionToken(row.get(2)?),
        created_at: datetime_from_timestamp(row.get(3)?),
        expires_at: datetime_from_timestamp(row.get(4)?),
        device_class: DeviceClass::from_str(&row.get::<usize, String>(5)?),
    })
}

impl SessionStore for SqliteStore {
    fn insert_session(&self, session: &NewSession) -> StorageResult<Session> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (user_id, token, created_at, expires_at, device_class) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.user_id,
                session.token.as_str(),
                session.created_at.timestamp(),
                session.expires_at.timestamp(),
                session.device_class.as_str(),
            ],
        )?;
        let id = conn.last_insert_rowid() as usize;
        debug!("Inserted session {} for user {}", id, session.user_id);

        // Timestamps go through the same second resolution as a reload would.
        Ok(Session {
            id,
            user_id: session.user_id,
            token: session.token.clone(),
            created_at: datetime_from_timestamp(session.created_at.timestamp()),
            expires_at: datetime_from_timestamp(session.expires_at.timestamp()),
            device_class: session.device_class,
        })
    }

    fn get_session_by_token(&self, token: &SessionToken) -> StorageResult<Option<Session>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM sessions WHERE token = ?1", SESSION_COLUMNS),
                params![token.as_str()],
                session_from_row,
            )
            .optional()?)
    }

    fn delete_session_by_token(&self, token: &SessionToken) -> StorageResult<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM sessions WHERE token = ?1", params![token.as_str()])?;
        Ok(deleted > 0)
    }

    fn delete_sessions_for_user(&self, user_id: usize) -> StorageResult<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?)
    }

    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StorageResult<usize> {
        let conn = self.conn()?;
        Ok(conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            params![now.timestamp()],
        )?)
    }

    fn list_sessions_for_user(&self, user_id: usize) -> StorageResult<Vec<Session>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sessions WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
            SESSION_COLUMNS
        ))?;
        let sessions = stmt
            .query_map(params![user_id], session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::user::{UserRole, UserStore};
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn create_tmp_store() -> (SqliteStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let temp_file_path = temp_dir.path().join("test.db");
        let store = SqliteStore::new(&temp_file_path).unwrap();
        (store, temp_dir)
    }

    fn new_session(user_id: usize, created_at: DateTime<Utc>, ttl: Duration) -> NewSession {
        NewSession {
            user_id,
            token: SessionToken::generate(),
            created_at,
            expires_at: created_at + ttl,
            device_class: DeviceClass::Mobile,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_sub_second_expiry_is_truncated() {
        let (store, _temp_dir) = create_tmp_store();
        let user_id = store.create_user("a@x.com", UserRole::Regular).unwrap();
        let created_at = t0() + Duration::milliseconds(900);

        let inserted = store
            .insert_session(&new_session(user_id, created_at, Duration::days(7)))
            .unwrap();
        assert_eq!(inserted.expires_at, t0() + Duration::days(7));
        assert!(inserted.expires_at < created_at + Duration::days(7));
        assert!(inserted.is_expired_at(created_at + Duration::days(7)));

        let loaded = store.get_session_by_token(&inserted.token).unwrap().unwrap();
        assert_eq!(loaded.expires_at, inserted.expires_at);
    }

    #[test]
    fn test_insert_and_get_session() {
        let (store, _temp_dir) = create_tmp_store();
        let user_id = store.create_user("a@x.com", UserRole::Regular).unwrap();

        let inserted = store
            .insert_session(&new_session(user_id, t0(), Duration::days(7)))
            .unwrap();
        let loaded = store.get_session_by_token(&inserted.token).unwrap().unwrap();
        assert_eq!(loaded, inserted);
        assert_eq!(loaded.expires_at, t0() + Duration::days(7));
        assert_eq!(loaded.device_class, DeviceClass::Mobile);

        let missing = SessionToken("nope".to_string());
        assert!(store.get_session_by_token(&missing).unwrap().is_none());
    }

    #[test]
    fn test_session_requires_existing_user() {
        let (store, _temp_dir) = create_tmp_store();
        let result = store.insert_session(&new_session(99, t0(), Duration::days(1)));
        assert!(matches!(result, Err(StorageError::Integrity(_))));
    }

    #[test]
    fn test_duplicate_token_is_integrity_error() {
        let (store, _temp_dir) = create_tmp_store();
        let user_id = store.create_user("a@x.com", UserRole::Regular).unwrap();
        let session = new_session(user_id, t0(), Duration::days(1));

        store.insert_session(&session).unwrap();
        let result = store.insert_session(&session);
        assert!(matches!(result, Err(StorageError::Integrity(_))));
    }

    #[test]
    fn test_delete_by_token_is_idempotent() {
        let (store, _temp_dir) = create_tmp_store();
        let user_id = store.create_user("a@x.com", UserRole::Regular).unwrap();
        let session = store
            .insert_session(&new_session(user_id, t0(), Duration::days(1)))
            .unwrap();

        assert!(store.delete_session_by_token(&session.token).unwrap());
        assert!(!store.delete_session_by_token(&session.token).unwrap());
    }

    #[test]
    fn test_delete_sessions_for_user() {
        let (store, _temp_dir) = create_tmp_store();
        let alice = store.create_user("alice@x.com", UserRole::Regular).unwrap();
        let bob = store.create_user("bob@x.com", UserRole::Regular).unwrap();
        store.insert_session(&new_session(alice, t0(), Duration::days(1))).unwrap();
        store.insert_session(&new_session(alice, t0(), Duration::days(2))).unwrap();
        store.insert_session(&new_session(bob, t0(), Duration::days(1))).unwrap();

        assert_eq!(store.delete_sessions_for_user(alice).unwrap(), 2);
        assert!(store.list_sessions_for_user(alice).unwrap().is_empty());
        assert_eq!(store.list_sessions_for_user(bob).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_expired_sessions_uses_inclusive_boundary() {
        let (store, _temp_dir) = create_tmp_store();
        let user_id = store.create_user("a@x.com", UserRole::Regular).unwrap();
        store.insert_session(&new_session(user_id, t0(), Duration::hours(1))).unwrap();
        store.insert_session(&new_session(user_id, t0(), Duration::hours(2))).unwrap();
        let survivor = store
            .insert_session(&new_session(user_id, t0(), Duration::hours(3)))
            .unwrap();

        assert_eq!(store.delete_expired_sessions(t0() + Duration::hours(2)).unwrap(), 2);
        let remaining = store.list_sessions_for_user(user_id).unwrap();
        assert_eq!(remaining, vec![survivor]);
        assert_eq!(store.delete_expired_sessions(t0() + Duration::hours(2)).unwrap(), 0);
    }

    #[test]
    fn test_sessions_removed_with_user() {
        let (store, _temp_dir) = create_tmp_store();
        let user_id = store.create_user("a@x.com", UserRole::Regular).unwrap();
        let session = store
            .insert_session(&new_session(user_id, t0(), Duration::days(1)))
            .unwrap();

        store.conn().unwrap().execute("DELETE FROM user WHERE id = ?1", params![user_id]).unwrap();
        assert!(store.get_session_by_token(&session.token).unwrap().is_none());
    }
}
