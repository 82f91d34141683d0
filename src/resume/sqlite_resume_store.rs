use super::models::{DeleteOutcome, NewResume, NewResumeReview, Resume, ResumeReview, ResumeStatus};
use super::resume_store::ResumeStore;
use crate::clock::datetime_from_timestamp;
use crate::error::StorageResult;
use crate::sqlite_persistence::SqliteStore;
use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use tracing::debug;

const RESUME_COLUMNS: &str = "id, user_id, file_name, file_path, status, uploaded_at, updated_at";
const REVIEW_COLUMNS: &str = "id, resume_id, reviewer_id, comments, reviewed_at";

fn resume_from_row(row: &Row) -> rusqlite::Result<Resume> {
    let status: String = row.get(4)?;
    let status = ResumeStatus::from_str(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            format!("Unknown resume status {}", status).into(),
        )
    })?;
    Ok(Resume {
        id: row.get::<usize, i64>(0)? as usize,
        user_id: row.get::<usize, i64>(1)? as usize,
        file_name: row.get(2)?,
        file_path: row.get(3)?,
        status,
        uploaded_at: datetime_from_timestamp(row.get(5)?),
        updated_at: datetime_from_timestamp(row.get(6)?),
    })
}

fn review_from_row(row: &Row) -> rusqlite::Result<ResumeReview> {
    Ok(ResumeReview {
        id: row.get::<usize, i64>(0)? as usize,
        resume_id: row.get::<usize, i64>(1)? as usize,
        reviewer_id: row.get::<usize, i64>(2)? as usize,
        comments: row.get(3)?,
        reviewed_at: datetime_from_timestamp(row.get(4)?),
    })
}

fn fetch_resume(conn: &Connection, resume_id: usize) -> rusqlite::Result<Option<Resume>> {
    conn.query_row(
        &format!("SELECT {} FROM resumes WHERE id = ?1", RESUME_COLUMNS),
        params![resume_id],
        resume_from_row,
    )
    .optional()
}

impl ResumeStore for SqliteStore {
    fn insert_resume(&self, resume: &NewResume) -> StorageResult<Resume> {
        let conn = self.conn()?;
        let uploaded_at = resume.uploaded_at.timestamp();
        conn.execute(
            "INSERT INTO resumes (user_id, file_name, file_path, status, uploaded_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                resume.user_id,
                resume.file_name,
                resume.file_path,
                ResumeStatus::Pending.as_str(),
                uploaded_at,
            ],
        )?;
        let id = conn.last_insert_rowid() as usize;
        debug!("Inserted resume {} for user {}", id, resume.user_id);

        Ok(Resume {
            id,
            user_id: resume.user_id,
            file_name: resume.file_name.clone(),
            file_path: resume.file_path.clone(),
            status: ResumeStatus::Pending,
            uploaded_at: datetime_from_timestamp(uploaded_at),
            updated_at: datetime_from_timestamp(uploaded_at),
        })
    }

    fn get_resume(&self, resume_id: usize) -> StorageResult<Option<Resume>> {
        let conn = self.conn()?;
        Ok(fetch_resume(&conn, resume_id)?)
    }

    fn get_active_resume_for_user(&self, user_id: usize) -> StorageResult<Option<Resume>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {} FROM resumes WHERE user_id = ?1 AND status IN (?2, ?3)",
                    RESUME_COLUMNS
                ),
                params![
                    user_id,
                    ResumeStatus::Pending.as_str(),
                    ResumeStatus::InReview.as_str()
                ],
                resume_from_row,
            )
            .optional()?)
    }

    fn list_resumes_for_user(&self, user_id: usize) -> StorageResult<Vec<Resume>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM resumes WHERE user_id = ?1 ORDER BY uploaded_at DESC, id DESC",
            RESUME_COLUMNS
        ))?;
        let resumes = stmt
            .query_map(params![user_id], resume_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(resumes)
    }

    fn list_resumes_by_status(
        &self,
        status: ResumeStatus,
        offset: usize,
        limit: usize,
    ) -> StorageResult<Vec<Resume>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM resumes WHERE status = ?1 ORDER BY uploaded_at ASC, id ASC LIMIT ?2 OFFSET ?3",
            RESUME_COLUMNS
        ))?;
        let resumes = stmt
            .query_map(
                params![status.as_str(), limit as i64, offset as i64],
                resume_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(resumes)
    }

    fn count_resumes_by_status(&self, status: ResumeStatus) -> StorageResult<usize> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM resumes WHERE status = ?1",
            params![status.as_str()],
            |row| row.get::<usize, i64>(0),
        )?;
        Ok(count as usize)
    }

    fn set_resume_status(
        &self,
        resume_id: usize,
        status: ResumeStatus,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<Resume>> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE resumes SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), now.timestamp(), resume_id],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        Ok(fetch_resume(&conn, resume_id)?)
    }

    fn transition_resume_status(
        &self,
        resume_id: usize,
        from: ResumeStatus,
        to: ResumeStatus,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<Resume>> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE resumes SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
            params![to.as_str(), now.timestamp(), resume_id, from.as_str()],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        Ok(fetch_resume(&conn, resume_id)?)
    }

    fn complete_review(
        &self,
        review: &NewResumeReview,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<ResumeReview>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE resumes SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status IN (?4, ?5)",
            params![
                ResumeStatus::Reviewed.as_str(),
                now.timestamp(),
                review.resume_id,
                ResumeStatus::Pending.as_str(),
                ResumeStatus::InReview.as_str(),
            ],
        )?;
        if updated == 0 {
            // Dropping the transaction rolls it back
            return Ok(None);
        }

        tx.execute(
            "INSERT INTO resume_reviews (resume_id, reviewer_id, comments, reviewed_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                review.resume_id,
                review.reviewer_id,
                review.comments,
                now.timestamp()
            ],
        )?;
        let id = tx.last_insert_rowid() as usize;
        tx.commit()?;

        Ok(Some(ResumeReview {
            id,
            resume_id: review.resume_id,
            reviewer_id: review.reviewer_id,
            comments: review.comments.clone(),
            reviewed_at: datetime_from_timestamp(now.timestamp()),
        }))
    }

    fn delete_resume_unless(
        &self,
        resume_id: usize,
        blocked_status: ResumeStatus,
    ) -> StorageResult<DeleteOutcome> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let Some(resume) = fetch_resume(&tx, resume_id)? else {
            return Ok(DeleteOutcome::Missing);
        };
        if resume.status == blocked_status {
            return Ok(DeleteOutcome::Blocked(resume));
        }

        tx.execute("DELETE FROM resumes WHERE id = ?1", params![resume_id])?;
        tx.commit()?;
        Ok(DeleteOutcome::Deleted(resume))
    }

    fn get_reviews_for_resume(&self, resume_id: usize) -> StorageResult<Vec<ResumeReview>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM resume_reviews WHERE resume_id = ?1 ORDER BY reviewed_at ASC, id ASC",
            REVIEW_COLUMNS
        ))?;
        let reviews = stmt
            .query_map(params![resume_id], review_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reviews)
    }
}
