use chrono::{DateTime, Utc};
use quiz_core::model::{SelectedAnswer, SessionRecord};

use super::{
    SqliteRepository,
    mapping::{answers_to_json, map_session_row},
};
use crate::repository::{SessionRepository, SessionRow, StorageError};

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn create_session(
        &self,
        total_questions: u32,
        started_at: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        let open = SessionRecord::open(total_questions, started_at);
        let answers = answers_to_json(open.answers())?;

        let res = sqlx::query(
            r"
            INSERT INTO quiz_sessions (started_at, ended_at, score, total_questions, is_completed, answers)
            VALUES (?1, NULL, 0, ?2, 0, ?3)
            ",
        )
        .bind(started_at)
        .bind(i64::from(total_questions))
        .bind(answers)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn complete_session(
        &self,
        id: i64,
        ended_at: DateTime<Utc>,
        score: u32,
        answers: &[Option<SelectedAnswer>],
    ) -> Result<(), StorageError> {
        let answers = answers_to_json(answers)?;

        let res = sqlx::query(
            r"
            UPDATE quiz_sessions
            SET ended_at = ?2, score = ?3, is_completed = 1, answers = ?4
            WHERE id = ?1
            ",
        )
        .bind(id)
        .bind(ended_at)
        .bind(i64::from(score))
        .bind(answers)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_session(&self, id: i64) -> Result<SessionRecord, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, started_at, ended_at, score, total_questions, is_completed, answers
            FROM quiz_sessions
            WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        Ok(map_session_row(&row)?.record)
    }

    async fn list_sessions(&self, limit: u32) -> Result<Vec<SessionRow>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, started_at, ended_at, score, total_questions, is_completed, answers
            FROM quiz_sessions
            ORDER BY started_at DESC, id DESC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_session_row(&row)?);
        }
        Ok(out)
    }
}
