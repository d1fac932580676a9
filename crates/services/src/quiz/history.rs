use chrono::{DateTime, Utc};
use std::sync::Arc;

use quiz_core::model::SessionRecord;
use quiz_core::quiz::percentage;
use storage::repository::{SessionRepository, SessionRow};

use crate::error::QuizServiceError;

/// Storage identifier for a persisted session.
///
/// NOTE: This is currently `i64` to match `SQLite` row IDs.
pub type SessionId = i64;

/// Presentation-agnostic list item for a persisted session.
///
/// No pre-formatted strings and no localization assumptions; the UI may
/// format timestamps as needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionListItem {
    pub id: SessionId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,

    pub score: u32,
    pub total: u32,
    pub percent: u8,
    pub is_completed: bool,
}

impl SessionListItem {
    #[must_use]
    pub fn from_row(row: &SessionRow) -> Self {
        let record = &row.record;
        Self {
            id: row.id,
            started_at: record.started_at(),
            ended_at: record.ended_at(),
            score: record.score(),
            total: record.total_questions(),
            percent: percentage(record.score() as usize, record.total_questions() as usize),
            is_completed: record.is_completed(),
        }
    }
}

/// Read side of the Session Recorder: past attempts for a history screen.
#[derive(Clone)]
pub struct SessionHistoryService {
    sessions: Arc<dyn SessionRepository>,
}

impl SessionHistoryService {
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }

    /// List persisted sessions, most recently started first.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` on repository failures.
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<SessionListItem>, QuizServiceError> {
        let rows = self.sessions.list_sessions(limit).await?;
        Ok(rows.iter().map(SessionListItem::from_row).collect())
    }

    /// Fetch one persisted session by ID.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if the session is missing or
    /// storage fails.
    pub async fn get(&self, id: SessionId) -> Result<SessionRecord, QuizServiceError> {
        Ok(self.sessions.get_session(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::SelectedAnswer;
    use quiz_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, StorageError};

    #[test]
    fn list_item_derives_the_percentage() {
        let now = fixed_now();
        let mut record = SessionRecord::open(3, now);
        record
            .complete(
                now + Duration::minutes(1),
                2,
                vec![
                    Some(SelectedAnswer::Single(0)),
                    Some(SelectedAnswer::Single(1)),
                    Some(SelectedAnswer::Single(1)),
                ],
            )
            .unwrap();

        let item = SessionListItem::from_row(&SessionRow::new(7, record));
        assert_eq!(item.id, 7);
        assert_eq!(item.score, 2);
        assert_eq!(item.total, 3);
        assert_eq!(item.percent, 67);
        assert!(item.is_completed);
    }

    #[tokio::test]
    async fn list_recent_orders_and_limits() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();

        let older = repo.create_session(1, now).await.unwrap();
        let newer = repo
            .create_session(1, now + Duration::minutes(10))
            .await
            .unwrap();

        let svc = SessionHistoryService::new(Arc::new(repo));
        let items = svc.list_recent(10).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, newer);
        assert_eq!(items[1].id, older);

        let limited = svc.list_recent(1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, newer);
    }

    #[tokio::test]
    async fn get_surfaces_missing_sessions() {
        let svc = SessionHistoryService::new(Arc::new(InMemoryRepository::new()));
        let err = svc.get(42).await.unwrap_err();
        assert!(matches!(
            err,
            QuizServiceError::Storage(StorageError::NotFound)
        ));
    }
}
