use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::SelectedAnswer;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionRecordError {
    #[error("ended_at is before started_at")]
    InvalidTimeRange,

    #[error("score ({score}) exceeds total questions ({total})")]
    ScoreOutOfRange { score: u32, total: u32 },

    #[error("answer slots ({len}) do not match total questions ({total})")]
    AnswerCountMismatch { len: usize, total: u32 },

    #[error("completed session is missing an end time")]
    MissingEndTime,
}

/// Persisted record of one quiz attempt's timing and outcome.
///
/// The Session Recorder owns these; quiz logic never reads them back. A
/// record is created open when the attempt starts and completed once with
/// the final score and answer set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    total_questions: u32,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    score: u32,
    answers: Vec<Option<SelectedAnswer>>,
    is_completed: bool,
}

impl SessionRecord {
    /// Creates an open record for an attempt that just started.
    #[must_use]
    pub fn open(total_questions: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            total_questions,
            started_at,
            ended_at: None,
            score: 0,
            answers: vec![None; total_questions as usize],
            is_completed: false,
        }
    }

    /// Rehydrate a session record from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionRecordError` if the time range is inverted, the score
    /// exceeds the question count, the answer slots do not line up, or a
    /// completed record lacks an end time.
    pub fn from_persisted(
        total_questions: u32,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
        score: u32,
        answers: Vec<Option<SelectedAnswer>>,
        is_completed: bool,
    ) -> Result<Self, SessionRecordError> {
        if let Some(ended) = ended_at {
            if ended < started_at {
                return Err(SessionRecordError::InvalidTimeRange);
            }
        }
        if score > total_questions {
            return Err(SessionRecordError::ScoreOutOfRange {
                score,
                total: total_questions,
            });
        }
        if answers.len() != total_questions as usize {
            return Err(SessionRecordError::AnswerCountMismatch {
                len: answers.len(),
                total: total_questions,
            });
        }
        if is_completed && ended_at.is_none() {
            return Err(SessionRecordError::MissingEndTime);
        }

        Ok(Self {
            total_questions,
            started_at,
            ended_at,
            score,
            answers,
            is_completed,
        })
    }

    /// Marks the record completed with the final outcome.
    ///
    /// # Errors
    ///
    /// Returns `SessionRecordError` under the same validation as
    /// `from_persisted`.
    pub fn complete(
        &mut self,
        ended_at: DateTime<Utc>,
        score: u32,
        answers: Vec<Option<SelectedAnswer>>,
    ) -> Result<(), SessionRecordError> {
        let completed = Self::from_persisted(
            self.total_questions,
            self.started_at,
            Some(ended_at),
            score,
            answers,
            true,
        )?;
        *self = completed;
        Ok(())
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<SelectedAnswer>] {
        &self.answers
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn open_record_has_empty_slots() {
        let record = SessionRecord::open(3, fixed_now());
        assert_eq!(record.total_questions(), 3);
        assert_eq!(record.answers().len(), 3);
        assert!(record.answers().iter().all(Option::is_none));
        assert!(!record.is_completed());
        assert_eq!(record.ended_at(), None);
    }

    #[test]
    fn complete_fills_outcome() {
        let now = fixed_now();
        let mut record = SessionRecord::open(2, now);
        record
            .complete(
                now + Duration::minutes(1),
                1,
                vec![Some(SelectedAnswer::Single(0)), None],
            )
            .unwrap();

        assert!(record.is_completed());
        assert_eq!(record.score(), 1);
        assert_eq!(record.ended_at(), Some(now + Duration::minutes(1)));
    }

    #[test]
    fn inverted_time_range_is_rejected() {
        let now = fixed_now();
        let err = SessionRecord::from_persisted(
            1,
            now,
            Some(now - Duration::seconds(1)),
            0,
            vec![None],
            false,
        )
        .unwrap_err();
        assert_eq!(err, SessionRecordError::InvalidTimeRange);
    }

    #[test]
    fn score_above_total_is_rejected() {
        let now = fixed_now();
        let err = SessionRecord::from_persisted(2, now, Some(now), 3, vec![None, None], true)
            .unwrap_err();
        assert_eq!(err, SessionRecordError::ScoreOutOfRange { score: 3, total: 2 });
    }

    #[test]
    fn answer_slot_mismatch_is_rejected() {
        let now = fixed_now();
        let err =
            SessionRecord::from_persisted(2, now, None, 0, vec![None], false).unwrap_err();
        assert_eq!(err, SessionRecordError::AnswerCountMismatch { len: 1, total: 2 });
    }

    #[test]
    fn completed_without_end_time_is_rejected() {
        let now = fixed_now();
        let err =
            SessionRecord::from_persisted(1, now, None, 0, vec![None], true).unwrap_err();
        assert_eq!(err, SessionRecordError::MissingEndTime);
    }
}
