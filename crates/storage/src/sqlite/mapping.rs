use quiz_core::model::{
    AnswerKey, Question, QuestionId, SelectedAnswer, SessionRecord,
};
use sqlx::Row;

use crate::repository::{SessionRow, StorageError, parse_kind};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    let raw = u64::try_from(v)
        .map_err(|_| StorageError::Serialization(format!("invalid question id: {v}")))?;
    Ok(QuestionId::new(raw))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

/// Encode the answer slots as the JSON array stored in the `answers` column
/// (`null` for unanswered positions, an index or index array otherwise).
pub(crate) fn answers_to_json(answers: &[Option<SelectedAnswer>]) -> Result<String, StorageError> {
    serde_json::to_string(answers).map_err(ser)
}

pub(crate) fn answers_from_json(raw: &str) -> Result<Vec<Option<SelectedAnswer>>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id = question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let text: String = row.try_get("question").map_err(ser)?;
    let choices: Vec<String> =
        serde_json::from_str(row.try_get::<String, _>("choices").map_err(ser)?.as_str())
            .map_err(ser)?;
    let key: AnswerKey =
        serde_json::from_str(row.try_get::<String, _>("answer").map_err(ser)?.as_str())
            .map_err(ser)?;
    let kind = parse_kind(row.try_get::<String, _>("kind").map_err(ser)?.as_str())?;
    let category: String = row.try_get("category").map_err(ser)?;

    Question::new(id, text, choices, key, kind, category).map_err(ser)
}

pub(crate) fn map_session_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let total_questions = u32_from_i64(
        "total_questions",
        row.try_get::<i64, _>("total_questions").map_err(ser)?,
    )?;
    let score = u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?;
    let started_at = row.try_get("started_at").map_err(ser)?;
    let ended_at = row.try_get("ended_at").map_err(ser)?;
    let is_completed: bool = row.try_get("is_completed").map_err(ser)?;
    let answers =
        answers_from_json(row.try_get::<String, _>("answers").map_err(ser)?.as_str())?;

    let record = SessionRecord::from_persisted(
        total_questions,
        started_at,
        ended_at,
        score,
        answers,
        is_completed,
    )
    .map_err(ser)?;

    Ok(SessionRow::new(id, record))
}
