use quiz_core::model::Question;
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{id_i64, map_question_row, ser},
};
use crate::repository::{CategoryFilter, QuestionRepository, StorageError};

impl SqliteRepository {
    /// Register a category so it is "known" even with zero questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the insert fails.
    pub async fn register_category(&self, name: &str) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO quiz_categories (name) VALUES (?1) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    /// Insert or replace a question, registering its category.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if serialization or the insert fails.
    pub async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        self.register_category(question.category()).await?;

        let choices = serde_json::to_string(question.choices()).map_err(ser)?;
        let answer = serde_json::to_string(question.key()).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO quiz_questions (id, question, choices, answer, kind, category)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                question = excluded.question,
                choices = excluded.choices,
                answer = excluded.answer,
                kind = excluded.kind,
                category = excluded.category
            ",
        )
        .bind(id_i64("question_id", question.id().value())?)
        .bind(question.text())
        .bind(choices)
        .bind(answer)
        .bind(question.kind().as_str())
        .bind(question.category())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn category_exists(&self, name: &str) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM quiz_categories WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(row.is_some())
    }
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn list_categories(&self) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query("SELECT name FROM quiz_categories ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut names = Vec::with_capacity(rows.len());
        for row in rows {
            names.push(row.try_get::<String, _>("name").map_err(ser)?);
        }
        Ok(names)
    }

    async fn load_questions(
        &self,
        filter: &CategoryFilter,
    ) -> Result<Vec<Question>, StorageError> {
        let rows = match filter {
            CategoryFilter::All => {
                sqlx::query(
                    r"
                    SELECT id, question, choices, answer, kind, category
                    FROM quiz_questions
                    ORDER BY id ASC
                    ",
                )
                .fetch_all(&self.pool)
                .await
            }
            CategoryFilter::Named(name) => {
                if !self.category_exists(name).await? {
                    return Err(StorageError::NotFound);
                }
                sqlx::query(
                    r"
                    SELECT id, question, choices, answer, kind, category
                    FROM quiz_questions
                    WHERE category = ?1
                    ORDER BY id ASC
                    ",
                )
                .bind(name)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in rows {
            questions.push(map_question_row(&row)?);
        }
        Ok(questions)
    }
}
