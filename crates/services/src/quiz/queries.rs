use quiz_core::model::Question;
use storage::repository::{CategoryFilter, QuestionRepository, StorageError};

use crate::error::QuizServiceError;

/// Storage-backed question loading with the error mapping the quiz flow
/// relies on: an unknown category is its own outcome, everything else the
/// backend reports becomes "source unavailable" (retryable via `start`).
pub(crate) struct QuizQueries;

impl QuizQueries {
    /// Load the question list for a filter.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::CategoryNotFound` for an unknown named
    /// category, `QuizServiceError::SourceUnavailable` for backend trouble.
    /// A known category with zero questions is `Ok(vec![])`, not an error.
    pub async fn load_questions(
        filter: &CategoryFilter,
        questions: &dyn QuestionRepository,
    ) -> Result<Vec<Question>, QuizServiceError> {
        match questions.load_questions(filter).await {
            Ok(list) => Ok(list),
            Err(StorageError::NotFound) => {
                Err(QuizServiceError::CategoryNotFound(filter.to_string()))
            }
            Err(e) => Err(QuizServiceError::SourceUnavailable(e.to_string())),
        }
    }

    /// Names of all known categories, for a selection menu.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::SourceUnavailable` if the backend cannot
    /// be read.
    pub async fn list_categories(
        questions: &dyn QuestionRepository,
    ) -> Result<Vec<String>, QuizServiceError> {
        questions
            .list_categories()
            .await
            .map_err(|e| QuizServiceError::SourceUnavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quiz_core::model::{AnswerKey, QuestionId, QuestionKind};
    use storage::repository::InMemoryRepository;

    fn build_question(id: u64, category: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Q{id}"),
            vec!["a".into(), "b".into()],
            AnswerKey::Single(0),
            QuestionKind::TrueFalse,
            category,
        )
        .unwrap()
    }

    struct BrokenSource;

    #[async_trait]
    impl QuestionRepository for BrokenSource {
        async fn list_categories(&self) -> Result<Vec<String>, StorageError> {
            Err(StorageError::Connection("backend down".into()))
        }

        async fn load_questions(
            &self,
            _filter: &CategoryFilter,
        ) -> Result<Vec<Question>, StorageError> {
            Err(StorageError::Connection("backend down".into()))
        }
    }

    #[tokio::test]
    async fn unknown_category_maps_to_category_not_found() {
        let repo = InMemoryRepository::new();
        repo.insert_question(build_question(1, "History")).unwrap();

        let err = QuizQueries::load_questions(&CategoryFilter::named("Astronomy"), &repo)
            .await
            .unwrap_err();
        assert!(
            matches!(err, QuizServiceError::CategoryNotFound(name) if name == "Astronomy")
        );
    }

    #[tokio::test]
    async fn known_empty_category_is_not_an_error() {
        let repo = InMemoryRepository::new();
        repo.register_category("Ethics").unwrap();

        let loaded = QuizQueries::load_questions(&CategoryFilter::named("Ethics"), &repo)
            .await
            .unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn backend_trouble_maps_to_source_unavailable() {
        let err = QuizQueries::load_questions(&CategoryFilter::All, &BrokenSource)
            .await
            .unwrap_err();
        assert!(matches!(err, QuizServiceError::SourceUnavailable(_)));

        let err = QuizQueries::list_categories(&BrokenSource).await.unwrap_err();
        assert!(matches!(err, QuizServiceError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn all_filter_loads_every_category() {
        let repo = InMemoryRepository::new();
        repo.insert_question(build_question(1, "History")).unwrap();
        repo.insert_question(build_question(2, "Law")).unwrap();

        let loaded = QuizQueries::load_questions(&CategoryFilter::All, &repo)
            .await
            .unwrap();
        assert_eq!(loaded.len(), 2);

        let categories = QuizQueries::list_categories(&repo).await.unwrap();
        assert_eq!(categories, vec!["History".to_owned(), "Law".to_owned()]);
    }
}
