use async_trait::async_trait;
use quiz_core::model::Question;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::repository::{CategoryFilter, QuestionRecord, QuestionRepository, StorageError};

/// Errors raised while loading a question directory.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JsonBankError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid question in {}: {source}", path.display())]
    InvalidQuestion {
        path: PathBuf,
        #[source]
        source: StorageError,
    },
}

/// File-backed question source.
///
/// Expects a directory with a `categories.json` listing (an array of
/// category names) and one `<category>.json` file per listed category
/// holding an array of question records. Everything is read eagerly at
/// construction; serving is in-memory afterwards, so a quiz never waits on
/// the filesystem mid-attempt.
#[derive(Debug)]
pub struct JsonQuestionBank {
    categories: Vec<String>,
    questions: Vec<Question>,
}

impl JsonQuestionBank {
    /// Load a question directory.
    ///
    /// # Errors
    ///
    /// Returns `JsonBankError` if the listing or any category file cannot be
    /// read, parsed, or validated. A category file holding an empty array is
    /// fine: the category stays known with zero questions.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, JsonBankError> {
        let dir = dir.as_ref();
        let listing_path = dir.join("categories.json");
        let categories: Vec<String> = read_json(&listing_path)?;

        let mut questions = Vec::new();
        for category in &categories {
            let path = dir.join(format!("{category}.json"));
            let records: Vec<QuestionRecord> = read_json(&path)?;
            for record in records {
                let question =
                    record
                        .into_question()
                        .map_err(|source| JsonBankError::InvalidQuestion {
                            path: path.clone(),
                            source,
                        })?;
                questions.push(question);
            }
        }

        Ok(Self {
            categories,
            questions,
        })
    }

    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, JsonBankError> {
    let raw = std::fs::read_to_string(path).map_err(|source| JsonBankError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| JsonBankError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[async_trait]
impl QuestionRepository for JsonQuestionBank {
    async fn list_categories(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.categories.clone())
    }

    async fn load_questions(
        &self,
        filter: &CategoryFilter,
    ) -> Result<Vec<Question>, StorageError> {
        if let CategoryFilter::Named(name) = filter {
            if !self.categories.iter().any(|c| c == name) {
                return Err(StorageError::NotFound);
            }
        }

        let questions = self
            .questions
            .iter()
            .filter(|q| match filter {
                CategoryFilter::All => true,
                CategoryFilter::Named(name) => q.category() == name,
            })
            .cloned()
            .collect();
        Ok(questions)
    }
}
