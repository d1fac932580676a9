use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    AnswerKey, Question, QuestionId, QuestionKind, SelectedAnswer, SessionRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Which categories a question load should cover.
///
/// `All` is the "all categories" sentinel; a `Named` filter for an unknown
/// category yields `StorageError::NotFound`, while a known category with no
/// questions yields an empty list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Named(String),
}

impl CategoryFilter {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl std::fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

pub(crate) fn parse_kind(s: &str) -> Result<QuestionKind, StorageError> {
    match s {
        "true-false" => Ok(QuestionKind::TrueFalse),
        "multiple-choice" => Ok(QuestionKind::MultipleChoice),
        // "multiple-choice-v2" is the legacy wire name for multi-select.
        "multi-select" | "multiple-choice-v2" => Ok(QuestionKind::MultiSelect),
        _ => Err(StorageError::Serialization(format!(
            "invalid question kind: {s}"
        ))),
    }
}

/// Wire shape for a question, as found in question files and API payloads.
///
/// Mirrors the domain `Question` so backends can serialize/deserialize
/// without leaking storage concerns into the domain layer. `answer` is a
/// bare index or an index array depending on the kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: u64,
    #[serde(rename = "question")]
    pub text: String,
    pub choices: Vec<String>,
    pub answer: AnswerKey,
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
}

impl QuestionRecord {
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            id: question.id().value(),
            text: question.text().to_owned(),
            choices: question.choices().to_vec(),
            answer: question.key().clone(),
            kind: question.kind().as_str().to_owned(),
            category: question.category().to_owned(),
        }
    }

    /// Convert the record back into a domain `Question`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the kind is unknown or the
    /// question fails domain validation.
    pub fn into_question(self) -> Result<Question, StorageError> {
        let kind = parse_kind(&self.kind)?;
        Question::new(
            QuestionId::new(self.id),
            self.text,
            self.choices,
            self.answer,
            kind,
            self.category,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Question Source contract: an ordered, well-formed question list per
/// category, with "unknown category" distinguishable from "known but empty".
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Names of all known categories, for populating a selection menu.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn list_categories(&self) -> Result<Vec<String>, StorageError>;

    /// Load questions for the given filter, in stable order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown named category, or
    /// other storage errors.
    async fn load_questions(
        &self,
        filter: &CategoryFilter,
    ) -> Result<Vec<Question>, StorageError>;
}

/// One persisted session with its storage identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRow {
    pub id: i64,
    pub record: SessionRecord,
}

impl SessionRow {
    #[must_use]
    pub fn new(id: i64, record: SessionRecord) -> Self {
        Self { id, record }
    }
}

/// Session Recorder contract: fire-and-forget persistence of attempt
/// timing and outcome, keyed by an opaque row identifier.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create an open session for an attempt that just started.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn create_session(
        &self,
        total_questions: u32,
        started_at: DateTime<Utc>,
    ) -> Result<i64, StorageError>;

    /// Record the final outcome of a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist, or
    /// other storage errors.
    async fn complete_session(
        &self,
        id: i64,
        ended_at: DateTime<Utc>,
        score: u32,
        answers: &[Option<SelectedAnswer>],
    ) -> Result<(), StorageError>;

    /// Fetch a session by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_session(&self, id: i64) -> Result<SessionRecord, StorageError>;

    /// List sessions, most recently started first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn list_sessions(&self, limit: u32) -> Result<Vec<SessionRow>, StorageError>;
}

/// Simple in-memory backend for testing, prototyping, and the built-in bank.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    categories: Arc<Mutex<BTreeSet<String>>>,
    questions: Arc<Mutex<Vec<Question>>>,
    sessions: Arc<Mutex<HashMap<i64, SessionRecord>>>,
    next_session_id: Arc<Mutex<i64>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An in-memory repository pre-loaded with the built-in question bank.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the bank fails validation or insertion.
    pub fn with_sample_bank() -> Result<Self, StorageError> {
        let repo = Self::new();
        for question in
            crate::sample::sample_questions().map_err(|e| StorageError::Serialization(e.to_string()))?
        {
            repo.insert_question(question)?;
        }
        Ok(repo)
    }

    /// Register a category so it is "known" even with zero questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn register_category(&self, name: &str) -> Result<(), StorageError> {
        let mut guard = self
            .categories
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(name.to_owned());
        Ok(())
    }

    /// Insert or replace a question, registering its category.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_question(&self, question: Question) -> Result<(), StorageError> {
        self.register_category(question.category())?;
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if let Some(existing) = guard.iter_mut().find(|q| q.id() == question.id()) {
            *existing = question;
        } else {
            guard.push(question);
        }
        Ok(())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn list_categories(&self) -> Result<Vec<String>, StorageError> {
        let guard = self
            .categories
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.iter().cloned().collect())
    }

    async fn load_questions(
        &self,
        filter: &CategoryFilter,
    ) -> Result<Vec<Question>, StorageError> {
        if let CategoryFilter::Named(name) = filter {
            let categories = self
                .categories
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            if !categories.contains(name) {
                return Err(StorageError::NotFound);
            }
        }

        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let questions = guard
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

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn create_session(
        &self,
        total_questions: u32,
        started_at: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        let id = {
            let mut guard = self
                .next_session_id
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            *guard += 1;
            *guard
        };

        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(id, SessionRecord::open(total_questions, started_at));
        Ok(id)
    }

    async fn complete_session(
        &self,
        id: i64,
        ended_at: DateTime<Utc>,
        score: u32,
        answers: &[Option<SelectedAnswer>],
    ) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let record = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        record
            .complete(ended_at, score, answers.to_vec())
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn get_session(&self, id: i64) -> Result<SessionRecord, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_sessions(&self, limit: u32) -> Result<Vec<SessionRow>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<SessionRow> = guard
            .iter()
            .map(|(id, record)| SessionRow::new(*id, record.clone()))
            .collect();
        rows.sort_by(|a, b| {
            (b.record.started_at(), b.id).cmp(&(a.record.started_at(), a.id))
        });
        rows.truncate(limit as usize);
        Ok(rows)
    }
}

/// Aggregates question and session backends behind trait objects for easy
/// backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub sessions: Arc<dyn SessionRepository>,
}

impl Storage {
    /// In-memory storage seeded with the built-in question bank.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the built-in bank fails to load.
    pub fn in_memory() -> Result<Self, StorageError> {
        let repo = InMemoryRepository::with_sample_bank()?;
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo);
        Ok(Self {
            questions,
            sessions,
        })
    }
}
