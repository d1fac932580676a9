use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::quiz::{NextOutcome, QuizError, QuizMachine};
use storage::repository::{CategoryFilter, QuestionRepository, SessionRepository};

use super::plan::QuizBuilder;
use super::queries::QuizQueries;
use crate::error::QuizServiceError;

/// Result of one forward step through a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceResult {
    pub outcome: NextOutcome,
    pub is_complete: bool,
    pub session_ref: Option<i64>,
}

/// Orchestrates quiz start and best-effort session recording.
///
/// The state machine itself is synchronous; this service owns the clock and
/// the async edges: loading questions at start and notifying the Session
/// Recorder. Recorder failures are logged and swallowed — the in-memory
/// attempt is authoritative, and `finalize_session` is the explicit retry.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    sessions: Arc<dyn SessionRepository>,
    shuffle: bool,
    question_limit: Option<usize>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            clock,
            questions,
            sessions,
            shuffle: false,
            question_limit: None,
        }
    }

    /// Enable or disable one-shot shuffling of question order at start.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Cap the number of questions per attempt.
    #[must_use]
    pub fn with_question_limit(mut self, limit: usize) -> Self {
        self.question_limit = Some(limit);
        self
    }

    /// Load questions for the filter and start a fresh attempt.
    ///
    /// Session creation is attempted once and its failure only logged; the
    /// returned machine then simply has no `session_ref`.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::CategoryNotFound` /
    /// `QuizServiceError::SourceUnavailable` for loading failures (the
    /// caller can retry by calling `start_quiz` again), or
    /// `QuizServiceError::Quiz` with `EmptyQuestionSet` when the filter
    /// matches a valid but empty category.
    pub async fn start_quiz(
        &self,
        filter: &CategoryFilter,
    ) -> Result<QuizMachine, QuizServiceError> {
        let questions = QuizQueries::load_questions(filter, self.questions.as_ref()).await?;

        let mut builder = QuizBuilder::new().with_shuffle(self.shuffle);
        if let Some(limit) = self.question_limit {
            builder = builder.with_limit(limit);
        }
        let plan = builder.build(questions);

        let now = self.clock.now();
        let mut machine = QuizMachine::new();
        machine.start(plan.questions, now)?;

        let total = total_questions(&machine);
        match self.sessions.create_session(total, now).await {
            Ok(id) => machine.set_session_ref(id)?,
            Err(e) => log::warn!("session recorder unavailable at start: {e}"),
        }

        Ok(machine)
    }

    /// Step the machine forward, recording completion when it happens.
    ///
    /// Never fails: a closed gate is a held outcome, and recorder failures
    /// are logged without touching the attempt.
    pub async fn advance(&self, machine: &mut QuizMachine) -> AdvanceResult {
        let outcome = machine.next(self.clock.now());
        if outcome == NextOutcome::Completed {
            self.record_completion(machine).await;
        }

        AdvanceResult {
            outcome,
            is_complete: machine.is_complete(),
            session_ref: machine.session_ref(),
        }
    }

    /// Retry session persistence for a completed attempt.
    ///
    /// Creates the session first if start-time recording already failed.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Quiz` if the attempt is not completed, or
    /// `QuizServiceError::Storage` if persistence fails again.
    pub async fn finalize_session(
        &self,
        machine: &mut QuizMachine,
    ) -> Result<i64, QuizServiceError> {
        let (started_at, ended_at, score, answers) = completed_parts(machine)?;

        let id = match machine.session_ref() {
            Some(id) => id,
            None => {
                let total = total_questions(machine);
                let id = self.sessions.create_session(total, started_at).await?;
                machine.set_session_ref(id)?;
                id
            }
        };

        self.sessions
            .complete_session(id, ended_at, score, &answers)
            .await?;
        Ok(id)
    }

    async fn record_completion(&self, machine: &QuizMachine) {
        let Some(id) = machine.session_ref() else {
            log::warn!("quiz completed without a recorded session; outcome kept in memory only");
            return;
        };
        let Ok((_, ended_at, score, answers)) = completed_parts(machine) else {
            return;
        };

        if let Err(e) = self
            .sessions
            .complete_session(id, ended_at, score, &answers)
            .await
        {
            log::warn!("failed to record completion for session {id}: {e}");
        }
    }
}

fn total_questions(machine: &QuizMachine) -> u32 {
    u32::try_from(machine.progress().total).unwrap_or(u32::MAX)
}

type CompletedParts = (
    chrono::DateTime<chrono::Utc>,
    chrono::DateTime<chrono::Utc>,
    u32,
    Vec<Option<quiz_core::model::SelectedAnswer>>,
);

fn completed_parts(machine: &QuizMachine) -> Result<CompletedParts, QuizServiceError> {
    let not_completed = || {
        QuizServiceError::Quiz(QuizError::InvalidTransition {
            op: "finalize_session",
            phase: machine.phase(),
        })
    };

    let attempt = machine.attempt().ok_or_else(not_completed)?;
    let ended_at = attempt.completed_at().ok_or_else(not_completed)?;
    let score = attempt.score().ok_or_else(not_completed)?;
    Ok((
        attempt.started_at(),
        ended_at,
        score,
        attempt.answers().to_vec(),
    ))
}
