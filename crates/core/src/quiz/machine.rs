use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::model::{Question, SelectedAnswer};
use crate::quiz::attempt::Attempt;
use crate::quiz::events::{Observers, ObserverId, QuizEvent};
use crate::quiz::progress::{QuizProgress, percentage};
use crate::quiz::review::AttemptReview;

//
// ─── PHASES & ERRORS ──────────────────────────────────────────────────────────
//

/// Lifecycle phase of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    NotStarted,
    InProgress,
    Completed,
}

impl QuizPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for QuizPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors emitted by the quiz state machine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("cannot start with an empty question set")]
    EmptyQuestionSet,

    #[error("{op} is not allowed in the {phase} phase")]
    InvalidTransition { op: &'static str, phase: QuizPhase },

    #[error("this question takes a single choice")]
    ExpectedSingleChoice,

    #[error("this question takes a set of choices")]
    ExpectedMultipleChoices,

    #[error("a multi-select answer cannot be empty")]
    EmptySelection,

    #[error("choice index {index} is out of range for {len} choices")]
    ChoiceOutOfRange { index: usize, len: usize },
}

/// What `next()` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextOutcome {
    /// The gate was closed (unanswered position, or nothing in progress).
    Held,
    /// Moved forward one position.
    Advanced,
    /// Was on the last position; the attempt is now completed and scored.
    Completed,
}

//
// ─── STATE MACHINE ────────────────────────────────────────────────────────────
//

/// Drives one attempt through a question set.
///
/// `NotStarted → InProgress → Completed`, with `reset` returning to a fresh
/// `NotStarted` from anywhere. All operations are synchronous and assume
/// sequential single-threaded use; timestamps come from the caller so time
/// stays deterministic in tests.
///
/// Navigation clamps (`next` with a closed gate, `previous` at 0) are
/// deliberate no-ops; everything else that cannot apply returns a typed
/// error and leaves the state untouched.
pub struct QuizMachine {
    attempt: Option<Attempt>,
    observers: Observers,
}

impl QuizMachine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            attempt: None,
            observers: Observers::new(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> QuizPhase {
        match &self.attempt {
            None => QuizPhase::NotStarted,
            Some(attempt) if attempt.is_complete() => QuizPhase::Completed,
            Some(_) => QuizPhase::InProgress,
        }
    }

    /// The current attempt, if one has been started.
    #[must_use]
    pub fn attempt(&self) -> Option<&Attempt> {
        self.attempt.as_ref()
    }

    /// Begins a new attempt over the given snapshot.
    ///
    /// `started_at` should come from the services layer clock.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptyQuestionSet` for an empty snapshot (the
    /// machine stays `NotStarted`, so `start` can simply be retried), or
    /// `QuizError::InvalidTransition` if an attempt already exists; `reset`
    /// first to discard it.
    pub fn start(
        &mut self,
        questions: Vec<Question>,
        started_at: DateTime<Utc>,
    ) -> Result<(), QuizError> {
        if self.attempt.is_some() {
            return Err(QuizError::InvalidTransition {
                op: "start",
                phase: self.phase(),
            });
        }
        if questions.is_empty() {
            return Err(QuizError::EmptyQuestionSet);
        }

        let total = questions.len();
        self.attempt = Some(Attempt::new(questions, started_at));
        self.observers.emit(&QuizEvent::Started { total });
        Ok(())
    }

    /// Records an answer for the current position, overwriting any prior one.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidTransition` outside `InProgress`, or an
    /// answer-shape error when the selection does not fit the current
    /// question's kind or choice range.
    pub fn select_answer(&mut self, answer: SelectedAnswer) -> Result<(), QuizError> {
        let phase = self.phase();
        let Some(attempt) = self.attempt.as_mut().filter(|a| !a.is_complete()) else {
            return Err(QuizError::InvalidTransition {
                op: "select_answer",
                phase,
            });
        };

        let question = attempt.current_question();
        check_answer_shape(question, &answer)?;

        attempt.record_answer(answer);
        let position = attempt.current_index();
        self.observers.emit(&QuizEvent::AnswerSelected { position });
        Ok(())
    }

    /// True iff the current position has a recorded answer.
    ///
    /// This is the sole gate on forward navigation: an unanswered question
    /// cannot be skipped.
    #[must_use]
    pub fn can_advance(&self) -> bool {
        match &self.attempt {
            Some(attempt) if !attempt.is_complete() => attempt.selected_answer().is_some(),
            _ => false,
        }
    }

    /// Moves forward, completing the attempt from the last position.
    ///
    /// Holds (no-op) exactly when `can_advance` is false. On completion the
    /// score is computed over all positions by the matching rule.
    pub fn next(&mut self, now: DateTime<Utc>) -> NextOutcome {
        if !self.can_advance() {
            return NextOutcome::Held;
        }
        // can_advance guarantees an in-progress attempt.
        let Some(attempt) = self.attempt.as_mut() else {
            return NextOutcome::Held;
        };

        if attempt.is_last_question() {
            let score = attempt.complete(now);
            let total = attempt.total_questions();
            self.observers.emit(&QuizEvent::Completed { score, total });
            NextOutcome::Completed
        } else {
            attempt.advance();
            let position = attempt.current_index();
            self.observers.emit(&QuizEvent::Advanced { position });
            NextOutcome::Advanced
        }
    }

    /// Moves back one position, floored at 0. Never errors; keeps the
    /// answer at the position left behind.
    pub fn previous(&mut self) {
        let Some(attempt) = self.attempt.as_mut().filter(|a| !a.is_complete()) else {
            return;
        };
        if attempt.current_index() == 0 {
            return;
        }
        attempt.retreat();
        let position = attempt.current_index();
        self.observers.emit(&QuizEvent::WentBack { position });
    }

    /// Discards the current attempt and returns to `NotStarted`.
    ///
    /// The prior attempt is dropped, not mutated; a retake starts from a
    /// fresh snapshot.
    pub fn reset(&mut self) {
        self.attempt = None;
        self.observers.emit(&QuizEvent::Reset);
    }

    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        match &self.attempt {
            None => QuizProgress {
                total: 0,
                position: 0,
                answered: 0,
                percent: 0,
                is_complete: false,
            },
            Some(attempt) => {
                let total = attempt.total_questions();
                QuizProgress {
                    total,
                    position: attempt.current_index(),
                    answered: attempt.answers().iter().filter(|a| a.is_some()).count(),
                    percent: percentage(attempt.current_index(), total),
                    is_complete: attempt.is_complete(),
                }
            }
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.attempt
            .as_ref()
            .filter(|a| !a.is_complete())
            .map(Attempt::current_question)
    }

    #[must_use]
    pub fn selected_answer(&self) -> Option<&SelectedAnswer> {
        self.attempt
            .as_ref()
            .and_then(Attempt::selected_answer)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase() == QuizPhase::Completed
    }

    /// Final score; `None` until completed.
    #[must_use]
    pub fn score(&self) -> Option<u32> {
        self.attempt.as_ref().and_then(Attempt::score)
    }

    #[must_use]
    pub fn session_ref(&self) -> Option<i64> {
        self.attempt.as_ref().and_then(Attempt::session_ref)
    }

    /// Attaches the persisted session handle once the recorder accepts it.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidTransition` when nothing has started.
    pub fn set_session_ref(&mut self, id: i64) -> Result<(), QuizError> {
        let phase = self.phase();
        let Some(attempt) = self.attempt.as_mut() else {
            return Err(QuizError::InvalidTransition {
                op: "set_session_ref",
                phase,
            });
        };
        attempt.set_session_ref(id);
        Ok(())
    }

    /// Opens a read-only review over the completed attempt.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidTransition` unless the attempt completed.
    pub fn review(&self) -> Result<AttemptReview<'_>, QuizError> {
        match self.attempt.as_ref().filter(|a| a.is_complete()) {
            Some(attempt) => Ok(AttemptReview::new(attempt)),
            None => Err(QuizError::InvalidTransition {
                op: "review",
                phase: self.phase(),
            }),
        }
    }

    /// Registers an observer; it runs after each successful transition.
    pub fn subscribe(&mut self, callback: impl Fn(&QuizEvent) + Send + 'static) -> ObserverId {
        self.observers.subscribe(Box::new(callback))
    }

    /// Removes an observer; returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }
}

impl Default for QuizMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QuizMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizMachine")
            .field("phase", &self.phase())
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}

fn check_answer_shape(question: &Question, answer: &SelectedAnswer) -> Result<(), QuizError> {
    if question.kind().expects_multiple() != answer.is_multiple() {
        return if question.kind().expects_multiple() {
            Err(QuizError::ExpectedMultipleChoices)
        } else {
            Err(QuizError::ExpectedSingleChoice)
        };
    }
    if matches!(answer, SelectedAnswer::Multiple(set) if set.is_empty()) {
        return Err(QuizError::EmptySelection);
    }

    let len = question.choices().len();
    for index in answer.indices() {
        if index >= len {
            return Err(QuizError::ChoiceOutOfRange { index, len });
        }
    }
    Ok(())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerKey, QuestionId, QuestionKind};
    use crate::time::fixed_now;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn single(id: u64, key: usize) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Q{id}"),
            vec!["a".into(), "b".into(), "c".into()],
            AnswerKey::Single(key),
            QuestionKind::MultipleChoice,
            "Test",
        )
        .unwrap()
    }

    fn multi(id: u64, key: impl IntoIterator<Item = usize>) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Q{id}"),
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            AnswerKey::multiple(key),
            QuestionKind::MultiSelect,
            "Test",
        )
        .unwrap()
    }

    fn started(questions: Vec<Question>) -> QuizMachine {
        let mut machine = QuizMachine::new();
        machine.start(questions, fixed_now()).unwrap();
        machine
    }

    #[test]
    fn empty_set_cannot_start() {
        let mut machine = QuizMachine::new();
        let err = machine.start(Vec::new(), fixed_now()).unwrap_err();
        assert_eq!(err, QuizError::EmptyQuestionSet);
        assert_eq!(machine.phase(), QuizPhase::NotStarted);

        // a failed start is retryable
        machine.start(vec![single(1, 0)], fixed_now()).unwrap();
        assert_eq!(machine.phase(), QuizPhase::InProgress);
    }

    #[test]
    fn select_before_start_is_rejected() {
        let mut machine = QuizMachine::new();
        let err = machine
            .select_answer(SelectedAnswer::Single(0))
            .unwrap_err();
        assert!(matches!(
            err,
            QuizError::InvalidTransition {
                op: "select_answer",
                phase: QuizPhase::NotStarted,
            }
        ));
    }

    #[test]
    fn unanswered_position_cannot_be_skipped() {
        let mut machine = started(vec![single(1, 0), single(2, 1)]);

        assert!(!machine.can_advance());
        assert_eq!(machine.next(fixed_now()), NextOutcome::Held);
        assert_eq!(machine.progress().position, 0);

        machine.select_answer(SelectedAnswer::Single(0)).unwrap();
        assert!(machine.can_advance());
        assert_eq!(machine.next(fixed_now()), NextOutcome::Advanced);
        assert_eq!(machine.progress().position, 1);
    }

    #[test]
    fn previous_then_next_round_trips() {
        let mut machine = started(vec![single(1, 0), single(2, 1), single(3, 0)]);
        machine.select_answer(SelectedAnswer::Single(0)).unwrap();
        machine.next(fixed_now());
        machine.select_answer(SelectedAnswer::Single(1)).unwrap();

        let before = machine.progress().position;
        machine.previous();
        assert_eq!(machine.progress().position, before - 1);
        assert_eq!(machine.next(fixed_now()), NextOutcome::Advanced);
        assert_eq!(machine.progress().position, before);
    }

    #[test]
    fn previous_clamps_at_zero() {
        let mut machine = started(vec![single(1, 0), single(2, 1)]);
        machine.previous();
        assert_eq!(machine.progress().position, 0);
    }

    #[test]
    fn going_back_keeps_the_answer_left_behind() {
        let mut machine = started(vec![single(1, 0), single(2, 1)]);
        machine.select_answer(SelectedAnswer::Single(2)).unwrap();
        machine.next(fixed_now());
        machine.previous();

        assert_eq!(machine.selected_answer(), Some(&SelectedAnswer::Single(2)));

        // changing one's mind after coming back is allowed
        machine.select_answer(SelectedAnswer::Single(0)).unwrap();
        assert_eq!(machine.selected_answer(), Some(&SelectedAnswer::Single(0)));
    }

    #[test]
    fn completion_scores_by_the_matching_rule() {
        // keys [0, 1, 0]; user answers [0, 1, 1] -> score 2, percent 67
        let mut machine = started(vec![single(1, 0), single(2, 1), single(3, 0)]);
        for answer in [0, 1, 1] {
            machine.select_answer(SelectedAnswer::Single(answer)).unwrap();
            machine.next(fixed_now());
        }

        assert_eq!(machine.phase(), QuizPhase::Completed);
        assert_eq!(machine.score(), Some(2));

        let review = machine.review().unwrap();
        assert_eq!(review.percent(), 67);
    }

    #[test]
    fn completion_score_matches_independent_recomputation() {
        let mut machine = started(vec![single(1, 2), multi(2, [1, 3]), single(3, 0)]);
        machine.select_answer(SelectedAnswer::Single(2)).unwrap();
        machine.next(fixed_now());
        machine
            .select_answer(SelectedAnswer::multiple([3, 1]))
            .unwrap();
        machine.next(fixed_now());
        machine.select_answer(SelectedAnswer::Single(1)).unwrap();
        machine.next(fixed_now());

        let attempt = machine.attempt().unwrap();
        assert_eq!(machine.score(), Some(attempt.compute_score()));
        assert_eq!(machine.score(), Some(2));
    }

    #[test]
    fn multi_select_set_equality_round_trip() {
        let mut machine = started(vec![multi(1, [1, 3])]);
        machine
            .select_answer(SelectedAnswer::multiple([3, 1]))
            .unwrap();
        machine.next(fixed_now());
        assert_eq!(machine.score(), Some(1));

        let mut machine = started(vec![multi(1, [1, 3])]);
        machine
            .select_answer(SelectedAnswer::multiple([1, 2, 3]))
            .unwrap();
        machine.next(fixed_now());
        assert_eq!(machine.score(), Some(0));
    }

    #[test]
    fn answer_shape_is_checked_against_the_kind() {
        let mut machine = started(vec![single(1, 0), multi(2, [0, 1])]);

        let err = machine
            .select_answer(SelectedAnswer::multiple([0]))
            .unwrap_err();
        assert_eq!(err, QuizError::ExpectedSingleChoice);

        machine.select_answer(SelectedAnswer::Single(0)).unwrap();
        machine.next(fixed_now());

        let err = machine
            .select_answer(SelectedAnswer::Single(0))
            .unwrap_err();
        assert_eq!(err, QuizError::ExpectedMultipleChoices);

        let err = machine
            .select_answer(SelectedAnswer::multiple([]))
            .unwrap_err();
        assert_eq!(err, QuizError::EmptySelection);

        let err = machine
            .select_answer(SelectedAnswer::multiple([0, 9]))
            .unwrap_err();
        assert_eq!(err, QuizError::ChoiceOutOfRange { index: 9, len: 4 });
    }

    #[test]
    fn completed_attempt_is_frozen() {
        let mut machine = started(vec![single(1, 0)]);
        machine.select_answer(SelectedAnswer::Single(0)).unwrap();
        machine.next(fixed_now());

        let err = machine
            .select_answer(SelectedAnswer::Single(1))
            .unwrap_err();
        assert!(matches!(
            err,
            QuizError::InvalidTransition {
                op: "select_answer",
                phase: QuizPhase::Completed,
            }
        ));
        assert_eq!(machine.next(fixed_now()), NextOutcome::Held);
    }

    #[test]
    fn reset_returns_to_a_fresh_not_started() {
        let mut machine = started(vec![single(1, 0)]);
        machine.select_answer(SelectedAnswer::Single(0)).unwrap();
        machine.next(fixed_now());
        assert_eq!(machine.score(), Some(1));

        machine.reset();
        assert_eq!(machine.phase(), QuizPhase::NotStarted);
        assert_eq!(machine.progress().position, 0);
        assert_eq!(machine.score(), None);
        assert!(machine.attempt().is_none());

        // the new attempt starts with unset slots regardless of the old score
        machine.start(vec![single(1, 0), single(2, 1)], fixed_now()).unwrap();
        assert!(machine.attempt().unwrap().answers().iter().all(Option::is_none));
    }

    #[test]
    fn progress_tracks_position_and_percent() {
        let mut machine = QuizMachine::new();
        assert_eq!(machine.progress().percent, 0);

        machine
            .start(vec![single(1, 0), single(2, 1), single(3, 0)], fixed_now())
            .unwrap();
        assert_eq!(machine.progress().percent, 0);

        machine.select_answer(SelectedAnswer::Single(0)).unwrap();
        machine.next(fixed_now());
        let progress = machine.progress();
        assert_eq!(progress.position, 1);
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.percent, 33);
    }

    #[test]
    fn observers_fire_after_each_transition() {
        let events = Arc::new(AtomicUsize::new(0));
        let mut machine = QuizMachine::new();
        let id = {
            let events = Arc::clone(&events);
            machine.subscribe(move |_| {
                events.fetch_add(1, Ordering::SeqCst);
            })
        };

        machine.start(vec![single(1, 0)], fixed_now()).unwrap(); // Started
        machine.select_answer(SelectedAnswer::Single(0)).unwrap(); // AnswerSelected
        machine.next(fixed_now()); // Completed
        assert_eq!(events.load(Ordering::SeqCst), 3);

        // a held next() is not a transition
        machine.next(fixed_now());
        assert_eq!(events.load(Ordering::SeqCst), 3);

        assert!(machine.unsubscribe(id));
        machine.reset();
        assert_eq!(events.load(Ordering::SeqCst), 3);
    }
}
