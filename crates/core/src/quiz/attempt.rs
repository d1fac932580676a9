use chrono::{DateTime, Utc};

use crate::model::{Question, SelectedAnswer};

/// One run through a question set, from start to completion.
///
/// Holds the question snapshot taken at start, the answer slot per position,
/// and the navigation cursor. Mutation goes through `QuizMachine`; once
/// `completed_at` is set the attempt is frozen and only read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    questions: Vec<Question>,
    current: usize,
    answers: Vec<Option<SelectedAnswer>>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    score: Option<u32>,
    session_ref: Option<i64>,
}

impl Attempt {
    /// Non-emptiness of `questions` is checked by the machine's `start`.
    pub(crate) fn new(questions: Vec<Question>, started_at: DateTime<Utc>) -> Self {
        let slots = questions.len();
        Self {
            questions,
            current: 0,
            answers: vec![None; slots],
            started_at,
            completed_at: None,
            score: None,
            session_ref: None,
        }
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<SelectedAnswer>] {
        &self.answers
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Final score; `None` until the attempt completes.
    #[must_use]
    pub fn score(&self) -> Option<u32> {
        self.score
    }

    /// Handle of the persisted session backing this attempt, if recording
    /// succeeded.
    #[must_use]
    pub fn session_ref(&self) -> Option<i64> {
        self.session_ref
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    /// The answer recorded at the current position, if any.
    #[must_use]
    pub fn selected_answer(&self) -> Option<&SelectedAnswer> {
        self.answers[self.current].as_ref()
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.current + 1 == self.questions.len()
    }

    /// Counts answered positions whose recorded answer matches the key.
    ///
    /// This is the matching rule applied independently of the completion
    /// path, so tests can cross-check the stored score against it.
    #[must_use]
    pub fn compute_score(&self) -> u32 {
        let correct = self
            .questions
            .iter()
            .zip(&self.answers)
            .filter(|(question, answer)| question.is_correct(answer.as_ref()))
            .count();
        u32::try_from(correct).unwrap_or(u32::MAX)
    }

    pub(crate) fn record_answer(&mut self, answer: SelectedAnswer) {
        self.answers[self.current] = Some(answer);
    }

    pub(crate) fn advance(&mut self) {
        self.current += 1;
    }

    pub(crate) fn retreat(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    pub(crate) fn complete(&mut self, completed_at: DateTime<Utc>) -> u32 {
        let score = self.compute_score();
        self.completed_at = Some(completed_at);
        self.score = Some(score);
        score
    }

    pub(crate) fn set_session_ref(&mut self, id: i64) {
        self.session_ref = Some(id);
    }
}
