use crate::model::{AnswerKey, Question, SelectedAnswer};
use crate::quiz::attempt::Attempt;
use crate::quiz::progress::percentage;

/// Everything needed to render one position of the review screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewItem<'a> {
    pub position: usize,
    pub question: &'a Question,
    /// The user's recorded answer; `None` renders as "no answer".
    pub answer: Option<&'a SelectedAnswer>,
    pub key: &'a AnswerKey,
    pub is_correct: bool,
}

/// Read-only walk over a completed attempt.
///
/// Borrows the frozen answer record and keeps its own cursor, independent
/// of the position the attempt finished on. Obtained via
/// `QuizMachine::review`, which guarantees completion.
#[derive(Debug)]
pub struct AttemptReview<'a> {
    attempt: &'a Attempt,
    cursor: usize,
    score: u32,
}

impl<'a> AttemptReview<'a> {
    pub(crate) fn new(attempt: &'a Attempt) -> Self {
        let score = attempt.score().unwrap_or_else(|| attempt.compute_score());
        Self {
            attempt,
            cursor: 0,
            score,
        }
    }

    /// The item under the cursor, with correctness derived by the same
    /// matching rule that scored the attempt.
    #[must_use]
    pub fn current(&self) -> ReviewItem<'a> {
        let question = &self.attempt.questions()[self.cursor];
        let answer = self.attempt.answers()[self.cursor].as_ref();
        ReviewItem {
            position: self.cursor,
            question,
            answer,
            key: question.key(),
            is_correct: question.is_correct(answer),
        }
    }

    /// Moves the cursor forward, clamped at the last index.
    pub fn advance(&mut self) {
        if self.cursor + 1 < self.attempt.total_questions() {
            self.cursor += 1;
        }
    }

    /// Moves the cursor backward, clamped at 0.
    pub fn retreat(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.attempt.total_questions()
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Rounded score percentage, computed the same way as the attempt's.
    #[must_use]
    pub fn percent(&self) -> u8 {
        percentage(self.score as usize, self.total())
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.cursor == 0
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.cursor + 1 == self.attempt.total_questions()
    }
}
