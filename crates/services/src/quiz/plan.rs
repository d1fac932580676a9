use rand::rng;
use rand::seq::SliceRandom;

use quiz_core::model::Question;

/// Selection result for an attempt build.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizPlan {
    pub questions: Vec<Question>,
    pub shuffled: bool,
}

impl QuizPlan {
    /// Total number of questions in this plan.
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Returns true when no questions were selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Builds the question snapshot an attempt starts from.
///
/// Shuffling happens here, once, before the attempt takes its snapshot;
/// the order then stays fixed for the whole attempt and its review. Choice
/// order inside a question is never touched, so recorded indices keep
/// their meaning.
#[derive(Debug, Clone, Default)]
pub struct QuizBuilder {
    shuffle: bool,
    limit: Option<usize>,
}

impl QuizBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable shuffling of question order.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Cap the number of questions, applied after any shuffle.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Build the plan from a loaded question list.
    #[must_use]
    pub fn build(self, mut questions: Vec<Question>) -> QuizPlan {
        if self.shuffle {
            let mut rng = rng();
            questions.as_mut_slice().shuffle(&mut rng);
        }
        if let Some(limit) = self.limit {
            questions.truncate(limit);
        }

        QuizPlan {
            questions,
            shuffled: self.shuffle,
        }
    }
}
