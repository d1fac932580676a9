mod attempt;
mod events;
mod machine;
mod progress;
mod review;

// Public API of the quiz subsystem.
pub use attempt::Attempt;
pub use events::{ObserverId, QuizEvent};
pub use machine::{NextOutcome, QuizError, QuizMachine, QuizPhase};
pub use progress::{QuizProgress, percentage};
pub use review::{AttemptReview, ReviewItem};
