mod history;
mod plan;
mod queries;
mod workflow;

// Public API of the quiz subsystem.
pub use crate::error::QuizServiceError;
pub use history::{SessionHistoryService, SessionId, SessionListItem};
pub use plan::{QuizBuilder, QuizPlan};
pub use workflow::{AdvanceResult, QuizLoopService};
