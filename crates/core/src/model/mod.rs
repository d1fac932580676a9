mod answer;
mod ids;
mod question;
mod session;

pub use answer::SelectedAnswer;
pub use ids::{ParseIdError, QuestionId};
pub use question::{AnswerKey, Question, QuestionError, QuestionKind};
pub use session::{SessionRecord, SessionRecordError};
