mod plan;
mod progress;
mod runner;
mod workflow;

// Public API of the quiz subsystem.
pub use crate::error::QuizFlowError;
pub use plan::{DEFAULT_QUIZ_LENGTH, MAX_QUIZ_LENGTH, MOCK_TEST_LENGTH, QuizBuilder, QuizPlan};
pub use progress::QuizProgress;
pub use runner::{AnswerFeedback, QuizRunner};
pub use workflow::{QuizAnswerOutcome, QuizCompletion, QuizFlowService};
