mod chat;
mod ids;
mod leaderboard;
mod module;
mod question;
pub mod progress;
pub mod quiz;
pub mod score;

pub use ids::{ModuleId, ParseIdError, QuestionId, SessionId, UserId};

pub use chat::{extract_directive, ChatMessage, ChatRole, CoachAction, CoachReply};
pub use leaderboard::{rank_rows, LeaderboardEntry, LeaderboardRow};
pub use module::{LearningModule, ModuleError, ModuleProgress, ModuleStatus};
pub use progress::{CategoryTally, ProgressRecord};
pub use question::{
    Category, ChoiceIndex, Question, QuestionError, MAX_CHOICES, MIN_CHOICES,
};
pub use quiz::{QuizError, QuizSession, QuizSnapshot, QuizStatus, RecordedAnswer};
pub use score::{
    score_session, BonusTier, MasteryAward, QuizScore, ScoreError, ScoredQuiz,
    MODULE_MASTERY_POINTS, PASS_MARK_PERCENT, POINTS_PER_CORRECT,
};
