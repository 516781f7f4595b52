#![forbid(unsafe_code)]

pub mod app_services;
pub mod coach;
pub mod error;
pub mod leaderboard_service;
pub mod module_service;
pub mod progress_service;
pub mod quiz;
pub mod sync;

pub use theory_core::Clock;

pub use error::{
    AppServicesError, CoachError, LeaderboardError, ModuleServiceError, ProgressServiceError,
    QuizFlowError, SyncError,
};

pub use app_services::{AppServices, HydrationReport};
pub use coach::{CoachConfig, CoachService};
pub use leaderboard_service::{LeaderboardService, DEFAULT_LEADERBOARD_LIMIT};
pub use module_service::{ModuleOverview, ModuleService};
pub use progress_service::{CategoryProgress, ProgressOverview, ProgressService};
pub use quiz::{
    AnswerFeedback, QuizAnswerOutcome, QuizBuilder, QuizCompletion, QuizFlowService, QuizPlan,
    QuizProgress, QuizRunner, DEFAULT_QUIZ_LENGTH, MAX_QUIZ_LENGTH, MOCK_TEST_LENGTH,
};
pub use sync::{
    HttpRemoteStore, RecordingRemote, RemoteError, RemoteStore, SessionSyncService, SyncConfig,
    SyncHandle, DEFAULT_DEBOUNCE_MS,
};
