#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    AttemptRecord, AttemptRepository, InMemoryRepository, ModuleRepository, ProgressRepository,
    QuestionRepository, SessionRepository, Storage, StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
