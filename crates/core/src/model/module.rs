use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{Category, ModuleId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModuleError {
    #[error("module title cannot be empty")]
    EmptyTitle,

    #[error("unknown module status: {raw}")]
    UnknownStatus { raw: String },
}

/// How far a learner has taken one module.
///
/// Promotion is one-way: a mastered module never drops back to studied,
/// and a studied module never returns to not-started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModuleStatus {
    NotStarted,
    Studied,
    Mastered,
}

impl ModuleStatus {
    /// Stable slug used in storage and over the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleStatus::NotStarted => "not-started",
            ModuleStatus::Studied => "studied",
            ModuleStatus::Mastered => "mastered",
        }
    }

    /// Parse a slug back into a status.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::UnknownStatus` for unrecognised input.
    pub fn parse(raw: &str) -> Result<Self, ModuleError> {
        match raw {
            "not-started" => Ok(ModuleStatus::NotStarted),
            "studied" => Ok(ModuleStatus::Studied),
            "mastered" => Ok(ModuleStatus::Mastered),
            _ => Err(ModuleError::UnknownStatus {
                raw: raw.to_string(),
            }),
        }
    }
}

/// A study unit covering one slice of a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearningModule {
    id: ModuleId,
    category: Category,
    title: String,
    summary: String,
}

impl LearningModule {
    /// Create a validated module.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::EmptyTitle` for a blank title.
    pub fn new(
        id: ModuleId,
        category: Category,
        title: impl Into<String>,
        summary: impl Into<String>,
    ) -> Result<Self, ModuleError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ModuleError::EmptyTitle);
        }
        Ok(Self {
            id,
            category,
            title,
            summary: summary.into(),
        })
    }

    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }
}

/// A learner's standing on one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleProgress {
    module_id: ModuleId,
    status: ModuleStatus,
    updated_at: DateTime<Utc>,
}

impl ModuleProgress {
    /// Fresh progress for a module nobody has opened.
    #[must_use]
    pub fn new(module_id: ModuleId, now: DateTime<Utc>) -> Self {
        Self {
            module_id,
            status: ModuleStatus::NotStarted,
            updated_at: now,
        }
    }

    /// Rehydrate progress from storage.
    #[must_use]
    pub fn from_persisted(
        module_id: ModuleId,
        status: ModuleStatus,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            module_id,
            status,
            updated_at,
        }
    }

    #[must_use]
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    #[must_use]
    pub fn status(&self) -> ModuleStatus {
        self.status
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Move the status forward, never backward.
    ///
    /// Returns true only when the status actually advanced.
    pub fn promote(&mut self, to: ModuleStatus, now: DateTime<Utc>) -> bool {
        if to <= self.status {
            return false;
        }
        self.status = to;
        self.updated_at = now;
        true
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
