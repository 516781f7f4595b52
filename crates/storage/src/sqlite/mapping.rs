use sqlx::Row;

use theory_core::model::{
    BonusTier, Category, ChoiceIndex, LearningModule, ModuleId, ModuleProgress, ModuleStatus,
    Question, QuestionId, QuizSnapshot, QuizStatus, RecordedAnswer, SessionId, UserId,
};

use crate::repository::{AttemptRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn module_id_from_i64(v: i64) -> Result<ModuleId, StorageError> {
    Ok(ModuleId::new(i64_to_u64("module_id", v)?))
}

pub(crate) fn parse_session_id(raw: &str) -> Result<SessionId, StorageError> {
    raw.parse::<SessionId>().map_err(ser)
}

pub(crate) fn parse_user_id(raw: Option<String>) -> Result<Option<UserId>, StorageError> {
    raw.map(UserId::new).transpose().map_err(ser)
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

// ─── Row Mapping ───────────────────────────────────────────────────────────────

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id = question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;

    let category_str: String = row.try_get("category").map_err(ser)?;
    let category = Category::parse(&category_str).map_err(ser)?;

    let choices_json: String = row.try_get("choices").map_err(ser)?;
    let choices: Vec<String> = serde_json::from_str(&choices_json).map_err(ser)?;

    let correct_i64: i64 = row.try_get("correct_choice").map_err(ser)?;
    let correct = u8::try_from(correct_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid correct_choice: {correct_i64}")))?;

    Question::new(
        id,
        category,
        row.try_get::<String, _>("prompt").map_err(ser)?,
        choices,
        ChoiceIndex::new(correct),
        row.try_get::<Option<String>, _>("explanation").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_session_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<QuizSnapshot, StorageError> {
    let session_id = parse_session_id(row.try_get::<String, _>("id").map_err(ser)?.as_str())?;

    let questions_json: String = row.try_get("questions").map_err(ser)?;
    let questions: Vec<QuestionId> = serde_json::from_str(&questions_json).map_err(ser)?;

    let answers_json: String = row.try_get("answers").map_err(ser)?;
    let answers: Vec<RecordedAnswer> = serde_json::from_str(&answers_json).map_err(ser)?;

    let cursor_i64: i64 = row.try_get("cursor").map_err(ser)?;
    let cursor = usize::try_from(cursor_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid cursor: {cursor_i64}")))?;

    let status_str: String = row.try_get("status").map_err(ser)?;
    let status = QuizStatus::parse(&status_str).map_err(ser)?;

    let revision_i64: i64 = row.try_get("revision").map_err(ser)?;
    let revision = i64_to_u64("revision", revision_i64)?;

    Ok(QuizSnapshot {
        session_id,
        questions,
        cursor,
        answers,
        status,
        started_at: row.try_get("started_at").map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
        revision,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn map_attempt_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<AttemptRecord, StorageError> {
    let session_id =
        parse_session_id(row.try_get::<String, _>("session_id").map_err(ser)?.as_str())?;
    let user_id = parse_user_id(row.try_get::<Option<String>, _>("user_id").map_err(ser)?)?;

    let tier_str: String = row.try_get("tier").map_err(ser)?;
    let tier = BonusTier::parse(&tier_str).map_err(ser)?;

    Ok(AttemptRecord {
        id: Some(row.try_get::<i64, _>("id").map_err(ser)?),
        session_id,
        user_id,
        correct: i64_to_u32("correct", row.try_get("correct").map_err(ser)?)?,
        total: i64_to_u32("total", row.try_get("total").map_err(ser)?)?,
        percent: i64_to_u32("percent", row.try_get("percent").map_err(ser)?)?,
        tier,
        points_awarded: i64_to_u32(
            "points_awarded",
            row.try_get("points_awarded").map_err(ser)?,
        )?,
        started_at: row.try_get("started_at").map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    })
}

pub(crate) fn map_module_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<LearningModule, StorageError> {
    let id = module_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;

    let category_str: String = row.try_get("category").map_err(ser)?;
    let category = Category::parse(&category_str).map_err(ser)?;

    LearningModule::new(
        id,
        category,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<String, _>("summary").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_module_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ModuleProgress, StorageError> {
    let module_id = module_id_from_i64(row.try_get::<i64, _>("module_id").map_err(ser)?)?;

    let status_str: String = row.try_get("status").map_err(ser)?;
    let status = ModuleStatus::parse(&status_str).map_err(ser)?;

    Ok(ModuleProgress::from_persisted(
        module_id,
        status,
        row.try_get("updated_at").map_err(ser)?,
    ))
}
