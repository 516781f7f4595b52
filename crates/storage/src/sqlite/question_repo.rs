use std::collections::HashMap;

use theory_core::model::{Category, Question, QuestionId};

use super::{
    SqliteRepository,
    mapping::{id_to_i64, map_question_row, ser},
};
use crate::repository::{QuestionRepository, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let id = id_to_i64("question_id", question.id().value())?;
        let choices = serde_json::to_string(question.choices()).map_err(ser)?;

        sqlx::query(
            r"
                INSERT INTO questions (id, category, prompt, choices, correct_choice, explanation)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO UPDATE SET
                    category = excluded.category,
                    prompt = excluded.prompt,
                    choices = excluded.choices,
                    correct_choice = excluded.correct_choice,
                    explanation = excluded.explanation
            ",
        )
        .bind(id)
        .bind(question.category().as_str())
        .bind(question.prompt())
        .bind(choices)
        .bind(i64::from(question.correct().value()))
        .bind(question.explanation())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            r"
                SELECT id, category, prompt, choices, correct_choice, explanation
                FROM questions
                WHERE id IN (
            ",
        );

        for i in 0..ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push_str(")\n");

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id_to_i64("question_id", id.value())?);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut by_id: HashMap<u64, Question> = HashMap::with_capacity(rows.len());
        for row in rows {
            let question = map_question_row(&row)?;
            by_id.insert(question.id().value(), question);
        }

        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            match by_id.remove(&id.value()) {
                Some(question) => found.push(question),
                None => return Err(StorageError::NotFound),
            }
        }
        Ok(found)
    }

    async fn list_questions(&self, limit: u32) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, category, prompt, choices, correct_choice, explanation
                FROM questions
                ORDER BY id ASC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_question_row(&row)?);
        }
        Ok(out)
    }

    async fn list_by_category(
        &self,
        category: Category,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, category, prompt, choices, correct_choice, explanation
                FROM questions
                WHERE category = ?1
                ORDER BY id ASC
                LIMIT ?2
            ",
        )
        .bind(category.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_question_row(&row)?);
        }
        Ok(out)
    }
}
