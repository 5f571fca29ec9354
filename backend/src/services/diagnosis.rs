//! Flock health diagnosis and assistant chat
//!
//! The model service is optional. When it is unset or fails, diagnoses come
//! from the built-in symptom table and the record says so in `source`.

use serde::{Deserialize, Serialize};
use shared::{local_chat_answer, local_diagnosis, DiagnosisRecord, DiagnosisReport};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::external::ai_assistant::{AiAssistantClient, DiagnoseRequest};

/// Diagnosis service
#[derive(Clone)]
pub struct DiagnosisService {
    db: PgPool,
    ai: Option<AiAssistantClient>,
    fallback_enabled: bool,
}

/// Input for a diagnosis request
#[derive(Debug, Deserialize, Validate)]
pub struct DiagnoseInput {
    #[validate(length(min = 1, max = 20, message = "Give between 1 and 20 symptoms"))]
    pub symptoms: Vec<String>,
    #[validate(range(min = 0, max = 730))]
    pub flock_age_days: Option<i32>,
    #[validate(range(min = 1))]
    pub flock_size: Option<i32>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChatInput {
    #[validate(length(min = 1, max = 2000))]
    pub question: String,
    #[validate(length(max = 2000))]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatAnswer {
    pub answer: String,
    /// false when the canned local answer was used
    pub from_ai: bool,
}

impl DiagnosisService {
    /// Create a new DiagnosisService instance
    pub fn new(db: PgPool, ai: Option<AiAssistantClient>, fallback_enabled: bool) -> Self {
        Self {
            db,
            ai,
            fallback_enabled,
        }
    }

    /// Diagnose a flock and keep the result in the user's history
    pub async fn diagnose(&self, user_id: Uuid, input: DiagnoseInput) -> AppResult<DiagnosisRecord> {
        let symptoms: Vec<String> = input
            .symptoms
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if symptoms.is_empty() {
            return Err(AppError::Validation {
                field: "symptoms".to_string(),
                message: "Describe at least one symptom".to_string(),
            });
        }

        let report = self.report_for(&symptoms, &input).await;

        let record = sqlx::query_as::<_, DiagnosisRecord>(
            r#"
            INSERT INTO diagnoses (
                user_id, symptoms, flock_age_days, condition, confidence,
                severity, recommendations, source
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, symptoms, flock_age_days, condition, confidence,
                      severity, recommendations, source, created_at
            "#,
        )
        .bind(user_id)
        .bind(&symptoms)
        .bind(input.flock_age_days)
        .bind(&report.condition)
        .bind(report.confidence)
        .bind(report.severity)
        .bind(&report.recommendations)
        .bind(report.source)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            user_id = %user_id,
            condition = %record.condition,
            source = ?record.source,
            "Diagnosis recorded"
        );

        Ok(record)
    }

    async fn report_for(&self, symptoms: &[String], input: &DiagnoseInput) -> DiagnosisReport {
        let Some(ai) = &self.ai else {
            return local_diagnosis(symptoms, input.flock_age_days);
        };

        let request = DiagnoseRequest {
            symptoms,
            flock_age_days: input.flock_age_days,
            flock_size: input.flock_size,
            notes: input.notes.as_deref(),
        };

        match ai.diagnose(&request).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "AI diagnosis failed, using local rules");
                local_diagnosis(symptoms, input.flock_age_days)
            }
        }
    }

    /// Answer a question, falling back to a canned answer when allowed
    pub async fn chat(&self, user_id: Uuid, input: ChatInput) -> AppResult<ChatAnswer> {
        let fallback = || ChatAnswer {
            answer: local_chat_answer(&input.question),
            from_ai: false,
        };

        let Some(ai) = &self.ai else {
            return Ok(fallback());
        };

        match ai.chat(&input.question, input.context.as_deref()).await {
            Ok(answer) => Ok(ChatAnswer {
                answer,
                from_ai: true,
            }),
            Err(e) if self.fallback_enabled => {
                tracing::warn!(user_id = %user_id, error = %e, "AI chat failed, using local answer");
                Ok(fallback())
            }
            Err(e) => Err(e),
        }
    }

    /// Past diagnoses, newest first
    pub async fn list_history(&self, user_id: Uuid) -> AppResult<Vec<DiagnosisRecord>> {
        let records = sqlx::query_as::<_, DiagnosisRecord>(
            r#"
            SELECT id, user_id, symptoms, flock_age_days, condition, confidence,
                   severity, recommendations, source, created_at
            FROM diagnoses
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 100
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnose_input_validation() {
        let ok = DiagnoseInput {
            symptoms: vec!["sneezing".to_string()],
            flock_age_days: Some(21),
            flock_size: Some(1000),
            notes: None,
        };
        assert!(ok.validate().is_ok());

        let empty = DiagnoseInput {
            symptoms: vec![],
            flock_age_days: None,
            flock_size: None,
            notes: None,
        };
        assert!(empty.validate().is_err());

        let negative_age = DiagnoseInput {
            symptoms: vec!["panting".to_string()],
            flock_age_days: Some(-1),
            flock_size: None,
            notes: None,
        };
        assert!(negative_age.validate().is_err());
    }
}
