//! AI Assistant Client
//!
//! Client for the external model service that answers flock health questions.
//! Callers treat it as unreliable and fall back to local rules on any error.

use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{DiagnosisReport, DiagnosisSource, Severity};
use std::time::Duration;

use crate::config::AiConfig;
use crate::error::{AppError, AppResult};

/// Width of the stored condition column
const MAX_CONDITION_CHARS: usize = 200;

/// Client for the AI assistant service
#[derive(Clone)]
pub struct AiAssistantClient {
    api_endpoint: String,
    api_key: Option<String>,
    http_client: Client,
}

/// Request to diagnose a flock
#[derive(Debug, Serialize)]
pub struct DiagnoseRequest<'a> {
    pub symptoms: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flock_age_days: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flock_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<&'a str>,
}

/// Diagnosis response from the service
#[derive(Debug, Deserialize)]
pub struct DiagnoseResponse {
    pub condition: String,
    pub confidence: f64,
    pub severity: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    question: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    answer: String,
}

impl From<DiagnoseResponse> for DiagnosisReport {
    fn from(r: DiagnoseResponse) -> Self {
        let confidence = Decimal::try_from(r.confidence)
            .unwrap_or(Decimal::ZERO)
            .clamp(Decimal::ZERO, Decimal::ONE)
            .round_dp(2);

        DiagnosisReport {
            condition: r.condition.trim().chars().take(MAX_CONDITION_CHARS).collect(),
            confidence,
            severity: AiAssistantClient::parse_severity(&r.severity),
            recommendations: r.recommendations,
            source: DiagnosisSource::Ai,
        }
    }
}

impl AiAssistantClient {
    /// Create a new AI assistant client
    pub fn new(api_endpoint: String, api_key: Option<String>, timeout: Duration) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_endpoint: api_endpoint.trim_end_matches('/').to_string(),
            api_key,
            http_client,
        })
    }

    /// Build a client when an endpoint is configured
    pub fn from_config(config: &AiConfig) -> AppResult<Option<Self>> {
        config
            .endpoint
            .clone()
            .map(|endpoint| {
                Self::new(
                    endpoint,
                    config.api_key.clone(),
                    Duration::from_secs(config.timeout_secs),
                )
            })
            .transpose()
    }

    /// Ask the service for a diagnosis
    pub async fn diagnose(&self, request: &DiagnoseRequest<'_>) -> AppResult<DiagnosisReport> {
        let response: DiagnoseResponse = self.post("diagnose", request).await?;
        Ok(response.into())
    }

    /// Ask the service a free-form question
    pub async fn chat(&self, question: &str, context: Option<&str>) -> AppResult<String> {
        let response: ChatResponse = self.post("chat", &ChatRequest { question, context }).await?;
        Ok(response.answer)
    }

    async fn post<B: Serialize + ?Sized, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> AppResult<R> {
        let mut request = self
            .http_client
            .post(format!("{}/{}", self.api_endpoint, path))
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::AiService(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::AiService(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::AiService(format!("Failed to parse response: {}", e)))
    }

    /// Map the service's severity label
    pub fn parse_severity(label: &str) -> Severity {
        match label.to_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" | "severe" => Severity::High,
            "moderate" | "medium" => Severity::Moderate,
            _ => Severity::Low,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_parsing() {
        assert_eq!(AiAssistantClient::parse_severity("Critical"), Severity::Critical);
        assert_eq!(AiAssistantClient::parse_severity("severe"), Severity::High);
        assert_eq!(AiAssistantClient::parse_severity("medium"), Severity::Moderate);
        assert_eq!(AiAssistantClient::parse_severity("unknown"), Severity::Low);
    }

    #[test]
    fn test_response_conversion_clamps_confidence() {
        let report: DiagnosisReport = DiagnoseResponse {
            condition: "Coccidiosis".to_string(),
            confidence: 1.7,
            severity: "high".to_string(),
            recommendations: vec!["Amprolium".to_string()],
        }
        .into();
        assert_eq!(report.confidence, Decimal::ONE);
        assert_eq!(report.source, DiagnosisSource::Ai);
        assert_eq!(report.severity, Severity::High);
    }

    #[test]
    fn test_long_condition_fits_column() {
        let report: DiagnosisReport = DiagnoseResponse {
            condition: "Infectious bursal disease ".repeat(20),
            confidence: 0.6,
            severity: "moderate".to_string(),
            recommendations: Vec::new(),
        }
        .into();
        assert_eq!(report.condition.chars().count(), MAX_CONDITION_CHARS);
        assert!(report.condition.starts_with("Infectious bursal disease"));
    }

    #[test]
    fn test_unconfigured_client() {
        let config = AiConfig {
            endpoint: None,
            api_key: None,
            timeout_secs: 5,
            fallback_enabled: true,
        };
        assert!(AiAssistantClient::from_config(&config).unwrap().is_none());
    }
}
