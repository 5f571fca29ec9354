//! Flock health diagnosis models and the local rule-based fallback

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a diagnosis came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "diagnosis_source", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisSource {
    /// External model service
    Ai,
    /// Built-in symptom table
    LocalRules,
}

/// How urgently the farmer should act
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "severity", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
}

/// Result of a diagnosis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisReport {
    pub condition: String,
    /// 0..=1
    pub confidence: Decimal,
    pub severity: Severity,
    pub recommendations: Vec<String>,
    pub source: DiagnosisSource,
}

/// A stored diagnosis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct DiagnosisRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub symptoms: Vec<String>,
    pub flock_age_days: Option<i32>,
    pub condition: String,
    pub confidence: Decimal,
    pub severity: Severity,
    pub recommendations: Vec<String>,
    pub source: DiagnosisSource,
    pub created_at: DateTime<Utc>,
}

struct SymptomRule {
    condition: &'static str,
    keywords: &'static [&'static str],
    /// Inclusive age window in days where the condition is typical
    typical_age: Option<(i32, i32)>,
    severity: Severity,
    recommendations: &'static [&'static str],
}

const RULES: &[SymptomRule] = &[
    SymptomRule {
        condition: "Avian Influenza (suspected)",
        keywords: &["sudden death", "swollen head", "blue comb", "purple wattle", "drop in egg"],
        typical_age: None,
        severity: Severity::Critical,
        recommendations: &[
            "Isolate the shed and stop all bird movement immediately",
            "Report to the district animal husbandry officer",
            "Do not sell or transport birds until cleared",
        ],
    },
    SymptomRule {
        condition: "Newcastle Disease",
        keywords: &["twisted neck", "gasping", "green diarrhea", "greenish", "paralysis", "tremor"],
        typical_age: None,
        severity: Severity::High,
        recommendations: &[
            "Isolate affected birds",
            "Consult a veterinarian for confirmation",
            "Review the Lasota / R2B vaccination schedule for the flock",
        ],
    },
    SymptomRule {
        condition: "Coccidiosis",
        keywords: &["bloody droppings", "blood in droppings", "bloody diarrhea", "huddling", "wet litter"],
        typical_age: Some((14, 42)),
        severity: Severity::High,
        recommendations: &[
            "Start an anticoccidial (e.g. amprolium) in drinking water",
            "Replace wet litter and improve ventilation",
            "Add vitamin K and A supplements",
        ],
    },
    SymptomRule {
        condition: "Infectious Bursal Disease (Gumboro)",
        keywords: &["ruffled feathers", "watery diarrhea", "white diarrhea", "vent pecking", "trembling"],
        typical_age: Some((21, 42)),
        severity: Severity::High,
        recommendations: &[
            "Provide electrolytes and multivitamins",
            "Check the IBD vaccination record",
            "Consult a veterinarian",
        ],
    },
    SymptomRule {
        condition: "Chronic Respiratory Disease",
        keywords: &["sneezing", "coughing", "nasal discharge", "rales", "swollen eyes", "rattling"],
        typical_age: None,
        severity: Severity::Moderate,
        recommendations: &[
            "Improve ventilation and reduce ammonia",
            "Consult a veterinarian about a suitable antibiotic course",
        ],
    },
    SymptomRule {
        condition: "Fowl Pox",
        keywords: &["scabs", "wart", "lesions on comb", "nodules"],
        typical_age: None,
        severity: Severity::Moderate,
        recommendations: &[
            "Separate affected birds",
            "Control mosquitoes around the shed",
            "Vaccinate unaffected birds",
        ],
    },
    SymptomRule {
        condition: "Heat Stress",
        keywords: &["panting", "open mouth", "wings spread", "drooping wings", "reduced feed"],
        typical_age: None,
        severity: Severity::Moderate,
        recommendations: &[
            "Provide cool drinking water with electrolytes",
            "Increase air flow and use foggers during peak heat",
            "Shift feeding to cooler hours",
        ],
    },
];

/// Deterministic diagnosis from symptom keywords, used when the model service
/// is unavailable.
pub fn local_diagnosis(symptoms: &[String], flock_age_days: Option<i32>) -> DiagnosisReport {
    let text: Vec<String> = symptoms.iter().map(|s| s.to_lowercase()).collect();

    let best = RULES
        .iter()
        .map(|rule| {
            let hits = rule
                .keywords
                .iter()
                .filter(|kw| text.iter().any(|s| s.contains(*kw)))
                .count();
            let age_bonus = match (rule.typical_age, flock_age_days) {
                (Some((lo, hi)), Some(age)) if hits > 0 && age >= lo && age <= hi => 1,
                _ => 0,
            };
            (rule, hits, hits + age_bonus)
        })
        .filter(|(_, hits, _)| *hits > 0)
        // earlier rules win ties
        .fold(None, |best: Option<(&SymptomRule, usize, usize)>, cand| match best {
            Some(b) if b.2 >= cand.2 => Some(b),
            _ => Some(cand),
        });

    match best {
        Some((rule, hits, _)) => {
            let confidence = Decimal::from(hits as i64) / Decimal::from(rule.keywords.len() as i64);
            DiagnosisReport {
                condition: rule.condition.to_string(),
                confidence: confidence.min(Decimal::ONE).round_dp(2),
                severity: rule.severity,
                recommendations: rule.recommendations.iter().map(|r| r.to_string()).collect(),
                source: DiagnosisSource::LocalRules,
            }
        }
        None => DiagnosisReport {
            condition: "Unidentified condition".to_string(),
            confidence: Decimal::ZERO,
            severity: Severity::Low,
            recommendations: vec![
                "Monitor feed and water intake daily".to_string(),
                "Consult a veterinarian if symptoms persist".to_string(),
            ],
            source: DiagnosisSource::LocalRules,
        },
    }
}

/// Canned answer for the chat assistant when the model service is unavailable
pub fn local_chat_answer(question: &str) -> String {
    let q = question.to_lowercase();
    if q.contains("vaccin") {
        "Typical broiler schedule: Marek's at hatchery, Lasota (ND) on day 5-7, \
         IBD on day 12-14, Lasota booster on day 21. Follow your veterinarian's advice."
            .to_string()
    } else if q.contains("feed") || q.contains("fcr") {
        "Use pre-starter up to day 10, starter up to day 21 and finisher afterwards. \
         A good broiler FCR at 35-42 days is 1.5-1.8."
            .to_string()
    } else if q.contains("temperature") || q.contains("brood") {
        "Keep brooding temperature around 32-34°C in week one and reduce by about 3°C each week."
            .to_string()
    } else {
        "The assistant is offline right now. For health concerns, use the diagnosis tool \
         or contact your veterinarian."
            .to_string()
    }
}
