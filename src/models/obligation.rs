use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single obligation imposed by a PVA, e.g. a recurring safety-report
/// exchange. Tasks hang off obligations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obligation {
    pub id: i64,
    pub pva: i64,
    #[serde(default)]
    pub pva_display: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Responsibility type title slug, e.g. "Reporting".
    #[serde(default)]
    pub responsibility_type: Option<String>,
}

/// Body for creating or updating an obligation.
#[derive(Debug, Clone, Serialize)]
pub struct ObligationPayload {
    pub pva: i64,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsibility_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsibilityType {
    pub id: i64,
    pub title: String,
}
