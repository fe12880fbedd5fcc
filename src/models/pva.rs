use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a pharmacovigilance agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PvaStatus {
    Planned,
    Active,
    Ending,
    Completed,
}

/// A pharmacovigilance agreement with a partner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pva {
    pub id: i64,
    /// Contract requisites identifying the agreement.
    pub requisites: String,
    /// Medicinal product title slugs covered by the agreement.
    #[serde(default)]
    pub medicinal_products: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pva_link: String,
    #[serde(default)]
    pub main_contract_link: String,
    pub status: PvaStatus,
    #[serde(default)]
    pub status_display: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Body for creating or updating a PVA.
#[derive(Debug, Clone, Serialize)]
pub struct PvaPayload {
    pub requisites: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub medicinal_products: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pva_link: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub main_contract_link: String,
    pub status: PvaStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicinalProduct {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
}
