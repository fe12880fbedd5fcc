use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
    Hidden,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "NOT_STARTED",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Hidden => "HIDDEN",
        }
    }
}

/// Recurrence frequency of a task schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    #[serde(rename = "D")]
    Daily,
    #[serde(rename = "W")]
    Weekly,
    #[serde(rename = "M")]
    Monthly,
    #[serde(rename = "Y")]
    Yearly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub frequency_type: Frequency,
    #[serde(default)]
    pub day_of_week: Option<i32>,
    #[serde(default)]
    pub week_of_month: Option<i32>,
    #[serde(default)]
    pub day_of_month: Option<i32>,
    #[serde(default)]
    pub month_of_year: Option<i32>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub status_display: Option<String>,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub completion_evidence_link: String,
    pub obligation: i64,
    #[serde(default)]
    pub obligation_display: Option<String>,
    #[serde(default)]
    pub pva_display: Option<String>,
    #[serde(default)]
    pub responsibility_type_display: Option<String>,
    pub created_by: i64,
    #[serde(default)]
    pub created_by_display: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<i64>,
    #[serde(default)]
    pub assigned_to_display: Option<String>,
    #[serde(default)]
    pub schedule: Option<TaskSchedule>,
}

impl Task {
    pub fn is_overdue(&self) -> bool {
        self.status != TaskStatus::Completed && self.deadline < Utc::now()
    }
}

/// Body for creating or updating a task. `status` and `created_by` are
/// read-only on the server and therefore not part of the payload.
#[derive(Debug, Clone, Serialize)]
pub struct TaskPayload {
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub obligation: i64,
    pub deadline: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<i64>,
    pub is_recurring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<TaskSchedule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_evidence_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub task: i64,
    pub created_by: i64,
    #[serde(default)]
    pub created_by_display: Option<String>,
    pub created_at: DateTime<Utc>,
    pub text: String,
}

/// Query parameters accepted by the task list endpoint.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub title_contains: Option<String>,
    pub description_contains: Option<String>,
    pub status: Option<TaskStatus>,
    pub deadline_after: Option<DateTime<Utc>>,
    pub deadline_before: Option<DateTime<Utc>>,
    pub assigned_to_username: Option<String>,
    pub assigned_to_last_name: Option<String>,
    pub created_by_username: Option<String>,
    pub created_by_last_name: Option<String>,
    pub responsibility_type: Option<String>,
    pub obligation_starts_after: Option<NaiveDate>,
    pub obligation_ends_before: Option<NaiveDate>,
}

impl TaskFilter {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        let mut push = |key: &str, value: String| query.push((key.to_string(), value));

        if let Some(ref title) = self.title_contains {
            push("title__icontains", title.clone());
        }
        if let Some(ref description) = self.description_contains {
            push("description__icontains", description.clone());
        }
        if let Some(status) = self.status {
            push("status", status.as_str().to_string());
        }
        if let Some(after) = self.deadline_after {
            push("deadline__range_min", after.to_rfc3339());
        }
        if let Some(before) = self.deadline_before {
            push("deadline__range_max", before.to_rfc3339());
        }
        if let Some(ref username) = self.assigned_to_username {
            push("assigned_to__username__iexact", username.clone());
        }
        if let Some(ref last_name) = self.assigned_to_last_name {
            push("assigned_to__last_name__icontains", last_name.clone());
        }
        if let Some(ref username) = self.created_by_username {
            push("created_by__username__iexact", username.clone());
        }
        if let Some(ref last_name) = self.created_by_last_name {
            push("created_by__last_name__icontains", last_name.clone());
        }
        if let Some(ref title) = self.responsibility_type {
            push("obligation__responsibility_type__title__iexact", title.clone());
        }
        if let Some(start) = self.obligation_starts_after {
            push("obligation__start_date__gte", start.to_string());
        }
        if let Some(end) = self.obligation_ends_before {
            push("obligation__end_date__lte", end.to_string());
        }

        query
    }
}
