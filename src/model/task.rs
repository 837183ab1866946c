use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TryFrom<String> for TaskStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Task joined with the names of its assignee and creator.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct TaskView {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
    pub assigned_to: Option<u64>,
    pub created_by: Option<u64>,
    #[schema(value_type = Option<String>, format = "date")]
    pub deadline: Option<NaiveDate>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
    pub assigned_to_name: Option<String>,
    pub created_by_name: Option<String>,
}
