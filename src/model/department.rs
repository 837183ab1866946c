use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Department {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Accounting")]
    pub name: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct DepartmentWithCount {
    pub id: u64,
    pub name: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
    pub employee_count: i64,
}
