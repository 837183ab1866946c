use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Whether a scan is an arrival or a departure.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl TryFrom<String> for Direction {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One QR scan. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceEvent {
    pub employee_id: u64,
    #[schema(value_type = String, format = "date-time", example = "2025-03-03T08:55:00")]
    pub time: NaiveDateTime,
    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    pub direction: Direction,
}

/// An `attendance_logs` row joined with its employee and department.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceLog {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date-time")]
    pub time: NaiveDateTime,
    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    pub direction: Direction,
    pub employee_name: String,
    pub qr_code: String,
    pub department_name: Option<String>,
}

impl AttendanceLog {
    pub fn event(&self) -> AttendanceEvent {
        AttendanceEvent {
            employee_id: self.employee_id,
            time: self.time,
            direction: self.direction,
        }
    }
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct DepartmentStatistics {
    pub id: u64,
    pub name: String,
    pub employee_count: i64,
    pub attendance_count: i64,
    pub late_count: i64,
}
