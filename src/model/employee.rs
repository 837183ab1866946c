use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Aigerim Sadykova",
        "department_id": 2,
        "qr_code": "EMP5f0c3c1e9a4b4b7e8d2f6a1c0b9e8d7c",
        "photo": "uploads/photos/photo_5f0c3c1e.jpg",
        "created_at": "2025-03-01T09:12:00"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "Aigerim Sadykova")]
    pub name: String,

    #[schema(example = 2, nullable = true)]
    pub department_id: Option<u64>,

    /// Opaque identity token printed on the employee's QR badge
    pub qr_code: String,

    #[schema(nullable = true)]
    pub photo: Option<String>,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct EmployeeWithDepartment {
    pub id: u64,
    pub name: String,
    pub department_id: Option<u64>,
    pub qr_code: String,
    pub photo: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: NaiveDateTime,
    pub department_name: Option<String>,
}
