use crate::{
    api::{department::fetch_department, empty_as_none},
    auth::auth::AuthUser,
    error::AppError,
    model::{
        department::Department,
        employee::{Employee, EmployeeWithDepartment},
    },
    utils::{
        db_utils::{
            ConstraintViolation, SqlValue, build_update_sql, constraint_violation, execute_update,
            reject_missing_reference,
        },
        qr_filter,
    },
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

const QR_INSERT_ATTEMPTS: usize = 3;
const UNKNOWN_DEPARTMENT: &str = "Department does not exist";

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct EmployeeForm {
    #[serde(default)]
    #[schema(example = "Aigerim Sadykova")]
    pub name: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(example = 2, value_type = Option<u64>)]
    pub department_id: Option<u64>,
    /// Stored path of an already uploaded photo
    #[serde(default)]
    pub photo: Option<String>,
}

impl EmployeeForm {
    /// Name and department are both required.
    fn validated(&self) -> Result<(&str, u64), AppError> {
        let name = self.name.trim();
        match self.department_id {
            Some(department_id) if !name.is_empty() => Ok((name, department_id)),
            _ => Err(AppError::required_fields(self)),
        }
    }

    fn photo(&self) -> Option<String> {
        self.photo
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
    }
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeDetail {
    pub employee: Employee,
    pub department: Option<Department>,
}

#[derive(Serialize, ToSchema)]
pub struct QrIdentity {
    pub employee_id: u64,
    pub name: String,
    /// Value to encode in the printed QR code
    pub qr_code: String,
}

const EMPLOYEE_COLUMNS: &str = "id, name, department_id, qr_code, photo, created_at";

pub async fn fetch_employee(pool: &MySqlPool, id: u64) -> Result<Option<Employee>, sqlx::Error> {
    sqlx::query_as::<_, Employee>(&format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_employee_by_qr(
    pool: &MySqlPool,
    qr_code: &str,
) -> Result<Option<Employee>, sqlx::Error> {
    sqlx::query_as::<_, Employee>(&format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE qr_code = ?"
    ))
    .bind(qr_code)
    .fetch_optional(pool)
    .await
}

/// All employees, optionally limited to one department, ordered by name.
pub async fn list_all_employees(
    pool: &MySqlPool,
    department_id: Option<u64>,
) -> Result<Vec<Employee>, sqlx::Error> {
    match department_id {
        Some(department_id) => {
            sqlx::query_as::<_, Employee>(&format!(
                "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE department_id = ? ORDER BY name ASC"
            ))
            .bind(department_id)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, Employee>(&format!(
                "SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY name ASC"
            ))
            .fetch_all(pool)
            .await
        }
    }
}

/// `None` means the insert may be retried with a fresh QR token.
fn insert_failure(err: sqlx::Error, attempt: usize, form: &EmployeeForm) -> Option<AppError> {
    match constraint_violation(&err) {
        Some(ConstraintViolation::Unique) if attempt < QR_INSERT_ATTEMPTS => None,
        Some(ConstraintViolation::ForeignKey) => {
            Some(AppError::validation(UNKNOWN_DEPARTMENT, form))
        }
        _ => Some(err.into()),
    }
}

async fn require_employee(pool: &MySqlPool, id: u64) -> Result<Employee, AppError> {
    fetch_employee(pool, id)
        .await?
        .ok_or(AppError::NotFound("Employee"))
}

/// List employees with their department names
#[utoipa::path(
    get,
    path = "/api/employees",
    responses(
        (status = 200, description = "Employees ordered by name", body = Vec<EmployeeWithDepartment>)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<impl Responder, AppError> {
    let employees = sqlx::query_as::<_, EmployeeWithDepartment>(
        r#"
        SELECT e.id, e.name, e.department_id, e.qr_code, e.photo, e.created_at,
               d.name AS department_name
        FROM employees e
        LEFT JOIN departments d ON e.department_id = d.id
        ORDER BY e.name ASC
        "#,
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(employees))
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = EmployeeForm,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 403, description = "Admin only"),
        (status = 422, description = "Required fields missing or unknown department; submitted values echoed back")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<EmployeeForm>,
) -> Result<impl Responder, AppError> {
    auth.require_admin()?;
    let (name, department_id) = payload.validated()?;
    let photo = payload.photo();

    let mut attempt = 0;
    let (id, qr_code) = loop {
        attempt += 1;
        let qr_code = qr_filter::generate_unique_qr_code(pool.get_ref()).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO employees (name, department_id, qr_code, photo, created_at)
            VALUES (?, ?, ?, ?, NOW())
            "#,
        )
        .bind(name)
        .bind(department_id)
        .bind(&qr_code)
        .bind(&photo)
        .execute(pool.get_ref())
        .await;

        match result {
            Ok(done) => break (done.last_insert_id(), qr_code),
            Err(e) => match insert_failure(e, attempt, &payload) {
                // Lost a race for the token; draw another one
                None => warn!(attempt, "QR token already taken at insert time"),
                Some(err) => return Err(err),
            },
        }
    };

    qr_filter::insert(&qr_code);
    info!(employee_id = id, "Employee created");

    let employee = require_employee(pool.get_ref(), id).await?;
    Ok(HttpResponse::Created().json(employee))
}

/// Employee together with their department
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = EmployeeDetail),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, AppError> {
    let employee = require_employee(pool.get_ref(), path.into_inner()).await?;

    let department = match employee.department_id {
        Some(id) => fetch_department(pool.get_ref(), id).await?,
        None => None,
    };

    Ok(HttpResponse::Ok().json(EmployeeDetail {
        employee,
        department,
    }))
}

/// Update Employee. The photo is only replaced when a new one is supplied.
#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    request_body = EmployeeForm,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 404, description = "Employee not found"),
        (status = 422, description = "Required fields missing or unknown department")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<EmployeeForm>,
) -> Result<impl Responder, AppError> {
    auth.require_admin()?;
    let employee_id = path.into_inner();
    require_employee(pool.get_ref(), employee_id).await?;

    let (name, department_id) = payload.validated()?;

    let mut fields = vec![
        ("name", SqlValue::String(name.to_string())),
        ("department_id", SqlValue::U64(department_id)),
    ];
    if let Some(photo) = payload.photo() {
        fields.push(("photo", SqlValue::String(photo)));
    }

    let update = build_update_sql("employees", fields, "id", employee_id)?;
    debug!(sql = %update.sql, employee_id, "Updating employee");
    execute_update(pool.get_ref(), update)
        .await
        .map_err(|e| reject_missing_reference(e, UNKNOWN_DEPARTMENT, &*payload))?;

    let employee = require_employee(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, AppError> {
    auth.require_admin()?;
    let employee = require_employee(pool.get_ref(), path.into_inner()).await?;

    sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(employee.id)
        .execute(pool.get_ref())
        .await?;

    qr_filter::remove(&employee.qr_code);
    info!(employee_id = employee.id, "Employee deleted");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}

/// QR identity for printing a badge
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}/qr",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "QR identity", body = QrIdentity),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn employee_qr(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, AppError> {
    let employee = require_employee(pool.get_ref(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(QrIdentity {
        employee_id: employee.id,
        name: employee.name,
        qr_code: employee.qr_code,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::db_utils::fake::db_error;
    use actix_web::{ResponseError, http::StatusCode};
    use sqlx::error::ErrorKind;

    fn form(name: &str, department_id: Option<u64>, photo: Option<&str>) -> EmployeeForm {
        EmployeeForm {
            name: name.to_string(),
            department_id,
            photo: photo.map(str::to_string),
        }
    }

    #[test]
    fn name_and_department_are_required() {
        assert!(form("", Some(1), None).validated().is_err());
        assert!(form("   ", Some(1), None).validated().is_err());
        assert!(form("Dana", None, None).validated().is_err());

        let ok = form("  Dana ", Some(4), None);
        assert_eq!(ok.validated().unwrap(), ("Dana", 4));
    }

    #[test]
    fn validation_error_carries_the_submitted_form() {
        match form("", Some(2), Some("uploads/photos/a.png")).validated() {
            Err(AppError::Validation { values, .. }) => {
                assert_eq!(values["department_id"], 2);
                assert_eq!(values["photo"], "uploads/photos/a.png");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn blank_photo_is_ignored() {
        assert_eq!(form("Dana", Some(1), Some("  ")).photo(), None);
        assert_eq!(
            form("Dana", Some(1), Some("uploads/photos/p.jpg")).photo(),
            Some("uploads/photos/p.jpg".to_string())
        );
    }

    #[test]
    fn duplicate_token_is_retried_until_the_last_attempt() {
        let f = form("Dana", Some(1), None);
        assert!(insert_failure(db_error(ErrorKind::UniqueViolation), 1, &f).is_none());
        let last = insert_failure(db_error(ErrorKind::UniqueViolation), QR_INSERT_ATTEMPTS, &f);
        assert_eq!(
            last.map(|e| e.status_code()),
            Some(StatusCode::INTERNAL_SERVER_ERROR)
        );
    }

    #[test]
    fn unknown_department_is_not_retried() {
        let f = form("Dana", Some(99), None);
        match insert_failure(db_error(ErrorKind::ForeignKeyViolation), 1, &f) {
            Some(AppError::Validation { message, values }) => {
                assert_eq!(message, UNKNOWN_DEPARTMENT);
                assert_eq!(values["name"], "Dana");
                assert_eq!(values["department_id"], 99);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
