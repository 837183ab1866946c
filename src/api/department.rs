use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::department::{Department, DepartmentWithCount},
    utils::db_utils::{SqlValue, build_update_sql, execute_update},
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct DepartmentForm {
    #[serde(default)]
    #[schema(example = "Accounting")]
    pub name: String,
}

impl DepartmentForm {
    fn validated(&self) -> Result<&str, AppError> {
        let name = self.name.trim();
        if name.is_empty() {
            Err(AppError::required_fields(self))
        } else {
            Ok(name)
        }
    }
}

pub async fn fetch_department(
    pool: &MySqlPool,
    id: u64,
) -> Result<Option<Department>, sqlx::Error> {
    sqlx::query_as::<_, Department>("SELECT id, name, created_at FROM departments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_all_departments(pool: &MySqlPool) -> Result<Vec<Department>, sqlx::Error> {
    sqlx::query_as::<_, Department>("SELECT id, name, created_at FROM departments ORDER BY name ASC")
        .fetch_all(pool)
        .await
}

async fn require_department(pool: &MySqlPool, id: u64) -> Result<Department, AppError> {
    fetch_department(pool, id)
        .await?
        .ok_or(AppError::NotFound("Department"))
}

#[utoipa::path(
    get,
    path = "/api/departments",
    responses(
        (status = 200, description = "Departments with head counts", body = Vec<DepartmentWithCount>)
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn list_departments(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<impl Responder, AppError> {
    let departments = sqlx::query_as::<_, DepartmentWithCount>(
        r#"
        SELECT d.id, d.name, d.created_at, COUNT(e.id) AS employee_count
        FROM departments d
        LEFT JOIN employees e ON d.id = e.department_id
        GROUP BY d.id, d.name, d.created_at
        ORDER BY d.name ASC
        "#,
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(departments))
}

#[utoipa::path(
    post,
    path = "/api/departments",
    request_body = DepartmentForm,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 422, description = "Name missing")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn create_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<DepartmentForm>,
) -> Result<impl Responder, AppError> {
    auth.require_admin()?;
    let name = payload.validated()?;

    let id = sqlx::query("INSERT INTO departments (name, created_at) VALUES (?, NOW())")
        .bind(name)
        .execute(pool.get_ref())
        .await?
        .last_insert_id();

    info!(department_id = id, "Department created");

    let department = require_department(pool.get_ref(), id).await?;
    Ok(HttpResponse::Created().json(department))
}

#[utoipa::path(
    get,
    path = "/api/departments/{department_id}",
    params(("department_id", Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department found", body = Department),
        (status = 404, description = "Department not found")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn get_department(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, AppError> {
    let department = require_department(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(department))
}

#[utoipa::path(
    put,
    path = "/api/departments/{department_id}",
    params(("department_id", Path, description = "Department ID")),
    request_body = DepartmentForm,
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 404, description = "Department not found"),
        (status = 422, description = "Name missing")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn update_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<DepartmentForm>,
) -> Result<impl Responder, AppError> {
    auth.require_admin()?;
    let department_id = path.into_inner();
    require_department(pool.get_ref(), department_id).await?;

    let name = payload.validated()?;
    let update = build_update_sql(
        "departments",
        vec![("name", SqlValue::String(name.to_string()))],
        "id",
        department_id,
    )?;
    execute_update(pool.get_ref(), update).await?;

    let department = require_department(pool.get_ref(), department_id).await?;
    Ok(HttpResponse::Ok().json(department))
}

/// Refused while employees still belong to the department
#[utoipa::path(
    delete,
    path = "/api/departments/{department_id}",
    params(("department_id", Path, description = "Department ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Department still has employees")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn delete_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<impl Responder, AppError> {
    auth.require_admin()?;
    let department = require_department(pool.get_ref(), path.into_inner()).await?;

    let members: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees WHERE department_id = ?")
        .bind(department.id)
        .fetch_one(pool.get_ref())
        .await?;

    if members > 0 {
        return Err(AppError::Conflict(
            "Cannot delete a department that still has employees".into(),
        ));
    }

    sqlx::query("DELETE FROM departments WHERE id = ?")
        .bind(department.id)
        .execute(pool.get_ref())
        .await?;

    info!(department_id = department.id, "Department deleted");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}
