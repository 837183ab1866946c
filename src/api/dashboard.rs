use crate::{
    analytics::window::DateRange,
    api::attendance::{LogQuery, fetch_logs},
    auth::auth::AuthUser,
    config::Config,
    error::AppError,
    model::attendance::AttendanceLog,
};
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

pub const RECENT_EVENTS: u32 = 10;

#[derive(Serialize, ToSchema)]
pub struct DashboardView {
    pub total_employees: i64,
    pub total_departments: i64,
    pub attendance_today: Vec<AttendanceLog>,
    pub recent_attendance: Vec<AttendanceLog>,
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses((status = 200, description = "Head counts and latest scans", body = DashboardView)),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
pub async fn dashboard(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<impl Responder, AppError> {
    let pool = pool.get_ref();

    let total_employees: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees")
        .fetch_one(pool)
        .await?;
    let total_departments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM departments")
        .fetch_one(pool)
        .await?;

    let today = config.today();
    let attendance_today = fetch_logs(
        pool,
        &LogQuery {
            range: Some(DateRange::new(today, today)),
            ..LogQuery::default()
        },
    )
    .await?;

    let recent_attendance = fetch_logs(
        pool,
        &LogQuery {
            limit: Some(RECENT_EVENTS),
            ..LogQuery::default()
        },
    )
    .await?;

    Ok(HttpResponse::Ok().json(DashboardView {
        total_employees,
        total_departments,
        attendance_today,
        recent_attendance,
    }))
}
