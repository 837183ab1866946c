use crate::{
    analytics::{
        classifier::WORKDAY_START_HOUR,
        direction::resolve_direction,
        window::DateRange,
    },
    api::{
        department::{fetch_department, list_all_departments},
        empty_as_none,
        employee::{fetch_employee_by_qr, list_all_employees},
    },
    auth::auth::AuthUser,
    config::Config,
    error::AppError,
    model::{
        attendance::{AttendanceEvent, AttendanceLog, DepartmentStatistics, Direction},
        department::Department,
        employee::Employee,
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LogFilter {
    /// Only this employee
    #[serde(default, deserialize_with = "empty_as_none")]
    pub employee_id: Option<u64>,
    /// Only employees of this department
    #[serde(default, deserialize_with = "empty_as_none")]
    pub department_id: Option<u64>,
    /// Inclusive, defaults to a week ago
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<String>, format = "date")]
    pub date_from: Option<NaiveDate>,
    /// Inclusive, defaults to today
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<String>, format = "date")]
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PeriodQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<String>, format = "date")]
    pub date_from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<String>, format = "date")]
    pub date_to: Option<NaiveDate>,
}

/// Which attendance rows to load.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogQuery {
    pub employee_id: Option<u64>,
    pub department_id: Option<u64>,
    pub range: Option<DateRange>,
    pub limit: Option<u32>,
}

enum FilterValue {
    U64(u64),
    Date(NaiveDate),
}

/// Joined attendance rows, newest first.
pub async fn fetch_logs(pool: &MySqlPool, q: &LogQuery) -> Result<Vec<AttendanceLog>, sqlx::Error> {
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(employee_id) = q.employee_id {
        where_sql.push_str(" AND a.employee_id = ?");
        args.push(FilterValue::U64(employee_id));
    }

    if let Some(department_id) = q.department_id {
        where_sql.push_str(" AND e.department_id = ?");
        args.push(FilterValue::U64(department_id));
    }

    if let Some(range) = q.range {
        where_sql.push_str(" AND DATE(a.time) >= ? AND DATE(a.time) <= ?");
        args.push(FilterValue::Date(range.from));
        args.push(FilterValue::Date(range.to));
    }

    let limit_sql = if q.limit.is_some() { " LIMIT ?" } else { "" };

    let sql = format!(
        r#"
        SELECT a.id, a.employee_id, a.time, a.type,
               e.name AS employee_name, e.qr_code, d.name AS department_name
        FROM attendance_logs a
        JOIN employees e ON a.employee_id = e.id
        LEFT JOIN departments d ON e.department_id = d.id
        {}
        ORDER BY a.time DESC, a.id DESC{}
        "#,
        where_sql, limit_sql
    );

    debug!(?q, "Fetching attendance logs");

    let mut query = sqlx::query_as::<_, AttendanceLog>(&sql);
    for arg in args {
        query = match arg {
            FilterValue::U64(v) => query.bind(v),
            FilterValue::Date(v) => query.bind(v),
        };
    }
    if let Some(limit) = q.limit {
        query = query.bind(limit);
    }

    query.fetch_all(pool).await
}

async fn last_event(
    pool: &MySqlPool,
    employee_id: u64,
) -> Result<Option<AttendanceEvent>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceEvent>(
        r#"
        SELECT employee_id, time, type
        FROM attendance_logs
        WHERE employee_id = ?
        ORDER BY time DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(employee_id)
    .fetch_optional(pool)
    .await
}

/// SQL form of `classifier::is_late_arrival`.
fn late_arrival_sql() -> String {
    format!(
        "a.type = 'in' AND (HOUR(a.time) > {h} OR (HOUR(a.time) = {h} AND MINUTE(a.time) > 0))",
        h = WORKDAY_START_HOUR
    )
}

pub async fn department_statistics(
    pool: &MySqlPool,
    range: DateRange,
) -> Result<Vec<DepartmentStatistics>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT d.id, d.name,
               COUNT(DISTINCT a.employee_id) AS employee_count,
               COUNT(a.id) AS attendance_count,
               CAST(COALESCE(SUM(CASE WHEN {} THEN 1 ELSE 0 END), 0) AS SIGNED) AS late_count
        FROM departments d
        LEFT JOIN employees e ON d.id = e.department_id
        LEFT JOIN attendance_logs a
               ON e.id = a.employee_id AND DATE(a.time) BETWEEN ? AND ?
        GROUP BY d.id, d.name
        ORDER BY d.name ASC
        "#,
        late_arrival_sql()
    );

    sqlx::query_as::<_, DepartmentStatistics>(&sql)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(pool)
        .await
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ScanRequest {
    #[serde(default)]
    #[schema(example = "EMP5f0c3c1e9a4b4b7e8d2f6a1c0b9e8d7c")]
    pub qr_code: String,
}

#[derive(Serialize, ToSchema)]
pub struct ScanResult {
    pub employee: Employee,
    pub department: Option<Department>,
    pub direction: Direction,
    #[schema(value_type = String, format = "date-time")]
    pub time: NaiveDateTime,
}

#[derive(Serialize, ToSchema)]
pub struct AppliedLogFilter {
    pub employee_id: Option<u64>,
    pub department_id: Option<u64>,
    pub range: DateRange,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceIndexView {
    pub logs: Vec<AttendanceLog>,
    pub employees: Vec<Employee>,
    pub departments: Vec<Department>,
    pub filters: AppliedLogFilter,
}

#[derive(Serialize, ToSchema)]
pub struct StatisticsView {
    pub department_stats: Vec<DepartmentStatistics>,
    pub range: DateRange,
}

/// Register an arrival or departure from a scanned QR code
#[utoipa::path(
    post,
    path = "/attendance/scan",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Scan recorded", body = ScanResult),
        (status = 404, description = "No employee has this QR code", body = Object, example = json!({
            "message": "Employee not found"
        })),
        (status = 422, description = "QR code missing")
    ),
    tag = "Attendance"
)]
#[instrument(name = "attendance_scan", skip(pool, config, payload))]
pub async fn scan(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<ScanRequest>,
) -> Result<impl Responder, AppError> {
    let qr_code = payload.qr_code.trim();
    if qr_code.is_empty() {
        return Err(AppError::validation("QR code is missing", json!({ "qr_code": "" })));
    }

    let employee = fetch_employee_by_qr(pool.get_ref(), qr_code)
        .await?
        .ok_or(AppError::NotFound("Employee"))?;

    let now = config.local_now();
    let now = now.with_nanosecond(0).unwrap_or(now);

    let last = last_event(pool.get_ref(), employee.id).await?;
    let direction = resolve_direction(last.as_ref(), now.date());

    sqlx::query("INSERT INTO attendance_logs (employee_id, time, type) VALUES (?, ?, ?)")
        .bind(employee.id)
        .bind(now)
        .bind(direction.as_ref())
        .execute(pool.get_ref())
        .await?;

    info!(employee_id = employee.id, %direction, time = %now, "Scan recorded");

    let department = match employee.department_id {
        Some(id) => fetch_department(pool.get_ref(), id).await?,
        None => None,
    };

    Ok(HttpResponse::Ok().json(ScanResult {
        employee,
        department,
        direction,
        time: now,
    }))
}

/// Attendance journal with filter options
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(LogFilter),
    responses((status = 200, description = "Attendance journal", body = AttendanceIndexView)),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_logs(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<LogFilter>,
) -> Result<impl Responder, AppError> {
    let range = DateRange::last_week(query.date_from, query.date_to, config.today());

    let logs = fetch_logs(
        pool.get_ref(),
        &LogQuery {
            employee_id: query.employee_id,
            department_id: query.department_id,
            range: Some(range),
            limit: None,
        },
    )
    .await?;

    let employees = list_all_employees(pool.get_ref(), None).await?;
    let departments = list_all_departments(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(AttendanceIndexView {
        logs,
        employees,
        departments,
        filters: AppliedLogFilter {
            employee_id: query.employee_id,
            department_id: query.department_id,
            range,
        },
    }))
}

/// Per-department attendance counts for a period
#[utoipa::path(
    get,
    path = "/api/attendance/statistics",
    params(PeriodQuery),
    responses((status = 200, description = "Department statistics", body = StatisticsView)),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn statistics(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<PeriodQuery>,
) -> Result<impl Responder, AppError> {
    let range = DateRange::month_to_date(query.date_from, query.date_to, config.today());
    let department_stats = department_statistics(pool.get_ref(), range).await?;

    Ok(HttpResponse::Ok().json(StatisticsView {
        department_stats,
        range,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_sql_uses_the_workday_start() {
        let sql = late_arrival_sql();
        assert!(sql.contains("HOUR(a.time) > 9"));
        assert!(sql.contains("MINUTE(a.time) > 0"));
        assert!(sql.starts_with("a.type = 'in'"));
    }
}
