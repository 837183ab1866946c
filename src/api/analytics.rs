use crate::{
    analytics::{
        classifier::{AttendanceAnalysis, classify},
        client::AnalyticsClient,
        recommendations::{Recommendations, recommend},
        window::{DateRange, EmployeeAttendanceWindow, group_windows},
    },
    api::{
        attendance::{LogQuery, fetch_logs},
        empty_as_none,
    },
    auth::auth::AuthUser,
    config::Config,
    error::AppError,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AnalysisFilter {
    /// Inclusive, defaults to the first day of the month
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<String>, format = "date")]
    pub date_from: Option<NaiveDate>,
    /// Inclusive, defaults to today
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<String>, format = "date")]
    pub date_to: Option<NaiveDate>,
    /// Only this employee
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<u64>)]
    pub employee_id: Option<u64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<u64>)]
    pub department_id: Option<u64>,
}

impl AnalysisFilter {
    /// Month to date unless the filter names its own bounds.
    fn range(&self, today: NaiveDate) -> DateRange {
        DateRange::month_to_date(self.date_from, self.date_to, today)
    }

    fn log_query(&self, range: DateRange) -> LogQuery {
        LogQuery {
            employee_id: self.employee_id,
            department_id: self.department_id,
            range: Some(range),
            limit: None,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AnalysisView {
    pub attendance_data: Vec<EmployeeAttendanceWindow>,
    pub analysis: AttendanceAnalysis,
    pub recommendations: Recommendations,
    pub range: DateRange,
    pub employee_id: Option<u64>,
    pub department_id: Option<u64>,
}

/// Windows for every employee with at least one matching event.
async fn load_windows(
    pool: &MySqlPool,
    query: &LogQuery,
) -> Result<Vec<EmployeeAttendanceWindow>, sqlx::Error> {
    let mut logs = fetch_logs(pool, query).await?;

    // Rows come back newest first
    logs.reverse();
    Ok(group_windows(logs))
}

/// Classify attendance locally
#[utoipa::path(
    get,
    path = "/api/analytics",
    params(AnalysisFilter),
    responses((status = 200, description = "Windows, buckets and recommendations", body = AnalysisView)),
    tag = "Analytics",
    security(("bearer_auth" = []))
)]
pub async fn local_analysis(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<AnalysisFilter>,
) -> Result<impl Responder, AppError> {
    let range = query.range(config.today());
    let attendance_data = load_windows(pool.get_ref(), &query.log_query(range)).await?;

    let analysis = classify(&attendance_data);
    let recommendations = recommend(&analysis);

    info!(
        employees = attendance_data.len(),
        risk = analysis.risk_employees.len(),
        late = analysis.late_employees.len(),
        "Attendance analysis computed"
    );

    Ok(HttpResponse::Ok().json(AnalysisView {
        attendance_data,
        analysis,
        recommendations,
        range,
        employee_id: query.employee_id,
        department_id: query.department_id,
    }))
}

/// Forward attendance windows to the external analysis service
#[utoipa::path(
    post,
    path = "/api/analytics/external",
    request_body = AnalysisFilter,
    responses(
        (status = 200, description = "Payload from the analysis service, or the unavailable marker", body = Object, example = json!({
            "error": "analysis unavailable"
        }))
    ),
    tag = "Analytics",
    security(("bearer_auth" = []))
)]
pub async fn external_analysis(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    client: web::Data<AnalyticsClient>,
    payload: web::Json<AnalysisFilter>,
) -> Result<impl Responder, AppError> {
    let range = payload.range(config.today());
    let windows = load_windows(pool.get_ref(), &payload.log_query(range)).await?;

    Ok(HttpResponse::Ok().json(client.analyze(&windows).await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{middleware::auth_middleware, session::SessionStore};
    use actix_web::{
        App,
        middleware::from_fn,
        test::{TestRequest, call_service, init_service},
    };

    #[test]
    fn filter_accepts_a_json_body() {
        let f: AnalysisFilter = serde_json::from_str(
            r#"{"date_from": "2025-03-01", "date_to": "", "department_id": 4}"#,
        )
        .unwrap();
        assert_eq!(f.date_from, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(f.date_to, None);
        assert_eq!(f.department_id, Some(4));
        assert_eq!(f.employee_id, None);
    }

    #[test]
    fn employee_filter_reaches_the_log_query() {
        let f = web::Query::<AnalysisFilter>::from_query(
            "employee_id=7&date_from=2025-03-01&date_to=2025-03-10",
        )
        .unwrap()
        .into_inner();
        let today = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        let range = f.range(today);
        assert_eq!(range.from, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(range.to, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());

        let q = f.log_query(range);
        assert_eq!(q.employee_id, Some(7));
        assert_eq!(q.department_id, None);
        assert_eq!(q.range, Some(range));
    }

    #[actix_web::test]
    async fn external_analysis_requires_a_session() {
        let app = init_service(
            App::new()
                .app_data(web::Data::new(SessionStore::new(std::time::Duration::from_secs(60))))
                .service(
                    web::scope("/api")
                        .wrap(from_fn(auth_middleware))
                        .route("/analytics/external", web::post().to(external_analysis)),
                ),
        )
        .await;

        let req = TestRequest::post()
            .uri("/api/analytics/external")
            .set_json(serde_json::json!({}))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    }
}
