use std::collections::HashMap;

use crate::{
    analytics::{classifier::is_late_arrival, window::DateRange},
    api::{
        attendance::{LogQuery, department_statistics, fetch_logs},
        department::{fetch_department, list_all_departments},
        empty_as_none,
        employee::list_all_employees,
    },
    auth::auth::AuthUser,
    config::Config,
    error::AppError,
    model::{
        attendance::{AttendanceLog, DepartmentStatistics, Direction},
        department::Department,
        employee::Employee,
    },
    utils::spreadsheet::{Cell, Report, XLSX_CONTENT_TYPE},
};
use actix_web::{
    HttpResponse, Responder,
    http::header::{CacheControl, CacheDirective, ContentDisposition, DispositionParam, DispositionType},
    web,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use strum_macros::{Display, EnumString};
use tracing::info;
use utoipa::ToSchema;

pub const REPORT_FILENAME: &str = "report.xlsx";
const ALL_DEPARTMENTS: &str = "All departments";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ReportKind {
    Attendance,
    Employee,
    Department,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ReportForm {
    /// One of `attendance`, `employee`, `department`
    #[serde(default)]
    #[schema(example = "attendance")]
    pub report_type: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<u64>)]
    pub department_id: Option<u64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<String>, format = "date")]
    pub date_from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[schema(value_type = Option<String>, format = "date")]
    pub date_to: Option<NaiveDate>,
}

impl ReportForm {
    fn kind(&self) -> Result<ReportKind, AppError> {
        self.report_type
            .trim()
            .parse()
            .map_err(|_| AppError::validation("Unknown report type", self))
    }
}

fn period_line(range: DateRange) -> String {
    format!("Period: {} to {}", range.from, range.to)
}

fn department_line(department: Option<&Department>) -> String {
    format!(
        "Department: {}",
        department.map_or(ALL_DEPARTMENTS, |d| d.name.as_str())
    )
}

fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::In => "In",
        Direction::Out => "Out",
    }
}

pub fn attendance_report(
    logs: Vec<AttendanceLog>,
    department: Option<&Department>,
    range: DateRange,
) -> Report {
    Report {
        title: "Attendance report".into(),
        subtitles: vec![department_line(department), period_line(range)],
        column_headers: ["Employee", "Department", "Date and time", "Type"]
            .map(String::from)
            .to_vec(),
        rows: logs
            .into_iter()
            .map(|log| {
                vec![
                    Cell::from(log.employee_name),
                    Cell::from(log.department_name),
                    Cell::from(log.time.format("%Y-%m-%d %H:%M:%S").to_string()),
                    Cell::from(direction_label(log.direction)),
                ]
            })
            .collect(),
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ScanCounts {
    ins: i64,
    outs: i64,
    late: i64,
}

/// Every listed employee gets a row, even with no scans in the period.
pub fn employee_report(
    employees: &[Employee],
    department_names: &HashMap<u64, String>,
    logs: &[AttendanceLog],
    department: Option<&Department>,
    range: DateRange,
) -> Report {
    let mut counts: HashMap<u64, ScanCounts> = HashMap::new();
    for log in logs {
        let entry = counts.entry(log.employee_id).or_default();
        match log.direction {
            Direction::In => {
                entry.ins += 1;
                if is_late_arrival(log.time.time()) {
                    entry.late += 1;
                }
            }
            Direction::Out => entry.outs += 1,
        }
    }

    Report {
        title: "Employee report".into(),
        subtitles: vec![department_line(department), period_line(range)],
        column_headers: [
            "Employee",
            "Department",
            "Arrivals",
            "Departures",
            "Late arrivals",
        ]
        .map(String::from)
        .to_vec(),
        rows: employees
            .iter()
            .map(|employee| {
                let c = counts.get(&employee.id).copied().unwrap_or_default();
                let department_name = employee
                    .department_id
                    .and_then(|id| department_names.get(&id).cloned());
                vec![
                    Cell::from(employee.name.clone()),
                    Cell::from(department_name),
                    Cell::from(c.ins),
                    Cell::from(c.outs),
                    Cell::from(c.late),
                ]
            })
            .collect(),
    }
}

pub fn department_report(stats: Vec<DepartmentStatistics>, range: DateRange) -> Report {
    Report {
        title: "Department report".into(),
        subtitles: vec![period_line(range)],
        column_headers: ["Department", "Employees", "Scans", "Late arrivals"]
            .map(String::from)
            .to_vec(),
        rows: stats
            .into_iter()
            .map(|s| {
                vec![
                    Cell::from(s.name),
                    Cell::from(s.employee_count),
                    Cell::from(s.attendance_count),
                    Cell::from(s.late_count),
                ]
            })
            .collect(),
    }
}

async fn build_report(
    pool: &MySqlPool,
    kind: ReportKind,
    department_id: Option<u64>,
    range: DateRange,
) -> Result<Report, AppError> {
    // An unknown department id falls back to all departments in the subtitle
    let department = match department_id {
        Some(id) => fetch_department(pool, id).await?,
        None => None,
    };

    let report = match kind {
        ReportKind::Attendance => {
            let logs = fetch_logs(
                pool,
                &LogQuery {
                    department_id,
                    range: Some(range),
                    ..LogQuery::default()
                },
            )
            .await?;
            attendance_report(logs, department.as_ref(), range)
        }
        ReportKind::Employee => {
            let employees = list_all_employees(pool, department_id).await?;
            let department_names: HashMap<u64, String> = list_all_departments(pool)
                .await?
                .into_iter()
                .map(|d| (d.id, d.name))
                .collect();
            let logs = fetch_logs(
                pool,
                &LogQuery {
                    department_id,
                    range: Some(range),
                    ..LogQuery::default()
                },
            )
            .await?;
            employee_report(
                &employees,
                &department_names,
                &logs,
                department.as_ref(),
                range,
            )
        }
        ReportKind::Department => {
            department_report(department_statistics(pool, range).await?, range)
        }
    };

    Ok(report)
}

/// Download a report as an Excel workbook
#[utoipa::path(
    post,
    path = "/api/reports",
    request_body = ReportForm,
    responses(
        (status = 200, description = "report.xlsx", content_type = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        (status = 422, description = "Unknown report type")
    ),
    tag = "Report",
    security(("bearer_auth" = []))
)]
pub async fn generate_report(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<ReportForm>,
) -> Result<impl Responder, AppError> {
    let kind = payload.kind()?;
    let range = DateRange::month_to_date(payload.date_from, payload.date_to, config.today());

    let report = build_report(pool.get_ref(), kind, payload.department_id, range).await?;
    let bytes = report.to_xlsx()?;

    info!(%kind, rows = report.rows.len(), "Report generated");

    Ok(HttpResponse::Ok()
        .content_type(XLSX_CONTENT_TYPE)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(REPORT_FILENAME.to_string())],
        })
        .insert_header(CacheControl(vec![CacheDirective::MaxAge(0)]))
        .body(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        )
    }

    fn log(employee_id: u64, time: &str, direction: Direction) -> AttendanceLog {
        AttendanceLog {
            id: 0,
            employee_id,
            time: at(time),
            direction,
            employee_name: format!("Employee {employee_id}"),
            qr_code: format!("EMP{employee_id}"),
            department_name: None,
        }
    }

    fn employee(id: u64, department_id: Option<u64>) -> Employee {
        Employee {
            id,
            name: format!("Employee {id}"),
            department_id,
            qr_code: format!("EMP{id}"),
            photo: None,
            created_at: at("2025-01-01 00:00"),
        }
    }

    #[test]
    fn report_type_must_be_known() {
        let form = |t: &str| ReportForm {
            report_type: t.into(),
            department_id: None,
            date_from: None,
            date_to: None,
        };
        assert_eq!(form("employee").kind().unwrap(), ReportKind::Employee);
        assert!(matches!(
            form("payroll").kind(),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn attendance_report_labels_direction_and_department() {
        let report = attendance_report(
            vec![log(1, "2025-03-03 08:55", Direction::In)],
            None,
            range(),
        );
        assert_eq!(report.subtitles[0], "Department: All departments");
        assert_eq!(report.subtitles[1], "Period: 2025-03-01 to 2025-03-31");
        assert_eq!(report.rows[0][2], Cell::Text("2025-03-03 08:55:00".into()));
        assert_eq!(report.rows[0][3], Cell::Text("In".into()));
        assert_eq!(report.rows[0][1], Cell::Text(String::new()));
    }

    #[test]
    fn employee_report_counts_scans_and_late_arrivals() {
        let logs = vec![
            log(1, "2025-03-03 09:00", Direction::In),
            log(1, "2025-03-03 18:00", Direction::Out),
            log(1, "2025-03-04 09:01", Direction::In),
            log(1, "2025-03-05 10:30", Direction::In),
        ];
        let names = HashMap::from([(7, "Sales".to_string())]);
        let report = employee_report(
            &[employee(1, Some(7)), employee(2, None)],
            &names,
            &logs,
            None,
            range(),
        );

        assert_eq!(report.rows.len(), 2);
        assert_eq!(
            report.rows[0],
            vec![
                Cell::Text("Employee 1".into()),
                Cell::Text("Sales".into()),
                Cell::Number(3.0),
                Cell::Number(1.0),
                Cell::Number(2.0),
            ]
        );
        assert_eq!(report.rows[1][2], Cell::Number(0.0));
    }

    #[test]
    fn department_report_has_only_the_period_subtitle() {
        let report = department_report(
            vec![DepartmentStatistics {
                id: 1,
                name: "Sales".into(),
                employee_count: 4,
                attendance_count: 30,
                late_count: 5,
            }],
            range(),
        );
        assert_eq!(report.subtitles.len(), 1);
        assert_eq!(report.rows[0][3], Cell::Number(5.0));
        assert!(report.to_xlsx().unwrap().starts_with(b"PK"));
    }
}
