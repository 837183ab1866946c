use crate::analytics::classifier::{AttendanceAnalysis, Bucket, ClassifiedEmployee};
use crate::analytics::recommendations::{EmployeeRecommendation, Recommendations};
use crate::analytics::window::{DateRange, EmployeeAttendanceWindow};
use crate::api::analytics::{AnalysisFilter, AnalysisView};
use crate::api::attendance::{
    AppliedLogFilter, AttendanceIndexView, LogFilter, PeriodQuery, ScanRequest, ScanResult,
    StatisticsView,
};
use crate::api::dashboard::DashboardView;
use crate::api::department::DepartmentForm;
use crate::api::employee::{EmployeeDetail, EmployeeForm, QrIdentity};
use crate::api::report::ReportForm;
use crate::api::task::{StatusForm, TaskBoard, TaskFilter, TaskForm};
use crate::model::attendance::{AttendanceEvent, AttendanceLog, DepartmentStatistics, Direction};
use crate::model::department::{Department, DepartmentWithCount};
use crate::model::employee::{Employee, EmployeeWithDepartment};
use crate::model::role::Role;
use crate::model::task::{TaskStatus, TaskView};
use crate::models::{CreateUserReq, LoginReqDto, LoginResponse, MeResponse};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Tracker API",
        version = "1.0.0",
        description = r#"
## Attendance and task tracking

Staff scan a QR badge at the entrance; the first scan of the day is an arrival,
the next one a departure.

### Features
- **Attendance**: QR scan, attendance journal, per-department statistics
- **Analytics**: late / disciplined / risk classification with recommendations
- **Employees and departments**: CRUD, QR identity per employee
- **Tasks**: board grouped by status
- **Reports**: Excel export

### Security
Everything under `/api` needs `Authorization: Bearer <token>` from `POST /auth/login`.
Employee and department changes are admin only; task changes need a manager or admin.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,
        crate::auth::handlers::create_user,

        crate::api::attendance::scan,
        crate::api::attendance::list_logs,
        crate::api::attendance::statistics,

        crate::api::analytics::local_analysis,
        crate::api::analytics::external_analysis,

        crate::api::dashboard::dashboard,

        crate::api::employee::list_employees,
        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::employee_qr,

        crate::api::department::list_departments,
        crate::api::department::create_department,
        crate::api::department::get_department,
        crate::api::department::update_department,
        crate::api::department::delete_department,

        crate::api::task::list_tasks,
        crate::api::task::create_task,
        crate::api::task::get_task,
        crate::api::task::update_task,
        crate::api::task::update_task_status,
        crate::api::task::delete_task,

        crate::api::report::generate_report
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            MeResponse,
            CreateUserReq,
            Role,
            ScanRequest,
            ScanResult,
            Direction,
            AttendanceEvent,
            AttendanceLog,
            DepartmentStatistics,
            LogFilter,
            PeriodQuery,
            AppliedLogFilter,
            AttendanceIndexView,
            StatisticsView,
            DateRange,
            EmployeeAttendanceWindow,
            Bucket,
            ClassifiedEmployee,
            AttendanceAnalysis,
            EmployeeRecommendation,
            Recommendations,
            AnalysisFilter,
            AnalysisView,
            DashboardView,
            Employee,
            EmployeeWithDepartment,
            EmployeeForm,
            EmployeeDetail,
            QrIdentity,
            Department,
            DepartmentWithCount,
            DepartmentForm,
            TaskStatus,
            TaskView,
            TaskFilter,
            TaskForm,
            StatusForm,
            TaskBoard,
            ReportForm
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, logout and user accounts"),
        (name = "Attendance", description = "QR scans and the attendance journal"),
        (name = "Analytics", description = "Attendance classification"),
        (name = "Dashboard", description = "Overview counters"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Department", description = "Department management APIs"),
        (name = "Task", description = "Task board"),
        (name = "Report", description = "Spreadsheet export"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .description(Some("Session token from /auth/login"))
                    .build(),
            ),
        );
    }
}
