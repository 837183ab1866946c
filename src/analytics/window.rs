use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::attendance::{AttendanceEvent, AttendanceLog};

/// Every event of one employee inside a queried date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmployeeAttendanceWindow {
    pub employee_id: u64,
    pub employee_name: String,
    pub department_name: Option<String>,
    #[serde(rename = "logs")]
    pub events: Vec<AttendanceEvent>,
}

/// Inclusive calendar range, always stored with `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct DateRange {
    #[schema(value_type = String, format = "date")]
    pub from: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub to: NaiveDate,
}

impl DateRange {
    /// Accepts the bounds in either order.
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            Self { from: a, to: b }
        } else {
            Self { from: b, to: a }
        }
    }

    /// Fills missing bounds with `default_from` and `today`.
    pub fn resolve(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        default_from: NaiveDate,
        today: NaiveDate,
    ) -> Self {
        Self::new(from.unwrap_or(default_from), to.unwrap_or(today))
    }

    /// First day of the current month through today.
    pub fn month_to_date(from: Option<NaiveDate>, to: Option<NaiveDate>, today: NaiveDate) -> Self {
        Self::resolve(from, to, first_of_month(today), today)
    }

    /// The trailing week through today.
    pub fn last_week(from: Option<NaiveDate>, to: Option<NaiveDate>, today: NaiveDate) -> Self {
        Self::resolve(from, to, today - Duration::days(7), today)
    }
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Groups joined log rows by employee, keeping employees in order of first appearance
/// and events in row order.
pub fn group_windows<I>(logs: I) -> Vec<EmployeeAttendanceWindow>
where
    I: IntoIterator<Item = AttendanceLog>,
{
    let mut index: HashMap<u64, usize> = HashMap::new();
    let mut windows: Vec<EmployeeAttendanceWindow> = Vec::new();

    for log in logs {
        let slot = *index.entry(log.employee_id).or_insert_with(|| {
            windows.push(EmployeeAttendanceWindow {
                employee_id: log.employee_id,
                employee_name: log.employee_name.clone(),
                department_name: log.department_name.clone(),
                events: Vec::new(),
            });
            windows.len() - 1
        });
        windows[slot].events.push(log.event());
    }

    windows
}
