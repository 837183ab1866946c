//! Attendance classification.
//!
//! Each employee window is reduced to a tally of distinct attendance days, late days and
//! early-leave days, turned into percentages and placed in exactly one bucket. The
//! function is pure: same windows in, same analysis out.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::Serialize;
use strum_macros::Display;
use utoipa::ToSchema;

use crate::analytics::window::EmployeeAttendanceWindow;
use crate::model::attendance::{AttendanceEvent, Direction};

/// Arrivals after 09:00 (minute resolution) are late.
pub const WORKDAY_START_HOUR: u32 = 9;
/// Departures before 18:00 are early.
pub const WORKDAY_END_HOUR: u32 = 18;

pub const RISK_PERCENT: f64 = 30.0;
pub const LATE_PERCENT: f64 = 10.0;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Display, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Bucket {
    Disciplined,
    Late,
    Risk,
}

/// `09:00` is on time, `09:01` is late. Seconds are ignored.
pub fn is_late_arrival(time: NaiveTime) -> bool {
    time.hour() > WORKDAY_START_HOUR || (time.hour() == WORKDAY_START_HOUR && time.minute() > 0)
}

pub fn is_early_leave(time: NaiveTime) -> bool {
    time.hour() < WORKDAY_END_HOUR
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub total_days: u32,
    pub late_count: u32,
    pub early_leave_count: u32,
}

impl Tally {
    /// Walks the events in time order. Equal timestamps keep their input order.
    ///
    /// A calendar date contributes at most one late arrival and one early leave, so both
    /// counts stay within `total_days`.
    pub fn from_events(events: &[AttendanceEvent]) -> Self {
        let mut sorted: Vec<&AttendanceEvent> = events.iter().collect();
        sorted.sort_by_key(|e| e.time);

        let mut tally = Tally::default();
        let mut last_date: Option<NaiveDate> = None;
        let mut late_days = BTreeSet::new();
        let mut early_days = BTreeSet::new();

        for event in sorted {
            let date = event.time.date();
            if last_date != Some(date) {
                tally.total_days += 1;
                last_date = Some(date);
            }

            match event.direction {
                Direction::In if is_late_arrival(event.time.time()) => {
                    late_days.insert(date);
                }
                Direction::Out if is_early_leave(event.time.time()) => {
                    early_days.insert(date);
                }
                _ => {}
            }
        }

        tally.late_count = late_days.len() as u32;
        tally.early_leave_count = early_days.len() as u32;
        tally
    }

    pub fn late_percent(&self) -> f64 {
        percent(self.late_count, self.total_days)
    }

    pub fn early_leave_percent(&self) -> f64 {
        percent(self.early_leave_count, self.total_days)
    }
}

fn percent(count: u32, days: u32) -> f64 {
    if days == 0 {
        0.0
    } else {
        100.0 * f64::from(count) / f64::from(days)
    }
}

/// Risk is checked first, so an employee over both thresholds is only ever `Risk`.
pub fn bucket_for(late_percent: f64, early_leave_percent: f64) -> Bucket {
    if late_percent >= RISK_PERCENT || early_leave_percent >= RISK_PERCENT {
        Bucket::Risk
    } else if late_percent >= LATE_PERCENT || early_leave_percent >= LATE_PERCENT {
        Bucket::Late
    } else {
        Bucket::Disciplined
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ClassifiedEmployee {
    pub employee_id: u64,
    pub employee_name: String,
    pub department_name: Option<String>,
    pub late_percent: f64,
    pub early_leave_percent: f64,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceAnalysis {
    pub late_employees: Vec<ClassifiedEmployee>,
    pub disciplined_employees: Vec<ClassifiedEmployee>,
    pub risk_employees: Vec<ClassifiedEmployee>,
}

impl AttendanceAnalysis {
    fn bucket_mut(&mut self, bucket: Bucket) -> &mut Vec<ClassifiedEmployee> {
        match bucket {
            Bucket::Disciplined => &mut self.disciplined_employees,
            Bucket::Late => &mut self.late_employees,
            Bucket::Risk => &mut self.risk_employees,
        }
    }
}

pub fn classify_window(window: &EmployeeAttendanceWindow) -> (Bucket, ClassifiedEmployee) {
    let tally = Tally::from_events(&window.events);
    let late_percent = tally.late_percent();
    let early_leave_percent = tally.early_leave_percent();

    (
        bucket_for(late_percent, early_leave_percent),
        ClassifiedEmployee {
            employee_id: window.employee_id,
            employee_name: window.employee_name.clone(),
            department_name: window.department_name.clone(),
            late_percent,
            early_leave_percent,
        },
    )
}

pub fn classify(windows: &[EmployeeAttendanceWindow]) -> AttendanceAnalysis {
    let mut analysis = AttendanceAnalysis::default();

    for window in windows {
        let (bucket, employee) = classify_window(window);
        analysis.bucket_mut(bucket).push(employee);
    }

    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDateTime};
    use std::collections::HashSet;

    fn at(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn event(raw: &str, direction: Direction) -> AttendanceEvent {
        AttendanceEvent {
            employee_id: 1,
            time: at(raw),
            direction,
        }
    }

    fn window(id: u64, events: Vec<AttendanceEvent>) -> EmployeeAttendanceWindow {
        EmployeeAttendanceWindow {
            employee_id: id,
            employee_name: format!("Employee {id}"),
            department_name: Some("Logistics".to_string()),
            events: events
                .into_iter()
                .map(|e| AttendanceEvent {
                    employee_id: id,
                    ..e
                })
                .collect(),
        }
    }

    /// `days` working days starting 2025-03-03, the first `late_days` of them late.
    fn days_with_late(id: u64, days: i64, late_days: i64) -> EmployeeAttendanceWindow {
        let start = at("2025-03-03 00:00:00");
        let mut events = Vec::new();
        for day in 0..days {
            let base = start + Duration::days(day);
            let arrival = if day < late_days {
                Duration::minutes(9 * 60 + 15)
            } else {
                Duration::minutes(8 * 60 + 45)
            };
            events.push(AttendanceEvent {
                employee_id: id,
                time: base + arrival,
                direction: Direction::In,
            });
            events.push(AttendanceEvent {
                employee_id: id,
                time: base + Duration::hours(18) + Duration::minutes(20),
                direction: Direction::Out,
            });
        }
        window(id, events)
    }

    #[test]
    fn late_arrival_boundary_is_exclusive_of_nine_sharp() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert!(!is_late_arrival(nine));
        assert!(!is_late_arrival(NaiveTime::from_hms_opt(9, 0, 45).unwrap()));
        assert!(is_late_arrival(NaiveTime::from_hms_opt(9, 1, 0).unwrap()));
        assert!(is_late_arrival(NaiveTime::from_hms_opt(10, 0, 0).unwrap()));
        assert!(!is_late_arrival(NaiveTime::from_hms_opt(8, 59, 59).unwrap()));
    }

    #[test]
    fn early_leave_is_any_departure_before_six() {
        assert!(is_early_leave(NaiveTime::from_hms_opt(17, 59, 59).unwrap()));
        assert!(!is_early_leave(NaiveTime::from_hms_opt(18, 0, 0).unwrap()));
    }

    #[test]
    fn scenario_a_late_arrival_on_single_day_is_risk() {
        let w = window(
            1,
            vec![
                event("2025-03-03 09:05:00", Direction::In),
                event("2025-03-03 18:30:00", Direction::Out),
            ],
        );
        let tally = Tally::from_events(&w.events);
        assert_eq!(
            tally,
            Tally {
                total_days: 1,
                late_count: 1,
                early_leave_count: 0
            }
        );

        let (bucket, employee) = classify_window(&w);
        assert_eq!(bucket, Bucket::Risk);
        assert_eq!(employee.late_percent, 100.0);
        assert_eq!(employee.early_leave_percent, 0.0);
    }

    #[test]
    fn scenario_b_on_time_day_is_disciplined() {
        let w = window(
            1,
            vec![
                event("2025-03-03 08:55:00", Direction::In),
                event("2025-03-03 18:05:00", Direction::Out),
            ],
        );
        let (bucket, employee) = classify_window(&w);
        assert_eq!(bucket, Bucket::Disciplined);
        assert_eq!(employee.late_percent, 0.0);
        assert_eq!(employee.early_leave_percent, 0.0);
    }

    #[test]
    fn scenario_c_thirty_percent_is_risk() {
        let (bucket, employee) = classify_window(&days_with_late(1, 10, 3));
        assert_eq!(employee.late_percent, 30.0);
        assert_eq!(bucket, Bucket::Risk);
    }

    #[test]
    fn scenario_d_ten_percent_is_late() {
        let (bucket, employee) = classify_window(&days_with_late(1, 10, 1));
        assert_eq!(employee.late_percent, 10.0);
        assert_eq!(bucket, Bucket::Late);
    }

    #[test]
    fn scenario_e_no_events_is_disciplined_with_zero_percent() {
        let w = window(1, vec![]);
        assert_eq!(Tally::from_events(&w.events).total_days, 0);

        let (bucket, employee) = classify_window(&w);
        assert_eq!(bucket, Bucket::Disciplined);
        assert_eq!(employee.late_percent, 0.0);
        assert_eq!(employee.early_leave_percent, 0.0);
    }

    #[test]
    fn early_leave_alone_can_put_employee_at_risk() {
        let w = window(
            1,
            vec![
                event("2025-03-03 08:30:00", Direction::In),
                event("2025-03-03 17:10:00", Direction::Out),
                event("2025-03-04 08:30:00", Direction::In),
                event("2025-03-04 18:10:00", Direction::Out),
            ],
        );
        let (bucket, employee) = classify_window(&w);
        assert_eq!(employee.early_leave_percent, 50.0);
        assert_eq!(bucket, Bucket::Risk);
    }

    #[test]
    fn days_are_counted_by_calendar_date_not_by_event() {
        let w = window(
            1,
            vec![
                event("2025-03-03 08:30:00", Direction::In),
                event("2025-03-03 12:00:00", Direction::Out),
                event("2025-03-03 13:00:00", Direction::In),
                event("2025-03-03 18:30:00", Direction::Out),
                event("2025-03-05 08:40:00", Direction::In),
            ],
        );
        assert_eq!(Tally::from_events(&w.events).total_days, 2);
    }

    #[test]
    fn unordered_input_is_sorted_before_counting() {
        let ordered = vec![
            event("2025-03-03 08:50:00", Direction::In),
            event("2025-03-03 18:10:00", Direction::Out),
            event("2025-03-04 09:30:00", Direction::In),
            event("2025-03-04 17:00:00", Direction::Out),
            event("2025-03-05 08:50:00", Direction::In),
        ];
        let mut shuffled = ordered.clone();
        shuffled.reverse();
        shuffled.swap(0, 2);

        assert_eq!(Tally::from_events(&ordered), Tally::from_events(&shuffled));
        assert_eq!(Tally::from_events(&shuffled).total_days, 3);
    }

    #[test]
    fn repeated_late_scans_on_one_day_stay_within_one_hundred_percent() {
        let w = window(
            1,
            vec![
                event("2025-03-03 09:30:00", Direction::In),
                event("2025-03-03 12:00:00", Direction::Out),
                event("2025-03-03 13:30:00", Direction::In),
                event("2025-03-03 15:00:00", Direction::Out),
            ],
        );
        let (_, employee) = classify_window(&w);
        assert_eq!(employee.late_percent, 100.0);
        assert_eq!(employee.early_leave_percent, 100.0);
    }

    #[test]
    fn buckets_partition_the_input_and_respect_priority() {
        let windows = vec![
            days_with_late(1, 10, 0),
            days_with_late(2, 10, 1),
            days_with_late(3, 10, 3),
            days_with_late(4, 4, 4),
            window(5, vec![]),
            window(
                6,
                vec![
                    event("2025-03-03 09:40:00", Direction::In),
                    event("2025-03-03 16:00:00", Direction::Out),
                ],
            ),
        ];

        let mut analysis = classify(&windows);

        let mut seen = HashSet::new();
        for bucket in [Bucket::Disciplined, Bucket::Late, Bucket::Risk] {
            for employee in analysis.bucket_mut(bucket).iter() {
                assert!(seen.insert(employee.employee_id), "duplicate employee");
                assert!((0.0..=100.0).contains(&employee.late_percent));
                assert!((0.0..=100.0).contains(&employee.early_leave_percent));

                let over_risk = employee.late_percent >= RISK_PERCENT
                    || employee.early_leave_percent >= RISK_PERCENT;
                assert_eq!(over_risk, bucket == Bucket::Risk);
            }
        }
        assert_eq!(seen.len(), windows.len());

        let mut ids = |b: Bucket| -> Vec<u64> {
            analysis.bucket_mut(b).iter().map(|e| e.employee_id).collect()
        };
        assert_eq!(ids(Bucket::Disciplined), vec![1, 5]);
        assert_eq!(ids(Bucket::Late), vec![2]);
        assert_eq!(ids(Bucket::Risk), vec![3, 4, 6]);
    }

    #[test]
    fn classification_is_idempotent() {
        let windows = vec![days_with_late(1, 10, 2), days_with_late(2, 5, 3)];
        assert_eq!(classify(&windows), classify(&windows));

        let mut reversed = windows.clone();
        for w in &mut reversed {
            w.events.reverse();
        }
        assert_eq!(classify(&windows), classify(&reversed));
    }
}
