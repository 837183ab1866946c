use chrono::NaiveDate;

use crate::model::attendance::{AttendanceEvent, Direction};

/// Per-employee, per-day scan state. Never stored; always inferred from the latest event.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ScanState {
    AwaitingIn,
    AwaitingOut,
}

impl ScanState {
    /// Only an `in` recorded today leaves the employee awaiting `out`. A new date resets.
    pub fn infer(last: Option<&AttendanceEvent>, today: NaiveDate) -> Self {
        match last {
            Some(event) if event.direction == Direction::In && event.time.date() == today => {
                ScanState::AwaitingOut
            }
            _ => ScanState::AwaitingIn,
        }
    }

    pub fn next_direction(self) -> Direction {
        match self {
            ScanState::AwaitingIn => Direction::In,
            ScanState::AwaitingOut => Direction::Out,
        }
    }
}

pub fn resolve_direction(last: Option<&AttendanceEvent>, today: NaiveDate) -> Direction {
    ScanState::infer(last, today).next_direction()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
    }

    fn last(raw: &str, direction: Direction) -> AttendanceEvent {
        AttendanceEvent {
            employee_id: 3,
            time: NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M").unwrap(),
            direction,
        }
    }

    #[test]
    fn first_scan_ever_is_in() {
        assert_eq!(resolve_direction(None, today()), Direction::In);
    }

    #[test]
    fn scan_after_todays_in_is_out() {
        let prior = last("2025-03-04 08:52", Direction::In);
        assert_eq!(ScanState::infer(Some(&prior), today()), ScanState::AwaitingOut);
        assert_eq!(resolve_direction(Some(&prior), today()), Direction::Out);
    }

    #[test]
    fn scan_after_todays_out_is_in_again() {
        let prior = last("2025-03-04 12:30", Direction::Out);
        assert_eq!(resolve_direction(Some(&prior), today()), Direction::In);
    }

    #[test]
    fn unclosed_in_from_yesterday_does_not_carry_over() {
        let prior = last("2025-03-03 08:40", Direction::In);
        assert_eq!(resolve_direction(Some(&prior), today()), Direction::In);
    }

    #[test]
    fn full_day_toggles_between_states() {
        let mut history: Vec<AttendanceEvent> = Vec::new();
        let times = ["08:50", "12:00", "13:00", "18:10"];
        let mut directions = Vec::new();

        for hm in times {
            let direction = resolve_direction(history.last(), today());
            directions.push(direction);
            history.push(last(&format!("2025-03-04 {hm}"), direction));
        }

        assert_eq!(
            directions,
            vec![Direction::In, Direction::Out, Direction::In, Direction::Out]
        );
    }
}
