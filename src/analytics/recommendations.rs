use serde::Serialize;
use utoipa::ToSchema;

use crate::analytics::classifier::AttendanceAnalysis;

pub const GENERAL_ADVICE: &str = "Based on the attendance analysis, pay attention to employees \
with a high share of late arrivals and early departures.";

pub const RISK_ADVICE: &str =
    "Talk with the employee about the importance of keeping to the work schedule.";

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EmployeeRecommendation {
    pub employee_id: u64,
    pub employee_name: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Recommendations {
    pub general: String,
    pub specific: Vec<EmployeeRecommendation>,
}

/// One general line, plus one line per employee in the risk bucket.
pub fn recommend(analysis: &AttendanceAnalysis) -> Recommendations {
    Recommendations {
        general: GENERAL_ADVICE.to_string(),
        specific: analysis
            .risk_employees
            .iter()
            .map(|employee| EmployeeRecommendation {
                employee_id: employee.employee_id,
                employee_name: employee.employee_name.clone(),
                recommendation: RISK_ADVICE.to_string(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::classifier::ClassifiedEmployee;

    fn employee(id: u64, late: f64) -> ClassifiedEmployee {
        ClassifiedEmployee {
            employee_id: id,
            employee_name: format!("E{id}"),
            department_name: None,
            late_percent: late,
            early_leave_percent: 0.0,
        }
    }

    #[test]
    fn only_risk_employees_get_specific_advice() {
        let analysis = AttendanceAnalysis {
            late_employees: vec![employee(1, 15.0)],
            disciplined_employees: vec![employee(2, 0.0)],
            risk_employees: vec![employee(3, 40.0), employee(4, 100.0)],
        };

        let recs = recommend(&analysis);
        assert_eq!(recs.general, GENERAL_ADVICE);
        let names: Vec<_> = recs.specific.iter().map(|r| r.employee_name.as_str()).collect();
        assert_eq!(names, vec!["E3", "E4"]);
        assert!(recs.specific.iter().all(|r| r.recommendation == RISK_ADVICE));
    }

    #[test]
    fn empty_analysis_still_has_general_advice() {
        let recs = recommend(&AttendanceAnalysis::default());
        assert!(recs.specific.is_empty());
        assert!(!recs.general.is_empty());
    }
}
