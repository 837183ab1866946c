pub mod analytics;
pub mod attendance;
pub mod dashboard;
pub mod department;
pub mod employee;
pub mod report;
pub mod task;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt::Display;
use std::str::FromStr;

/// HTML forms send `field=` for an untouched select; treat it as "not given".
/// JSON bodies may carry the same field as a number.
pub fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected a string or number, got {other}"
            )));
        }
    };

    match raw.trim() {
        "" => Ok(None),
        v => v.parse::<T>().map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::web::Query;
    use chrono::NaiveDate;

    #[derive(Deserialize)]
    struct Filters {
        #[serde(default, deserialize_with = "empty_as_none")]
        department_id: Option<u64>,
        #[serde(default, deserialize_with = "empty_as_none")]
        date_from: Option<NaiveDate>,
    }

    #[test]
    fn blank_query_values_are_absent() {
        let f = Query::<Filters>::from_query("department_id=&date_from=2025-03-01")
            .unwrap()
            .into_inner();
        assert_eq!(f.department_id, None);
        assert_eq!(f.date_from, NaiveDate::from_ymd_opt(2025, 3, 1));

        let f = Query::<Filters>::from_query("").unwrap().into_inner();
        assert_eq!(f.department_id, None);
    }

    #[test]
    fn json_numbers_and_blank_strings_are_accepted() {
        let f: Filters = serde_json::from_str(r#"{"department_id": 3, "date_from": ""}"#).unwrap();
        assert_eq!(f.department_id, Some(3));
        assert_eq!(f.date_from, None);

        let f: Filters = serde_json::from_str(r#"{"department_id": null}"#).unwrap();
        assert_eq!(f.department_id, None);
    }

    #[test]
    fn malformed_query_values_are_rejected() {
        assert!(Query::<Filters>::from_query("department_id=abc").is_err());
    }
}
