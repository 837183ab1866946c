use chrono::NaiveDate;
use serde::Serialize;
use sqlx::MySqlPool;

use crate::error::AppError;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    OptString(Option<String>),
    U64(u64),
    OptU64(Option<u64>),
    OptDate(Option<NaiveDate>),
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug, PartialEq)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Column names come from code, never from the request, so they are safe to splice in.
pub fn build_update_sql(
    table: &'static str,
    fields: Vec<(&'static str, SqlValue)>,
    id_column: &'static str,
    id_value: u64,
) -> Result<SqlUpdate, AppError> {
    if fields.is_empty() {
        return Err(AppError::BadRequest("No fields provided for update".into()));
    }

    let set_clause = fields
        .iter()
        .map(|(column, _)| format!("{} = ?", column))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {} SET {} WHERE {} = ?", table, set_clause, id_column);

    let mut values: Vec<SqlValue> = fields.into_iter().map(|(_, v)| v).collect();
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::OptString(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::OptU64(v) => query.bind(v),
            SqlValue::OptDate(v) => query.bind(v),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

/// ===============================
/// Constraint failures on writes
/// ===============================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintViolation {
    Unique,
    ForeignKey,
}

/// MySQL reports both kinds under SQLSTATE 23000, so go by the error kind.
pub fn constraint_violation(err: &sqlx::Error) -> Option<ConstraintViolation> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Some(ConstraintViolation::Unique)
        }
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            Some(ConstraintViolation::ForeignKey)
        }
        _ => None,
    }
}

/// A write that points at a row which does not exist is a client error.
pub fn reject_missing_reference(
    err: sqlx::Error,
    message: &str,
    values: impl Serialize,
) -> AppError {
    match constraint_violation(&err) {
        Some(ConstraintViolation::ForeignKey) => AppError::validation(message, values),
        _ => err.into(),
    }
}
