use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use once_cell::sync::OnceCell;
use serde_json::{Value, json};

static DEBUG_ERRORS: OnceCell<bool> = OnceCell::new();

pub const GENERIC_FAILURE: &str = "Something went wrong, Contact with system admin";

/// Set once at startup from `APP_DEBUG`.
pub fn set_debug(enabled: bool) {
    let _ = DEBUG_ERRORS.set(enabled);
}

fn debug_enabled() -> bool {
    DEBUG_ERRORS.get().copied().unwrap_or(false)
}

#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "{} not found", _0)]
    NotFound(&'static str),

    /// A required form field was missing or malformed; the submitted values are echoed back.
    #[display(fmt = "{}", message)]
    Validation { message: String, values: Value },

    #[display(fmt = "{}", _0)]
    BadRequest(String),

    #[display(fmt = "{}", _0)]
    Unauthorized(String),

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),

    #[display(fmt = "report error: {}", _0)]
    Report(rust_xlsxwriter::XlsxError),

    #[display(fmt = "internal error: {}", _0)]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>, values: impl serde::Serialize) -> Self {
        AppError::Validation {
            message: message.into(),
            values: serde_json::to_value(values).unwrap_or(Value::Null),
        }
    }

    pub fn required_fields(values: impl serde::Serialize) -> Self {
        Self::validation("Please fill in all required fields", values)
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e)
    }
}

impl From<rust_xlsxwriter::XlsxError> for AppError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        AppError::Report(e)
    }
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(e: argon2::password_hash::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Report(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::NotFound(_) => json!({ "message": self.to_string() }),
            AppError::Validation { message, values } => json!({
                "error": message,
                "values": values,
            }),
            AppError::Database(_) | AppError::Report(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                if debug_enabled() {
                    json!({ "message": GENERIC_FAILURE, "details": self.to_string() })
                } else {
                    json!({ "message": GENERIC_FAILURE })
                }
            }
            _ => json!({ "message": self.to_string() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_json(err: AppError) -> Value {
        let resp = err.error_response();
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn maps_variants_to_status_codes() {
        assert_eq!(
            AppError::NotFound("Employee").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::required_fields(json!({})).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Conflict("busy".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Database(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_web::test]
    async fn validation_echoes_submitted_values() {
        let body = body_json(AppError::required_fields(json!({ "name": "" }))).await;
        assert_eq!(body["error"], "Please fill in all required fields");
        assert_eq!(body["values"]["name"], "");
    }

    #[actix_web::test]
    async fn not_found_names_the_resource() {
        let body = body_json(AppError::NotFound("Department")).await;
        assert_eq!(body["message"], "Department not found");
    }

    #[actix_web::test]
    async fn storage_failures_hide_details_by_default() {
        let body = body_json(AppError::Database(sqlx::Error::RowNotFound)).await;
        assert_eq!(body["message"], GENERIC_FAILURE);
        assert!(body.get("details").is_none());
    }
}
