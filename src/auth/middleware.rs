use crate::auth::auth::AuthUser;
use crate::auth::session::SessionStore;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;

pub fn bearer_token(value: &str) -> Option<&str> {
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolves `Authorization: Bearer <token>` into an `AuthUser` for the rest of the request.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let store = req
        .app_data::<Data<SessionStore>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Session store missing"))?;

    let header_value = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or_default().to_string(),
        None => {
            let resp =
                HttpResponse::Unauthorized().json(json!({"message": "Missing Authorization header"}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    let token = match bearer_token(&header_value) {
        Some(t) => t.to_string(),
        None => {
            let resp = HttpResponse::Unauthorized()
                .json(json!({"message": "Authorization header must start with Bearer"}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    let session = match store.get(&token).await {
        Some(s) => s,
        None => {
            let resp =
                HttpResponse::Unauthorized().json(json!({"message": "Invalid or expired session"}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    req.extensions_mut().insert(AuthUser::from_session(session));

    next.call(req).await
}
