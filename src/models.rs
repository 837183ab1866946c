use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "admin")]
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    /// Opaque session token, sent back as `Authorization: Bearer <token>`
    pub token: String,
    /// Seconds until the session expires
    #[schema(example = 3600)]
    pub expires_in: u64,
}

#[derive(Serialize, ToSchema)]
pub struct MeResponse {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
    pub employee_id: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateUserReq {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub employee_id: Option<u64>,
}
