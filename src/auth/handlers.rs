use crate::{
    auth::{
        auth::AuthUser,
        middleware::bearer_token,
        password::{hash_password, verify_password},
        session::{Session, SessionStore},
    },
    error::AppError,
    model::{role::Role, user::User},
    utils::db_utils::{ConstraintViolation, constraint_violation},
    models::{CreateUserReq, LoginReqDto, LoginResponse, MeResponse},
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, info, instrument, warn};

async fn insert_user(
    pool: &MySqlPool,
    username: &str,
    password: &str,
    role: Role,
    employee_id: Option<u64>,
) -> Result<u64, AppError> {
    let hashed = hash_password(password)?;

    let result = sqlx::query(
        r#"INSERT INTO users (username, password_hash, role, employee_id) VALUES (?, ?, ?, ?)"#,
    )
    .bind(username)
    .bind(hashed)
    .bind(role.as_ref())
    .bind(employee_id)
    .execute(pool)
    .await;

    result
        .map(|done| done.last_insert_id())
        .map_err(|e| user_insert_failure(e, username, role, employee_id))
}

fn user_insert_failure(
    err: sqlx::Error,
    username: &str,
    role: Role,
    employee_id: Option<u64>,
) -> AppError {
    match constraint_violation(&err) {
        Some(ConstraintViolation::Unique) => AppError::Conflict("Username already exists".into()),
        Some(ConstraintViolation::ForeignKey) => AppError::validation(
            "Employee does not exist",
            json!({ "username": username, "role": role.as_ref(), "employee_id": employee_id }),
        ),
        None => err.into(),
    }
}

/// Seeds the first admin account when the users table is empty.
pub async fn ensure_bootstrap_admin(
    pool: &MySqlPool,
    username: &str,
    password: &str,
) -> Result<(), AppError> {
    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    if users == 0 {
        insert_user(pool, username, password, Role::Admin, None).await?;
        info!(username, "Bootstrap admin created");
    }

    Ok(())
}

/// 401 that hands the username back so the login form can be refilled.
fn invalid_credentials(username: &str) -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({
        "message": "Invalid username or password",
        "values": { "username": username }
    }))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Session opened", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 422, description = "Username or password missing")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, sessions, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(AppError::validation(
            "Username and password are required",
            json!({ "username": user.username }),
        ));
    }

    let db_user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password_hash, role, employee_id
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(user.username.trim())
    .fetch_optional(pool.get_ref())
    .await?;

    let db_user = match db_user {
        Some(u) => u,
        None => {
            info!("Invalid credentials: user not found");
            return Ok(invalid_credentials(&user.username));
        }
    };

    debug!(user_id = db_user.id, "Verifying password");

    if let Err(e) = verify_password(&user.password, &db_user.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Ok(invalid_credentials(&user.username));
    }

    let token = sessions
        .create(Session {
            user_id: db_user.id,
            username: db_user.username,
            role: db_user.role,
            employee_id: db_user.employee_id,
        })
        .await;

    info!("Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        expires_in: sessions.ttl().as_secs(),
    }))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Session closed (idempotent)")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(req: HttpRequest, sessions: web::Data<SessionStore>) -> impl Responder {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token);

    if let Some(token) = token {
        sessions.revoke(token).await;
    }

    HttpResponse::NoContent().finish()
}

#[utoipa::path(
    get,
    path = "/api/me",
    responses((status = 200, description = "Current session", body = MeResponse)),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser) -> impl Responder {
    HttpResponse::Ok().json(MeResponse {
        user_id: auth.user_id,
        username: auth.username,
        role: auth.role,
        employee_id: auth.employee_id,
    })
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserReq,
    responses(
        (status = 201, description = "User created"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Username already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUserReq>,
) -> Result<impl Responder, AppError> {
    auth.require_admin()?;

    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(AppError::validation(
            "Username and password are required",
            json!({ "username": payload.username, "role": payload.role }),
        ));
    }

    let id = insert_user(
        pool.get_ref(),
        username,
        &payload.password,
        payload.role,
        payload.employee_id,
    )
    .await
    .inspect_err(|e| warn!(error = %e, username, "Failed to create user"))?;

    Ok(HttpResponse::Created().json(json!({
        "id": id,
        "message": "User created successfully"
    })))
}
