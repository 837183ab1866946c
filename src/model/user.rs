use crate::model::role::Role;

#[derive(Debug, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub employee_id: Option<u64>,
}
