use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

pub type UserId = i64;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub pwhash: String,
    pub role: Role,
    pub active: bool,
    pub must_change_password: bool,
    pub created: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
}

impl Default for Role {
    fn default() -> Self {
        Role::Staff
    }
}

/// What a client gets to see of a user.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    pub password_change_required: bool,
    pub created: Timestamp,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            password_change_required: user.must_change_password,
            created: user.created,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UsernameChange {
    pub new_username: String,
    pub current_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ActiveChange {
    pub active: bool,
}
