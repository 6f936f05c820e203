use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

/// Role decides which parts of the API a caller may reach: employees file
/// expenses, approvers decide them, admins manage users and settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum UserRole {
    Admin,
    Approver,
    Employee,
}

impl UserRole {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "Admin" => Ok(UserRole::Admin),
            "Approver" => Ok(UserRole::Approver),
            "Employee" => Ok(UserRole::Employee),
            other => Err(AppError::validation(format!("unknown role: {other}"))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: UserRole,
    pub location: String,
    pub optional_field1: String,
    pub optional_field2: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    pub name: String,
    pub password: String,
    pub role: UserRole,
    pub location: String,
    #[serde(default)]
    pub optional_field1: String,
    #[serde(default)]
    pub optional_field2: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub name: String,
    pub password: Option<String>,
    pub role: UserRole,
    pub location: String,
    #[serde(default)]
    pub optional_field1: String,
    #[serde(default)]
    pub optional_field2: String,
}

/// Shape the client reads everywhere a user appears in full.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub role: UserRole,
    pub location: String,
    pub optional_field1: String,
    pub optional_field2: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            role: user.role,
            location: user.location,
            optional_field1: user.optional_field1,
            optional_field2: user.optional_field2,
        }
    }
}

/// Abbreviated user used by the approver picker and assignment views.
#[derive(Debug, Serialize, FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub location: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_known_roles() {
        assert_eq!(UserRole::parse("Admin").unwrap(), UserRole::Admin);
        assert_eq!(UserRole::parse("Approver").unwrap(), UserRole::Approver);
        assert_eq!(UserRole::parse("Employee").unwrap(), UserRole::Employee);
    }

    #[test]
    fn parse_rejects_unknown_role() {
        assert!(UserRole::parse("Manager").is_err());
    }
}
