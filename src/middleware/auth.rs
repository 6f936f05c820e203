use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use crate::{
    database::Database,
    error::AppError,
    models::{User, UserRole},
    utils::verify_token,
};

/// The authenticated caller, resolved from the `Authorization: Bearer`
/// header. The identity layer is deliberately thin: the token names a user,
/// the directory row supplies the trusted role and location.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub role: UserRole,
    pub location: String,
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        match self.role {
            UserRole::Admin => Ok(()),
            _ => Err(AppError::Forbidden),
        }
    }

    /// Decision endpoints are for approvers; admins can also act.
    pub fn require_approver(&self) -> Result<(), AppError> {
        match self.role {
            UserRole::Admin | UserRole::Approver => Ok(()),
            _ => Err(AppError::Forbidden),
        }
    }
}

#[async_trait]
impl FromRequestParts<Database> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, db: &Database) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;

        let claims = verify_token(token).map_err(|_| AppError::Unauthorized)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(db)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser {
            id: user.id,
            name: user.name,
            role: user.role,
            location: user.location,
        })
    }
}
