use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    database::Database,
    error::AppError,
    models::{User, UserResponse},
    utils::{create_token, verify_password, verify_token},
};

#[derive(Deserialize)]
pub struct LoginRequest {
    name: String,
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    token: String,
    user: UserResponse,
}

pub async fn login(
    State(db): State<Database>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if req.name.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::validation("name and password are required"));
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE name = $1")
        .bind(&req.name)
        .fetch_optional(&db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&req.password, &user.password_hash).unwrap_or(false) {
        return Err(AppError::Unauthorized);
    }

    let token =
        create_token(user.id, user.name.clone()).map_err(|_| AppError::Unauthorized)?;

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    token: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    user: UserResponse,
}

pub async fn verify(
    State(db): State<Database>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, AppError> {
    let claims = verify_token(&req.token).map_err(|_| AppError::Unauthorized)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&db)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    Ok(Json(VerifyResponse { user: user.into() }))
}
