use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::{
    database::Database,
    error::AppError,
    middleware::AuthUser,
    models::{CreateUser, UpdateUser, User, UserResponse, UserRole, UserSummary},
    utils::hash_password,
};

pub async fn users_list(
    State(db): State<Database>,
    user: AuthUser,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    user.require_admin()?;

    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY name")
        .fetch_all(&db)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(users))
}

pub async fn create_user(
    State(db): State<Database>,
    user: AuthUser,
    Json(req): Json<CreateUser>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    user.require_admin()?;

    if req.name.trim().is_empty() || req.password.is_empty() || req.location.trim().is_empty() {
        return Err(AppError::validation(
            "name, password, role, and location are required",
        ));
    }

    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE name = $1")
        .bind(&req.name)
        .fetch_optional(&db)
        .await?;
    if existing.is_some() {
        return Err(AppError::validation("user with this name already exists"));
    }

    let password_hash = hash_password(&req.password)
        .map_err(|_| AppError::validation("failed to process password"))?;

    let created = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, password_hash, role, location, optional_field1, optional_field2)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&req.name)
    .bind(&password_hash)
    .bind(req.role)
    .bind(&req.location)
    .bind(&req.optional_field1)
    .bind(&req.optional_field2)
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn update_user(
    State(db): State<Database>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateUser>,
) -> Result<Json<Message>, AppError> {
    user.require_admin()?;

    let result = if let Some(password) = req.password.filter(|p| !p.is_empty()) {
        let password_hash = hash_password(&password)
            .map_err(|_| AppError::validation("failed to process password"))?;
        sqlx::query(
            r#"
            UPDATE users
            SET name = $1, role = $2, location = $3, optional_field1 = $4,
                optional_field2 = $5, password_hash = $6
            WHERE id = $7
            "#,
        )
        .bind(&req.name)
        .bind(req.role)
        .bind(&req.location)
        .bind(&req.optional_field1)
        .bind(&req.optional_field2)
        .bind(&password_hash)
        .bind(user_id)
        .execute(&db)
        .await?
    } else {
        sqlx::query(
            r#"
            UPDATE users
            SET name = $1, role = $2, location = $3, optional_field1 = $4,
                optional_field2 = $5
            WHERE id = $6
            "#,
        )
        .bind(&req.name)
        .bind(req.role)
        .bind(&req.location)
        .bind(&req.optional_field1)
        .bind(&req.optional_field2)
        .bind(user_id)
        .execute(&db)
        .await?
    };

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("user"));
    }

    Ok(Json(Message::new("User updated successfully")))
}

pub async fn delete_user(
    State(db): State<Database>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Message>, AppError> {
    user.require_admin()?;

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("user"));
    }

    Ok(Json(Message::new("User deleted successfully")))
}

/// Approver picker: abbreviated users holding the given role.
pub async fn users_by_role(
    State(db): State<Database>,
    _user: AuthUser,
    Path(role): Path<String>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let role = UserRole::parse(&role)?;

    let users = sqlx::query_as::<_, UserSummary>(
        "SELECT id, name, location FROM users WHERE role = $1 ORDER BY name",
    )
    .bind(role)
    .fetch_all(&db)
    .await?;

    Ok(Json(users))
}

use serde::Serialize;

/// Short human-readable confirmation body used by mutation endpoints.
#[derive(Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
