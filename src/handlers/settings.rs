use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    database::Database,
    error::AppError,
    handlers::users::Message,
    middleware::AuthUser,
    models::{settings, Assignment, UserSummary},
};

// ---- Locations and expense types ----

#[derive(Serialize, Deserialize)]
pub struct LocationsBody {
    pub locations: Vec<String>,
}

pub async fn get_locations(
    State(db): State<Database>,
) -> Result<Json<LocationsBody>, AppError> {
    let locations = settings::load_list(&db, settings::LOCATIONS, settings::default_locations).await?;
    Ok(Json(LocationsBody { locations }))
}

pub async fn update_locations(
    State(db): State<Database>,
    user: AuthUser,
    Json(body): Json<LocationsBody>,
) -> Result<Json<LocationsBody>, AppError> {
    user.require_admin()?;
    settings::validate_list("location", &body.locations)?;
    settings::store_list(&db, settings::LOCATIONS, &body.locations).await?;
    Ok(Json(body))
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseTypesBody {
    pub expense_items: Vec<String>,
}

pub async fn get_expense_types(
    State(db): State<Database>,
) -> Result<Json<ExpenseTypesBody>, AppError> {
    let expense_items =
        settings::load_list(&db, settings::EXPENSE_TYPES, settings::default_expense_types).await?;
    Ok(Json(ExpenseTypesBody { expense_items }))
}

pub async fn update_expense_types(
    State(db): State<Database>,
    user: AuthUser,
    Json(body): Json<ExpenseTypesBody>,
) -> Result<Json<ExpenseTypesBody>, AppError> {
    user.require_admin()?;
    settings::validate_list("expense type", &body.expense_items)?;
    settings::store_list(&db, settings::EXPENSE_TYPES, &body.expense_items).await?;
    Ok(Json(body))
}

// ---- Approver assignments ----

pub async fn assignments_list(
    State(db): State<Database>,
    user: AuthUser,
) -> Result<Json<Vec<Assignment>>, AppError> {
    user.require_admin()?;

    let assignments =
        sqlx::query_as::<_, Assignment>("SELECT * FROM assignments ORDER BY created_at DESC")
            .fetch_all(&db)
            .await?;

    Ok(Json(assignments))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub approver_id: Uuid,
    pub approver_name: String,
    pub employee_ids: Vec<Uuid>,
}

/// Binds every listed employee to the approver. Prior bindings for those
/// employees are removed in the same transaction, so an employee never has
/// two active approvers, or none, mid-call.
pub async fn create_assignments(
    State(db): State<Database>,
    user: AuthUser,
    Json(req): Json<AssignRequest>,
) -> Result<Json<Message>, AppError> {
    user.require_admin()?;

    if req.employee_ids.is_empty() {
        return Err(AppError::validation("at least one employee is required"));
    }

    let mut tx = db.begin().await?;

    sqlx::query("DELETE FROM assignments WHERE employee_id = ANY($1)")
        .bind(&req.employee_ids)
        .execute(&mut *tx)
        .await?;

    for employee_id in &req.employee_ids {
        sqlx::query(
            r#"
            INSERT INTO assignments (id, approver_id, approver_name, employee_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(req.approver_id)
        .bind(&req.approver_name)
        .bind(employee_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(Json(Message::new("Approver assignments created successfully")))
}

pub async fn delete_assignment(
    State(db): State<Database>,
    user: AuthUser,
    Path(assignment_id): Path<Uuid>,
) -> Result<Json<Message>, AppError> {
    user.require_admin()?;

    let result = sqlx::query("DELETE FROM assignments WHERE id = $1")
        .bind(assignment_id)
        .execute(&db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("assignment"));
    }

    Ok(Json(Message::new("Assignment deleted successfully")))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproverAssignments {
    pub employee_ids: Vec<Uuid>,
    pub employees: Vec<UserSummary>,
    pub assignments: Vec<Assignment>,
}

pub async fn assignments_for_approver(
    State(db): State<Database>,
    _user: AuthUser,
    Path(approver_id): Path<Uuid>,
) -> Result<Json<ApproverAssignments>, AppError> {
    let assignments = sqlx::query_as::<_, Assignment>(
        "SELECT * FROM assignments WHERE approver_id = $1 ORDER BY created_at DESC",
    )
    .bind(approver_id)
    .fetch_all(&db)
    .await?;

    let employee_ids: Vec<Uuid> = {
        let mut seen = HashSet::new();
        assignments
            .iter()
            .map(|a| a.employee_id)
            .filter(|id| seen.insert(*id))
            .collect()
    };

    let employees = if employee_ids.is_empty() {
        Vec::new()
    } else {
        sqlx::query_as::<_, UserSummary>(
            "SELECT id, name, location FROM users WHERE id = ANY($1) ORDER BY name",
        )
        .bind(&employee_ids)
        .fetch_all(&db)
        .await?
    };

    Ok(Json(ApproverAssignments {
        employee_ids,
        employees,
        assignments,
    }))
}

#[derive(Serialize)]
pub struct EmployeeApprover {
    pub approver: Option<UserSummary>,
}

pub async fn assignment_for_employee(
    State(db): State<Database>,
    _user: AuthUser,
    Path(employee_id): Path<Uuid>,
) -> Result<Json<EmployeeApprover>, AppError> {
    let assignment = sqlx::query_as::<_, Assignment>(
        "SELECT * FROM assignments WHERE employee_id = $1 LIMIT 1",
    )
    .bind(employee_id)
    .fetch_optional(&db)
    .await?;

    let approver = match assignment {
        Some(assignment) => {
            sqlx::query_as::<_, UserSummary>("SELECT id, name, location FROM users WHERE id = $1")
                .bind(assignment.approver_id)
                .fetch_optional(&db)
                .await?
        }
        None => None,
    };

    Ok(Json(EmployeeApprover { approver }))
}
