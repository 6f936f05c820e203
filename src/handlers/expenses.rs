use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_extra::extract::Multipart;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use uuid::Uuid;

use crate::{
    database::Database,
    error::AppError,
    handlers::users::Message,
    middleware::AuthUser,
    models::{
        build_batch, expense::ensure_decidable, visible_to_approver, Expense, ExpenseFilter,
        ExpenseStatus, ExpenseSubmission, FilterQuery, Settings,
    },
};

// ---- Submission ----

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub message: String,
    pub expense_ids: Vec<Uuid>,
}

/// Files a batch of expenses: every regular item plus every travel leg lands
/// as its own Pending record, inserted in one transaction. Bill uploads are
/// best-effort; a failed transfer is logged and the item is filed without a
/// bill reference.
pub async fn submit_expenses(
    State(db): State<Database>,
    _user: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let (submission, files) = parse_submission(multipart).await?;

    let settings = Settings::load(&db).await?;

    let mut bill_urls = HashMap::new();
    for item in &submission.items {
        let Some(field) = &item.bill_field else {
            continue;
        };
        let Some(file) = files.get(field) else {
            continue;
        };
        match save_bill(file).await {
            Ok(url) => {
                bill_urls.insert(field.clone(), url);
            }
            Err(err) => log::warn!("bill upload for field {field} failed: {err}"),
        }
    }

    let batch = build_batch(&submission, &settings, &bill_urls)?;
    let expense_ids: Vec<Uuid> = batch.iter().map(|row| row.id).collect();

    let mut tx = db.begin().await?;
    for row in &batch {
        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, employee_id, employee_name, location, expense_type, amount,
                recurring_type, status, bill_image_urls, is_convenience,
                travel_details, date_of_spend, date_of_post
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(row.id)
        .bind(row.employee_id)
        .bind(&row.employee_name)
        .bind(&row.location)
        .bind(&row.expense_type)
        .bind(row.amount)
        .bind(row.recurring_type)
        .bind(ExpenseStatus::Pending)
        .bind(&row.bill_image_urls)
        .bind(row.is_convenience)
        .bind(&row.travel_details)
        .bind(row.date_of_spend)
        .bind(row.date_of_post)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            message: "Expenses submitted successfully".to_string(),
            expense_ids,
        }),
    ))
}

// ---- Listings ----

pub async fn employee_expenses(
    State(db): State<Database>,
    _user: AuthUser,
    Path(employee_id): Path<Uuid>,
) -> Result<Json<Vec<Expense>>, AppError> {
    let expenses = sqlx::query_as::<_, Expense>(
        "SELECT * FROM expenses WHERE employee_id = $1 ORDER BY created_at DESC",
    )
    .bind(employee_id)
    .fetch_all(&db)
    .await?;

    Ok(Json(expenses))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingQuery {
    locations: Option<String>,
    approver_id: Option<Uuid>,
}

/// Pending queue for the approver dashboard. Without an approverId this is
/// the unrestricted admin view; with one, only expenses from that approver's
/// assigned employees are visible. No assignments means an empty queue.
pub async fn pending_expenses(
    State(db): State<Database>,
    _user: AuthUser,
    Query(query): Query<PendingQuery>,
) -> Result<Json<Vec<Expense>>, AppError> {
    let location_filter = FilterQuery {
        locations: query.locations,
        ..Default::default()
    }
    .into_filter()?;

    let expenses = match &location_filter.locations {
        Some(locations) => {
            sqlx::query_as::<_, Expense>(
                r#"
                SELECT * FROM expenses
                WHERE status = 'Pending' AND location = ANY($1)
                ORDER BY created_at DESC
                "#,
            )
            .bind(locations)
            .fetch_all(&db)
            .await?
        }
        None => {
            sqlx::query_as::<_, Expense>(
                "SELECT * FROM expenses WHERE status = 'Pending' ORDER BY created_at DESC",
            )
            .fetch_all(&db)
            .await?
        }
    };

    let expenses = match query.approver_id {
        Some(approver_id) => {
            let assigned: HashSet<Uuid> = sqlx::query_scalar(
                "SELECT employee_id FROM assignments WHERE approver_id = $1",
            )
            .bind(approver_id)
            .fetch_all(&db)
            .await?
            .into_iter()
            .collect();

            visible_to_approver(expenses, &assigned)
        }
        None => expenses,
    };

    Ok(Json(expenses))
}

pub async fn all_expenses(
    State(db): State<Database>,
    _user: AuthUser,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Vec<Expense>>, AppError> {
    let filter = query.into_filter()?;
    let expenses = fetch_matching(&db, &filter).await?;
    Ok(Json(expenses))
}

/// Single fetch path shared by the admin listing, analytics, and CSV export,
/// so the same filter always selects the same rows. Sorted by spend date,
/// newest first.
pub(crate) async fn fetch_matching(
    db: &Database,
    filter: &ExpenseFilter,
) -> Result<Vec<Expense>, AppError> {
    let expenses = sqlx::query_as::<_, Expense>(
        "SELECT * FROM expenses ORDER BY date_of_spend DESC, created_at DESC",
    )
    .fetch_all(db)
    .await?;

    Ok(expenses
        .into_iter()
        .filter(|expense| filter.matches(expense))
        .collect())
}

// ---- Decisions ----

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequest {
    approver_name: String,
    #[serde(default)]
    payment_remark: String,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    hold: bool,
}

pub async fn approve_expense(
    State(db): State<Database>,
    user: AuthUser,
    Path(expense_id): Path<Uuid>,
    Json(req): Json<ApproveRequest>,
) -> Result<Json<Message>, AppError> {
    user.require_approver()?;

    let status = if req.hold {
        ExpenseStatus::ApprovedHold
    } else {
        ExpenseStatus::ApprovedPaid
    };

    let result = sqlx::query(
        r#"
        UPDATE expenses
        SET status = $1, approver_name = $2, approval_date = $3,
            payment_remark = $4, feedback = $5
        WHERE id = $6 AND status = 'Pending'
        "#,
    )
    .bind(status)
    .bind(&req.approver_name)
    .bind(Utc::now().date_naive())
    .bind(&req.payment_remark)
    .bind(&req.feedback)
    .bind(expense_id)
    .execute(&db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(decision_rejection(&db, expense_id).await?);
    }

    Ok(Json(Message::new("Expense approved successfully")))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclineRequest {
    approver_name: String,
    #[serde(default)]
    decline_reason: String,
}

pub async fn decline_expense(
    State(db): State<Database>,
    user: AuthUser,
    Path(expense_id): Path<Uuid>,
    Json(req): Json<DeclineRequest>,
) -> Result<Json<Message>, AppError> {
    user.require_approver()?;

    if req.decline_reason.trim().is_empty() {
        return Err(AppError::validation("decline reason is required"));
    }

    let result = sqlx::query(
        r#"
        UPDATE expenses
        SET status = $1, approver_name = $2, approval_date = $3, decline_reason = $4
        WHERE id = $5 AND status = 'Pending'
        "#,
    )
    .bind(ExpenseStatus::Declined)
    .bind(&req.approver_name)
    .bind(Utc::now().date_naive())
    .bind(&req.decline_reason)
    .bind(expense_id)
    .execute(&db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(decision_rejection(&db, expense_id).await?);
    }

    Ok(Json(Message::new("Expense declined successfully")))
}

/// A guarded decision UPDATE touched zero rows: either the id is unknown, or
/// the record already left Pending, possibly through a concurrent decision
/// (the first one wins).
async fn decision_rejection(db: &Database, expense_id: Uuid) -> Result<AppError, AppError> {
    let current: Option<ExpenseStatus> =
        sqlx::query_scalar("SELECT status FROM expenses WHERE id = $1")
            .bind(expense_id)
            .fetch_optional(db)
            .await?;

    match current {
        None => Ok(AppError::NotFound("expense")),
        Some(status) => match ensure_decidable(status) {
            Err(err) => Ok(err),
            Ok(()) => Ok(AppError::InvalidState(
                "expense was updated concurrently".to_string(),
            )),
        },
    }
}

// ---- Multipart parsing and bill storage ----

struct BillFile {
    filename: String,
    data: axum::body::Bytes,
}

/// Splits a submission request into its typed fields and its uploaded bill
/// files, keyed by multipart part name. Each item names the part carrying
/// its bill via `billField` inside the item JSON.
async fn parse_submission(
    mut multipart: Multipart,
) -> Result<(ExpenseSubmission, HashMap<String, BillFile>), AppError> {
    let mut employee_id = None;
    let mut employee_name = None;
    let mut date_of_spend = None;
    let mut location = None;
    let mut items_json = None;
    let mut legs_json = None;
    let mut files = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::validation("malformed multipart body"))?
    {
        let name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };

        if let Some(filename) = field.file_name().map(|s| s.to_string()) {
            let data = field
                .bytes()
                .await
                .map_err(|_| AppError::validation("malformed multipart body"))?;
            if !data.is_empty() {
                files.insert(name, BillFile { filename, data });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|_| AppError::validation("malformed multipart body"))?;

        match name.as_str() {
            "employeeId" => employee_id = Some(value),
            "employeeName" => employee_name = Some(value),
            "dateOfSpend" => date_of_spend = Some(value),
            "location" => location = Some(value),
            "expenseItems" => items_json = Some(value),
            "convenienceExpenses" => legs_json = Some(value),
            _ => (),
        }
    }

    let employee_id = employee_id
        .as_deref()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| AppError::validation("employeeId is required"))?;
    let employee_name = employee_name
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::validation("employeeName is required"))?;
    let date_of_spend: NaiveDate = date_of_spend
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .ok_or_else(|| AppError::validation("dateOfSpend must be a YYYY-MM-DD date"))?;
    let location = location
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::validation("location is required"))?;

    let items = match items_json {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| AppError::validation(format!("invalid expenseItems: {e}")))?,
        None => Vec::new(),
    };
    let travel_legs = match legs_json {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| AppError::validation(format!("invalid convenienceExpenses: {e}")))?,
        None => Vec::new(),
    };

    Ok((
        ExpenseSubmission {
            employee_id,
            employee_name,
            date_of_spend,
            location,
            items,
            travel_legs,
        },
        files,
    ))
}

async fn save_bill(file: &BillFile) -> Result<String, AppError> {
    let bills_dir = PathBuf::from("static/bills");
    if !bills_dir.exists() {
        fs::create_dir_all(&bills_dir)
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?;
    }

    let extension = PathBuf::from(&file.filename)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !["png", "jpg", "jpeg"].contains(&extension.as_str()) {
        return Err(AppError::Upload(format!(
            "unsupported bill file type: {}",
            file.filename
        )));
    }

    let new_file_name = format!("{}.{}", Uuid::new_v4(), extension);
    let file_path = bills_dir.join(&new_file_name);
    fs::write(&file_path, &file.data)
        .await
        .map_err(|e| AppError::Upload(e.to_string()))?;

    Ok(format!("/static/bills/{}", new_file_name))
}
