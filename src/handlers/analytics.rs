use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Json},
};
use chrono::Utc;

use crate::{
    database::Database,
    error::AppError,
    handlers::expenses::fetch_matching,
    middleware::AuthUser,
    models::{AnalyticsReport, Expense, FilterQuery},
};

/// Aggregate view of approved spend. The status parameter is not honored
/// here: approved-only is the aggregator's own rule, not a caller choice.
pub async fn get_analytics(
    State(db): State<Database>,
    _user: AuthUser,
    Query(query): Query<FilterQuery>,
) -> Result<Json<AnalyticsReport>, AppError> {
    let mut filter = query.into_filter()?;
    filter.status = None;

    let expenses = fetch_matching(&db, &filter).await?;
    Ok(Json(AnalyticsReport::from_expenses(&expenses)))
}

/// Flat export of whatever the filters select, any status included. One row
/// per expense, no aggregation.
pub async fn export_csv(
    State(db): State<Database>,
    _user: AuthUser,
    Query(query): Query<FilterQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = query.into_filter()?;
    let expenses = fetch_matching(&db, &filter).await?;
    let csv = render_csv(&expenses);

    let filename = format!("expenses_{}.csv", Utc::now().timestamp_millis());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    ))
}

const CSV_HEADER: [&str; 12] = [
    "Date of Spend",
    "Date of Post",
    "Employee Name",
    "Location",
    "Expense Type",
    "Amount",
    "Recurring Type",
    "Status",
    "Approver",
    "Approval Date",
    "Payment Remark",
    "Decline Reason",
];

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

pub(crate) fn render_csv(expenses: &[Expense]) -> String {
    let mut rows = Vec::with_capacity(expenses.len() + 1);
    rows.push(CSV_HEADER.join(","));

    for expense in expenses {
        let fields = [
            expense.date_of_spend.to_string(),
            expense.date_of_post.to_string(),
            expense.employee_name.clone(),
            expense.location.clone(),
            expense.expense_type.clone(),
            expense.amount.to_string(),
            expense.recurring_type.to_string(),
            expense.status.to_string(),
            expense.approver_name.clone().unwrap_or_default(),
            expense
                .approval_date
                .map(|d| d.to_string())
                .unwrap_or_default(),
            expense.payment_remark.clone().unwrap_or_default(),
            expense.decline_reason.clone().unwrap_or_default(),
        ];
        rows.push(
            fields
                .iter()
                .map(|field| quote(field))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    rows.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::expense::{test_expense, ExpenseStatus};
    use crate::models::ExpenseFilter;

    #[test]
    fn header_matches_export_schema() {
        let csv = render_csv(&[]);
        assert_eq!(
            csv,
            "Date of Spend,Date of Post,Employee Name,Location,Expense Type,Amount,\
             Recurring Type,Status,Approver,Approval Date,Payment Remark,Decline Reason"
        );
    }

    #[test]
    fn every_field_is_double_quoted() {
        let expenses = vec![test_expense(
            "Chennai",
            "Food",
            500,
            ExpenseStatus::Pending,
            "2024-03-15",
        )];
        let csv = render_csv(&expenses);
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(row.matches('"').count(), 24);
        assert!(row.contains("\"Food\""));
        assert!(row.contains("\"500\""));
        assert!(row.contains("\"Pending\""));
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let mut expense = test_expense("Chennai", "Food", 500, ExpenseStatus::Declined, "2024-03-15");
        expense.decline_reason = Some("bill says \"paid\" already".to_string());
        let csv = render_csv(&[expense]);
        assert!(csv.contains("\"bill says \"\"paid\"\" already\""));
    }

    #[test]
    fn export_includes_every_status() {
        let expenses = vec![
            test_expense("Chennai", "Food", 500, ExpenseStatus::Pending, "2024-03-15"),
            test_expense("Chennai", "Food", 600, ExpenseStatus::ApprovedPaid, "2024-03-16"),
            test_expense("Chennai", "Food", 700, ExpenseStatus::Declined, "2024-03-17"),
        ];
        let csv = render_csv(&expenses);
        assert_eq!(csv.lines().count(), 4);
    }

    #[test]
    fn export_row_count_matches_filtered_listing() {
        let expenses = vec![
            test_expense("Chennai", "Food", 500, ExpenseStatus::ApprovedPaid, "2024-03-15"),
            test_expense("Salem", "Rent", 9000, ExpenseStatus::Pending, "2024-03-16"),
            test_expense("Chennai", "Rent", 400, ExpenseStatus::Declined, "2024-04-02"),
        ];

        let filter = ExpenseFilter {
            locations: Some(vec!["Chennai".to_string()]),
            ..Default::default()
        };
        let matching: Vec<_> = expenses
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();

        let csv = render_csv(&matching);
        assert_eq!(csv.lines().count() - 1, matching.len());
        assert_eq!(matching.len(), 2);
    }
}
