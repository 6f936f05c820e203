use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::settings::Settings;

/// Lifecycle of a single expense line item. `Pending` is the only state a
/// record is ever created in; the three decision states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum ExpenseStatus {
    Pending,
    #[serde(rename = "Approved-Hold")]
    #[sqlx(rename = "Approved-Hold")]
    ApprovedHold,
    #[serde(rename = "Approved-Paid")]
    #[sqlx(rename = "Approved-Paid")]
    ApprovedPaid,
    Declined,
}

impl ExpenseStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ExpenseStatus::Pending)
    }

    /// Approved spend is what analytics counts; pending and declined records
    /// are not "spend".
    pub fn is_approved(self) -> bool {
        matches!(self, ExpenseStatus::ApprovedHold | ExpenseStatus::ApprovedPaid)
    }

    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "Pending" => Ok(ExpenseStatus::Pending),
            "Approved-Hold" => Ok(ExpenseStatus::ApprovedHold),
            "Approved-Paid" => Ok(ExpenseStatus::ApprovedPaid),
            "Declined" => Ok(ExpenseStatus::Declined),
            other => Err(AppError::validation(format!("unknown status: {other}"))),
        }
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExpenseStatus::Pending => "Pending",
            ExpenseStatus::ApprovedHold => "Approved-Hold",
            ExpenseStatus::ApprovedPaid => "Approved-Paid",
            ExpenseStatus::Declined => "Declined",
        };
        f.write_str(s)
    }
}

/// A decision is only legal from `Pending`. The store-level UPDATE enforces
/// the same predicate; this is the taxonomy for the failure.
pub fn ensure_decidable(status: ExpenseStatus) -> Result<(), AppError> {
    if status.is_terminal() {
        Err(AppError::InvalidState(format!(
            "expense is already {status} and cannot be decided again"
        )))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum RecurringType {
    #[serde(rename = "One-time")]
    #[sqlx(rename = "One-time")]
    OneTime,
    Weekly,
    Monthly,
}

impl fmt::Display for RecurringType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecurringType::OneTime => "One-time",
            RecurringType::Weekly => "Weekly",
            RecurringType::Monthly => "Monthly",
        };
        f.write_str(s)
    }
}

/// One line item of spend. A submission fans out into many of these; each is
/// decided independently. Travel legs are the `is_convenience` variant: they
/// carry a free-text trip description instead of a category and never have a
/// bill attached.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub employee_name: String,
    pub location: String,
    pub expense_type: String,
    pub amount: i64,
    pub recurring_type: RecurringType,
    pub status: ExpenseStatus,
    pub approver_name: Option<String>,
    pub approval_date: Option<NaiveDate>,
    pub payment_remark: Option<String>,
    pub feedback: Option<String>,
    pub decline_reason: Option<String>,
    pub bill_image_urls: Vec<String>,
    pub is_convenience: bool,
    pub travel_details: Option<String>,
    pub date_of_spend: NaiveDate,
    pub date_of_post: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    /// Grouping key for monthly rollups.
    pub fn month_key(&self) -> String {
        self.date_of_spend.format("%Y-%m").to_string()
    }
}

/// Admin/report filter criteria. Every present field must match (AND
/// semantics); an absent field matches everything.
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub locations: Option<Vec<String>>,
    pub status: Option<ExpenseStatus>,
    pub category: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ExpenseFilter {
    pub fn matches(&self, expense: &Expense) -> bool {
        if let Some(locations) = &self.locations {
            if !locations.contains(&expense.location) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if expense.status != status {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &expense.expense_type != category {
                return false;
            }
        }
        if let Some(start) = self.start_date {
            if expense.date_of_spend < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if expense.date_of_spend > end {
                return false;
            }
        }
        true
    }
}

/// Raw filter query parameters as the client sends them: comma-separated
/// locations with an `all` sentinel, `all` sentinels on status and category,
/// ISO dates as strings. Blank and `all` values mean "no restriction".
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterQuery {
    pub locations: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn non_sentinel(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty() && v != "all")
}

fn parse_filter_date(value: Option<String>) -> Result<Option<NaiveDate>, AppError> {
    match value.filter(|v| !v.trim().is_empty()) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::validation(format!("invalid date: {raw}"))),
    }
}

impl FilterQuery {
    pub fn into_filter(self) -> Result<ExpenseFilter, AppError> {
        let locations = non_sentinel(self.locations)
            .map(|raw| raw.split(',').map(|s| s.trim().to_string()).collect());
        let status = non_sentinel(self.status)
            .map(|raw| ExpenseStatus::parse(&raw))
            .transpose()?;

        Ok(ExpenseFilter {
            locations,
            status,
            category: non_sentinel(self.category),
            start_date: parse_filter_date(self.start_date)?,
            end_date: parse_filter_date(self.end_date)?,
        })
    }
}

/// One regular item from the submission form. `bill_field` names the
/// multipart part carrying this item's bill, so the correlation is explicit
/// in the payload rather than inferred from upload order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpenseItem {
    pub expense_type: String,
    pub amount: i64,
    pub recurring_type: RecurringType,
    #[serde(default)]
    pub bill_field: Option<String>,
}

/// One travel leg. Legs have no category, no bill, no recurrence.
#[derive(Debug, Clone, Deserialize)]
pub struct TravelLeg {
    pub description: String,
    pub amount: i64,
}

/// A parsed submission, before validation.
#[derive(Debug)]
pub struct ExpenseSubmission {
    pub employee_id: Uuid,
    pub employee_name: String,
    pub date_of_spend: NaiveDate,
    pub location: String,
    pub items: Vec<NewExpenseItem>,
    pub travel_legs: Vec<TravelLeg>,
}

/// A fully validated row ready for the atomic insert.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub employee_name: String,
    pub location: String,
    pub expense_type: String,
    pub amount: i64,
    pub recurring_type: RecurringType,
    pub bill_image_urls: Vec<String>,
    pub is_convenience: bool,
    pub travel_details: Option<String>,
    pub date_of_spend: NaiveDate,
    pub date_of_post: NaiveDate,
}

/// Expense type recorded on every travel leg.
pub const TRAVEL_TYPE: &str = "Travel";

#[cfg(test)]
pub(crate) fn test_expense(
    location: &str,
    expense_type: &str,
    amount: i64,
    status: ExpenseStatus,
    date_of_spend: &str,
) -> Expense {
    Expense {
        id: Uuid::new_v4(),
        employee_id: Uuid::new_v4(),
        employee_name: "Employee User".to_string(),
        location: location.to_string(),
        expense_type: expense_type.to_string(),
        amount,
        recurring_type: RecurringType::OneTime,
        status,
        approver_name: None,
        approval_date: None,
        payment_remark: None,
        feedback: None,
        decline_reason: None,
        bill_image_urls: Vec::new(),
        is_convenience: false,
        travel_details: None,
        date_of_spend: date_of_spend.parse().unwrap(),
        date_of_post: date_of_spend.parse().unwrap(),
        created_at: Utc::now(),
    }
}

/// Validates a submission against the settings snapshot and expands it into
/// one insertable row per item plus one per travel leg. No row is produced
/// unless every row passes, so a failed validation has no partial effect.
///
/// `bill_urls` maps a `bill_field` name to the stored URL of its uploaded
/// bill; an item whose field has no entry simply carries no bill reference.
pub fn build_batch(
    submission: &ExpenseSubmission,
    settings: &Settings,
    bill_urls: &HashMap<String, String>,
) -> Result<Vec<NewExpense>, AppError> {
    if submission.items.is_empty() {
        return Err(AppError::validation("at least one expense item is required"));
    }
    if !settings.locations.contains(&submission.location) {
        return Err(AppError::validation(format!(
            "unknown location: {}",
            submission.location
        )));
    }

    let date_of_post = Utc::now().date_naive();
    let mut batch = Vec::with_capacity(submission.items.len() + submission.travel_legs.len());

    for item in &submission.items {
        if item.amount < 1 {
            return Err(AppError::validation(
                "amount must be a positive whole number",
            ));
        }
        if !settings.expense_types.contains(&item.expense_type) {
            return Err(AppError::validation(format!(
                "unknown expense type: {}",
                item.expense_type
            )));
        }

        let bill_image_urls = item
            .bill_field
            .as_ref()
            .and_then(|field| bill_urls.get(field))
            .map(|url| vec![url.clone()])
            .unwrap_or_default();

        batch.push(NewExpense {
            id: Uuid::new_v4(),
            employee_id: submission.employee_id,
            employee_name: submission.employee_name.clone(),
            location: submission.location.clone(),
            expense_type: item.expense_type.clone(),
            amount: item.amount,
            recurring_type: item.recurring_type,
            bill_image_urls,
            is_convenience: false,
            travel_details: None,
            date_of_spend: submission.date_of_spend,
            date_of_post,
        });
    }

    for leg in &submission.travel_legs {
        if leg.amount < 1 {
            return Err(AppError::validation(
                "amount must be a positive whole number",
            ));
        }

        batch.push(NewExpense {
            id: Uuid::new_v4(),
            employee_id: submission.employee_id,
            employee_name: submission.employee_name.clone(),
            location: submission.location.clone(),
            expense_type: TRAVEL_TYPE.to_string(),
            amount: leg.amount,
            recurring_type: RecurringType::OneTime,
            bill_image_urls: Vec::new(),
            is_convenience: true,
            travel_details: Some(leg.description.clone()),
            date_of_spend: submission.date_of_spend,
            date_of_post,
        });
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings;

    fn test_settings() -> Settings {
        Settings {
            locations: settings::default_locations(),
            expense_types: settings::default_expense_types(),
        }
    }

    fn submission(items: Vec<NewExpenseItem>, travel_legs: Vec<TravelLeg>) -> ExpenseSubmission {
        ExpenseSubmission {
            employee_id: Uuid::new_v4(),
            employee_name: "Employee User".to_string(),
            date_of_spend: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            location: "Chennai".to_string(),
            items,
            travel_legs,
        }
    }

    fn item(expense_type: &str, amount: i64) -> NewExpenseItem {
        NewExpenseItem {
            expense_type: expense_type.to_string(),
            amount,
            recurring_type: RecurringType::OneTime,
            bill_field: None,
        }
    }

    use super::test_expense as expense;

    #[test]
    fn decision_is_legal_only_from_pending() {
        assert!(ensure_decidable(ExpenseStatus::Pending).is_ok());
        for status in [
            ExpenseStatus::ApprovedHold,
            ExpenseStatus::ApprovedPaid,
            ExpenseStatus::Declined,
        ] {
            let err = ensure_decidable(status).unwrap_err();
            assert!(matches!(err, AppError::InvalidState(_)));
        }
    }

    #[test]
    fn batch_has_one_row_per_item_and_leg() {
        let sub = submission(
            vec![item("Food", 500), item("Rent", 9000)],
            vec![
                TravelLeg {
                    description: "Chennai to Salem".to_string(),
                    amount: 300,
                },
                TravelLeg {
                    description: "Salem to Chennai".to_string(),
                    amount: 300,
                },
                TravelLeg {
                    description: "Auto to office".to_string(),
                    amount: 80,
                },
            ],
        );
        let batch = build_batch(&sub, &test_settings(), &HashMap::new()).unwrap();
        assert_eq!(batch.len(), 5);
        assert_eq!(batch.iter().filter(|e| e.is_convenience).count(), 3);
    }

    #[test]
    fn travel_legs_are_normalized() {
        let sub = submission(
            vec![item("Food", 500)],
            vec![TravelLeg {
                description: "Chennai to Salem".to_string(),
                amount: 300,
            }],
        );
        let batch = build_batch(&sub, &test_settings(), &HashMap::new()).unwrap();
        let leg = &batch[1];
        assert_eq!(leg.expense_type, TRAVEL_TYPE);
        assert_eq!(leg.recurring_type, RecurringType::OneTime);
        assert_eq!(leg.travel_details.as_deref(), Some("Chennai to Salem"));
        assert!(leg.bill_image_urls.is_empty());
    }

    #[test]
    fn empty_items_are_rejected() {
        let sub = submission(
            vec![],
            vec![TravelLeg {
                description: "Chennai to Salem".to_string(),
                amount: 300,
            }],
        );
        let err = build_batch(&sub, &test_settings(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        for amount in [0, -500] {
            let sub = submission(vec![item("Food", amount)], vec![]);
            assert!(build_batch(&sub, &test_settings(), &HashMap::new()).is_err());
        }
    }

    #[test]
    fn unknown_location_and_category_are_rejected() {
        let mut sub = submission(vec![item("Food", 500)], vec![]);
        sub.location = "Atlantis".to_string();
        assert!(build_batch(&sub, &test_settings(), &HashMap::new()).is_err());

        let sub = submission(vec![item("Yacht", 500)], vec![]);
        assert!(build_batch(&sub, &test_settings(), &HashMap::new()).is_err());
    }

    #[test]
    fn bills_attach_by_named_field() {
        let mut with_bill = item("Food", 500);
        with_bill.bill_field = Some("bill_a".to_string());
        let without_bill = item("Rent", 9000);

        let mut urls = HashMap::new();
        urls.insert(
            "bill_a".to_string(),
            "/static/bills/abc.jpg".to_string(),
        );

        let sub = submission(vec![with_bill, without_bill], vec![]);
        let batch = build_batch(&sub, &test_settings(), &urls).unwrap();
        assert_eq!(batch[0].bill_image_urls, vec!["/static/bills/abc.jpg"]);
        assert!(batch[1].bill_image_urls.is_empty());
    }

    #[test]
    fn filter_fields_combine_with_and_semantics() {
        let e = expense("Chennai", "Food", 500, ExpenseStatus::ApprovedPaid, "2024-03-15");

        assert!(ExpenseFilter::default().matches(&e));

        let full = ExpenseFilter {
            locations: Some(vec!["Chennai".to_string(), "Salem".to_string()]),
            status: Some(ExpenseStatus::ApprovedPaid),
            category: Some("Food".to_string()),
            start_date: Some("2024-03-01".parse().unwrap()),
            end_date: Some("2024-03-31".parse().unwrap()),
        };
        assert!(full.matches(&e));

        let wrong_location = ExpenseFilter {
            locations: Some(vec!["Salem".to_string()]),
            ..full.clone()
        };
        assert!(!wrong_location.matches(&e));

        let wrong_status = ExpenseFilter {
            status: Some(ExpenseStatus::Pending),
            ..full.clone()
        };
        assert!(!wrong_status.matches(&e));

        let out_of_range = ExpenseFilter {
            end_date: Some("2024-03-14".parse().unwrap()),
            ..full
        };
        assert!(!out_of_range.matches(&e));
    }

    #[test]
    fn date_range_bounds_are_inclusive() {
        let e = expense("Chennai", "Food", 500, ExpenseStatus::Pending, "2024-03-15");
        let filter = ExpenseFilter {
            start_date: Some("2024-03-15".parse().unwrap()),
            end_date: Some("2024-03-15".parse().unwrap()),
            ..Default::default()
        };
        assert!(filter.matches(&e));
    }

    #[test]
    fn filter_query_treats_all_and_blank_as_absent() {
        let query = FilterQuery {
            locations: Some("all".to_string()),
            status: Some("all".to_string()),
            category: Some("".to_string()),
            start_date: Some("".to_string()),
            end_date: None,
        };
        let filter = query.into_filter().unwrap();
        assert!(filter.locations.is_none());
        assert!(filter.status.is_none());
        assert!(filter.category.is_none());
        assert!(filter.start_date.is_none());
    }

    #[test]
    fn filter_query_splits_locations_and_parses_dates() {
        let query = FilterQuery {
            locations: Some("Chennai,Salem".to_string()),
            status: Some("Approved-Paid".to_string()),
            category: Some("Food".to_string()),
            start_date: Some("2024-03-01".to_string()),
            end_date: Some("2024-03-31".to_string()),
        };
        let filter = query.into_filter().unwrap();
        assert_eq!(
            filter.locations,
            Some(vec!["Chennai".to_string(), "Salem".to_string()])
        );
        assert_eq!(filter.status, Some(ExpenseStatus::ApprovedPaid));
        assert_eq!(filter.start_date, Some("2024-03-01".parse().unwrap()));
    }

    #[test]
    fn filter_query_rejects_malformed_input() {
        let bad_date = FilterQuery {
            start_date: Some("03/01/2024".to_string()),
            ..Default::default()
        };
        assert!(bad_date.into_filter().is_err());

        let bad_status = FilterQuery {
            status: Some("Paid".to_string()),
            ..Default::default()
        };
        assert!(bad_status.into_filter().is_err());
    }

    #[test]
    fn month_key_is_year_and_month() {
        let e = expense("Chennai", "Food", 500, ExpenseStatus::Pending, "2024-03-15");
        assert_eq!(e.month_key(), "2024-03");
    }
}
