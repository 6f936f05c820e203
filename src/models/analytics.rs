use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::expense::Expense;

/// Multi-dimensional rollup of approved spend. Built in a single pass; a
/// grouping key exists only if some included record produced it, so chart
/// zero-fill is the consumer's job.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub total_amount: i64,
    pub location_wise: BTreeMap<String, i64>,
    pub category_wise: BTreeMap<String, i64>,
    pub monthly_data: BTreeMap<String, BTreeMap<String, i64>>,
    pub monthly_location_data: BTreeMap<String, BTreeMap<String, i64>>,
    pub expense_count: usize,
}

impl AnalyticsReport {
    /// Folds the given records into the report. Only `Approved-Paid` and
    /// `Approved-Hold` records count; unresolved or rejected spend is not
    /// spend.
    pub fn from_expenses<'a, I>(expenses: I) -> Self
    where
        I: IntoIterator<Item = &'a Expense>,
    {
        let mut report = AnalyticsReport::default();

        for expense in expenses {
            if !expense.status.is_approved() {
                continue;
            }

            report.total_amount += expense.amount;
            report.expense_count += 1;

            *report
                .location_wise
                .entry(expense.location.clone())
                .or_insert(0) += expense.amount;

            *report
                .category_wise
                .entry(expense.expense_type.clone())
                .or_insert(0) += expense.amount;

            let month = expense.month_key();

            *report
                .monthly_data
                .entry(month.clone())
                .or_default()
                .entry(expense.expense_type.clone())
                .or_insert(0) += expense.amount;

            *report
                .monthly_location_data
                .entry(month)
                .or_default()
                .entry(expense.location.clone())
                .or_insert(0) += expense.amount;
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::expense::{test_expense, ExpenseStatus};

    #[test]
    fn pending_and_declined_are_excluded() {
        let expenses = vec![
            test_expense("Chennai", "Food", 500, ExpenseStatus::ApprovedPaid, "2024-03-15"),
            test_expense("Chennai", "Food", 700, ExpenseStatus::Pending, "2024-03-15"),
            test_expense("Chennai", "Food", 900, ExpenseStatus::Declined, "2024-03-15"),
            test_expense("Salem", "Rent", 9000, ExpenseStatus::ApprovedHold, "2024-04-01"),
        ];

        let report = AnalyticsReport::from_expenses(&expenses);
        assert_eq!(report.total_amount, 9500);
        assert_eq!(report.expense_count, 2);
    }

    #[test]
    fn grouping_sums_equal_total() {
        let expenses = vec![
            test_expense("Chennai", "Food", 500, ExpenseStatus::ApprovedPaid, "2024-03-15"),
            test_expense("Chennai", "Rent", 9000, ExpenseStatus::ApprovedHold, "2024-03-20"),
            test_expense("Salem", "Food", 250, ExpenseStatus::ApprovedPaid, "2024-04-02"),
        ];

        let report = AnalyticsReport::from_expenses(&expenses);
        assert_eq!(report.location_wise.values().sum::<i64>(), report.total_amount);
        assert_eq!(report.category_wise.values().sum::<i64>(), report.total_amount);

        let monthly: i64 = report
            .monthly_data
            .values()
            .flat_map(|by_category| by_category.values())
            .sum();
        assert_eq!(monthly, report.total_amount);
    }

    #[test]
    fn keys_are_created_lazily() {
        let expenses = vec![test_expense(
            "Chennai",
            "Food",
            500,
            ExpenseStatus::ApprovedPaid,
            "2024-03-15",
        )];

        let report = AnalyticsReport::from_expenses(&expenses);
        assert_eq!(report.location_wise.len(), 1);
        assert_eq!(report.category_wise.len(), 1);
        assert!(!report.location_wise.contains_key("Salem"));
    }

    #[test]
    fn monthly_rollups_group_by_spend_month() {
        let expenses = vec![
            test_expense("Chennai", "Food", 500, ExpenseStatus::ApprovedPaid, "2024-03-15"),
            test_expense("Salem", "Food", 300, ExpenseStatus::ApprovedPaid, "2024-03-28"),
            test_expense("Chennai", "Rent", 9000, ExpenseStatus::ApprovedHold, "2024-04-01"),
        ];

        let report = AnalyticsReport::from_expenses(&expenses);
        assert_eq!(report.monthly_data["2024-03"]["Food"], 800);
        assert_eq!(report.monthly_data["2024-04"]["Rent"], 9000);
        assert_eq!(report.monthly_location_data["2024-03"]["Chennai"], 500);
        assert_eq!(report.monthly_location_data["2024-03"]["Salem"], 300);
    }

    #[test]
    fn single_approved_item_reports_everywhere() {
        // Submit Food/500 on 2024-03-15, approve as paid: every view sees 500.
        let expenses = vec![test_expense(
            "Chennai",
            "Food",
            500,
            ExpenseStatus::ApprovedPaid,
            "2024-03-15",
        )];

        let report = AnalyticsReport::from_expenses(&expenses);
        assert_eq!(report.total_amount, 500);
        assert_eq!(report.location_wise["Chennai"], 500);
        assert_eq!(report.monthly_data["2024-03"]["Food"], 500);
    }

    #[test]
    fn empty_input_yields_empty_report() {
        let report = AnalyticsReport::from_expenses(&[]);
        assert_eq!(report.total_amount, 0);
        assert_eq!(report.expense_count, 0);
        assert!(report.location_wise.is_empty());
        assert!(report.monthly_data.is_empty());
    }
}
