use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::expense::Expense;

/// Binding of one employee to exactly one approver. The directory keeps at
/// most one row per employee; assigning an employee replaces any prior
/// binding in the same transaction.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: Uuid,
    pub approver_id: Uuid,
    pub approver_name: String,
    pub employee_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Restricts a pending-expense listing to the approver's assigned employees.
///
/// An approver with no assignments sees nothing: assignment is an opt-in
/// allowlist, never a fallback to full visibility.
pub fn visible_to_approver(
    expenses: Vec<Expense>,
    assigned_employees: &HashSet<Uuid>,
) -> Vec<Expense> {
    if assigned_employees.is_empty() {
        return Vec::new();
    }
    expenses
        .into_iter()
        .filter(|expense| assigned_employees.contains(&expense.employee_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::expense::{test_expense, ExpenseStatus};

    #[test]
    fn unassigned_approver_sees_nothing() {
        let expenses = vec![
            test_expense("Chennai", "Food", 500, ExpenseStatus::Pending, "2024-03-15"),
            test_expense("Salem", "Rent", 9000, ExpenseStatus::Pending, "2024-03-16"),
        ];
        let visible = visible_to_approver(expenses, &HashSet::new());
        assert!(visible.is_empty());
    }

    #[test]
    fn only_assigned_employees_are_visible() {
        let mine = test_expense("Chennai", "Food", 500, ExpenseStatus::Pending, "2024-03-15");
        let theirs = test_expense("Salem", "Rent", 9000, ExpenseStatus::Pending, "2024-03-16");

        let assigned: HashSet<Uuid> = [mine.employee_id].into_iter().collect();
        let visible = visible_to_approver(vec![mine.clone(), theirs], &assigned);

        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, mine.id);
    }
}
