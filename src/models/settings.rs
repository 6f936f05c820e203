use crate::{database::Database, error::AppError};

pub const LOCATIONS: &str = "locations";
pub const EXPENSE_TYPES: &str = "expenseItems";

/// Lists shipped before an admin has ever saved their own.
pub fn default_locations() -> Vec<String> {
    ["Chennai", "Salem", "Madurai", "Omalur", "Coimbatore", "Trichy"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn default_expense_types() -> Vec<String> {
    [
        "Food",
        "Cable",
        "Travel",
        "Rent",
        "Utilities",
        "Office Supplies",
        "System purchase",
        "Base",
        "Incentive",
        "EPF&ESI",
        "Vendor Charges",
        "Tax",
        "Travel Expenses",
        "Courier expenses",
        "Electricity",
        "Internet and SIM",
        "Wifi",
        "Food expenses",
        "Employee benefits",
        "Latefee",
        "Repairs",
        "Other",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Whole-list replace is the only write; a list must be non-empty, free of
/// blank entries, and free of duplicates.
pub fn validate_list(kind: &str, list: &[String]) -> Result<(), AppError> {
    if list.is_empty() {
        return Err(AppError::validation(format!("{kind} list must not be empty")));
    }
    for entry in list {
        if entry.trim().is_empty() {
            return Err(AppError::validation(format!(
                "{kind} list must not contain blank entries"
            )));
        }
    }
    for (i, entry) in list.iter().enumerate() {
        if list[..i].contains(entry) {
            return Err(AppError::validation(format!(
                "duplicate {kind} entry: {entry}"
            )));
        }
    }
    Ok(())
}

/// Snapshot of both settings lists, loaded once per operation so that
/// validation always runs against a single consistent read.
#[derive(Debug, Clone)]
pub struct Settings {
    pub locations: Vec<String>,
    pub expense_types: Vec<String>,
}

impl Settings {
    pub async fn load(db: &Database) -> Result<Self, AppError> {
        Ok(Self {
            locations: load_list(db, LOCATIONS, default_locations).await?,
            expense_types: load_list(db, EXPENSE_TYPES, default_expense_types).await?,
        })
    }
}

pub async fn load_list(
    db: &Database,
    name: &str,
    defaults: fn() -> Vec<String>,
) -> Result<Vec<String>, AppError> {
    let stored: Option<serde_json::Value> =
        sqlx::query_scalar("SELECT list FROM settings WHERE name = $1")
            .bind(name)
            .fetch_optional(db)
            .await?;

    match stored {
        Some(value) => serde_json::from_value(value)
            .map_err(|e| AppError::validation(format!("corrupt {name} list: {e}"))),
        None => Ok(defaults()),
    }
}

pub async fn store_list(db: &Database, name: &str, list: &[String]) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO settings (name, list, updated_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (name) DO UPDATE SET list = EXCLUDED.list, updated_at = NOW()
        "#,
    )
    .bind(name)
    .bind(serde_json::json!(list))
    .execute(db)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_lists() {
        validate_list("location", &default_locations()).unwrap();
        validate_list("expense type", &default_expense_types()).unwrap();
    }

    #[test]
    fn empty_list_is_rejected() {
        assert!(validate_list("location", &[]).is_err());
    }

    #[test]
    fn blank_entry_is_rejected() {
        let list = vec!["Chennai".to_string(), "  ".to_string()];
        assert!(validate_list("location", &list).is_err());
    }

    #[test]
    fn duplicate_entry_is_rejected() {
        let list = vec!["Food".to_string(), "Rent".to_string(), "Food".to_string()];
        let err = validate_list("expense type", &list).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}
