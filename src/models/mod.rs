pub mod analytics;
pub mod assignment;
pub mod expense;
pub mod settings;
pub mod user;

// Re-export only the types we actually use
pub use analytics::AnalyticsReport;
pub use assignment::{visible_to_approver, Assignment};
pub use expense::{
    build_batch, Expense, ExpenseFilter, ExpenseStatus, ExpenseSubmission, FilterQuery,
    NewExpense, NewExpenseItem, RecurringType, TravelLeg,
};
pub use settings::Settings;
pub use user::{CreateUser, UpdateUser, User, UserResponse, UserRole, UserSummary};
