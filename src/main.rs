mod database;
mod error;
mod handlers;
mod middleware;
mod models;
mod utils;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use dotenvy::dotenv;
use std::env;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use database::{create_database_pool, Database};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let db = create_database_pool(&database_url)
        .await
        .expect("Failed to connect to database");

    let app = create_router(db);

    let port = env::var("PORT").unwrap_or_else(|_| "5000".to_string());
    let addr = format!("0.0.0.0:{}", port);

    log::info!("claimdesk server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

fn create_router(db: Database) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        // Auth
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/verify", post(handlers::auth::verify))
        // User directory
        .route("/api/users", get(handlers::users::users_list))
        .route("/api/users", post(handlers::users::create_user))
        .route("/api/users/:id", put(handlers::users::update_user))
        .route("/api/users/:id", delete(handlers::users::delete_user))
        .route("/api/users/role/:role", get(handlers::users::users_by_role))
        // Expense ledger
        .route("/api/expenses", post(handlers::expenses::submit_expenses))
        .route("/api/expenses", get(handlers::expenses::all_expenses))
        .route(
            "/api/expenses/pending",
            get(handlers::expenses::pending_expenses),
        )
        .route(
            "/api/expenses/employee/:employee_id",
            get(handlers::expenses::employee_expenses),
        )
        .route(
            "/api/expenses/:id/approve",
            put(handlers::expenses::approve_expense),
        )
        .route(
            "/api/expenses/:id/decline",
            put(handlers::expenses::decline_expense),
        )
        // Analytics
        .route("/api/analytics", get(handlers::analytics::get_analytics))
        .route(
            "/api/analytics/export",
            get(handlers::analytics::export_csv),
        )
        // Approver assignments
        .route(
            "/api/settings/approver-assignments",
            get(handlers::settings::assignments_list),
        )
        .route(
            "/api/settings/approver-assignments",
            post(handlers::settings::create_assignments),
        )
        .route(
            "/api/settings/approver-assignments/approver/:approver_id",
            get(handlers::settings::assignments_for_approver),
        )
        .route(
            "/api/settings/approver-assignments/employee/:employee_id",
            get(handlers::settings::assignment_for_employee),
        )
        .route(
            "/api/settings/approver-assignments/:id",
            delete(handlers::settings::delete_assignment),
        )
        // Settings lists
        .route(
            "/api/settings/locations",
            get(handlers::settings::get_locations),
        )
        .route(
            "/api/settings/locations",
            put(handlers::settings::update_locations),
        )
        .route(
            "/api/settings/expense-items",
            get(handlers::settings::get_expense_types),
        )
        .route(
            "/api/settings/expense-items",
            put(handlers::settings::update_expense_types),
        )
        // Stored bill images
        .nest_service("/static", ServeDir::new("static"))
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(10 * 1024 * 1024)), // 10MB
        )
        .with_state(db)
}
