pub mod analytics;
pub mod auth;
pub mod expenses;
pub mod settings;
pub mod users;

use axum::response::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
    message: &'static str,
}

pub async fn health() -> Json<Health> {
    Json(Health {
        status: "OK",
        message: "Server is running",
    })
}
