//! Creates the claimdesk schema and seeds one user per role, so a fresh
//! install has working logins for each dashboard.

use std::env;

use dotenvy::dotenv;
use sqlx::PgPool;

const SCHEMA: &str = include_str!("../../schema.sql");

struct SeedUser {
    name: &'static str,
    email: &'static str,
    password: &'static str,
    role: &'static str,
    location: &'static str,
    optional_field1: &'static str,
    optional_field2: &'static str,
}

const SEED_USERS: [SeedUser; 3] = [
    SeedUser {
        name: "Admin User",
        email: "admin@company.com",
        password: "admin123",
        role: "Admin",
        location: "Chennai",
        optional_field1: "IT Department",
        optional_field2: "Senior Level",
    },
    SeedUser {
        name: "Approver User",
        email: "approver@company.com",
        password: "approver123",
        role: "Approver",
        location: "Salem",
        optional_field1: "Finance Team",
        optional_field2: "Manager Level",
    },
    SeedUser {
        name: "Employee User",
        email: "employee@company.com",
        password: "employee123",
        role: "Employee",
        location: "Madurai",
        optional_field1: "Sales Team",
        optional_field2: "Executive Level",
    },
];

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    println!("Setting up database...");

    for statement in SCHEMA.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        sqlx::query(statement)
            .execute(&pool)
            .await
            .expect("Failed to create schema");
    }

    for user in &SEED_USERS {
        let password_hash =
            bcrypt::hash(user.password, bcrypt::DEFAULT_COST).expect("Failed to hash password");

        let inserted = sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash, role, location, optional_field1, optional_field2)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(user.name)
        .bind(user.email)
        .bind(&password_hash)
        .bind(user.role)
        .bind(user.location)
        .bind(user.optional_field1)
        .bind(user.optional_field2)
        .execute(&pool)
        .await
        .expect("Failed to seed user");

        if inserted.rows_affected() > 0 {
            println!("Created {}: {} ({})", user.role, user.name, user.email);
        } else {
            println!("Skipped {} (already exists)", user.name);
        }
    }

    println!();
    println!("Database setup complete. Login credentials:");
    for user in &SEED_USERS {
        println!("{:<8} -> Name: {:<14} | Password: {}", user.role, user.name, user.password);
    }
}
