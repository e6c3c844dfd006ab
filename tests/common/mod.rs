//! Shared helpers for the HTTP and database-backed tests.
//!
//! Database tests are `#[ignore]`d; run them with
//! `TEST_DATABASE_URL=mysql://… cargo test -- --ignored`.
#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Once};
use std::time::{SystemTime, UNIX_EPOCH};

use actix_web::web::{self, Data};
use hrm_payroll::config::Config;
use hrm_payroll::leave::ledger::LeaveLedger;
use hrm_payroll::model::leave::Entitlements;
use hrm_payroll::model::role::Role;
use hrm_payroll::models::{Claims, TokenType};
use hrm_payroll::payroll::catalog::ComponentCatalog;
use hrm_payroll::payroll::engine::PayrollEngine;
use hrm_payroll::routes;
use jsonwebtoken::{EncodingKey, Header, encode};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;

pub const JWT_SECRET: &str = "test-secret";

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        server_addr: "127.0.0.1:0".to_string(),
        api_prefix: "/api".to_string(),
        db_max_connections: 5,
        db_acquire_timeout_secs: 5,
        rate_protected_per_min: 10_000,
        log_dir: "logs".to_string(),
        log_level: tracing::Level::DEBUG,
        component_catalog_path: None,
        default_entitlements: Entitlements::default(),
    }
}

/// Pool that never connects unless a handler actually reaches the database.
pub fn lazy_pool() -> MySqlPool {
    MySqlPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(1))
        .connect_lazy("mysql://nobody@127.0.0.1:1/unreachable")
        .expect("static URL parses")
}

pub fn engine(pool: MySqlPool) -> PayrollEngine {
    PayrollEngine::new(pool, Arc::new(ComponentCatalog::builtin()))
}

/// Registers app data and routes the same way `main` does.
pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, pool: MySqlPool) {
    cfg.app_data(routes::json_config())
        .app_data(Data::new(config.clone()))
        .app_data(Data::new(engine(pool.clone())))
        .app_data(Data::new(LeaveLedger::new(pool)));
    routes::configure(cfg, config);
}

pub fn token(role: Role, employee_id: Option<&str>) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;

    let claims = Claims {
        user_id: 1,
        sub: "tester".into(),
        role: role as u8,
        exp: now + 600,
        jti: format!("jti-{now}"),
        token_type: TokenType::Access,
        employee_id: employee_id.map(str::to_string),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn bearer(role: Role, employee_id: Option<&str>) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token(role, employee_id)))
}

pub fn peer() -> std::net::SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

/// Connects to `TEST_DATABASE_URL` and makes sure the tables exist.
pub async fn test_pool() -> MySqlPool {
    init_tracing();

    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set to run database tests");
    let pool = MySqlPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    let schema = include_str!("../../migrations/0001_payroll_core.sql");
    for statement in schema.split(';') {
        let sql: String = statement
            .lines()
            .filter(|l| !l.trim_start().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        if sql.trim().is_empty() {
            continue;
        }
        sqlx::query(&sql)
            .execute(&pool)
            .await
            .expect("Failed to apply schema");
    }

    pool
}

/// A fresh employee code, unique across test runs.
pub fn unique_employee_code() -> String {
    static SEQ: AtomicU32 = AtomicU32::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("T{nanos}-{}", SEQ.fetch_add(1, Ordering::SeqCst))
}

pub async fn seed_employee(pool: &MySqlPool) -> String {
    let code = unique_employee_code();
    sqlx::query(
        "INSERT INTO employees (employee_code, first_name, email) VALUES (?, 'Test', 'test@company.com')",
    )
    .bind(&code)
    .execute(pool)
    .await
    .expect("Failed to seed employee");
    code
}
