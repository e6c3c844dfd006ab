use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};

use hrm_payroll::config::Config;
use hrm_payroll::db::init_db;
use hrm_payroll::docs::openapi_for;
use hrm_payroll::leave::ledger::LeaveLedger;
use hrm_payroll::payroll::catalog::ComponentCatalog;
use hrm_payroll::payroll::engine::PayrollEngine;
use hrm_payroll::routes;

use tracing::{error, info};
use tracing_appender::rolling;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "HRM payroll service is running"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    let catalog = Arc::new(ComponentCatalog::load(config.component_catalog_path.as_deref())?);

    let pool = init_db(&config).await.map_err(|e| {
        error!(error = %e, "Failed to connect to database");
        e
    })?;

    let engine = PayrollEngine::new(pool.clone(), catalog);
    let ledger = LeaveLedger::new(pool);

    let server_addr = config.server_addr.clone();
    let openapi = openapi_for(&config.api_prefix);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", openapi.clone()),
            )
            .app_data(routes::json_config())
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(engine.clone()))
            .app_data(Data::new(ledger.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
