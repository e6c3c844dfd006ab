use crate::{
    api::{leave, payroll},
    auth::middleware::auth_middleware,
    config::Config,
    error::PayrollError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

// Helper to build per-scope limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("period and burst are both non-zero");
    Governor::new(&cfg)
}

/// Malformed JSON bodies become validation failures with the usual error body.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| PayrollError::Validation(err.to_string()).into())
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    let protected_limiter = build_limiter(config.rate_protected_per_min);

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/payroll")
                    // /payroll
                    .service(web::resource("").route(web::post().to(payroll::create_payroll)))
                    // /payroll/catalog
                    .service(web::resource("/catalog").route(web::get().to(payroll::list_catalog)))
                    // /payroll/{employee_id}/{month}/components
                    .service(
                        web::resource("/{employee_id}/{month}/components")
                            .route(web::get().to(payroll::read_components))
                            .route(web::post().to(payroll::add_component)),
                    )
                    // /payroll/{employee_id}/{month}/components/{name}
                    .service(
                        web::resource("/{employee_id}/{month}/components/{name}")
                            .route(web::put().to(payroll::update_component))
                            .route(web::delete().to(payroll::delete_component)),
                    )
                    // /payroll/{employee_id}/{month}/history
                    .service(
                        web::resource("/{employee_id}/{month}/history")
                            .route(web::get().to(payroll::component_history)),
                    ),
            )
            .service(
                web::scope("/leaves")
                    // /leaves/{employee_id}/usage
                    .service(
                        web::resource("/{employee_id}/usage")
                            .route(web::get().to(leave::leave_usage)),
                    )
                    // /leaves/{employee_id}/balance
                    .service(
                        web::resource("/{employee_id}/balance")
                            .route(web::get().to(leave::leave_balance)),
                    ),
            ),
    );
}
