use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::leave::ledger::LeaveLedger;
#[allow(unused_imports)] // referenced from the OpenAPI attributes
use crate::model::leave::{LeaveBalance, LeaveUsage};

#[derive(Deserialize, IntoParams)]
pub struct BalanceQuery {
    /// Per-bucket entitlements, e.g. `casual:12,sick:10,earned:15`.
    /// Buckets left out use the configured defaults.
    #[param(example = "casual:12,sick:10,earned:15")]
    pub entitlements: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/leaves/{employee_id}/usage",
    params(
        ("employee_id" = String, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Approved leaves per type", body = LeaveUsage),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_usage(
    auth: AuthUser,
    ledger: web::Data<LeaveLedger>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    auth.require_self_or_hr(&employee_id)?;

    let usage = ledger.used_by_type(&employee_id).await?;

    Ok(HttpResponse::Ok().json(usage))
}

#[utoipa::path(
    get,
    path = "/api/leaves/{employee_id}/balance",
    params(
        ("employee_id" = String, Path, description = "Employee ID"),
        BalanceQuery
    ),
    responses(
        (status = 200, description = "Remaining leave per type", body = LeaveBalance),
        (status = 400, description = "Malformed entitlements"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_balance(
    auth: AuthUser,
    ledger: web::Data<LeaveLedger>,
    config: web::Data<Config>,
    path: web::Path<String>,
    query: web::Query<BalanceQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    auth.require_self_or_hr(&employee_id)?;

    let entitlements = match query.entitlements.as_deref() {
        Some(raw) => config.default_entitlements.overridden_by(raw)?,
        None => config.default_entitlements,
    };

    let balance = ledger.balance(&employee_id, &entitlements).await?;

    Ok(HttpResponse::Ok().json(balance))
}
