use actix_web::{HttpResponse, Responder, web};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::model::payroll::{ComponentType, PayrollMonth};
use crate::payroll::catalog::CatalogEntry;
use crate::payroll::engine::{NewComponent, PayrollEngine};
#[allow(unused_imports)] // referenced from the OpenAPI attributes
use crate::payroll::response::{
    ComponentHistory, PayrollComponentDeleteResponse, PayrollComponentsView, UpdatedPayroll,
};

#[derive(Deserialize, ToSchema)]
pub struct CreatePayroll {
    #[schema(example = "EMP001")]
    pub employee_id: String,

    #[schema(example = "2026-01")]
    pub month: String,

    #[schema(example = "50000.00")]
    pub basic_salary: Decimal,
}

#[derive(Deserialize, ToSchema)]
pub struct AddComponent {
    #[schema(example = "Transport Allowance")]
    pub name: String,

    #[schema(example = "5000.00")]
    pub amount: Decimal,

    /// Defaults to the catalog type when the name is known.
    #[schema(nullable = true)]
    pub component_type: Option<ComponentType>,

    #[schema(example = "20", nullable = true)]
    pub original_percentage: Option<Decimal>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateComponent {
    #[schema(example = "2000.00")]
    pub amount: Decimal,

    /// Omit to turn the component into a manual amount.
    #[schema(nullable = true)]
    pub original_percentage: Option<Decimal>,
}

fn month_of(raw: &str) -> actix_web::Result<PayrollMonth> {
    Ok(PayrollMonth::parse(raw)?)
}

#[utoipa::path(
    post,
    path = "/api/payroll",
    request_body = CreatePayroll,
    responses(
        (status = 201, description = "Payroll record created", body = PayrollComponentsView),
        (status = 400, description = "Validation failure"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Payroll already exists for that month")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn create_payroll(
    auth: AuthUser,
    engine: web::Data<PayrollEngine>,
    payload: web::Json<CreatePayroll>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let month = month_of(&payload.month)?;
    let view = engine
        .create_payroll(&payload.employee_id, &month, payload.basic_salary)
        .await?;

    Ok(HttpResponse::Created().json(view))
}

#[utoipa::path(
    get,
    path = "/api/payroll/catalog",
    responses(
        (status = 200, description = "Known salary components", body = [CatalogEntry])
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_catalog(
    auth: AuthUser,
    engine: web::Data<PayrollEngine>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let entries: &[CatalogEntry] = engine.catalog().entries();
    Ok(HttpResponse::Ok().json(entries))
}

#[utoipa::path(
    post,
    path = "/api/payroll/{employee_id}/{month}/components",
    request_body = AddComponent,
    params(
        ("employee_id" = String, Path, description = "Employee ID"),
        ("month" = String, Path, description = "Payroll month, YYYY-MM")
    ),
    responses(
        (status = 200, description = "Component added", body = UpdatedPayroll),
        (status = 400, description = "Validation failure or catalog mismatch"),
        (status = 404, description = "Payroll record not found"),
        (status = 409, description = "Component already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn add_component(
    auth: AuthUser,
    engine: web::Data<PayrollEngine>,
    path: web::Path<(String, String)>,
    payload: web::Json<AddComponent>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let (employee_id, month) = path.into_inner();
    let month = month_of(&month)?;
    let payload = payload.into_inner();

    let updated = engine
        .add_component(
            &employee_id,
            &month,
            NewComponent {
                name: payload.name,
                amount: payload.amount,
                component_type: payload.component_type,
                original_percentage: payload.original_percentage,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    put,
    path = "/api/payroll/{employee_id}/{month}/components/{name}",
    request_body = UpdateComponent,
    params(
        ("employee_id" = String, Path, description = "Employee ID"),
        ("month" = String, Path, description = "Payroll month, YYYY-MM"),
        ("name" = String, Path, description = "Component name")
    ),
    responses(
        (status = 200, description = "Component updated", body = UpdatedPayroll),
        (status = 400, description = "Validation failure"),
        (status = 404, description = "Payroll record or component not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn update_component(
    auth: AuthUser,
    engine: web::Data<PayrollEngine>,
    path: web::Path<(String, String, String)>,
    payload: web::Json<UpdateComponent>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let (employee_id, month, name) = path.into_inner();
    let month = month_of(&month)?;

    let updated = engine
        .update_component(
            &employee_id,
            &month,
            &name,
            payload.amount,
            payload.original_percentage,
        )
        .await?;

    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/payroll/{employee_id}/{month}/components/{name}",
    params(
        ("employee_id" = String, Path, description = "Employee ID"),
        ("month" = String, Path, description = "Payroll month, YYYY-MM"),
        ("name" = String, Path, description = "Component name")
    ),
    responses(
        (status = 200, description = "Component deleted", body = PayrollComponentDeleteResponse),
        (status = 404, description = "Payroll record or component not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn delete_component(
    auth: AuthUser,
    engine: web::Data<PayrollEngine>,
    path: web::Path<(String, String, String)>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let (employee_id, month, name) = path.into_inner();
    let month = month_of(&month)?;

    let deleted = engine.delete_component(&employee_id, &month, &name).await?;

    Ok(HttpResponse::Ok().json(deleted))
}

#[utoipa::path(
    get,
    path = "/api/payroll/{employee_id}/{month}/components",
    params(
        ("employee_id" = String, Path, description = "Employee ID"),
        ("month" = String, Path, description = "Payroll month, YYYY-MM")
    ),
    responses(
        (status = 200, description = "Components split by type", body = PayrollComponentsView),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Payroll record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn read_components(
    auth: AuthUser,
    engine: web::Data<PayrollEngine>,
    path: web::Path<(String, String)>,
) -> actix_web::Result<impl Responder> {
    let (employee_id, month) = path.into_inner();
    auth.require_self_or_hr(&employee_id)?;
    let month = month_of(&month)?;

    let view = engine.read_components(&employee_id, &month).await?;

    Ok(HttpResponse::Ok().json(view))
}

#[utoipa::path(
    get,
    path = "/api/payroll/{employee_id}/{month}/history",
    params(
        ("employee_id" = String, Path, description = "Employee ID"),
        ("month" = String, Path, description = "Payroll month, YYYY-MM")
    ),
    responses(
        (status = 200, description = "Component update log, oldest first", body = ComponentHistory)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn component_history(
    auth: AuthUser,
    engine: web::Data<PayrollEngine>,
    path: web::Path<(String, String)>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let (employee_id, month) = path.into_inner();
    let month = month_of(&month)?;

    let history = engine.history(&employee_id, &month).await?;

    Ok(HttpResponse::Ok().json(history))
}
