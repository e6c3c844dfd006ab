use crate::api::payroll::{AddComponent, CreatePayroll, UpdateComponent};
use crate::model::component_log::{ComponentAction, ComponentUpdateLog};
use crate::model::leave::{BucketBalance, Entitlements, LeaveBalance, LeaveUsage};
use crate::model::payroll::{ComponentEntry, ComponentType, PayrollTotals};
use crate::payroll::catalog::CatalogEntry;
use crate::payroll::response::{
    ComponentHistory, ComponentLine, ComponentsByType, PayrollComponentDeleteResponse,
    PayrollComponentsView, UpdatedPayroll,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Payroll API",
        version = "1.0.0",
        description = r#"
## Payroll components and leave balances

Back-end for the payroll and leave screens of the **Human Resource Management (HRM)** system.

### 🔹 Key Features
- **Payroll Components**
  - Add, update and delete named earnings and deductions on a monthly payroll record
  - Totals and net salary are recomputed on every change
  - Every change is journalled in an append-only component update log
- **Leave Ledger**
  - Approved leaves per type (casual, sick, earned, other)
  - Remaining balance against caller-supplied entitlements

### 🔐 Security
Every endpoint needs a **JWT Bearer** access token.
Payroll changes are limited to **Admin** and **HR**; employees may read their own records.

### 📦 Money
Amounts are decimal strings with two fractional digits, e.g. `"5000.00"`.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::payroll::create_payroll,
        crate::api::payroll::list_catalog,
        crate::api::payroll::add_component,
        crate::api::payroll::update_component,
        crate::api::payroll::delete_component,
        crate::api::payroll::read_components,
        crate::api::payroll::component_history,

        crate::api::leave::leave_usage,
        crate::api::leave::leave_balance
    ),
    components(
        schemas(
            CreatePayroll,
            AddComponent,
            UpdateComponent,
            ComponentType,
            ComponentEntry,
            ComponentAction,
            ComponentLine,
            ComponentsByType,
            PayrollTotals,
            UpdatedPayroll,
            PayrollComponentDeleteResponse,
            PayrollComponentsView,
            ComponentHistory,
            ComponentUpdateLog,
            CatalogEntry,
            LeaveUsage,
            LeaveBalance,
            BucketBalance,
            Entitlements
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Payroll", description = "Payroll component APIs"),
        (name = "Leave", description = "Leave ledger APIs"),
    )
)]
pub struct ApiDoc;

/// Prefix the handler paths above are written with.
const DOCUMENTED_PREFIX: &str = "/api";

/// The OpenAPI document with its paths moved under the configured `API_PREFIX`.
pub fn openapi_for(api_prefix: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    let prefix = api_prefix.trim_end_matches('/');
    if prefix == DOCUMENTED_PREFIX {
        return doc;
    }

    let paths = std::mem::take(&mut doc.paths.paths);
    doc.paths.paths = paths
        .into_iter()
        .map(|(path, item)| {
            let rest = path.strip_prefix(DOCUMENTED_PREFIX).unwrap_or(&path);
            (format!("{prefix}{rest}"), item)
        })
        .collect();
    doc
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
