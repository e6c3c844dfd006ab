use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::model::payroll::{ComponentEntry, ComponentType, PayrollMonth, SalaryComponents};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, EnumString, AsRefStr,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ComponentAction {
    Added,
    Updated,
    Deleted,
}

/// A mutation about to be journalled, produced by the record itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentChange {
    pub component_name: String,
    pub component_type: ComponentType,
    pub amount: Decimal,
    pub action: ComponentAction,
}

impl ComponentChange {
    pub fn new(name: &str, entry: &ComponentEntry, action: ComponentAction) -> Self {
        Self {
            component_name: name.to_string(),
            component_type: entry.component_type,
            amount: entry.amount,
            action,
        }
    }
}

/// A row of `component_update_logs`. Never updated or deleted.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "log_id": 42,
    "employee_id": "EMP001",
    "month": "2026-01",
    "component_name": "PF",
    "component_type": "deductions",
    "amount": "1800.00",
    "action": "added",
    "created_at": "2026-01-05T10:00:00Z"
}))]
pub struct ComponentUpdateLog {
    pub log_id: u64,
    pub employee_id: String,
    #[schema(value_type = String, example = "2026-01")]
    pub month: PayrollMonth,
    pub component_name: String,
    pub component_type: ComponentType,
    pub amount: Decimal,
    pub action: ComponentAction,
    pub created_at: DateTime<Utc>,
}

impl ComponentUpdateLog {
    pub fn change(&self) -> ComponentChange {
        ComponentChange {
            component_name: self.component_name.clone(),
            component_type: self.component_type,
            amount: self.amount,
            action: self.action,
        }
    }
}

/// Rebuilds components from journalled changes, oldest first.
/// Percentages are not journalled, so replayed entries carry none.
pub fn replay<'a>(changes: impl IntoIterator<Item = &'a ComponentChange>) -> SalaryComponents {
    let mut components = SalaryComponents::new();

    for change in changes {
        let entry = ComponentEntry {
            amount: change.amount,
            component_type: change.component_type,
            original_percentage: None,
        };
        match change.action {
            ComponentAction::Added => {
                components.insert(change.component_name.clone(), entry);
            }
            ComponentAction::Updated => {
                if let Some(existing) = components.get_mut(&change.component_name) {
                    *existing = entry;
                }
            }
            ComponentAction::Deleted => {
                components.remove(&change.component_name);
            }
        }
    }

    components
}

/// Compares components on (name, type, amount), ignoring percentages.
pub fn same_projection(a: &SalaryComponents, b: &SalaryComponents) -> bool {
    a.len() == b.len()
        && a.iter().zip(b.iter()).all(|((na, ea), (nb, eb))| {
            na == nb && ea.component_type == eb.component_type && ea.amount == eb.amount
        })
}
