use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::component_log::{ComponentAction, ComponentChange, ComponentUpdateLog};
use crate::model::payroll::{ComponentType, PayrollRecord, PayrollTotals, SalaryComponents};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ComponentLine {
    #[schema(example = "PF")]
    pub name: String,
    #[schema(example = "1800.00")]
    pub amount: Decimal,
    pub component_type: ComponentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(nullable = true)]
    pub original_percentage: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ComponentsByType {
    pub earnings: Vec<ComponentLine>,
    pub deductions: Vec<ComponentLine>,
}

impl ComponentsByType {
    pub fn contains(&self, name: &str) -> bool {
        self.earnings
            .iter()
            .chain(self.deductions.iter())
            .any(|line| line.name == name)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "message": "Component deleted successfully",
    "payroll_id": 7,
    "employee_id": "EMP001",
    "month": "2026-01",
    "deleted_component": "Transport Allowance",
    "new_totals": {"total_earnings": "0.00", "total_deductions": "1800.00", "net_salary": "48200.00"},
    "remaining_components": {
        "earnings": [],
        "deductions": [{"name": "PF", "amount": "1800.00", "component_type": "deductions"}]
    }
}))]
pub struct PayrollComponentDeleteResponse {
    pub message: String,
    pub payroll_id: u64,
    pub employee_id: String,
    pub month: String,
    pub deleted_component: String,
    pub new_totals: PayrollTotals,
    pub remaining_components: ComponentsByType,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UpdatedPayroll {
    pub message: String,
    pub payroll_id: u64,
    pub employee_id: String,
    pub month: String,
    pub component: String,
    pub action: ComponentAction,
    pub new_totals: PayrollTotals,
    pub components: ComponentsByType,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PayrollComponentsView {
    pub payroll_id: u64,
    pub employee_id: String,
    pub month: String,
    #[schema(example = "50000.00")]
    pub basic_salary: Decimal,
    pub totals: PayrollTotals,
    pub components: ComponentsByType,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ComponentHistory {
    pub employee_id: String,
    pub month: String,
    pub entries: Vec<ComponentUpdateLog>,
    /// Replaying `entries` reproduces the record's current components.
    pub reconciled: bool,
}

/// Splits components by type, keeping insertion order, leaving out `exclude`.
pub fn split_by_type(components: &SalaryComponents, exclude: Option<&str>) -> ComponentsByType {
    let mut split = ComponentsByType::default();

    for (name, entry) in components.iter() {
        if Some(name) == exclude {
            continue;
        }
        let line = ComponentLine {
            name: name.to_string(),
            amount: entry.amount,
            component_type: entry.component_type,
            original_percentage: entry.original_percentage,
        };
        match entry.component_type {
            ComponentType::Earnings => split.earnings.push(line),
            ComponentType::Deductions => split.deductions.push(line),
        }
    }

    split
}

pub fn deleted(record: &PayrollRecord, deleted_component: &str) -> PayrollComponentDeleteResponse {
    PayrollComponentDeleteResponse {
        message: "Component deleted successfully".into(),
        payroll_id: record.payroll_id,
        employee_id: record.employee_id.clone(),
        month: record.month.to_string(),
        deleted_component: deleted_component.to_string(),
        new_totals: record.totals(),
        // the deleted component never shows up here, even if it were still present
        remaining_components: split_by_type(&record.salary_components, Some(deleted_component)),
    }
}

pub fn updated(record: &PayrollRecord, change: &ComponentChange) -> UpdatedPayroll {
    let message = match change.action {
        ComponentAction::Added => "Component added successfully",
        ComponentAction::Updated => "Component updated successfully",
        ComponentAction::Deleted => "Component deleted successfully",
    };

    UpdatedPayroll {
        message: message.into(),
        payroll_id: record.payroll_id,
        employee_id: record.employee_id.clone(),
        month: record.month.to_string(),
        component: change.component_name.clone(),
        action: change.action,
        new_totals: record.totals(),
        components: split_by_type(&record.salary_components, None),
    }
}

pub fn view(record: &PayrollRecord) -> PayrollComponentsView {
    PayrollComponentsView {
        payroll_id: record.payroll_id,
        employee_id: record.employee_id.clone(),
        month: record.month.to_string(),
        basic_salary: record.basic_salary,
        totals: record.totals(),
        components: split_by_type(&record.salary_components, None),
    }
}
